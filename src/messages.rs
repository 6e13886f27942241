// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Messages to report to the user.
//!
//! Building interpolation engines from calibration libraries produces a few
//! facts worth reporting together; these structs gather them and print them
//! in one go.

use std::path::Path;

use itertools::Itertools;
use log::info;

use crate::{interp::InterpolationAxis, time::epoch_from_mjd_seconds};

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct EngineSummary<'a> {
    pub(crate) num_rows: usize,
    pub(crate) num_series: usize,
    pub(crate) num_par: usize,
    pub(crate) antennas: Vec<i32>,
    pub(crate) spws: Vec<i32>,
    /// \[MJD seconds\]
    pub(crate) time_range: (f64, f64),
    pub(crate) time_axis: &'a InterpolationAxis,
    pub(crate) freq_axis: &'a InterpolationAxis,
}

impl EngineSummary<'_> {
    pub(crate) fn print(self) {
        info!(
            "Calibration solutions: {} rows in {} series, {} parameters each",
            self.num_rows, self.num_series, self.num_par
        );
        info!(
            "  {} antennas, spectral windows [{}]",
            self.antennas.len(),
            self.spws.iter().join(", ")
        );
        info!(
            "  First solution: {}",
            epoch_from_mjd_seconds(self.time_range.0)
        );
        info!(
            "  Last solution:  {}",
            epoch_from_mjd_seconds(self.time_range.1)
        );
        for axis in [self.time_axis, self.freq_axis] {
            let window = match axis.window {
                Some(w) => format!("within {w}{}", axis.kind.unit()),
                None => "unbounded".to_string(),
            };
            info!(
                "  {} interpolation: {}, {}, {window}, {} edges{}",
                axis.kind,
                axis.interp,
                axis.weighting,
                axis.edge,
                if axis.propagate_flags {
                    ", propagating flags"
                } else {
                    ""
                }
            );
        }
    }
}

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct CalLibEntryDetails<'a> {
    pub(crate) path: &'a Path,
    pub(crate) tinterp: &'a str,
    pub(crate) finterp: &'a str,
    pub(crate) num_groups: usize,
}

impl CalLibEntryDetails<'_> {
    pub(crate) fn print(self) {
        info!("Applying calibration table {}", self.path.display());
        info!(
            "  {} row groups; tinterp '{}', finterp '{}'",
            self.num_groups, self.tinterp, self.finterp
        );
    }
}
