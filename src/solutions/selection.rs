// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::CalSolutionRow;

/// Which rows of a calibration table to use. Unset criteria select
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSelection {
    pub fields: Option<Vec<i32>>,
    pub spws: Option<Vec<i32>>,

    /// Matched against both ANTENNA1 and (for baseline-based solutions)
    /// ANTENNA2.
    pub antennas: Option<Vec<i32>>,

    pub observations: Option<Vec<i32>>,

    /// Inclusive \[MJD seconds\].
    pub time_range: Option<(f64, f64)>,
}

impl RowSelection {
    pub fn all() -> RowSelection {
        RowSelection::default()
    }

    pub fn is_all(&self) -> bool {
        *self == RowSelection::default()
    }

    pub fn matches(&self, row: &CalSolutionRow) -> bool {
        let in_list = |list: &Option<Vec<i32>>, id: i32| {
            list.as_ref().map(|l| l.contains(&id)).unwrap_or(true)
        };
        in_list(&self.fields, row.field_id)
            && in_list(&self.spws, row.spw_id)
            && in_list(&self.observations, row.observation_id)
            && in_list(&self.antennas, row.antenna1)
            && (row.antenna2 < 0 || in_list(&self.antennas, row.antenna2))
            && self
                .time_range
                .map(|(start, end)| row.time >= start && row.time <= end)
                .unwrap_or(true)
    }
}
