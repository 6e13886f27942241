// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::AxisKind;

/// Errors from building an interpolation engine or querying it. Query errors
/// are about what was asked for, not about the table; see
/// [`crate::CallingConvention::Lenient`].
#[derive(Error, Debug)]
pub enum InterpError {
    #[error("There are no calibration solutions to interpolate")]
    EmptyCalTable,

    #[error("The {axis} axis was specified more than once")]
    AxisConflict { axis: AxisKind },

    #[error("Antenna {antenna} is not mapped to any calibration-table antenna")]
    UnmappedAntenna { antenna: i32 },

    #[error("No calibration solutions for antenna1 {antenna1}, antenna2 {antenna2}, field {field}, spw {spw}, observation {observation}")]
    NoMatchingSolution {
        antenna1: i32,
        antenna2: i32,
        field: i32,
        spw: i32,
        observation: i32,
    },

    #[error("The nearest {axis} sample is {distance}{unit} away, beyond the window of {window}{unit}")]
    OutOfWindow {
        axis: AxisKind,
        distance: f64,
        window: f64,
        unit: &'static str,
    },

    #[error("{axis} interpolation needs at least {needed} distinct points, but only {available} are available")]
    InsufficientPoints {
        axis: AxisKind,
        needed: usize,
        available: usize,
    },

    #[error("Calibration solutions have inconsistent shapes: {0}")]
    InconsistentShape(String),

    #[error("Spectral window {spw} has more than one channel, but no channel frequencies")]
    MissingChannelFrequencies { spw: i32 },
}

impl InterpError {
    /// Is this error about a query, rather than about the calibration table or
    /// how the engine was built?
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            InterpError::UnmappedAntenna { .. }
                | InterpError::NoMatchingSolution { .. }
                | InterpError::OutOfWindow { .. }
                | InterpError::InsufficientPoints { .. }
        )
    }
}
