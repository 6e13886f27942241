// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexMapError {
    #[error("The calibration table has no fields to map to")]
    NoCalFields,

    #[error("Found more than one calibration field at the minimum distance from field {field} ({separation_deg}°); can't decide which is nearest")]
    AmbiguousNearestField { field: usize, separation_deg: f64 },

    #[error("Field {field} has no direction in the calibration table's FIELD subtable")]
    MissingFieldDirection { field: i32 },
}
