// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All arithmetic on calibration parameters is done in double precision; results
are only converted to single precision on the way out.
 */

use crate::columns::CalColumn;

/// The order in which rows of a calibration table are grouped when the caller
/// doesn't specify one.
pub const DEFAULT_SORT_COLUMNS: [CalColumn; 4] = [
    CalColumn::ScanNumber,
    CalColumn::FieldId,
    CalColumn::SpectralWindowId,
    CalColumn::Time,
];

/// The subtable describing spectral windows. Row `n` describes spw `n`.
pub const SPECTRAL_WINDOW_SUBTABLE: &str = "SPECTRAL_WINDOW";

/// The column of [`SPECTRAL_WINDOW_SUBTABLE`] holding channel centre
/// frequencies \[Hz\].
pub const CHAN_FREQ_COLUMN: &str = "CHAN_FREQ";

/// The smallest number of distinct points a natural cubic spline is fitted
/// through.
pub const SPLINE_MIN_POINTS: usize = 3;

/// The interpolation order used for a plain "poly" interpolation string.
pub const DEFAULT_POLYNOMIAL_ORDER: u8 = 2;

pub const SECONDS_PER_DAY: f64 = 86400.0;

/// The subtable describing fields. Row `n` describes field `n`.
pub const FIELD_SUBTABLE: &str = "FIELD";

/// The column of [`FIELD_SUBTABLE`] holding `[ra, dec]` phase centres
/// \[radians\].
pub const PHASE_DIR_COLUMN: &str = "PHASE_DIR";
