// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions around time.

use hifitime::Epoch;

use crate::constants::SECONDS_PER_DAY;

/// Calibration tables store times as MJD seconds (UTC). Convert one to an
/// [`Epoch`].
pub(crate) fn epoch_from_mjd_seconds(mjd_seconds: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd_seconds / SECONDS_PER_DAY)
}
