// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all caltab-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaltabError {
    #[error(transparent)]
    Table(#[from] crate::table::CalTableError),

    #[error(transparent)]
    Interp(#[from] crate::interp::InterpError),

    #[error(transparent)]
    IndexMap(#[from] crate::maps::IndexMapError),

    #[error(transparent)]
    CalLib(#[from] crate::callib::CalLibError),

    #[error(transparent)]
    UnitParse(#[from] crate::unit_parsing::UnitParseError),
}
