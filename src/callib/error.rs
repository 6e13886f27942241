// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::CALLIB_FILE_TYPES_COMMA_SEPARATED;
use crate::unit_parsing::UnitParseError;

#[derive(Error, Debug)]
pub enum CalLibError {
    #[error("Calibration library '{0}' doesn't have a recognised file extension! Valid extensions are: {}", *CALLIB_FILE_TYPES_COMMA_SEPARATED)]
    UnrecognisedFileExt(String),

    #[error("Couldn't decode toml structure from {file}:\n{err}")]
    TomlDecode { file: String, err: String },

    #[error("Couldn't decode json structure from {file}:\n{err}")]
    JsonDecode { file: String, err: String },

    #[error("The calibration library has no calibration tables")]
    NoTables,

    #[error("Calibration table {table}: {axis} window '{window}' must be a positive quantity")]
    BadWindow {
        table: String,
        axis: &'static str,
        window: String,
    },

    #[error("Calibration table {table}: couldn't parse the {axis} window: {source}")]
    WindowUnit {
        table: String,
        axis: &'static str,
        source: UnitParseError,
    },

    #[error("Calibration table {table}: fldmap '{value}' isn't understood; use a field ID, a list of field IDs or \"nearest\"")]
    BadFieldMap { table: String, value: String },

    #[error("Calibration table {table}: fldmap \"nearest\" needs the directions of the fields being calibrated")]
    NearestFieldNeedsDirections { table: String },

    #[error("Calibration table {table}: the time range starts ({start}) after it ends ({end})")]
    BadTimeRange { table: String, start: f64, end: f64 },

    #[error("IO error when trying to read a calibration library: {0}")]
    IO(#[from] std::io::Error),
}
