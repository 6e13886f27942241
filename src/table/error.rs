// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structural errors: anything wrong with a table, its columns or an iterator
//! over it.

use thiserror::Error;

use super::DataType;
use crate::iterator::IteratorState;

#[derive(Error, Debug)]
pub enum CalTableError {
    #[error("Couldn't open calibration table '{table}': {reason}")]
    TableOpen { table: String, reason: String },

    #[error("Required column '{column}' does not exist in the calibration table")]
    ColumnMissing { column: String },

    #[error("Column '{column}' is not attached (it is optional and absent from this table)")]
    ColumnNotAttached { column: String },

    #[error("Column access is not possible while the iterator is {state}")]
    InvalidIteratorState { state: IteratorState },

    #[error("next() was called on an exhausted calibration table iterator")]
    IteratorExhausted,

    #[error("Column '{column}' holds {actual} data, but {expected} data was requested")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Cells of column '{column}' have inconsistent shapes within one group: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        column: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Tried to access row {row}, but the table only has {num_rows} rows")]
    RowOutOfRange { row: usize, num_rows: usize },

    #[error("Column '{column}' has {actual} rows, but the table has {expected} rows")]
    BadColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Calibration table '{table}' is not writable: {reason}")]
    NotWritable { table: String, reason: &'static str },

    #[error("Calibration table '{table}' has no subtable '{subtable}'")]
    SubtableMissing { table: String, subtable: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
