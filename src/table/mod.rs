// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Access to calibration tables.
//!
//! Calibration tables are columnar; every column has one cell per row, and a
//! cell is either a scalar or a small 2D array (`[nPar, nChan]`). The storage
//! engine is hidden behind [`ColumnStore`]; [`MemTable`] is an in-memory
//! implementation that can be persisted to JSON.

mod cursor;
mod error;
mod handle;
mod memory;
#[cfg(test)]
mod tests;

pub use cursor::GroupCursor;
pub use error::CalTableError;
pub use handle::CalTableHandle;
pub use memory::MemTable;

use std::{ops::Range, path::Path};

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How a table is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum TableOpenMode {
    /// The table must exist, and can't be written to.
    #[strum(serialize = "read")]
    Read,

    /// The table must exist, and can be written to.
    #[strum(serialize = "update")]
    Update,

    /// A new, empty table is created (replacing anything at the path).
    #[strum(serialize = "create")]
    Create,
}

impl TableOpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, TableOpenMode::Read)
    }
}

/// The type of the data held by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DataType {
    #[strum(serialize = "double")]
    Float64,

    #[strum(serialize = "int")]
    Int32,

    #[strum(serialize = "string")]
    String,

    #[strum(serialize = "float array")]
    Float32Array,

    #[strum(serialize = "double vector")]
    Float64Vector,

    #[strum(serialize = "bool array")]
    BoolArray,
}

/// All of the cells of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "cells")]
pub enum ColumnData {
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    String(Vec<String>),
    Float32Array(Vec<Array2<f32>>),
    Float64Vector(Vec<Array1<f64>>),
    BoolArray(Vec<Array2<bool>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float64(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::Float32Array(v) => v.len(),
            ColumnData::Float64Vector(v) => v.len(),
            ColumnData::BoolArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::String(_) => DataType::String,
            ColumnData::Float32Array(_) => DataType::Float32Array,
            ColumnData::Float64Vector(_) => DataType::Float64Vector,
            ColumnData::BoolArray(_) => DataType::BoolArray,
        }
    }
}

/// A Rust type that can be stored in the cells of a column.
pub trait CalDataType: Clone + Sized {
    const DATA_TYPE: DataType;

    /// Borrow the cells of `data`, if it holds this type.
    fn cells(data: &ColumnData) -> Option<&[Self]>;

    /// Mutably borrow the cells of `data`, if it holds this type.
    fn cells_mut(data: &mut ColumnData) -> Option<&mut [Self]>;

    /// Wrap cells into column data.
    fn into_column(cells: Vec<Self>) -> ColumnData;
}

macro_rules! impl_cal_data_type {
    ($t:ty, $variant:ident) => {
        impl CalDataType for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn cells(data: &ColumnData) -> Option<&[Self]> {
                match data {
                    ColumnData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn cells_mut(data: &mut ColumnData) -> Option<&mut [Self]> {
                match data {
                    ColumnData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_column(cells: Vec<Self>) -> ColumnData {
                ColumnData::$variant(cells)
            }
        }
    };
}

impl_cal_data_type!(f64, Float64);
impl_cal_data_type!(i32, Int32);
impl_cal_data_type!(String, String);
impl_cal_data_type!(Array2<f32>, Float32Array);
impl_cal_data_type!(Array1<f64>, Float64Vector);
impl_cal_data_type!(Array2<bool>, BoolArray);

/// The storage engine interface of a calibration table.
pub trait ColumnStore {
    /// A human-readable name for the table (usually its path).
    fn name(&self) -> &str;

    fn num_rows(&self) -> usize;

    fn column_names(&self) -> Vec<String>;

    /// The data type of a column, or `None` if the column doesn't exist.
    fn column_type(&self, name: &str) -> Option<DataType>;

    fn has_column(&self, name: &str) -> bool {
        self.column_type(name).is_some()
    }

    /// Read the cells of the given rows of a column, in the given order.
    fn read_rows<T: CalDataType>(&self, name: &str, rows: &[usize])
        -> Result<Vec<T>, CalTableError>;

    /// Read a contiguous range of rows of a column.
    fn read_range<T: CalDataType>(
        &self,
        name: &str,
        rows: Range<usize>,
    ) -> Result<Vec<T>, CalTableError> {
        let rows: Vec<usize> = rows.collect();
        self.read_rows(name, &rows)
    }

    fn write_cell<T: CalDataType>(
        &mut self,
        name: &str,
        row: usize,
        value: T,
    ) -> Result<(), CalTableError>;

    /// Get a named subtable (e.g. "SPECTRAL_WINDOW").
    fn subtable(&self, name: &str) -> Result<Self, CalTableError>
    where
        Self: Sized;

    /// Sort the rows by the given key columns and partition them into groups.
    fn sorted_groups(&self, sort_keys: &[&str]) -> Result<GroupCursor, CalTableError> {
        GroupCursor::new(self, sort_keys)
    }
}

/// A [`ColumnStore`] that lives at a path.
pub trait OpenColumnStore: ColumnStore + Sized {
    fn open(path: &Path, mode: TableOpenMode) -> Result<Self, CalTableError>;
}
