// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed access to the columns of a calibration table.
//!
//! Columns are either required or optional. Attaching to a missing required
//! column is an error, but attaching to a missing optional column gives an
//! [`ColumnAccessor::Unattached`] accessor; only reading from or writing to it
//! fails.


use std::marker::PhantomData;

use ndarray::prelude::*;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::table::{CalDataType, CalTableError, CalTableHandle, ColumnStore, DataType};

/// The columns a calibration table may have.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum CalColumn {
    #[strum(serialize = "TIME")]
    Time,

    #[strum(serialize = "INTERVAL")]
    Interval,

    #[strum(serialize = "FIELD_ID")]
    FieldId,

    #[strum(serialize = "SPECTRAL_WINDOW_ID")]
    SpectralWindowId,

    #[strum(serialize = "SCAN_NUMBER")]
    ScanNumber,

    #[strum(serialize = "ANTENNA1")]
    Antenna1,

    #[strum(serialize = "ANTENNA2")]
    Antenna2,

    #[strum(serialize = "OBSERVATION_ID")]
    ObservationId,

    #[strum(serialize = "PARAM")]
    Param,

    #[strum(serialize = "PARAMERR")]
    ParamErr,

    #[strum(serialize = "SNR")]
    Snr,

    #[strum(serialize = "WEIGHT")]
    Weight,

    #[strum(serialize = "FLAG")]
    Flag,

    #[strum(serialize = "CAL_PARMS")]
    CalParms,

    #[strum(serialize = "CAL_TABLES")]
    CalTables,

    #[strum(serialize = "CAL_SELECT")]
    CalSelect,

    #[strum(serialize = "CAL_NOTES")]
    CalNotes,
}

impl CalColumn {
    /// The canonical name of the column in a table.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn from_name(name: &str) -> Option<CalColumn> {
        name.parse().ok()
    }

    /// The type of data this column holds.
    pub fn data_type(self) -> DataType {
        use CalColumn::*;
        match self {
            Time | Interval => DataType::Float64,
            FieldId | SpectralWindowId | ScanNumber | Antenna1 | Antenna2 | ObservationId => {
                DataType::Int32
            }
            Param | ParamErr | Snr | Weight => DataType::Float32Array,
            Flag => DataType::BoolArray,
            CalParms | CalTables | CalSelect | CalNotes => DataType::String,
        }
    }

    /// Is this one of the calibration history columns?
    pub fn is_history(self) -> bool {
        matches!(
            self,
            CalColumn::CalParms | CalColumn::CalTables | CalColumn::CalSelect | CalColumn::CalNotes
        )
    }

    /// May a calibration table lack this column? Missing optional main
    /// columns are read as defaults.
    pub fn is_optional(self) -> bool {
        self.is_history()
            || matches!(
                self,
                CalColumn::Interval
                    | CalColumn::ScanNumber
                    | CalColumn::ObservationId
                    | CalColumn::Weight
            )
    }
}

/// An attached column: the column exists and holds data of type `T`.
#[derive(Debug)]
pub struct AttachedColumn<'a, S, T> {
    store: &'a S,
    column: CalColumn,
    _data: PhantomData<T>,
}

impl<S, T> Clone for AttachedColumn<'_, S, T> {
    fn clone(&self) -> Self {
        AttachedColumn {
            store: self.store,
            column: self.column,
            _data: PhantomData,
        }
    }
}

impl<'a, S: ColumnStore, T: CalDataType> AttachedColumn<'a, S, T> {
    /// Attach to a column that must exist.
    pub fn attach(
        table: &'a CalTableHandle<S>,
        column: CalColumn,
    ) -> Result<AttachedColumn<'a, S, T>, CalTableError> {
        let store = table.store();
        check_column_type::<S, T>(store, column)?.ok_or_else(|| {
            CalTableError::ColumnMissing {
                column: column.to_string(),
            }
        })?;
        Ok(AttachedColumn {
            store,
            column,
            _data: PhantomData,
        })
    }

    pub fn column(&self) -> CalColumn {
        self.column
    }

    pub fn get(&self, row: usize) -> Result<T, CalTableError> {
        self.store
            .read_rows(self.column.name(), &[row])?
            .pop()
            .ok_or(CalTableError::RowOutOfRange {
                row,
                num_rows: self.store.num_rows(),
            })
    }

    pub fn get_rows(&self, rows: &[usize]) -> Result<Vec<T>, CalTableError> {
        self.store.read_rows(self.column.name(), rows)
    }

    pub fn get_all(&self) -> Result<Vec<T>, CalTableError> {
        self.store
            .read_range(self.column.name(), 0..self.store.num_rows())
    }
}

/// Returns `Ok(None)` if the column doesn't exist, and an error if it exists
/// with a type other than `T`.
fn check_column_type<S: ColumnStore, T: CalDataType>(
    store: &S,
    column: CalColumn,
) -> Result<Option<()>, CalTableError> {
    match store.column_type(column.name()) {
        None => Ok(None),
        Some(actual) if actual == T::DATA_TYPE => Ok(Some(())),
        Some(actual) => Err(CalTableError::TypeMismatch {
            column: column.to_string(),
            expected: T::DATA_TYPE,
            actual,
        }),
    }
}

/// A read accessor for a column that may or may not exist.
#[derive(Debug, Clone)]
pub enum ColumnAccessor<'a, S, T> {
    Attached(AttachedColumn<'a, S, T>),

    /// The column is optional and the table doesn't have it.
    Unattached(CalColumn),
}

impl<'a, S: ColumnStore, T: CalDataType> ColumnAccessor<'a, S, T> {
    /// Attach to `column` of `table`. If `optional` is `false` and the column
    /// doesn't exist, this fails immediately.
    pub fn attach(
        table: &'a CalTableHandle<S>,
        column: CalColumn,
        optional: bool,
    ) -> Result<ColumnAccessor<'a, S, T>, CalTableError> {
        match check_column_type::<S, T>(table.store(), column)? {
            Some(()) => Ok(ColumnAccessor::Attached(AttachedColumn {
                store: table.store(),
                column,
                _data: PhantomData,
            })),
            None if optional => Ok(ColumnAccessor::Unattached(column)),
            None => Err(CalTableError::ColumnMissing {
                column: column.to_string(),
            }),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, ColumnAccessor::Attached(_))
    }

    pub fn column(&self) -> CalColumn {
        match self {
            ColumnAccessor::Attached(a) => a.column,
            ColumnAccessor::Unattached(c) => *c,
        }
    }

    pub fn as_attached(&self) -> Option<&AttachedColumn<'a, S, T>> {
        match self {
            ColumnAccessor::Attached(a) => Some(a),
            ColumnAccessor::Unattached(_) => None,
        }
    }

    pub fn get(&self, row: usize) -> Result<T, CalTableError> {
        self.attached()?.get(row)
    }

    pub fn get_rows(&self, rows: &[usize]) -> Result<Vec<T>, CalTableError> {
        self.attached()?.get_rows(rows)
    }

    fn attached(&self) -> Result<&AttachedColumn<'a, S, T>, CalTableError> {
        match self {
            ColumnAccessor::Attached(a) => Ok(a),
            ColumnAccessor::Unattached(c) => Err(CalTableError::ColumnNotAttached {
                column: c.to_string(),
            }),
        }
    }
}

/// Attach to a column for reading. See [`ColumnAccessor::attach`].
pub fn attach<'a, S: ColumnStore, T: CalDataType>(
    table: &'a CalTableHandle<S>,
    column: CalColumn,
    optional: bool,
) -> Result<ColumnAccessor<'a, S, T>, CalTableError> {
    ColumnAccessor::attach(table, column, optional)
}

/// A read-write accessor for a column that may or may not exist.
#[derive(Debug)]
pub enum ColumnAccessorMut<'a, S, T> {
    Attached {
        store: &'a mut S,
        column: CalColumn,
        _data: PhantomData<T>,
    },

    Unattached(CalColumn),
}

impl<'a, S: ColumnStore, T: CalDataType> ColumnAccessorMut<'a, S, T> {
    /// Attach to `column` of a writable `table`. Fails with `NotWritable` if
    /// the handle is read-only or aliased.
    pub fn attach(
        table: &'a mut CalTableHandle<S>,
        column: CalColumn,
        optional: bool,
    ) -> Result<ColumnAccessorMut<'a, S, T>, CalTableError> {
        let store = table.store_mut()?;
        match check_column_type::<S, T>(store, column)? {
            Some(()) => Ok(ColumnAccessorMut::Attached {
                store,
                column,
                _data: PhantomData,
            }),
            None if optional => Ok(ColumnAccessorMut::Unattached(column)),
            None => Err(CalTableError::ColumnMissing {
                column: column.to_string(),
            }),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, ColumnAccessorMut::Attached { .. })
    }

    pub fn get(&self, row: usize) -> Result<T, CalTableError> {
        match self {
            ColumnAccessorMut::Attached { store, column, .. } => store
                .read_rows(column.name(), &[row])?
                .pop()
                .ok_or(CalTableError::RowOutOfRange {
                    row,
                    num_rows: store.num_rows(),
                }),
            ColumnAccessorMut::Unattached(c) => Err(CalTableError::ColumnNotAttached {
                column: c.to_string(),
            }),
        }
    }

    pub fn set(&mut self, row: usize, value: T) -> Result<(), CalTableError> {
        match self {
            ColumnAccessorMut::Attached { store, column, .. } => {
                store.write_cell(column.name(), row, value)
            }
            ColumnAccessorMut::Unattached(c) => Err(CalTableError::ColumnNotAttached {
                column: c.to_string(),
            }),
        }
    }
}

/// The optional calibration history columns.
#[derive(Debug, Clone)]
pub struct CalHistoryColumns<'a, S> {
    pub cal_parms: ColumnAccessor<'a, S, String>,
    pub cal_tables: ColumnAccessor<'a, S, String>,
    pub cal_select: ColumnAccessor<'a, S, String>,
    pub cal_notes: ColumnAccessor<'a, S, String>,
}

impl<'a, S: ColumnStore> CalHistoryColumns<'a, S> {
    pub fn attach(table: &'a CalTableHandle<S>) -> Result<Self, CalTableError> {
        Ok(CalHistoryColumns {
            cal_parms: attach(table, CalColumn::CalParms, true)?,
            cal_tables: attach(table, CalColumn::CalTables, true)?,
            cal_select: attach(table, CalColumn::CalSelect, true)?,
            cal_notes: attach(table, CalColumn::CalNotes, true)?,
        })
    }
}

/// All of the main-table columns. Missing optional columns are replaced by
/// defaults when read: an interval of 0, scan and observation 0, and unit
/// weights.
#[derive(Debug, Clone)]
pub struct CalMainColumns<'a, S> {
    pub time: AttachedColumn<'a, S, f64>,
    pub interval: ColumnAccessor<'a, S, f64>,
    pub field: AttachedColumn<'a, S, i32>,
    pub spw: AttachedColumn<'a, S, i32>,
    pub scan: ColumnAccessor<'a, S, i32>,
    pub antenna1: AttachedColumn<'a, S, i32>,
    pub antenna2: AttachedColumn<'a, S, i32>,
    pub observation: ColumnAccessor<'a, S, i32>,
    pub param: AttachedColumn<'a, S, Array2<f32>>,
    pub param_err: AttachedColumn<'a, S, Array2<f32>>,
    pub snr: AttachedColumn<'a, S, Array2<f32>>,
    pub weight: ColumnAccessor<'a, S, Array2<f32>>,
    pub flag: AttachedColumn<'a, S, Array2<bool>>,
}

impl<'a, S: ColumnStore> CalMainColumns<'a, S> {
    pub fn attach(table: &'a CalTableHandle<S>) -> Result<Self, CalTableError> {
        Ok(CalMainColumns {
            time: AttachedColumn::attach(table, CalColumn::Time)?,
            interval: attach(table, CalColumn::Interval, true)?,
            field: AttachedColumn::attach(table, CalColumn::FieldId)?,
            spw: AttachedColumn::attach(table, CalColumn::SpectralWindowId)?,
            scan: attach(table, CalColumn::ScanNumber, true)?,
            antenna1: AttachedColumn::attach(table, CalColumn::Antenna1)?,
            antenna2: AttachedColumn::attach(table, CalColumn::Antenna2)?,
            observation: attach(table, CalColumn::ObservationId, true)?,
            param: AttachedColumn::attach(table, CalColumn::Param)?,
            param_err: AttachedColumn::attach(table, CalColumn::ParamErr)?,
            snr: AttachedColumn::attach(table, CalColumn::Snr)?,
            weight: attach(table, CalColumn::Weight, true)?,
            flag: AttachedColumn::attach(table, CalColumn::Flag)?,
        })
    }

    pub fn interval(&self, rows: &[usize]) -> Result<Vec<f64>, CalTableError> {
        read_or_default(&self.interval, rows, 0.0)
    }

    pub fn scan(&self, rows: &[usize]) -> Result<Vec<i32>, CalTableError> {
        read_or_default(&self.scan, rows, 0)
    }

    pub fn observation(&self, rows: &[usize]) -> Result<Vec<i32>, CalTableError> {
        read_or_default(&self.observation, rows, 0)
    }

    /// The weight cells of `rows`, or unit weights shaped like PARAM.
    pub fn weight(&self, rows: &[usize]) -> Result<Vec<Array2<f32>>, CalTableError> {
        match &self.weight {
            ColumnAccessor::Attached(a) => a.get_rows(rows),
            ColumnAccessor::Unattached(_) => Ok(self
                .param
                .get_rows(rows)?
                .into_iter()
                .map(|p| Array2::ones(p.dim()))
                .collect()),
        }
    }
}

fn read_or_default<S: ColumnStore, T: CalDataType>(
    accessor: &ColumnAccessor<S, T>,
    rows: &[usize],
    default: T,
) -> Result<Vec<T>, CalTableError> {
    match accessor {
        ColumnAccessor::Attached(a) => a.get_rows(rows),
        ColumnAccessor::Unattached(_) => Ok(vec![default; rows.len()]),
    }
}

/// Stack per-row `[nPar, nChan]` cells into a `[nPar, nChan, nRow]` cube. All
/// cells must have the same shape.
pub(crate) fn stack_cells<T: Clone>(
    column: CalColumn,
    cells: &[Array2<T>],
) -> Result<Array3<T>, CalTableError> {
    let (num_par, num_chan) = cells.first().map(|c| c.dim()).unwrap_or((0, 0));
    check_cell_shapes(column, cells, (num_par, num_chan))?;
    Ok(Array3::from_shape_fn(
        (num_par, num_chan, cells.len()),
        |(p, c, r)| cells[r][(p, c)].clone(),
    ))
}

/// Like [`stack_cells`], but write into an existing cube if it already has
/// the right shape.
pub(crate) fn stack_cells_into<T: Clone>(
    column: CalColumn,
    cells: &[Array2<T>],
    buffer: &mut Array3<T>,
) -> Result<(), CalTableError> {
    let (num_par, num_chan) = cells.first().map(|c| c.dim()).unwrap_or((0, 0));
    if buffer.dim() != (num_par, num_chan, cells.len()) {
        *buffer = stack_cells(column, cells)?;
        return Ok(());
    }
    check_cell_shapes(column, cells, (num_par, num_chan))?;
    for (mut slice, cell) in buffer.axis_iter_mut(Axis(2)).zip(cells) {
        slice.assign(cell);
    }
    Ok(())
}

fn check_cell_shapes<T>(
    column: CalColumn,
    cells: &[Array2<T>],
    expected: (usize, usize),
) -> Result<(), CalTableError> {
    match cells.iter().find(|c| c.dim() != expected) {
        Some(bad) => Err(CalTableError::ShapeMismatch {
            column: column.to_string(),
            expected: vec![expected.0, expected.1],
            actual: bad.shape().to_vec(),
        }),
        None => Ok(()),
    }
}
