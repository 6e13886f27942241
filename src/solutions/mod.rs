// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration solutions as plain rows, and conversions between rows and
//! tables.

mod selection;
mod spw;
#[cfg(test)]
mod tests;

pub use selection::RowSelection;
pub use spw::SpectralWindows;

use ndarray::prelude::*;

use crate::{
    columns::CalColumn,
    iterator::CalTableIterator,
    table::{CalDataType, CalTableError, ColumnStore, MemTable},
};

/// One row of a calibration table.
#[derive(Debug, Clone, PartialEq)]
pub struct CalSolutionRow {
    /// \[MJD seconds\]
    pub time: f64,

    /// \[seconds\]
    pub interval: f64,

    pub antenna1: i32,

    /// -1 for antenna-based solutions.
    pub antenna2: i32,

    pub field_id: i32,
    pub spw_id: i32,
    pub scan_number: i32,
    pub observation_id: i32,

    /// The calibration parameters, `[nPar, nChan]`. The other arrays have the
    /// same shape.
    pub param: Array2<f32>,
    pub param_err: Array2<f32>,
    pub snr: Array2<f32>,
    pub weight: Array2<f32>,
    pub flag: Array2<bool>,
}

impl CalSolutionRow {
    /// An unflagged antenna-based solution with zero errors and unit SNRs and
    /// weights. Scan, observation and interval are 0.
    pub fn new(time: f64, antenna: i32, field_id: i32, spw_id: i32, param: Array2<f32>) -> Self {
        let dim = param.dim();
        CalSolutionRow {
            time,
            interval: 0.0,
            antenna1: antenna,
            antenna2: -1,
            field_id,
            spw_id,
            scan_number: 0,
            observation_id: 0,
            param,
            param_err: Array2::zeros(dim),
            snr: Array2::ones(dim),
            weight: Array2::ones(dim),
            flag: Array2::from_elem(dim, false),
        }
    }

    /// `(nPar, nChan)`.
    pub fn shape(&self) -> (usize, usize) {
        self.param.dim()
    }

    /// Do all of this row's arrays have the same shape?
    pub fn is_consistent(&self) -> bool {
        let dim = self.param.dim();
        self.param_err.dim() == dim
            && self.snr.dim() == dim
            && self.weight.dim() == dim
            && self.flag.dim() == dim
    }

    /// Read all of the rows of the iterator's current group.
    pub fn read_group<S: ColumnStore>(
        iter: &CalTableIterator<S>,
    ) -> Result<Vec<CalSolutionRow>, CalTableError> {
        let rows = iter.rows()?;
        let columns = iter.columns();
        let time = columns.time.get_rows(rows)?;
        let interval = columns.interval(rows)?;
        let antenna1 = columns.antenna1.get_rows(rows)?;
        let antenna2 = columns.antenna2.get_rows(rows)?;
        let field = columns.field.get_rows(rows)?;
        let spw = columns.spw.get_rows(rows)?;
        let scan = columns.scan(rows)?;
        let observation = columns.observation(rows)?;
        let param = columns.param.get_rows(rows)?;
        let param_err = columns.param_err.get_rows(rows)?;
        let snr = columns.snr.get_rows(rows)?;
        let weight = columns.weight(rows)?;
        let flag = columns.flag.get_rows(rows)?;

        let mut out = Vec::with_capacity(rows.len());
        for (i, (param, param_err, snr, weight, flag)) in param
            .into_iter()
            .zip(param_err)
            .zip(snr)
            .zip(weight)
            .zip(flag)
            .map(|((((p, e), s), w), f)| (p, e, s, w, f))
            .enumerate()
        {
            let row = CalSolutionRow {
                time: time[i],
                interval: interval[i],
                antenna1: antenna1[i],
                antenna2: antenna2[i],
                field_id: field[i],
                spw_id: spw[i],
                scan_number: scan[i],
                observation_id: observation[i],
                param,
                param_err,
                snr,
                weight,
                flag,
            };
            if !row.is_consistent() {
                return Err(CalTableError::ShapeMismatch {
                    column: CalColumn::Param.to_string(),
                    expected: row.param.shape().to_vec(),
                    actual: [
                        row.param_err.shape(),
                        row.snr.shape(),
                        row.weight.shape(),
                        row.flag.shape(),
                    ]
                    .into_iter()
                    .find(|s| *s != row.param.shape())
                    .map(|s| s.to_vec())
                    .unwrap_or_default(),
                });
            }
            out.push(row);
        }
        Ok(out)
    }
}

/// Build an in-memory calibration table holding these rows (in this order).
pub fn rows_to_table(rows: &[CalSolutionRow]) -> Result<MemTable, CalTableError> {
    fn column<T: CalDataType>(rows: &[CalSolutionRow], f: impl Fn(&CalSolutionRow) -> T) -> Vec<T> {
        rows.iter().map(f).collect()
    }

    let mut table = MemTable::new(rows.len());
    table.add_column(
        CalColumn::Time.name(),
        f64::into_column(column(rows, |r| r.time)),
    )?;
    table.add_column(
        CalColumn::Interval.name(),
        f64::into_column(column(rows, |r| r.interval)),
    )?;
    let int_columns: [(CalColumn, fn(&CalSolutionRow) -> i32); 6] = [
        (CalColumn::FieldId, |r| r.field_id),
        (CalColumn::SpectralWindowId, |r| r.spw_id),
        (CalColumn::ScanNumber, |r| r.scan_number),
        (CalColumn::Antenna1, |r| r.antenna1),
        (CalColumn::Antenna2, |r| r.antenna2),
        (CalColumn::ObservationId, |r| r.observation_id),
    ];
    for (col, f) in int_columns {
        table.add_column(col.name(), i32::into_column(column(rows, f)))?;
    }
    let array_columns: [(CalColumn, fn(&CalSolutionRow) -> Array2<f32>); 4] = [
        (CalColumn::Param, |r| r.param.clone()),
        (CalColumn::ParamErr, |r| r.param_err.clone()),
        (CalColumn::Snr, |r| r.snr.clone()),
        (CalColumn::Weight, |r| r.weight.clone()),
    ];
    for (col, f) in array_columns {
        table.add_column(col.name(), Array2::<f32>::into_column(column(rows, f)))?;
    }
    table.add_column(
        CalColumn::Flag.name(),
        Array2::<bool>::into_column(column(rows, |r| r.flag.clone())),
    )?;
    Ok(table)
}
