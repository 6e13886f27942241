// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Iteration over groups of calibration-table rows sharing a sort key.

#[cfg(test)]
mod tests;

use itertools::Itertools;
use log::{debug, trace};
use ndarray::prelude::*;
use strum_macros::Display;

use crate::{
    columns::{stack_cells, stack_cells_into, CalColumn, CalMainColumns},
    constants::DEFAULT_SORT_COLUMNS,
    table::{CalTableError, CalTableHandle, ColumnStore, GroupCursor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IteratorState {
    /// `next` hasn't been called yet.
    #[strum(serialize = "not yet positioned")]
    Created,

    #[strum(serialize = "positioned on a group")]
    Positioned,

    #[strum(serialize = "exhausted")]
    Exhausted,
}

/// Iterates over the groups of rows of a calibration table that share the
/// values of the sort columns, exposing each group's columns as vectors and
/// `[nPar, nChan, nRow]` cubes.
///
/// ```ignore
/// let mut iter = CalTableIterator::with_default_sort(&table)?;
/// while iter.next()? {
///     let times = iter.time()?;
///     let params = iter.param()?;
/// }
/// ```
pub struct CalTableIterator<'a, S> {
    table: &'a CalTableHandle<S>,
    sort_columns: Vec<CalColumn>,
    columns: CalMainColumns<'a, S>,
    cursor: GroupCursor,
    state: IteratorState,
}

impl<'a, S: ColumnStore> CalTableIterator<'a, S> {
    /// Create an iterator grouping rows by `sort_columns` (most significant
    /// first). Fails if a sort column or a required column is missing.
    pub fn new(
        table: &'a CalTableHandle<S>,
        sort_columns: &[CalColumn],
    ) -> Result<CalTableIterator<'a, S>, CalTableError> {
        let names: Vec<&str> = sort_columns.iter().map(|c| c.name()).collect();
        let cursor = table.store().sorted_groups(&names)?;
        let columns = CalMainColumns::attach(table)?;
        debug!(
            "Iterating over '{}' sorted by [{}]: {} groups",
            table.name(),
            sort_columns.iter().join(", "),
            cursor.num_groups()
        );
        Ok(CalTableIterator {
            table,
            sort_columns: sort_columns.to_vec(),
            columns,
            cursor,
            state: IteratorState::Created,
        })
    }

    /// Create an iterator with the default sort: SCAN_NUMBER, FIELD_ID,
    /// SPECTRAL_WINDOW_ID, TIME. Optional columns of the default sort that the
    /// table doesn't have are left out of it.
    pub fn with_default_sort(
        table: &'a CalTableHandle<S>,
    ) -> Result<CalTableIterator<'a, S>, CalTableError> {
        let sort_columns: Vec<CalColumn> = DEFAULT_SORT_COLUMNS
            .iter()
            .copied()
            .filter(|c| {
                let keep = !c.is_optional() || table.has_column(c.name());
                if !keep {
                    debug!("'{}' has no {c} column; not sorting by it", table.name());
                }
                keep
            })
            .collect();
        Self::new(table, &sort_columns)
    }

    /// Advance to the next group. Returns `true` if the iterator is now on a
    /// group and `false` if there were no groups left; calling this again
    /// after `false` is an error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool, CalTableError> {
        if self.state == IteratorState::Exhausted {
            return Err(CalTableError::IteratorExhausted);
        }
        if self.cursor.advance() {
            self.state = IteratorState::Positioned;
            trace!(
                "Group {} has {} rows",
                self.cursor.group_index().unwrap_or_default(),
                self.cursor.current_rows().map(|r| r.len()).unwrap_or_default()
            );
            Ok(true)
        } else {
            self.state = IteratorState::Exhausted;
            Ok(false)
        }
    }

    /// Go back to before the first group.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.state = IteratorState::Created;
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    pub fn table(&self) -> &'a CalTableHandle<S> {
        self.table
    }

    pub fn sort_columns(&self) -> &[CalColumn] {
        &self.sort_columns
    }

    pub fn num_groups(&self) -> usize {
        self.cursor.num_groups()
    }

    /// The index of the current group.
    pub fn group_index(&self) -> Result<usize, CalTableError> {
        self.check_positioned()?;
        self.cursor
            .group_index()
            .ok_or(CalTableError::InvalidIteratorState { state: self.state })
    }

    /// The storage row numbers of the current group, in sort order.
    pub fn rows(&self) -> Result<&[usize], CalTableError> {
        self.check_positioned()?;
        self.cursor
            .current_rows()
            .ok_or(CalTableError::InvalidIteratorState { state: self.state })
    }

    pub fn num_rows(&self) -> Result<usize, CalTableError> {
        Ok(self.rows()?.len())
    }

    fn check_positioned(&self) -> Result<(), CalTableError> {
        match self.state {
            IteratorState::Positioned => Ok(()),
            state => Err(CalTableError::InvalidIteratorState { state }),
        }
    }

    /// The first row of the current group.
    fn first_row(&self) -> Result<usize, CalTableError> {
        self.rows()?
            .first()
            .copied()
            .ok_or(CalTableError::InvalidIteratorState { state: self.state })
    }

    // Scalars. Every row of a group shares the sort-column values, so these
    // are representative of the whole group for sort columns.

    pub fn time0(&self) -> Result<f64, CalTableError> {
        self.columns.time.get(self.first_row()?)
    }

    pub fn field0(&self) -> Result<i32, CalTableError> {
        self.columns.field.get(self.first_row()?)
    }

    pub fn spw0(&self) -> Result<i32, CalTableError> {
        self.columns.spw.get(self.first_row()?)
    }

    pub fn scan0(&self) -> Result<i32, CalTableError> {
        let row = self.first_row()?;
        Ok(self.columns.scan(&[row])?.first().copied().unwrap_or_default())
    }

    // Vectors.

    pub fn time(&self) -> Result<Array1<f64>, CalTableError> {
        Ok(Array1::from(self.columns.time.get_rows(self.rows()?)?))
    }

    pub fn interval(&self) -> Result<Array1<f64>, CalTableError> {
        Ok(Array1::from(self.columns.interval(self.rows()?)?))
    }

    pub fn field(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.field.get_rows(self.rows()?)?))
    }

    pub fn spw(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.spw.get_rows(self.rows()?)?))
    }

    pub fn scan(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.scan(self.rows()?)?))
    }

    pub fn antenna1(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.antenna1.get_rows(self.rows()?)?))
    }

    pub fn antenna2(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.antenna2.get_rows(self.rows()?)?))
    }

    pub fn observation(&self) -> Result<Array1<i32>, CalTableError> {
        Ok(Array1::from(self.columns.observation(self.rows()?)?))
    }

    pub fn time_into(&self, buffer: &mut Array1<f64>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.time.get_rows(self.rows()?)?);
        Ok(())
    }

    pub fn interval_into(&self, buffer: &mut Array1<f64>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.interval(self.rows()?)?);
        Ok(())
    }

    pub fn field_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.field.get_rows(self.rows()?)?);
        Ok(())
    }

    pub fn spw_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.spw.get_rows(self.rows()?)?);
        Ok(())
    }

    pub fn scan_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.scan(self.rows()?)?);
        Ok(())
    }

    pub fn antenna1_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.antenna1.get_rows(self.rows()?)?);
        Ok(())
    }

    pub fn antenna2_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.antenna2.get_rows(self.rows()?)?);
        Ok(())
    }

    pub fn observation_into(&self, buffer: &mut Array1<i32>) -> Result<(), CalTableError> {
        fill_vector(buffer, self.columns.observation(self.rows()?)?);
        Ok(())
    }

    // Cubes, [nPar, nChan, nRow].

    pub fn param(&self) -> Result<Array3<f32>, CalTableError> {
        stack_cells(CalColumn::Param, &self.columns.param.get_rows(self.rows()?)?)
    }

    pub fn param_err(&self) -> Result<Array3<f32>, CalTableError> {
        stack_cells(
            CalColumn::ParamErr,
            &self.columns.param_err.get_rows(self.rows()?)?,
        )
    }

    pub fn snr(&self) -> Result<Array3<f32>, CalTableError> {
        stack_cells(CalColumn::Snr, &self.columns.snr.get_rows(self.rows()?)?)
    }

    pub fn weight(&self) -> Result<Array3<f32>, CalTableError> {
        stack_cells(CalColumn::Weight, &self.columns.weight(self.rows()?)?)
    }

    pub fn flag(&self) -> Result<Array3<bool>, CalTableError> {
        stack_cells(CalColumn::Flag, &self.columns.flag.get_rows(self.rows()?)?)
    }

    pub fn param_into(&self, buffer: &mut Array3<f32>) -> Result<(), CalTableError> {
        stack_cells_into(
            CalColumn::Param,
            &self.columns.param.get_rows(self.rows()?)?,
            buffer,
        )
    }

    pub fn param_err_into(&self, buffer: &mut Array3<f32>) -> Result<(), CalTableError> {
        stack_cells_into(
            CalColumn::ParamErr,
            &self.columns.param_err.get_rows(self.rows()?)?,
            buffer,
        )
    }

    pub fn snr_into(&self, buffer: &mut Array3<f32>) -> Result<(), CalTableError> {
        stack_cells_into(
            CalColumn::Snr,
            &self.columns.snr.get_rows(self.rows()?)?,
            buffer,
        )
    }

    pub fn weight_into(&self, buffer: &mut Array3<f32>) -> Result<(), CalTableError> {
        stack_cells_into(
            CalColumn::Weight,
            &self.columns.weight(self.rows()?)?,
            buffer,
        )
    }

    pub fn flag_into(&self, buffer: &mut Array3<bool>) -> Result<(), CalTableError> {
        stack_cells_into(
            CalColumn::Flag,
            &self.columns.flag.get_rows(self.rows()?)?,
            buffer,
        )
    }

    /// The column accessors behind this iterator.
    pub(crate) fn columns(&self) -> &CalMainColumns<'a, S> {
        &self.columns
    }
}

/// Overwrite `buffer` with `values`, only reallocating if the length differs.
fn fill_vector<T: Clone>(buffer: &mut Array1<T>, values: Vec<T>) {
    if buffer.len() == values.len() {
        buffer
            .iter_mut()
            .zip(values)
            .for_each(|(b, v)| *b = v);
    } else {
        *buffer = Array1::from(values);
    }
}
