// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A cursor over the row-groups of a table sorted by some key columns.

use std::{cmp::Ordering, ops::Range};

use log::trace;

use super::{CalTableError, ColumnStore, DataType};

/// One key value of one row.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Int(i32),
    Float(f64),
    Str(String),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Str(a), SortValue::Str(b)) => a.cmp(b),
            // Every row's n-th key comes from the same column, so mixed types
            // can't be compared against each other.
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(usize),
    PastLast,
}

/// The rows of a table, permuted into ascending order of the sort key and
/// partitioned into groups of rows with identical keys.
///
/// Sorting is stable, so rows with equal keys keep their storage order.
#[derive(Debug, Clone)]
pub struct GroupCursor {
    /// Row numbers of the table in sorted order.
    order: Vec<usize>,

    /// The ranges of `order` that make up each group.
    bounds: Vec<Range<usize>>,

    position: Position,
}

impl GroupCursor {
    /// Sort the rows of `store` by `sort_keys` (most significant first). Fails
    /// if a key column doesn't exist or holds array data.
    pub fn new<S: ColumnStore + ?Sized>(
        store: &S,
        sort_keys: &[&str],
    ) -> Result<GroupCursor, CalTableError> {
        let num_rows = store.num_rows();
        let mut keys: Vec<Vec<SortValue>> = vec![Vec::with_capacity(sort_keys.len()); num_rows];
        for &key in sort_keys {
            let values: Vec<SortValue> = match store.column_type(key) {
                Some(DataType::Int32) => store
                    .read_range::<i32>(key, 0..num_rows)?
                    .into_iter()
                    .map(SortValue::Int)
                    .collect(),
                Some(DataType::Float64) => store
                    .read_range::<f64>(key, 0..num_rows)?
                    .into_iter()
                    .map(SortValue::Float)
                    .collect(),
                Some(DataType::String) => store
                    .read_range::<String>(key, 0..num_rows)?
                    .into_iter()
                    .map(SortValue::Str)
                    .collect(),
                Some(other) => {
                    return Err(CalTableError::TableOpen {
                        table: store.name().to_string(),
                        reason: format!("can't sort by column '{key}' holding {other} data"),
                    })
                }
                None => {
                    return Err(CalTableError::TableOpen {
                        table: store.name().to_string(),
                        reason: format!("sort column '{key}' does not exist"),
                    })
                }
            };
            for (row_keys, value) in keys.iter_mut().zip(values) {
                row_keys.push(value);
            }
        }

        let compare = |a: &usize, b: &usize| -> Ordering {
            keys[*a]
                .iter()
                .zip(keys[*b].iter())
                .map(|(ka, kb)| ka.compare(kb))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        };
        let mut order: Vec<usize> = (0..num_rows).collect();
        order.sort_by(compare);

        let mut bounds = vec![];
        let mut start = 0;
        for i in 1..=order.len() {
            if i == order.len() || compare(&order[i - 1], &order[i]) != Ordering::Equal {
                bounds.push(start..i);
                start = i;
            }
        }
        trace!(
            "Sorted {num_rows} rows by [{}] into {} groups",
            sort_keys.join(", "),
            bounds.len()
        );

        Ok(GroupCursor {
            order,
            bounds,
            position: Position::BeforeFirst,
        })
    }

    /// Move to the next group. Returns `false` (and stays past the last group)
    /// when there are no groups left.
    pub fn advance(&mut self) -> bool {
        let next = match self.position {
            Position::BeforeFirst => 0,
            Position::At(i) => i + 1,
            Position::PastLast => return false,
        };
        if next < self.bounds.len() {
            self.position = Position::At(next);
            true
        } else {
            self.position = Position::PastLast;
            false
        }
    }

    /// The range of the sorted row order occupied by the current group.
    pub fn current_group_row_range(&self) -> Option<Range<usize>> {
        match self.position {
            Position::At(i) => Some(self.bounds[i].clone()),
            _ => None,
        }
    }

    /// The table row numbers of the current group.
    pub fn current_rows(&self) -> Option<&[usize]> {
        self.current_group_row_range()
            .map(|range| &self.order[range])
    }

    pub fn group_index(&self) -> Option<usize> {
        match self.position {
            Position::At(i) => Some(i),
            _ => None,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_past_last(&self) -> bool {
        self.position == Position::PastLast
    }

    /// Go back to before the first group.
    pub fn reset(&mut self) {
        self.position = Position::BeforeFirst;
    }
}
