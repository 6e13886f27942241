// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    solutions::{rows_to_table, CalSolutionRow},
    table::{ColumnData, MemTable, TableOpenMode},
};

/// 2 spws x 3 times x 2 antennas, written in reverse time order. PARAM is
/// `[2, 3]` with every element `antenna + time`.
fn test_table() -> MemTable {
    let mut rows = vec![];
    for spw in 0..2 {
        for time in [20.0, 10.0, 0.0] {
            for antenna in 0..2 {
                let mut row = CalSolutionRow::new(
                    time,
                    antenna,
                    0,
                    spw,
                    Array2::from_elem((2, 3), antenna as f32 + time as f32),
                );
                row.interval = 10.0;
                row.scan_number = 1;
                rows.push(row);
            }
        }
    }
    rows_to_table(&rows).unwrap()
}

#[test]
fn test_iterator_visits_each_group_once() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    assert_eq!(iter.state(), IteratorState::Created);
    assert_eq!(iter.num_groups(), 6);
    assert_eq!(iter.sort_columns(), &DEFAULT_SORT_COLUMNS);

    let mut keys = vec![];
    for _ in 0..6 {
        let result = iter.next();
        assert!(result.is_ok(), "{:?}", result.err());
        assert!(result.unwrap());
        assert_eq!(iter.state(), IteratorState::Positioned);
        assert_eq!(iter.num_rows().unwrap(), 2);
        keys.push((iter.spw0().unwrap(), iter.time0().unwrap()));
    }
    assert_eq!(
        keys,
        vec![
            (0, 0.0),
            (0, 10.0),
            (0, 20.0),
            (1, 0.0),
            (1, 10.0),
            (1, 20.0)
        ]
    );

    assert!(!iter.next().unwrap());
    assert_eq!(iter.state(), IteratorState::Exhausted);
    assert!(matches!(
        iter.time(),
        Err(CalTableError::InvalidIteratorState {
            state: IteratorState::Exhausted
        })
    ));
    assert!(matches!(iter.next(), Err(CalTableError::IteratorExhausted)));
}

#[test]
fn test_access_before_next_is_an_error() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let iter = CalTableIterator::with_default_sort(&table).unwrap();
    assert!(matches!(
        iter.param(),
        Err(CalTableError::InvalidIteratorState {
            state: IteratorState::Created
        })
    ));
    assert!(iter.group_index().is_err());
    assert!(iter.time0().is_err());
}

#[test]
fn test_reset() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    while iter.next().unwrap() {}
    iter.reset();
    assert_eq!(iter.state(), IteratorState::Created);
    assert!(iter.next().unwrap());
    assert_eq!(iter.group_index().unwrap(), 0);
}

#[test]
fn test_vectors_agree_with_scalars() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    while iter.next().unwrap() {
        let time = iter.time().unwrap();
        let spw = iter.spw().unwrap();
        let field = iter.field().unwrap();
        let scan = iter.scan().unwrap();
        assert!(time.iter().all(|&t| t == iter.time0().unwrap()));
        assert!(spw.iter().all(|&s| s == iter.spw0().unwrap()));
        assert!(field.iter().all(|&f| f == iter.field0().unwrap()));
        assert!(scan.iter().all(|&s| s == iter.scan0().unwrap()));
        assert_eq!(iter.scan0().unwrap(), 1);

        assert_eq!(iter.antenna1().unwrap(), array![0, 1]);
        assert_eq!(iter.antenna2().unwrap(), array![-1, -1]);
        assert_eq!(iter.observation().unwrap(), array![0, 0]);
        assert_abs_diff_eq!(iter.interval().unwrap(), array![10.0_f64, 10.0]);
    }
}

#[test]
fn test_cubes() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    // Skip to spw 0, time 10.
    iter.next().unwrap();
    iter.next().unwrap();

    let param = iter.param().unwrap();
    assert_eq!(param.dim(), (2, 3, 2));
    assert_abs_diff_eq!(
        param.index_axis(Axis(2), 0).to_owned(),
        Array2::from_elem((2, 3), 10.0_f32)
    );
    assert_abs_diff_eq!(
        param.index_axis(Axis(2), 1).to_owned(),
        Array2::from_elem((2, 3), 11.0_f32)
    );
    assert_eq!(iter.param_err().unwrap().dim(), (2, 3, 2));
    assert_abs_diff_eq!(iter.snr().unwrap(), Array3::<f32>::ones((2, 3, 2)));
    assert_abs_diff_eq!(iter.weight().unwrap(), Array3::<f32>::ones((2, 3, 2)));
    assert!(iter.flag().unwrap().iter().all(|f| !f));
}

#[test]
fn test_into_buffers() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    let mut time = Array1::zeros(0);
    let mut antenna1 = Array1::zeros(0);
    let mut param = Array3::zeros((0, 0, 0));
    let mut flag = Array3::from_elem((0, 0, 0), true);
    while iter.next().unwrap() {
        iter.time_into(&mut time).unwrap();
        iter.antenna1_into(&mut antenna1).unwrap();
        iter.param_into(&mut param).unwrap();
        iter.flag_into(&mut flag).unwrap();
        assert_eq!(time, iter.time().unwrap());
        assert_eq!(antenna1, iter.antenna1().unwrap());
        assert_eq!(param, iter.param().unwrap());
        assert_eq!(flag, iter.flag().unwrap());
    }
}

#[test]
fn test_missing_sort_column() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let result = CalTableIterator::new(&table, &[CalColumn::Time, CalColumn::CalNotes]);
    assert!(matches!(result, Err(CalTableError::TableOpen { .. })));
}

#[test]
fn test_default_sort_without_scan_numbers() {
    let mut store = test_table();
    store.remove_column(CalColumn::ScanNumber.name());
    let table = CalTableHandle::from_store(store, TableOpenMode::Read);
    let iter = CalTableIterator::with_default_sort(&table);
    assert!(iter.is_ok(), "{:?}", iter.err());
    let mut iter = iter.unwrap();
    assert_eq!(
        iter.sort_columns(),
        &[
            CalColumn::FieldId,
            CalColumn::SpectralWindowId,
            CalColumn::Time
        ]
    );
    assert_eq!(iter.num_groups(), 6);
    assert!(iter.next().unwrap());
    assert_eq!(iter.scan0().unwrap(), 0);
    assert_eq!((iter.spw0().unwrap(), iter.time0().unwrap()), (0, 0.0));

    // Required columns of the default sort are still required.
    let mut store = test_table();
    store.remove_column(CalColumn::FieldId.name());
    let table = CalTableHandle::from_store(store, TableOpenMode::Read);
    assert!(matches!(
        CalTableIterator::with_default_sort(&table),
        Err(CalTableError::TableOpen { .. })
    ));
}

#[test]
fn test_missing_required_column() {
    let mut store = test_table();
    store.remove_column(CalColumn::Antenna2.name());
    let table = CalTableHandle::from_store(store, TableOpenMode::Read);
    let result = CalTableIterator::with_default_sort(&table);
    assert!(matches!(result, Err(CalTableError::ColumnMissing { .. })));
}

#[test]
fn test_custom_sort() {
    let table = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    let mut iter = CalTableIterator::new(&table, &[CalColumn::Antenna1]).unwrap();
    assert_eq!(iter.num_groups(), 2);
    assert!(iter.next().unwrap());
    assert_eq!(iter.num_rows().unwrap(), 6);
    assert!(iter.antenna1().unwrap().iter().all(|&a| a == 0));
    // Storage order is kept within a group.
    assert_eq!(
        iter.time().unwrap(),
        array![20.0, 10.0, 0.0, 20.0, 10.0, 0.0]
    );
}

#[test]
fn test_inconsistent_cell_shapes() {
    let mut store = test_table();
    let mut params = vec![Array2::<f32>::zeros((2, 3)); 12];
    // Row 1 is in the same group as row 0 (spw 0, time 20).
    params[1] = Array2::zeros((2, 4));
    store
        .add_column(CalColumn::Param.name(), ColumnData::Float32Array(params))
        .unwrap();
    let table = CalTableHandle::from_store(store, TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    while iter.next().unwrap() {
        let time0 = iter.time0().unwrap();
        let spw0 = iter.spw0().unwrap();
        let result = iter.param();
        if time0 == 20.0 && spw0 == 0 {
            assert!(matches!(result, Err(CalTableError::ShapeMismatch { .. })));
        } else {
            assert!(result.is_ok(), "{:?}", result.err());
        }
    }
}
