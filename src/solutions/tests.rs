// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::tempdir;
use vec1::vec1;

use super::*;
use crate::{
    constants::SPECTRAL_WINDOW_SUBTABLE,
    table::{CalTableHandle, OpenColumnStore, TableOpenMode},
};

fn make_rows() -> Vec<CalSolutionRow> {
    let mut rows = vec![];
    for (i, time) in [100.0, 200.0].into_iter().enumerate() {
        for antenna in 0..3 {
            let mut row = CalSolutionRow::new(
                time,
                antenna,
                1,
                2,
                Array2::from_elem((2, 4), antenna as f32),
            );
            row.scan_number = i as i32 + 1;
            row.observation_id = 3;
            row.interval = 100.0;
            row.flag[(1, 3)] = antenna == 2;
            rows.push(row);
        }
    }
    rows
}

#[test]
fn test_new_row_defaults() {
    let row = CalSolutionRow::new(1.0, 5, 0, 0, Array2::zeros((1, 8)));
    assert_eq!(row.antenna2, -1);
    assert_eq!(row.shape(), (1, 8));
    assert!(row.is_consistent());
    assert_abs_diff_eq!(row.snr, Array2::<f32>::ones((1, 8)));
    assert_abs_diff_eq!(row.weight, Array2::<f32>::ones((1, 8)));
    assert!(row.flag.iter().all(|f| !f));

    let mut row = row;
    row.weight = Array2::ones((1, 7));
    assert!(!row.is_consistent());
}

#[test]
fn test_rows_survive_a_table() {
    let rows = make_rows();
    let table = rows_to_table(&rows);
    assert!(table.is_ok(), "{:?}", table.err());
    let table = CalTableHandle::from_store(table.unwrap(), TableOpenMode::Read);
    assert_eq!(table.num_rows(), 6);

    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    let mut read = vec![];
    while iter.next().unwrap() {
        let group = CalSolutionRow::read_group(&iter);
        assert!(group.is_ok(), "{:?}", group.err());
        read.extend(group.unwrap());
    }
    // The default sort is by scan first, which here is also time order.
    assert_eq!(read, rows);
}

#[test]
fn test_read_group_catches_inconsistent_rows() {
    let mut rows = make_rows();
    rows[0].snr = Array2::ones((2, 3));
    let table = CalTableHandle::from_store(rows_to_table(&rows).unwrap(), TableOpenMode::Read);
    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    assert!(iter.next().unwrap());
    let result = CalSolutionRow::read_group(&iter);
    assert!(matches!(
        result,
        Err(CalTableError::ShapeMismatch { expected, actual, .. })
            if expected == vec![2, 4] && actual == vec![2, 3]
    ));
}

#[test]
fn test_spectral_windows_round_trip_through_a_file() {
    let mut spws = SpectralWindows::new();
    assert!(spws.is_empty());
    spws.insert(0, vec1![100e6, 101e6]);
    spws.insert(2, vec1![200e6]);

    let mut table = rows_to_table(&make_rows()).unwrap();
    let subtable = spws.to_subtable();
    assert!(subtable.is_ok(), "{:?}", subtable.err());
    let subtable = subtable.unwrap();
    // spw 1 has no row of its own, so it gets an empty one.
    assert_eq!(subtable.num_rows(), 3);
    table.add_subtable(SPECTRAL_WINDOW_SUBTABLE, subtable);

    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.json");
    table.save(&path).unwrap();
    let table = CalTableHandle::from_store(
        MemTable::open(&path, TableOpenMode::Read).unwrap(),
        TableOpenMode::Read,
    );
    let read = SpectralWindows::from_table(&table);
    assert!(read.is_ok(), "{:?}", read.err());
    let read = read.unwrap();
    assert_eq!(read, spws);
    assert_eq!(read.len(), 2);
    assert!(read.get(1).is_none());
    assert_eq!(read.get(0).unwrap().as_slice(), &[100e6, 101e6]);
    assert_eq!(read.iter().map(|(spw, _)| spw).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn test_no_spectral_window_subtable() {
    let table = CalTableHandle::from_store(rows_to_table(&make_rows()).unwrap(), TableOpenMode::Read);
    let spws = SpectralWindows::from_table(&table).unwrap();
    assert!(spws.is_empty());
}

#[test]
fn test_selection() {
    let rows = make_rows();
    let all = RowSelection::all();
    assert!(all.is_all());
    assert!(rows.iter().all(|r| all.matches(r)));

    let selection = RowSelection {
        antennas: Some(vec![0, 2]),
        ..Default::default()
    };
    assert!(!selection.is_all());
    assert_eq!(rows.iter().filter(|r| selection.matches(r)).count(), 4);

    let selection = RowSelection {
        time_range: Some((150.0, 200.0)),
        ..Default::default()
    };
    assert_eq!(rows.iter().filter(|r| selection.matches(r)).count(), 3);

    let selection = RowSelection {
        fields: Some(vec![0]),
        ..Default::default()
    };
    assert_eq!(rows.iter().filter(|r| selection.matches(r)).count(), 0);

    let selection = RowSelection {
        spws: Some(vec![2]),
        observations: Some(vec![3]),
        ..Default::default()
    };
    assert_eq!(rows.iter().filter(|r| selection.matches(r)).count(), 6);
}

#[test]
fn test_selection_checks_both_antennas_of_baseline_solutions() {
    let mut row = CalSolutionRow::new(0.0, 0, 0, 0, Array2::zeros((1, 1)));
    row.antenna2 = 5;
    let selection = RowSelection {
        antennas: Some(vec![0]),
        ..Default::default()
    };
    assert!(!selection.matches(&row));

    let selection = RowSelection {
        antennas: Some(vec![0, 5]),
        ..Default::default()
    };
    assert!(selection.matches(&row));
}
