// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::prelude::*;
use tempfile::tempdir;

use super::*;

/// Six rows: scans [1, 0, 1, 0, 1, 0], times [3, 2, 1, 0, 1, 2].
fn test_table() -> MemTable {
    MemTable::new(6)
        .with_column("SCAN_NUMBER", ColumnData::Int32(vec![1, 0, 1, 0, 1, 0]))
        .unwrap()
        .with_column(
            "TIME",
            ColumnData::Float64(vec![3.0, 2.0, 1.0, 0.0, 1.0, 2.0]),
        )
        .unwrap()
        .with_column(
            "PARAM",
            ColumnData::Float32Array(vec![Array2::zeros((1, 1)); 6]),
        )
        .unwrap()
}

#[test]
fn test_add_column_with_wrong_length() {
    let mut table = MemTable::new(3);
    let result = table.add_column("TIME", ColumnData::Float64(vec![0.0; 2]));
    assert!(matches!(
        result,
        Err(CalTableError::BadColumnLength {
            expected: 3,
            actual: 2,
            ..
        })
    ));
    assert!(!table.has_column("TIME"));
}

#[test]
fn test_read_rows() {
    let table = test_table();
    let times: Vec<f64> = table.read_rows("TIME", &[5, 0, 3]).unwrap();
    assert_eq!(times, vec![2.0, 3.0, 0.0]);

    let result = table.read_rows::<f64>("TIME", &[6]);
    assert!(matches!(
        result,
        Err(CalTableError::RowOutOfRange {
            row: 6,
            num_rows: 6
        })
    ));

    let result = table.read_rows::<i32>("TIME", &[0]);
    assert!(matches!(
        result,
        Err(CalTableError::TypeMismatch {
            expected: DataType::Int32,
            actual: DataType::Float64,
            ..
        })
    ));

    let result = table.read_rows::<f64>("INTERVAL", &[0]);
    assert!(matches!(result, Err(CalTableError::ColumnMissing { .. })));
}

#[test]
fn test_write_cell() {
    let mut table = test_table();
    let result = table.write_cell("TIME", 2, 10.0);
    assert!(result.is_ok(), "{:?}", result.err());
    assert_eq!(table.read_rows::<f64>("TIME", &[2]).unwrap(), vec![10.0]);

    assert!(table.write_cell("TIME", 2, 1_i32).is_err());
    assert!(table.write_cell("TIME", 100, 1.0).is_err());
}

#[test]
fn test_group_cursor_sorts_stably() {
    let table = test_table();
    let mut cursor = table.sorted_groups(&["SCAN_NUMBER", "TIME"]).unwrap();
    assert_eq!(cursor.num_groups(), 4);
    assert!(cursor.current_rows().is_none());

    let mut groups = vec![];
    while cursor.advance() {
        groups.push(cursor.current_rows().unwrap().to_vec());
    }
    // Scan 0: times 0, 2, 2; scan 1: times 1, 1, 3. Rows with equal keys keep
    // their storage order.
    assert_eq!(groups, vec![vec![3], vec![1, 5], vec![2, 4], vec![0]]);
    assert!(cursor.is_past_last());
    assert!(!cursor.advance());

    cursor.reset();
    assert!(cursor.advance());
    assert_eq!(cursor.group_index(), Some(0));
    assert_eq!(cursor.current_group_row_range(), Some(0..1));
}

#[test]
fn test_group_cursor_bad_keys() {
    let table = test_table();
    let result = table.sorted_groups(&["FIELD_ID"]);
    assert!(matches!(result, Err(CalTableError::TableOpen { .. })));

    let result = table.sorted_groups(&["PARAM"]);
    assert!(matches!(result, Err(CalTableError::TableOpen { .. })));
}

#[test]
fn test_empty_table_has_no_groups() {
    let table = MemTable::new(0)
        .with_column("TIME", ColumnData::Float64(vec![]))
        .unwrap();
    let mut cursor = table.sorted_groups(&["TIME"]).unwrap();
    assert_eq!(cursor.num_groups(), 0);
    assert!(!cursor.advance());
}

#[test]
fn test_save_and_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.json");
    let mut table = test_table();
    let mut spw = MemTable::new(1);
    spw.add_column(
        "CHAN_FREQ",
        ColumnData::Float64Vector(vec![array![1e8, 2e8]]),
    )
    .unwrap();
    table.add_subtable("SPECTRAL_WINDOW", spw);
    let result = table.save(&path);
    assert!(result.is_ok(), "{:?}", result.err());

    let opened = MemTable::open(&path, TableOpenMode::Read);
    assert!(opened.is_ok(), "{:?}", opened.err());
    let opened = opened.unwrap();
    assert_eq!(opened.num_rows(), 6);
    assert_eq!(opened.column_names(), vec!["SCAN_NUMBER", "TIME", "PARAM"]);
    assert_eq!(opened.path(), Some(path.as_path()));
    assert_eq!(opened.name(), path.display().to_string());

    let spw = opened.subtable("SPECTRAL_WINDOW").unwrap();
    assert_eq!(spw.name(), format!("{}/SPECTRAL_WINDOW", path.display()));
    let freqs: Vec<Array1<f64>> = spw.read_range("CHAN_FREQ", 0..1).unwrap();
    assert_eq!(freqs[0], array![1e8, 2e8]);

    assert!(matches!(
        opened.subtable("FIELD"),
        Err(CalTableError::SubtableMissing { .. })
    ));
}

#[test]
fn test_open_missing_table() {
    let dir = tempdir().unwrap();
    let result = MemTable::open(&dir.path().join("nothing.json"), TableOpenMode::Read);
    assert!(matches!(result, Err(CalTableError::TableOpen { .. })));
}

#[test]
fn test_open_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "this isn't json").unwrap();
    let result = MemTable::open(&path, TableOpenMode::Update);
    assert!(matches!(result, Err(CalTableError::TableOpen { .. })));
}

#[test]
fn test_create_then_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("new.json");
    let table = MemTable::open(&path, TableOpenMode::Create).unwrap();
    assert_eq!(table.num_rows(), 0);
    assert!(path.exists());
    assert!(table.flush().is_ok());

    assert!(matches!(
        MemTable::new(0).flush(),
        Err(CalTableError::NotWritable { .. })
    ));
}

#[test]
fn test_handle_read_only() {
    let mut handle = CalTableHandle::from_store(test_table(), TableOpenMode::Read);
    assert!(matches!(
        handle.store_mut(),
        Err(CalTableError::NotWritable {
            reason: "the table was opened read-only",
            ..
        })
    ));
}

#[test]
fn test_handle_aliasing() {
    let mut handle = CalTableHandle::from_store(test_table(), TableOpenMode::Update);
    assert!(!handle.is_shared());
    let alias = handle.clone();
    assert!(handle.is_shared());
    assert_eq!(alias.num_rows(), 6);
    let name = handle.name().to_string();
    assert!(!name.is_empty());
    assert!(matches!(
        handle.store_mut(),
        Err(CalTableError::NotWritable {
            table,
            reason: "other handles reference the same table",
        }) if table == name
    ));

    drop(alias);
    let store = handle.store_mut();
    assert!(store.is_ok(), "{:?}", store.err());
    store.unwrap().write_cell("TIME", 0, 100.0).unwrap();
    assert_eq!(
        handle.store().read_rows::<f64>("TIME", &[0]).unwrap(),
        vec![100.0]
    );
}

#[test]
fn test_handle_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.json");
    test_table().save(&path).unwrap();

    let handle = CalTableHandle::<MemTable>::open(&path, TableOpenMode::Read).unwrap();
    assert_eq!(handle.mode(), TableOpenMode::Read);
    assert!(handle.has_column("SCAN_NUMBER"));
    assert!(!handle.has_column("FIELD_ID"));
    assert!(handle.subtable("SPECTRAL_WINDOW").is_err());
}
