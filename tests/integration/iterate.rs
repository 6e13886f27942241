// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use tempfile::tempdir;

use caltab::{
    CacheBuilder, CalColumn, CalHistoryColumns, CalIndexMap, CalTableHandle, CalTableIterator,
    InterpolationAxis, MemTable, QueryPoint, SpectralWindows, TableOpenMode,
};

use super::{save_table, T0};

#[test]
fn test_iterate_saved_table() {
    let dir = tempdir().unwrap();
    let path = save_table(dir.path());
    let table = CalTableHandle::<MemTable>::open(&path, TableOpenMode::Read);
    assert!(table.is_ok(), "{:?}", table.err());
    let table = table.unwrap();
    assert_eq!(table.num_rows(), 24);

    // No history columns in this table.
    let history = CalHistoryColumns::attach(&table).unwrap();
    assert!(!history.cal_notes.is_attached());

    let mut iter = CalTableIterator::with_default_sort(&table).unwrap();
    assert_eq!(iter.num_groups(), 6);
    let mut num_rows = 0;
    let mut param = Array3::zeros((0, 0, 0));
    while iter.next().unwrap() {
        num_rows += iter.num_rows().unwrap();
        iter.param_into(&mut param).unwrap();
        assert_eq!(param.dim(), (2, 4, 4));
        let antennas = iter.antenna1().unwrap();
        assert_eq!(antennas, array![0, 1, 2, 3]);
        assert!(iter.time().unwrap().iter().all(|&t| t == iter.time0().unwrap()));
        let flags = iter.flag().unwrap();
        let antenna_3_flagged = flags.index_axis(Axis(2), 3).iter().all(|&f| f);
        assert_eq!(antenna_3_flagged, iter.time0().unwrap() == T0 + 60.0);
    }
    assert_eq!(num_rows, 24);

    let spws = SpectralWindows::from_table(&table).unwrap();
    assert_eq!(spws.len(), 2);

    // Iterating by antenna instead.
    let mut iter = CalTableIterator::new(&table, &[CalColumn::Antenna1, CalColumn::Time]).unwrap();
    assert_eq!(iter.num_groups(), 12);
    iter.next().unwrap();
    assert_eq!(iter.spw().unwrap(), array![0, 1]);
}

#[test]
fn test_drain_and_interpolate() {
    let dir = tempdir().unwrap();
    let path = save_table(dir.path());
    let table = CalTableHandle::<MemTable>::open(&path, TableOpenMode::Read).unwrap();

    let mut builder = CacheBuilder::new();
    let num_read = builder
        .drain(CalTableIterator::with_default_sort(&table).unwrap())
        .unwrap();
    assert_eq!(num_read, 24);
    let engine = builder
        .with_spectral_windows(SpectralWindows::from_table(&table).unwrap())
        .finalize(
            &[InterpolationAxis::default_for(caltab::AxisKind::Time)],
            CalIndexMap::identity(),
        );
    assert!(engine.is_ok(), "{:?}", engine.err());
    let engine = engine.unwrap();
    engine.print_summary();
    assert_eq!(engine.num_series(), 8);
    assert_eq!(engine.time_range(), (T0, T0 + 120.0));

    // Halfway between channels 1 and 2 of spw 1, 30 s in.
    let result = engine
        .lookup(&QueryPoint::new(2, 0, 1, T0 + 30.0, 201.5e6))
        .unwrap();
    assert!(!result.flagged);
    assert_abs_diff_eq!(result.value[0], 2.0 + 0.015 + 0.03, epsilon = 1e-5);
    assert_abs_diff_eq!(result.value[1], -(2.0 + 0.015 + 0.03), epsilon = 1e-5);

    // Antenna 3 is flagged at T0 + 60, so its neighbours are used.
    let result = engine
        .lookup(&QueryPoint::new(3, 0, 0, T0 + 60.0, 100e6))
        .unwrap();
    assert!(!result.flagged);
    assert_abs_diff_eq!(result.value[0], 3.0 + 0.06, epsilon = 1e-5);
}
