// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod callib;
mod iterate;

use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use vec1::vec1;

use caltab::{
    constants::SPECTRAL_WINDOW_SUBTABLE,
    solutions::rows_to_table,
    table::MemTable,
    CalSolutionRow, SpectralWindows,
};

/// A bandpass-like table: 4 antennas, 2 spectral windows of 4 channels, 3
/// solution times 60 s apart starting at `T0`. Each solution has 2 parameters;
/// parameter 0 is `antenna + 0.01 * chan + 0.001 * (time - T0)`, parameter 1 is
/// its negative. Antenna 3 is flagged at the middle time.
pub(crate) const T0: f64 = 4_888_310_400.0;

pub(crate) fn make_table() -> MemTable {
    let mut rows = vec![];
    for spw in 0..2 {
        for i_time in 0..3 {
            let time = T0 + 60.0 * i_time as f64;
            for antenna in 0..4 {
                let param = Array2::from_shape_fn((2, 4), |(p, c)| {
                    let v = antenna as f32 + 0.01 * c as f32 + 0.001 * (time - T0) as f32;
                    if p == 0 {
                        v
                    } else {
                        -v
                    }
                });
                let mut row = CalSolutionRow::new(time, antenna, 0, spw, param);
                row.interval = 60.0;
                row.scan_number = 1;
                if antenna == 3 && i_time == 1 {
                    row.flag.fill(true);
                }
                rows.push(row);
            }
        }
    }
    let mut table = rows_to_table(&rows).unwrap();

    let mut spws = SpectralWindows::new();
    spws.insert(0, vec1![100e6, 101e6, 102e6, 103e6]);
    spws.insert(1, vec1![200e6, 201e6, 202e6, 203e6]);
    table.add_subtable(SPECTRAL_WINDOW_SUBTABLE, spws.to_subtable().unwrap());
    table
}

/// Write the test table into `dir`, returning its path.
pub(crate) fn save_table(dir: &Path) -> PathBuf {
    let path = dir.join("bandpass.json");
    make_table().save(&path).unwrap();
    path
}
