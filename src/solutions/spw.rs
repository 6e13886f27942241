// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use log::debug;
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{
    constants::{CHAN_FREQ_COLUMN, SPECTRAL_WINDOW_SUBTABLE},
    table::{CalTableError, CalTableHandle, ColumnData, ColumnStore, MemTable},
};

/// Channel centre frequencies \[Hz\] of each calibration-table spectral
/// window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralWindows {
    chan_freqs: BTreeMap<i32, Vec1<f64>>,
}

impl SpectralWindows {
    pub fn new() -> SpectralWindows {
        SpectralWindows::default()
    }

    pub fn insert(&mut self, spw: i32, chan_freqs: Vec1<f64>) {
        self.chan_freqs.insert(spw, chan_freqs);
    }

    pub fn get(&self, spw: i32) -> Option<&Vec1<f64>> {
        self.chan_freqs.get(&spw)
    }

    pub fn len(&self) -> usize {
        self.chan_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chan_freqs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &Vec1<f64>)> {
        self.chan_freqs.iter().map(|(&spw, f)| (spw, f))
    }

    /// Read the CHAN_FREQ column of a table's SPECTRAL_WINDOW subtable; row
    /// `n` describes spw `n`. A table without the subtable gives no spectral
    /// windows.
    pub fn from_table<S: ColumnStore>(table: &CalTableHandle<S>) -> Result<Self, CalTableError> {
        let subtable = match table.subtable(SPECTRAL_WINDOW_SUBTABLE) {
            Ok(s) => s,
            Err(CalTableError::SubtableMissing { .. }) => {
                debug!(
                    "'{}' has no {SPECTRAL_WINDOW_SUBTABLE} subtable",
                    table.name()
                );
                return Ok(SpectralWindows::default());
            }
            Err(e) => return Err(e),
        };
        let store = subtable.store();
        let freqs: Vec<Array1<f64>> = store.read_range(CHAN_FREQ_COLUMN, 0..store.num_rows())?;
        let mut spws = SpectralWindows::default();
        for (spw, freqs) in freqs.into_iter().enumerate() {
            // Spectral windows without channels are skipped.
            if let Ok(freqs) = Vec1::try_from_vec(freqs.to_vec()) {
                spws.insert(spw as i32, freqs);
            }
        }
        debug!("Read channel frequencies for {} spectral windows", spws.len());
        Ok(spws)
    }

    /// A SPECTRAL_WINDOW subtable describing these windows. Missing (and
    /// negative) spw ids get no row with frequencies.
    pub fn to_subtable(&self) -> Result<MemTable, CalTableError> {
        let num_rows = self
            .chan_freqs
            .keys()
            .next_back()
            .filter(|&&max| max >= 0)
            .map(|&max| max as usize + 1)
            .unwrap_or(0);
        let mut cells = vec![Array1::zeros(0); num_rows];
        for (&spw, freqs) in self.chan_freqs.range(0..) {
            cells[spw as usize] = Array1::from(freqs.to_vec());
        }
        MemTable::new(num_rows).with_column(CHAN_FREQ_COLUMN, ColumnData::Float64Vector(cells))
    }
}
