// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::Path, sync::Arc};

use log::debug;

use super::{CalTableError, ColumnStore, OpenColumnStore, TableOpenMode};

/// A shared reference to an open calibration table.
///
/// Cloning a handle aliases the same storage; the storage lives until the last
/// handle referencing it is dropped. Writing requires a handle opened for
/// update that isn't aliased.
#[derive(Debug)]
pub struct CalTableHandle<S> {
    store: Arc<S>,
    mode: TableOpenMode,
}

impl<S> Clone for CalTableHandle<S> {
    fn clone(&self) -> Self {
        CalTableHandle {
            store: Arc::clone(&self.store),
            mode: self.mode,
        }
    }
}

impl<S: OpenColumnStore> CalTableHandle<S> {
    pub fn open<P: AsRef<Path>>(path: P, mode: TableOpenMode) -> Result<Self, CalTableError> {
        let store = S::open(path.as_ref(), mode)?;
        debug!(
            "Opened '{}' with {} rows ({mode})",
            store.name(),
            store.num_rows()
        );
        Ok(CalTableHandle {
            store: Arc::new(store),
            mode,
        })
    }
}

impl<S: ColumnStore> CalTableHandle<S> {
    /// Wrap an already-constructed store.
    pub fn from_store(store: S, mode: TableOpenMode) -> Self {
        CalTableHandle {
            store: Arc::new(store),
            mode,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store. Fails if the table was opened
    /// read-only, or if another handle aliases the same storage.
    pub fn store_mut(&mut self) -> Result<&mut S, CalTableError> {
        if !self.mode.is_writable() {
            return Err(CalTableError::NotWritable {
                table: self.store.name().to_string(),
                reason: "the table was opened read-only",
            });
        }
        let table = self.store.name().to_string();
        Arc::get_mut(&mut self.store).ok_or_else(|| CalTableError::NotWritable {
            table,
            reason: "other handles reference the same table",
        })
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn mode(&self) -> TableOpenMode {
        self.mode
    }

    pub fn num_rows(&self) -> usize {
        self.store.num_rows()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.store.has_column(name)
    }

    /// Whether other handles reference the same storage.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.store) > 1
    }

    /// Open a named subtable with the same mode as this table.
    pub fn subtable(&self, name: &str) -> Result<CalTableHandle<S>, CalTableError> {
        let store = self.store.subtable(name)?;
        Ok(CalTableHandle {
            store: Arc::new(store),
            mode: self.mode,
        })
    }
}
