// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory column store, persisted as JSON.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    CalDataType, CalTableError, ColumnData, ColumnStore, DataType, OpenColumnStore, TableOpenMode,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemTable {
    num_rows: usize,

    columns: IndexMap<String, ColumnData>,

    #[serde(default)]
    subtables: IndexMap<String, MemTable>,

    /// Where this table was opened from, if anywhere.
    #[serde(skip)]
    path: Option<PathBuf>,

    #[serde(skip)]
    name: String,
}

impl MemTable {
    /// A table with `num_rows` rows and no columns.
    pub fn new(num_rows: usize) -> MemTable {
        MemTable {
            num_rows,
            name: "<memory>".to_string(),
            ..Default::default()
        }
    }

    /// Add a column. Its length must match the number of rows; an existing
    /// column with the same name is replaced.
    pub fn add_column(&mut self, name: &str, data: ColumnData) -> Result<(), CalTableError> {
        if data.len() != self.num_rows {
            return Err(CalTableError::BadColumnLength {
                column: name.to_string(),
                expected: self.num_rows,
                actual: data.len(),
            });
        }
        self.columns.insert(name.to_string(), data);
        Ok(())
    }

    /// Builder-style [`MemTable::add_column`].
    pub fn with_column(mut self, name: &str, data: ColumnData) -> Result<MemTable, CalTableError> {
        self.add_column(name, data)?;
        Ok(self)
    }

    pub fn remove_column(&mut self, name: &str) -> Option<ColumnData> {
        self.columns.shift_remove(name)
    }

    pub fn add_subtable(&mut self, name: &str, mut table: MemTable) {
        table.name = format!("{}/{name}", self.name);
        self.subtables.insert(name.to_string(), table);
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write this table (and its subtables) to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CalTableError> {
        let path = path.as_ref();
        debug!("Writing calibration table to {}", path.display());
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Write this table back to where it was opened from.
    pub fn flush(&self) -> Result<(), CalTableError> {
        match &self.path {
            Some(p) => self.save(p),
            None => Err(CalTableError::NotWritable {
                table: self.name.clone(),
                reason: "the table has no path",
            }),
        }
    }

    fn column<T: CalDataType>(&self, name: &str) -> Result<&[T], CalTableError> {
        let data = self
            .columns
            .get(name)
            .ok_or_else(|| CalTableError::ColumnMissing {
                column: name.to_string(),
            })?;
        T::cells(data).ok_or_else(|| CalTableError::TypeMismatch {
            column: name.to_string(),
            expected: T::DATA_TYPE,
            actual: data.data_type(),
        })
    }

    fn set_name(&mut self, name: String) {
        for (sub_name, sub) in self.subtables.iter_mut() {
            sub.set_name(format!("{name}/{sub_name}"));
        }
        self.name = name;
    }
}

impl ColumnStore for MemTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn column_type(&self, name: &str) -> Option<DataType> {
        self.columns.get(name).map(|c| c.data_type())
    }

    fn read_rows<T: CalDataType>(
        &self,
        name: &str,
        rows: &[usize],
    ) -> Result<Vec<T>, CalTableError> {
        let cells = self.column::<T>(name)?;
        rows.iter()
            .map(|&row| {
                cells
                    .get(row)
                    .cloned()
                    .ok_or(CalTableError::RowOutOfRange {
                        row,
                        num_rows: self.num_rows,
                    })
            })
            .collect()
    }

    fn write_cell<T: CalDataType>(
        &mut self,
        name: &str,
        row: usize,
        value: T,
    ) -> Result<(), CalTableError> {
        let num_rows = self.num_rows;
        let data = self
            .columns
            .get_mut(name)
            .ok_or_else(|| CalTableError::ColumnMissing {
                column: name.to_string(),
            })?;
        let actual = data.data_type();
        let cells = T::cells_mut(data).ok_or_else(|| CalTableError::TypeMismatch {
            column: name.to_string(),
            expected: T::DATA_TYPE,
            actual,
        })?;
        let cell = cells
            .get_mut(row)
            .ok_or(CalTableError::RowOutOfRange { row, num_rows })?;
        *cell = value;
        Ok(())
    }

    fn subtable(&self, name: &str) -> Result<MemTable, CalTableError> {
        self.subtables
            .get(name)
            .cloned()
            .ok_or_else(|| CalTableError::SubtableMissing {
                table: self.name.clone(),
                subtable: name.to_string(),
            })
    }
}

impl OpenColumnStore for MemTable {
    fn open(path: &Path, mode: TableOpenMode) -> Result<MemTable, CalTableError> {
        let table_open_err = |reason: String| CalTableError::TableOpen {
            table: path.display().to_string(),
            reason,
        };

        let mut table = match mode {
            TableOpenMode::Create => {
                debug!("Creating calibration table {}", path.display());
                let t = MemTable::new(0);
                t.save(path)?;
                t
            }
            TableOpenMode::Read | TableOpenMode::Update => {
                debug!("Opening calibration table {} ({mode})", path.display());
                if !path.exists() {
                    return Err(table_open_err("the path does not exist".to_string()));
                }
                let reader = BufReader::new(File::open(path)?);
                let t: MemTable = serde_json::from_reader(reader)
                    .map_err(|e| table_open_err(e.to_string()))?;
                for (name, column) in &t.columns {
                    if column.len() != t.num_rows {
                        return Err(table_open_err(format!(
                            "column '{name}' has {} rows, but the table has {}",
                            column.len(),
                            t.num_rows
                        )));
                    }
                }
                debug!(
                    "{} rows, columns: [{}]",
                    t.num_rows,
                    t.columns.keys().join(", ")
                );
                t
            }
        };
        table.set_name(path.display().to_string());
        table.path = Some(path.to_path_buf());
        Ok(table)
    }
}
