// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration libraries: files describing which calibration tables to apply
//! and how to interpolate them.
//!
//! A library is a toml or json file with one `caltable` entry per table, e.g.
//!
//! ```toml
//! [[caltable]]
//! path = "bandpass.json"
//! tinterp = "nearest"
//! finterp = "linearflag"
//! spwmap = [0, 0, 1, 1]
//!
//! [[caltable]]
//! path = "gains.json"
//! tinterp = "cubic"
//! time_window = "10min"
//! fldmap = "nearest"
//! ```

mod error;

pub use error::CalLibError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, warn};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    columns::CalColumn,
    constants::{DEFAULT_POLYNOMIAL_ORDER, FIELD_SUBTABLE, PHASE_DIR_COLUMN},
    interp::{
        AxisKind, CacheBuilder, CalInterpolationEngine, EdgePolicy, InterpType,
        InterpolationAxis, Weighting,
    },
    iterator::CalTableIterator,
    maps::{CalIndexMap, CalMap, FieldDirection, IndexMapError},
    messages,
    solutions::{RowSelection, SpectralWindows},
    table::{CalTableHandle, ColumnStore, OpenColumnStore, TableOpenMode},
    unit_parsing::{parse_hz, parse_seconds},
    CaltabError,
};

#[derive(Debug, Display, EnumIter, EnumString)]
enum CalLibFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

lazy_static! {
    static ref CALLIB_FILE_TYPES_COMMA_SEPARATED: String = CalLibFileType::iter().join(", ");
}

/// How a calibration table's fields map to the fields being calibrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapSpec {
    /// Every field uses this calibration field.
    Single(i32),

    /// Field `i` uses calibration field `list[i]`.
    List(Vec<i32>),

    /// Only "nearest" is understood: each field uses the calibration field
    /// closest to it on the sky.
    Named(String),
}

/// How to interpolate along one axis, as parsed from an interpolation string
/// like "linear", "cubic", "nearestflag" or "linearextrap".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpSpec {
    pub interp: InterpType,
    pub edge: EdgePolicy,
    pub propagate_flags: bool,
}

/// Parse an interpolation string. The type is found by substring ("nearest",
/// "linear", "cubic", "poly", "spline"); "flag" turns on flag propagation and
/// "extrap" turns on extrapolation. Unrecognised (or empty) strings mean
/// linear. `order` is used for "poly".
pub fn parse_interp(s: &str, order: Option<u8>) -> InterpSpec {
    let s = s.to_lowercase();
    let interp = if s.contains("nearest") {
        InterpType::Nearest
    } else if s.contains("linear") {
        InterpType::Linear
    } else if s.contains("cubic") {
        InterpType::Polynomial(3)
    } else if s.contains("poly") {
        InterpType::Polynomial(order.unwrap_or(DEFAULT_POLYNOMIAL_ORDER))
    } else if s.contains("spline") {
        InterpType::Spline
    } else {
        if !s.trim().is_empty() {
            warn!("Unrecognised interpolation '{s}'; using linear");
        }
        InterpType::Linear
    };
    InterpSpec {
        interp,
        edge: if s.contains("extrap") {
            EdgePolicy::Extrapolate
        } else {
            EdgePolicy::Nearest
        },
        propagate_flags: s.contains("flag"),
    }
}

/// One calibration table and how to apply it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalLibEntry {
    /// Relative paths are relative to the library file.
    pub path: PathBuf,

    /// Time interpolation. Default: linear.
    pub tinterp: Option<String>,

    /// Frequency interpolation. Default: linear.
    pub finterp: Option<String>,

    /// The order of "poly" interpolation.
    pub order: Option<u8>,

    /// e.g. "30s", "2min". Default: unbounded.
    pub time_window: Option<String>,

    /// e.g. "1MHz". Default: unbounded.
    pub freq_window: Option<String>,

    #[serde(default)]
    pub weighted: bool,

    pub obsmap: Option<Vec<i32>>,
    pub fldmap: Option<FieldMapSpec>,
    pub spwmap: Option<Vec<i32>>,
    pub antmap: Option<Vec<i32>>,

    // Row selection.
    pub obs: Option<Vec<i32>>,
    pub field: Option<Vec<i32>>,
    pub spw: Option<Vec<i32>>,
    pub antenna: Option<Vec<i32>>,

    /// \[MJD seconds\]
    pub time_range: Option<[f64; 2]>,
}

impl CalLibEntry {
    pub fn new<P: Into<PathBuf>>(path: P) -> CalLibEntry {
        CalLibEntry {
            path: path.into(),
            ..Default::default()
        }
    }

    fn table_name(&self) -> String {
        self.path.display().to_string()
    }

    fn window(
        &self,
        window: Option<&str>,
        kind: AxisKind,
    ) -> Result<Option<f64>, CalLibError> {
        let window = match window {
            Some(w) => w,
            None => return Ok(None),
        };
        let axis: &'static str = kind.into();
        let value = match kind {
            AxisKind::Frequency => parse_hz(window),
            _ => parse_seconds(window),
        }
        .map_err(|source| CalLibError::WindowUnit {
            table: self.table_name(),
            axis,
            source,
        })?;
        if value.is_nan() || value <= 0.0 {
            return Err(CalLibError::BadWindow {
                table: self.table_name(),
                axis,
                window: window.to_string(),
            });
        }
        Ok(Some(value))
    }

    fn axis(
        &self,
        kind: AxisKind,
        interp: Option<&str>,
        window: Option<&str>,
    ) -> Result<InterpolationAxis, CalLibError> {
        let spec = parse_interp(interp.unwrap_or("linear"), self.order);
        let weighting = if self.weighted {
            Weighting::Weighted
        } else {
            Weighting::Unweighted
        };
        let mut axis = InterpolationAxis::new(kind, spec.interp)
            .with_weighting(weighting)
            .with_edge(spec.edge)
            .with_flag_propagation(spec.propagate_flags);
        axis.window = self.window(window, kind)?;
        Ok(axis)
    }

    /// The time and frequency axis configurations.
    pub fn axes(&self) -> Result<[InterpolationAxis; 2], CalLibError> {
        Ok([
            self.axis(
                AxisKind::Time,
                self.tinterp.as_deref(),
                self.time_window.as_deref(),
            )?,
            self.axis(
                AxisKind::Frequency,
                self.finterp.as_deref(),
                self.freq_window.as_deref(),
            )?,
        ])
    }

    /// The index maps. A "nearest" field map needs the directions of the
    /// fields being calibrated and of the calibration table's fields.
    pub fn index_map(
        &self,
        field_directions: Option<(&[FieldDirection], &[(i32, FieldDirection)])>,
    ) -> Result<CalIndexMap, CaltabError> {
        let to_map = |m: &Option<Vec<i32>>| m.clone().map(CalMap::new).unwrap_or_default();
        let field = match &self.fldmap {
            None => CalMap::identity(),
            Some(FieldMapSpec::Single(id)) => CalMap::constant(*id),
            Some(FieldMapSpec::List(list)) => CalMap::new(list.clone()),
            Some(FieldMapSpec::Named(name)) if name.trim().eq_ignore_ascii_case("nearest") => {
                match field_directions {
                    Some((ms_fields, ct_fields)) => CalMap::nearest_field(ms_fields, ct_fields)?,
                    None => {
                        return Err(CalLibError::NearestFieldNeedsDirections {
                            table: self.table_name(),
                        }
                        .into())
                    }
                }
            }
            Some(FieldMapSpec::Named(name)) => {
                // A plain number in a string is a single field.
                match i32::from_str(name.trim()) {
                    Ok(id) => CalMap::constant(id),
                    Err(_) => {
                        return Err(CalLibError::BadFieldMap {
                            table: self.table_name(),
                            value: name.clone(),
                        }
                        .into())
                    }
                }
            }
        };
        Ok(CalIndexMap {
            antenna: to_map(&self.antmap),
            field,
            spw: to_map(&self.spwmap),
            observation: to_map(&self.obsmap),
        })
    }

    pub fn selection(&self) -> Result<RowSelection, CalLibError> {
        let time_range = match self.time_range {
            Some([start, end]) if start > end => {
                return Err(CalLibError::BadTimeRange {
                    table: self.table_name(),
                    start,
                    end,
                })
            }
            Some([start, end]) => Some((start, end)),
            None => None,
        };
        Ok(RowSelection {
            fields: self.field.clone(),
            spws: self.spw.clone(),
            antennas: self.antenna.clone(),
            observations: self.obs.clone(),
            time_range,
        })
    }

    fn needs_field_directions(&self) -> bool {
        matches!(&self.fldmap, Some(FieldMapSpec::Named(n)) if n.trim().eq_ignore_ascii_case("nearest"))
    }

    /// Open the table, read all of its solutions and build an interpolation
    /// engine. `ms_fields` are the directions of the fields being calibrated;
    /// they're only needed for a "nearest" field map.
    pub fn open_engine<S: OpenColumnStore>(
        &self,
        ms_fields: Option<&[FieldDirection]>,
    ) -> Result<CalInterpolationEngine, CaltabError> {
        let axes = self.axes()?;
        let selection = self.selection()?;

        let table: CalTableHandle<S> = CalTableHandle::open(&self.path, TableOpenMode::Read)?;
        let iter = CalTableIterator::with_default_sort(&table)?;
        messages::CalLibEntryDetails {
            path: &self.path,
            tinterp: self.tinterp.as_deref().unwrap_or("linear"),
            finterp: self.finterp.as_deref().unwrap_or("linear"),
            num_groups: iter.num_groups(),
        }
        .print();

        let index_map = match (self.needs_field_directions(), ms_fields) {
            (true, Some(ms_fields)) => {
                let ct_fields = ct_field_directions(&table)?;
                self.index_map(Some((ms_fields, &ct_fields)))?
            }
            _ => self.index_map(None)?,
        };

        let mut builder = CacheBuilder::new();
        builder.drain(iter)?;
        let engine = builder
            .with_spectral_windows(SpectralWindows::from_table(&table)?)
            .with_selection(selection)
            .finalize(&axes, index_map)?;
        engine.print_summary();
        Ok(engine)
    }
}

/// The directions of the fields that have solutions in a calibration table,
/// from its FIELD subtable (PHASE_DIR is `[ra, dec]` in radians; row `n` is
/// field `n`).
fn ct_field_directions<S: ColumnStore>(
    table: &CalTableHandle<S>,
) -> Result<Vec<(i32, FieldDirection)>, CaltabError> {
    let field_ids: Vec<i32> = table
        .store()
        .read_range::<i32>(CalColumn::FieldId.name(), 0..table.num_rows())?
        .into_iter()
        .sorted()
        .dedup()
        .collect();
    let field_table = table.subtable(FIELD_SUBTABLE)?;
    let store = field_table.store();
    let dirs: Vec<Array1<f64>> = store.read_range(PHASE_DIR_COLUMN, 0..store.num_rows())?;
    field_ids
        .into_iter()
        .map(|id| -> Result<(i32, FieldDirection), CaltabError> {
            let dir = usize::try_from(id)
                .ok()
                .and_then(|i| dirs.get(i))
                .filter(|d| d.len() >= 2)
                .ok_or(IndexMapError::MissingFieldDirection { field: id })?;
            Ok((
                id,
                FieldDirection {
                    ra: dir[0],
                    dec: dir[1],
                },
            ))
        })
        .collect()
}

/// A collection of calibration tables to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalLibrary {
    #[serde(default)]
    pub caltable: Vec<CalLibEntry>,
}

impl CalLibrary {
    /// Read a library from a toml or json file (picked by the file
    /// extension). Relative table paths are made relative to the file's
    /// directory.
    pub fn read<P: AsRef<Path>>(file: P) -> Result<CalLibrary, CalLibError> {
        let file = file.as_ref();
        debug!("Attempting to parse calibration library {} ...", file.display());

        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| CalLibFileType::from_str(&e).ok());
        let mut contents = String::new();
        let mut library = match file_type {
            Some(CalLibFileType::Toml) => {
                debug!("Parsing toml file...");
                File::open(file)?.read_to_string(&mut contents)?;
                toml::from_str::<CalLibrary>(&contents).map_err(|e| CalLibError::TomlDecode {
                    file: file.display().to_string(),
                    err: e.to_string(),
                })?
            }
            Some(CalLibFileType::Json) => {
                debug!("Parsing json file...");
                File::open(file)?.read_to_string(&mut contents)?;
                serde_json::from_str::<CalLibrary>(&contents).map_err(|e| {
                    CalLibError::JsonDecode {
                        file: file.display().to_string(),
                        err: e.to_string(),
                    }
                })?
            }
            None => return Err(CalLibError::UnrecognisedFileExt(file.display().to_string())),
        };

        if let Some(dir) = file.parent() {
            for entry in library.caltable.iter_mut() {
                if entry.path.is_relative() {
                    entry.path = dir.join(&entry.path);
                }
            }
        }
        library.validate()?;
        Ok(library)
    }

    pub fn from_toml_str(s: &str) -> Result<CalLibrary, CalLibError> {
        let library: CalLibrary = toml::from_str(s).map_err(|e| CalLibError::TomlDecode {
            file: "<string>".to_string(),
            err: e.to_string(),
        })?;
        library.validate()?;
        Ok(library)
    }

    pub fn from_json_str(s: &str) -> Result<CalLibrary, CalLibError> {
        let library: CalLibrary =
            serde_json::from_str(s).map_err(|e| CalLibError::JsonDecode {
                file: "<string>".to_string(),
                err: e.to_string(),
            })?;
        library.validate()?;
        Ok(library)
    }

    /// Check everything that can be checked without opening the tables.
    fn validate(&self) -> Result<(), CalLibError> {
        if self.caltable.is_empty() {
            return Err(CalLibError::NoTables);
        }
        for entry in &self.caltable {
            entry.axes()?;
            entry.selection()?;
        }
        Ok(())
    }

    /// Build an engine for every table, in order.
    pub fn open_engines<S: OpenColumnStore>(
        &self,
        ms_fields: Option<&[FieldDirection]>,
    ) -> Result<Vec<CalInterpolationEngine>, CaltabError> {
        self.caltable
            .iter()
            .map(|entry| entry.open_engine::<S>(ms_fields))
            .collect()
    }
}
