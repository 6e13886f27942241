// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Maps from science-dataset indices to calibration-table indices.
//!
//! Calibration solutions are often derived from a different set of antennas,
//! fields, spectral windows or observations than the data they're applied to.
//! A [`CalMap`] says which calibration-table index to use for each
//! science-dataset index of one axis.

mod error;

pub use error::IndexMapError;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

/// A map for one categorical axis. An empty map (or the single entry `-1`)
/// means "unspecified": every science index maps to itself. Science indices
/// beyond the end of the map use the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalMap {
    map: Vec<i32>,
}

impl CalMap {
    pub fn identity() -> CalMap {
        CalMap { map: vec![] }
    }

    pub fn new(map: Vec<i32>) -> CalMap {
        CalMap { map }
    }

    /// Map every science index to the same calibration index.
    pub fn constant(ct_id: i32) -> CalMap {
        CalMap { map: vec![ct_id] }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.map.as_slice(), [] | [-1])
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.map
    }

    /// The calibration-table index for a science index, or `None` if it is
    /// unmapped.
    pub fn ct_id(&self, ms_id: i32) -> Option<i32> {
        if ms_id < 0 {
            return None;
        }
        if self.is_identity() {
            return Some(ms_id);
        }
        let i = (ms_id as usize).min(self.map.len() - 1);
        match self.map[i] {
            ct_id if ct_id < 0 => None,
            ct_id => Some(ct_id),
        }
    }

    /// The sorted, unique calibration-table indices needed for the given
    /// science indices. `None` means the map is unspecified and the caller
    /// must decide (all, or identity). An empty `ms_ids` means all science
    /// indices.
    pub fn ct_ids(&self, ms_ids: &[i32]) -> Option<Vec<i32>> {
        if self.is_identity() {
            return None;
        }
        let ids = if ms_ids.is_empty() {
            self.map.clone()
        } else {
            ms_ids.iter().filter_map(|&id| self.ct_id(id)).collect()
        };
        Some(
            ids.into_iter()
                .filter(|&id| id >= 0)
                .sorted()
                .dedup()
                .collect(),
        )
    }

    /// The science indices that map to `ct_id`, optionally limited to a
    /// superset. `None` means the map is unspecified.
    ///
    /// Only indices covered by the explicit map are returned; larger indices
    /// that would reuse the last entry are not enumerated.
    pub fn ms_ids(&self, ct_id: i32, superset: Option<&[i32]>) -> Option<Vec<i32>> {
        if self.is_identity() {
            return None;
        }
        Some(
            self.map
                .iter()
                .enumerate()
                .filter(|(_, &m)| m == ct_id)
                .map(|(i, _)| i as i32)
                .filter(|i| superset.map(|s| s.contains(i)).unwrap_or(true))
                .collect(),
        )
    }

    /// Map each science field to the nearest calibration-table field on the
    /// sky. If the calibration table only has one field, everything maps to
    /// it. An exact tie for nearest is an error.
    pub fn nearest_field(
        ms_fields: &[FieldDirection],
        ct_fields: &[(i32, FieldDirection)],
    ) -> Result<CalMap, IndexMapError> {
        let ct_ids: Vec<i32> = ct_fields.iter().map(|(id, _)| *id).sorted().dedup().collect();
        match ct_ids.as_slice() {
            [] => return Err(IndexMapError::NoCalFields),
            [only] => {
                debug!("Only one calibration field ({only}); mapping all fields to it");
                return Ok(CalMap::new(vec![*only; ms_fields.len().max(1)]));
            }
            _ => (),
        }

        let mut map = Vec::with_capacity(ms_fields.len());
        for (i_ms, ms_dir) in ms_fields.iter().enumerate() {
            let separations: Vec<(i32, f64)> = ct_fields
                .iter()
                .map(|(id, ct_dir)| (*id, ms_dir.separation(ct_dir)))
                .sorted_by(|a, b| a.1.total_cmp(&b.1))
                .collect();
            match separations.as_slice() {
                [(_, s0), (id1, s1), ..] if s0 == s1 && separations[0].0 != *id1 => {
                    return Err(IndexMapError::AmbiguousNearestField {
                        field: i_ms,
                        separation_deg: s0.to_degrees(),
                    })
                }
                [(id, _), ..] => map.push(*id),
                [] => return Err(IndexMapError::NoCalFields),
            }
        }
        debug!("Nearest field map: [{}]", map.iter().join(", "));
        Ok(CalMap::new(map))
    }
}

/// A direction on the sky \[radians\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDirection {
    pub ra: f64,
    pub dec: f64,
}

impl FieldDirection {
    pub fn from_degrees(ra: f64, dec: f64) -> FieldDirection {
        FieldDirection {
            ra: ra.to_radians(),
            dec: dec.to_radians(),
        }
    }

    /// The angular separation to another direction \[radians\], using the
    /// Vincenty formula (stable for small and antipodal separations).
    pub fn separation(&self, other: &FieldDirection) -> f64 {
        let d_ra = other.ra - self.ra;
        let (s_d1, c_d1) = self.dec.sin_cos();
        let (s_d2, c_d2) = other.dec.sin_cos();
        let (s_dra, c_dra) = d_ra.sin_cos();
        let num1 = c_d2 * s_dra;
        let num2 = c_d1 * s_d2 - s_d1 * c_d2 * c_dra;
        let den = s_d1 * s_d2 + c_d1 * c_d2 * c_dra;
        num1.hypot(num2).atan2(den)
    }
}

/// Per-axis maps from science indices to calibration-table indices. Immutable
/// once handed to an interpolation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalIndexMap {
    pub antenna: CalMap,
    pub field: CalMap,
    pub spw: CalMap,
    pub observation: CalMap,
}

impl CalIndexMap {
    /// Every axis maps indices to themselves.
    pub fn identity() -> CalIndexMap {
        CalIndexMap::default()
    }
}
