// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interpolation of calibration solutions to arbitrary times and frequencies.
//!
//! Solutions are first collected with a [`CacheBuilder`] (usually by draining
//! a [`CalTableIterator`]), which is then finalized into an immutable
//! [`CalInterpolationEngine`]. Only the engine can be queried.
//!
//! A query selects a solution series exactly on the categorical axes
//! (antenna, field, spw, observation; after mapping with a [`CalIndexMap`]),
//! interpolates every (parameter, channel) element of the series in time, and
//! then interpolates the result across channels in frequency.

mod axis;
mod error;
mod numeric;

pub use axis::{AxisKind, EdgePolicy, InterpType, InterpolationAxis, Weighting};
pub use error::InterpError;

use std::collections::BTreeMap;

use log::{debug, trace, warn};
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{
    iterator::{CalTableIterator, IteratorState},
    maps::CalIndexMap,
    messages,
    solutions::{CalSolutionRow, RowSelection, SpectralWindows},
    table::{CalTableError, ColumnStore},
};
use numeric::{interpolate_1d, Sample};

/// The categorical key of a solution series (calibration-table indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SeriesKey {
    antenna1: i32,
    antenna2: i32,
    field: i32,
    spw: i32,
    observation: i32,
}

impl SeriesKey {
    fn of(row: &CalSolutionRow) -> SeriesKey {
        SeriesKey {
            antenna1: row.antenna1,
            antenna2: row.antenna2,
            field: row.field_id,
            spw: row.spw_id,
            observation: row.observation_id,
        }
    }
}

/// All solutions for one key, sorted by time. Arrays are `[nTime, nPar,
/// nChan]`.
#[derive(Debug)]
struct SolutionSeries {
    times: Vec1<f64>,
    value: Array3<f64>,
    error: Array3<f64>,
    snr: Array3<f64>,
    weight: Array3<f64>,
    flag: Array3<bool>,
}

impl SolutionSeries {
    /// `rows` must be non-empty, sorted by time and of one shape.
    fn new(rows: &[&CalSolutionRow]) -> Option<SolutionSeries> {
        let times = Vec1::try_from_vec(rows.iter().map(|r| r.time).collect()).ok()?;
        let (num_par, num_chan) = rows.first()?.shape();
        let dim = (rows.len(), num_par, num_chan);
        Some(SolutionSeries {
            times,
            value: stack_f64(rows, dim, |r| &r.param),
            error: stack_f64(rows, dim, |r| &r.param_err),
            snr: stack_f64(rows, dim, |r| &r.snr),
            weight: stack_f64(rows, dim, |r| &r.weight),
            flag: Array3::from_shape_fn(dim, |(t, p, c)| rows[t].flag[(p, c)]),
        })
    }

    fn num_par(&self) -> usize {
        self.value.len_of(Axis(1))
    }

    fn num_chan(&self) -> usize {
        self.value.len_of(Axis(2))
    }

    fn sample(&self, t: usize, p: usize, c: usize) -> Sample {
        Sample {
            value: self.value[(t, p, c)],
            error: self.error[(t, p, c)],
            snr: self.snr[(t, p, c)],
            weight: self.weight[(t, p, c)],
            flagged: self.flag[(t, p, c)],
        }
    }
}

fn stack_f64(
    rows: &[&CalSolutionRow],
    dim: (usize, usize, usize),
    select: impl Fn(&CalSolutionRow) -> &Array2<f32>,
) -> Array3<f64> {
    Array3::from_shape_fn(dim, |(t, p, c)| f64::from(select(rows[t])[(p, c)]))
}

/// Collects calibration solutions for a [`CalInterpolationEngine`]. It can't
/// be queried; call [`CacheBuilder::finalize`] for that.
#[derive(Debug, Default)]
pub struct CacheBuilder {
    rows: Vec<CalSolutionRow>,
    spws: SpectralWindows,
    selection: RowSelection,
}

impl CacheBuilder {
    pub fn new() -> CacheBuilder {
        CacheBuilder::default()
    }

    pub fn push(&mut self, row: CalSolutionRow) {
        self.rows.push(row);
    }

    pub fn extend<I: IntoIterator<Item = CalSolutionRow>>(&mut self, rows: I) {
        self.rows.extend(rows);
    }

    /// Read every group of the iterator into the cache, consuming it. The
    /// iterator is rewound first if it has already been advanced. Returns the
    /// number of rows read.
    pub fn drain<S: ColumnStore>(
        &mut self,
        mut iter: CalTableIterator<'_, S>,
    ) -> Result<usize, CalTableError> {
        if iter.state() != IteratorState::Created {
            debug!("Rewinding a partially-consumed iterator before draining it");
            iter.reset();
        }
        let before = self.rows.len();
        while iter.next()? {
            self.rows.extend(CalSolutionRow::read_group(&iter)?);
        }
        let num_read = self.rows.len() - before;
        debug!(
            "Drained {num_read} rows in {} groups from '{}'",
            iter.num_groups(),
            iter.table().name()
        );
        Ok(num_read)
    }

    /// Channel frequencies for multi-channel spectral windows.
    pub fn with_spectral_windows(mut self, spws: SpectralWindows) -> Self {
        self.spws = spws;
        self
    }

    /// Only use rows matching this selection.
    pub fn with_selection(mut self, selection: RowSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Build the engine. Rows not matching the selection are dropped first.
    pub fn finalize(
        self,
        axes: &[InterpolationAxis],
        index_map: CalIndexMap,
    ) -> Result<CalInterpolationEngine, InterpError> {
        let (time_axis, freq_axis) = resolve_axes(axes)?;

        let num_total = self.rows.len();
        let rows: Vec<CalSolutionRow> = if self.selection.is_all() {
            self.rows
        } else {
            let selection = &self.selection;
            self.rows
                .into_iter()
                .filter(|r| selection.matches(r))
                .collect()
        };
        if rows.len() != num_total {
            debug!(
                "Selection kept {} of {num_total} calibration rows",
                rows.len()
            );
        }
        let rows = Vec1::try_from_vec(rows).map_err(|_| InterpError::EmptyCalTable)?;

        let num_par = rows.first().shape().0;
        if let Some(bad) = rows.iter().find(|r| !r.is_consistent() || r.shape().0 != num_par) {
            return Err(InterpError::InconsistentShape(format!(
                "the row at time {} for antenna {} has shape {:?}, but the first row has {num_par} parameters",
                bad.time,
                bad.antenna1,
                bad.shape()
            )));
        }

        let mut grouped: BTreeMap<SeriesKey, Vec<&CalSolutionRow>> = BTreeMap::new();
        for row in rows.iter() {
            grouped.entry(SeriesKey::of(row)).or_default().push(row);
        }

        let mut series = BTreeMap::new();
        for (key, mut key_rows) in grouped {
            // Stable, so duplicate times keep their table order.
            key_rows.sort_by(|a, b| a.time.total_cmp(&b.time));
            let shape = key_rows[0].shape();
            if let Some(bad) = key_rows.iter().find(|r| r.shape() != shape) {
                return Err(InterpError::InconsistentShape(format!(
                    "{key:?} has rows of shape {shape:?} and {:?}",
                    bad.shape()
                )));
            }
            if shape.1 > 1 {
                match self.spws.get(key.spw) {
                    None => return Err(InterpError::MissingChannelFrequencies { spw: key.spw }),
                    Some(freqs) if freqs.len() != shape.1 => {
                        return Err(InterpError::InconsistentShape(format!(
                            "spw {} has {} channel frequencies, but solutions with {} channels",
                            key.spw,
                            freqs.len(),
                            shape.1
                        )))
                    }
                    Some(_) => (),
                }
            }
            if let Some(s) = SolutionSeries::new(&key_rows) {
                series.insert(key, s);
            }
        }

        let (first, last) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, r| {
            (acc.0.min(r.time), acc.1.max(r.time))
        });
        let engine = CalInterpolationEngine {
            series,
            time_axis,
            freq_axis,
            index_map,
            spws: self.spws,
            num_par,
            num_rows: rows.len(),
            time_range: (first, last),
        };
        debug!(
            "Built an interpolation engine with {} series from {} rows",
            engine.series.len(),
            engine.num_rows
        );
        Ok(engine)
    }
}

/// Work out the time and frequency axis configurations. Categorical axes only
/// support exact matching; asking for anything else is ignored with a
/// warning.
fn resolve_axes(
    axes: &[InterpolationAxis],
) -> Result<(InterpolationAxis, InterpolationAxis), InterpError> {
    let mut seen = vec![];
    let mut time_axis = InterpolationAxis::default_for(AxisKind::Time);
    let mut freq_axis = InterpolationAxis::default_for(AxisKind::Frequency);
    for axis in axes {
        if seen.contains(&axis.kind) {
            return Err(InterpError::AxisConflict { axis: axis.kind });
        }
        seen.push(axis.kind);
        match axis.kind {
            AxisKind::Time => time_axis = *axis,
            AxisKind::Frequency => freq_axis = *axis,
            kind => {
                if axis.interp != InterpType::Nearest {
                    warn!("{kind} is a categorical axis; ignoring {} interpolation and matching exactly", axis.interp);
                }
            }
        }
    }
    Ok((time_axis, freq_axis))
}

/// Where to interpolate calibration solutions to. IDs are science-dataset
/// indices; they are mapped to calibration-table indices by the engine's
/// [`CalIndexMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    pub antenna: i32,

    /// -1 for antenna-based solutions.
    pub antenna2: i32,

    pub field: i32,
    pub spw: i32,
    pub observation: i32,

    /// \[MJD seconds\]
    pub time: f64,

    /// \[Hz\]
    pub freq: f64,
}

impl QueryPoint {
    /// An antenna-based query in observation 0.
    pub fn new(antenna: i32, field: i32, spw: i32, time: f64, freq: f64) -> QueryPoint {
        QueryPoint {
            antenna,
            antenna2: -1,
            field,
            spw,
            observation: 0,
            time,
            freq,
        }
    }
}

/// Interpolated calibration parameters, one element per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedResult {
    pub value: Array1<f32>,
    pub error: Array1<f32>,
    pub snr: Array1<f32>,
    pub weight: Array1<f32>,
    pub flags: Array1<bool>,

    /// Are any of the parameters flagged?
    pub flagged: bool,
}

impl InterpolatedResult {
    fn from_samples(samples: &[Sample]) -> InterpolatedResult {
        let map = |f: fn(&Sample) -> f64| -> Array1<f32> {
            samples.iter().map(|s| f(s) as f32).collect()
        };
        let flags: Array1<bool> = samples.iter().map(|s| s.flagged).collect();
        InterpolatedResult {
            value: map(|s| s.value),
            error: map(|s| s.error),
            snr: map(|s| s.snr),
            weight: map(|s| s.weight),
            flagged: flags.iter().any(|&f| f),
            flags,
        }
    }

    /// Zero-valued, zero-weight and fully flagged.
    pub fn flagged_sentinel(num_par: usize) -> InterpolatedResult {
        InterpolatedResult::from_samples(&vec![Sample::flagged_sentinel(); num_par])
    }
}

/// How lookup failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Query errors are returned.
    #[default]
    Strict,

    /// Query errors are logged and replaced by a flagged result.
    Lenient,
}

/// A finalized cache of calibration solutions that can be interpolated.
#[derive(Debug)]
pub struct CalInterpolationEngine {
    series: BTreeMap<SeriesKey, SolutionSeries>,
    time_axis: InterpolationAxis,
    freq_axis: InterpolationAxis,
    index_map: CalIndexMap,
    spws: SpectralWindows,
    num_par: usize,
    num_rows: usize,
    time_range: (f64, f64),
}

impl CalInterpolationEngine {
    /// Build an engine straight from rows. Rows with more than one channel
    /// need channel frequencies; use a [`CacheBuilder`] to supply them.
    pub fn build(
        rows: Vec<CalSolutionRow>,
        axes: &[InterpolationAxis],
        index_map: CalIndexMap,
    ) -> Result<CalInterpolationEngine, InterpError> {
        let mut builder = CacheBuilder::new();
        builder.extend(rows);
        builder.finalize(axes, index_map)
    }

    pub fn num_par(&self) -> usize {
        self.num_par
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    /// The earliest and latest solution times \[MJD seconds\].
    pub fn time_range(&self) -> (f64, f64) {
        self.time_range
    }

    pub fn time_axis(&self) -> &InterpolationAxis {
        &self.time_axis
    }

    pub fn freq_axis(&self) -> &InterpolationAxis {
        &self.freq_axis
    }

    pub fn index_map(&self) -> &CalIndexMap {
        &self.index_map
    }

    /// The calibration-table antennas with solutions.
    pub fn antennas(&self) -> Vec<i32> {
        let mut ants: Vec<i32> = self.series.keys().map(|k| k.antenna1).collect();
        ants.sort_unstable();
        ants.dedup();
        ants
    }

    /// The calibration-table spectral windows with solutions.
    pub fn spws(&self) -> Vec<i32> {
        let mut spws: Vec<i32> = self.series.keys().map(|k| k.spw).collect();
        spws.sort_unstable();
        spws.dedup();
        spws
    }

    /// Log a summary of this engine at the info level.
    pub fn print_summary(&self) {
        messages::EngineSummary {
            num_rows: self.num_rows,
            num_series: self.series.len(),
            num_par: self.num_par,
            antennas: self.antennas(),
            spws: self.spws(),
            time_range: self.time_range,
            time_axis: &self.time_axis,
            freq_axis: &self.freq_axis,
        }
        .print();
    }

    /// Find the series for a query, mapping its indices.
    fn find_series(&self, query: &QueryPoint) -> Result<(SeriesKey, &SolutionSeries), InterpError> {
        let map = &self.index_map;
        let antenna1 = map
            .antenna
            .ct_id(query.antenna)
            .ok_or(InterpError::UnmappedAntenna {
                antenna: query.antenna,
            })?;
        let antenna2 = if query.antenna2 < 0 {
            -1
        } else {
            map.antenna
                .ct_id(query.antenna2)
                .ok_or(InterpError::UnmappedAntenna {
                    antenna: query.antenna2,
                })?
        };
        let no_match = || InterpError::NoMatchingSolution {
            antenna1,
            antenna2,
            field: query.field,
            spw: query.spw,
            observation: query.observation,
        };
        let key = SeriesKey {
            antenna1,
            antenna2,
            field: map.field.ct_id(query.field).ok_or_else(no_match)?,
            spw: map.spw.ct_id(query.spw).ok_or_else(no_match)?,
            observation: map.observation.ct_id(query.observation).ok_or_else(no_match)?,
        };
        match self.series.get(&key) {
            Some(s) => Ok((key, s)),
            None => Err(InterpError::NoMatchingSolution {
                antenna1,
                antenna2,
                field: key.field,
                spw: key.spw,
                observation: key.observation,
            }),
        }
    }

    /// Interpolate every (parameter, channel) element of a series to `time`.
    /// The result is `[nPar, nChan]`.
    fn interpolate_time(
        &self,
        series: &SolutionSeries,
        time: f64,
    ) -> Result<Array2<Sample>, InterpError> {
        let num_times = series.times.len();
        let (num_par, num_chan) = (series.num_par(), series.num_chan());
        let mut out = Array2::from_elem((num_par, num_chan), Sample::flagged_sentinel());
        let mut samples = Vec::with_capacity(num_times);
        for p in 0..num_par {
            for c in 0..num_chan {
                samples.clear();
                samples.extend((0..num_times).map(|t| series.sample(t, p, c)));
                out[(p, c)] = interpolate_1d(series.times.as_slice(), &samples, time, &self.time_axis)?;
            }
        }
        Ok(out)
    }

    /// Interpolate time-interpolated channels to `freq`, one sample per
    /// parameter.
    fn interpolate_freq(
        &self,
        spw: i32,
        per_chan: &Array2<Sample>,
        freq: f64,
    ) -> Result<Vec<Sample>, InterpError> {
        let num_chan = per_chan.len_of(Axis(1));
        let freqs = self.spws.get(spw);
        if num_chan == 1 {
            // Nothing to interpolate; the window still applies if we know the
            // channel's frequency.
            if let (Some(freqs), Some(window)) = (freqs, self.freq_axis.window) {
                let distance = (freqs.first() - freq).abs();
                if distance > window {
                    return Err(InterpError::OutOfWindow {
                        axis: AxisKind::Frequency,
                        distance,
                        window,
                        unit: AxisKind::Frequency.unit(),
                    });
                }
            }
            return Ok(per_chan.column(0).to_vec());
        }

        let freqs = freqs.ok_or(InterpError::MissingChannelFrequencies { spw })?;
        // Lower sidebands have descending frequencies.
        let mut order: Vec<usize> = (0..num_chan).collect();
        order.sort_by(|&a, &b| freqs[a].total_cmp(&freqs[b]));
        let xs: Vec<f64> = order.iter().map(|&c| freqs[c]).collect();

        per_chan
            .outer_iter()
            .map(|chans| {
                let samples: Vec<Sample> = order.iter().map(|&c| chans[c]).collect();
                interpolate_1d(&xs, &samples, freq, &self.freq_axis)
            })
            .collect()
    }

    /// Interpolate the solutions to a point. Fails if the query can't be
    /// satisfied.
    pub fn lookup(&self, query: &QueryPoint) -> Result<InterpolatedResult, InterpError> {
        let (key, series) = self.find_series(query)?;
        trace!("Lookup {query:?} -> {key:?}");
        let per_chan = self.interpolate_time(series, query.time)?;
        let samples = self.interpolate_freq(key.spw, &per_chan, query.freq)?;
        Ok(InterpolatedResult::from_samples(&samples))
    }

    /// Like [`CalInterpolationEngine::lookup`], but any failure is logged and
    /// gives a flagged, zero-weight result.
    pub fn lookup_lenient(&self, query: &QueryPoint) -> InterpolatedResult {
        match self.lookup(query) {
            Ok(r) => r,
            Err(e) => {
                warn!("Flagging calibration for {query:?}: {e}");
                InterpolatedResult::flagged_sentinel(self.num_par)
            }
        }
    }

    pub fn lookup_with(
        &self,
        query: &QueryPoint,
        convention: CallingConvention,
    ) -> Result<InterpolatedResult, InterpError> {
        match convention {
            CallingConvention::Strict => self.lookup(query),
            CallingConvention::Lenient => Ok(self.lookup_lenient(query)),
        }
    }

    /// Interpolate to one time and many frequencies (`query.freq` is
    /// ignored). Time interpolation is only done once.
    pub fn lookup_spectrum(
        &self,
        query: &QueryPoint,
        freqs: &[f64],
    ) -> Result<Vec<InterpolatedResult>, InterpError> {
        let (key, series) = self.find_series(query)?;
        let per_chan = self.interpolate_time(series, query.time)?;
        freqs
            .iter()
            .map(|&f| {
                self.interpolate_freq(key.spw, &per_chan, f)
                    .map(|s| InterpolatedResult::from_samples(&s))
            })
            .collect()
    }
}
