// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One-dimensional interpolation of calibration samples.
//!
//! Everything here works on a slice of coordinates sorted in ascending order
//! (duplicates allowed) with one [`Sample`] per coordinate.

use itertools::Itertools;
use ndarray::prelude::*;

use super::{EdgePolicy, InterpError, InterpType, InterpolationAxis, Weighting};
use crate::constants::SPLINE_MIN_POINTS;

/// One calibration parameter at one coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sample {
    pub(crate) value: f64,
    pub(crate) error: f64,
    pub(crate) snr: f64,
    pub(crate) weight: f64,
    pub(crate) flagged: bool,
}

impl Sample {
    pub(crate) fn flagged_sentinel() -> Sample {
        Sample {
            value: 0.0,
            error: 0.0,
            snr: 0.0,
            weight: 0.0,
            flagged: true,
        }
    }
}

/// Interpolate `samples` (at coordinates `xs`) to `x` following `axis`.
///
/// Only samples within the axis' window are used. Flagged samples among them
/// are ignored while any unflagged one exists. If all are flagged, the
/// nearest one is returned and the result is flagged.
pub(crate) fn interpolate_1d(
    xs: &[f64],
    samples: &[Sample],
    x: f64,
    axis: &InterpolationAxis,
) -> Result<Sample, InterpError> {
    debug_assert_eq!(xs.len(), samples.len());

    let in_window: Vec<usize> = match axis.window {
        Some(window) => (0..xs.len())
            .filter(|&i| (xs[i] - x).abs() <= window)
            .collect(),
        None => (0..xs.len()).collect(),
    };
    if in_window.is_empty() {
        return match axis.window {
            Some(window) if !xs.is_empty() => {
                let distance = xs
                    .iter()
                    .map(|&xi| (xi - x).abs())
                    .fold(f64::INFINITY, f64::min);
                Err(out_of_window(axis, distance, window))
            }
            _ => Err(InterpError::InsufficientPoints {
                axis: axis.kind,
                needed: 1,
                available: 0,
            }),
        };
    }

    let unflagged: Vec<usize> = in_window
        .iter()
        .copied()
        .filter(|&i| !samples[i].flagged)
        .collect();
    if unflagged.is_empty() {
        // `in_window` isn't empty.
        let i = nearest(xs, &in_window, x).unwrap_or(in_window[0]);
        return Ok(Sample {
            flagged: true,
            ..samples[i]
        });
    }

    let mut result = interpolate_unflagged(xs, samples, &unflagged, x, axis)?;
    if axis.propagate_flags
        && stencil(xs, x, axis.interp)
            .into_iter()
            .any(|i| samples[i].flagged)
    {
        result.flagged = true;
    }
    Ok(result)
}

/// `candidates` are the unflagged samples within the window.
fn interpolate_unflagged(
    xs: &[f64],
    samples: &[Sample],
    candidates: &[usize],
    x: f64,
    axis: &InterpolationAxis,
) -> Result<Sample, InterpError> {
    if let Some(&i) = candidates.iter().find(|&&i| xs[i] == x) {
        return Ok(samples[i]);
    }

    match axis.interp {
        InterpType::Nearest => {
            let i = nearest(xs, candidates, x).ok_or(InterpError::InsufficientPoints {
                axis: axis.kind,
                needed: 1,
                available: 0,
            })?;
            Ok(samples[i])
        }
        InterpType::Linear => Ok(linear(xs, samples, candidates, x, axis)),
        InterpType::Polynomial(order) => polynomial(xs, samples, candidates, x, order, axis),
        InterpType::Spline => spline(xs, samples, candidates, x, axis),
    }
}

fn out_of_window(axis: &InterpolationAxis, distance: f64, window: f64) -> InterpError {
    InterpError::OutOfWindow {
        axis: axis.kind,
        distance,
        window,
        unit: axis.kind.unit(),
    }
}

/// The index (out of `indices`) with the coordinate closest to `x`. Ties go to
/// the lower coordinate.
fn nearest(xs: &[f64], indices: &[usize], x: f64) -> Option<usize> {
    indices
        .iter()
        .copied()
        .min_by(|&a, &b| (xs[a] - x).abs().total_cmp(&(xs[b] - x).abs()))
}

/// If `x` is outside the span of `indices` and the edge policy clamps, the
/// nearest edge sample.
fn clamp_to_edge(
    xs: &[f64],
    samples: &[Sample],
    indices: &[usize],
    x: f64,
    axis: &InterpolationAxis,
) -> Option<Sample> {
    if axis.edge == EdgePolicy::Extrapolate {
        return None;
    }
    let (&first, &last) = (indices.first()?, indices.last()?);
    if x < xs[first] {
        Some(samples[first])
    } else if x > xs[last] {
        Some(samples[last])
    } else {
        None
    }
}

fn lerp(a: f64, b: f64, f: f64) -> f64 {
    a + f * (b - a)
}

/// Combine two samples, `f` of the way from `a` to `b`.
fn lerp_samples(a: &Sample, b: &Sample, f: f64, weighting: Weighting) -> Sample {
    let weight = match weighting {
        Weighting::Weighted => {
            if a.weight > 0.0 && b.weight > 0.0 {
                1.0 / ((1.0 - f).powi(2) / a.weight + f.powi(2) / b.weight)
            } else {
                0.0
            }
        }
        Weighting::Unweighted => 0.5 * (a.weight + b.weight),
    };
    Sample {
        value: lerp(a.value, b.value, f),
        error: lerp(a.error, b.error, f),
        snr: lerp(a.snr, b.snr, f),
        weight,
        flagged: false,
    }
}

/// Linear interpolation between the candidates bracketing `x`. With only one
/// side available the edge policy decides between the nearest sample and a
/// linear extrapolation of the two outermost samples.
fn linear(
    xs: &[f64],
    samples: &[Sample],
    candidates: &[usize],
    x: f64,
    axis: &InterpolationAxis,
) -> Sample {
    let below = candidates.iter().copied().filter(|&i| xs[i] < x).last();
    let above = candidates.iter().copied().find(|&i| xs[i] > x);
    if let (Some(lo), Some(hi)) = (below, above) {
        let f = (x - xs[lo]) / (xs[hi] - xs[lo]);
        return lerp_samples(&samples[lo], &samples[hi], f, axis.weighting);
    }

    // One-sided.
    let outer_pair = if axis.edge == EdgePolicy::Extrapolate {
        match (below, above) {
            (Some(i1), None) => candidates
                .iter()
                .copied()
                .filter(|&i| xs[i] < xs[i1])
                .last()
                .map(|i0| (i0, i1)),
            (None, Some(i0)) => candidates
                .iter()
                .copied()
                .find(|&i| xs[i] > xs[i0])
                .map(|i1| (i0, i1)),
            _ => None,
        }
    } else {
        None
    };
    match outer_pair {
        Some((i0, i1)) => {
            let f = (x - xs[i0]) / (xs[i1] - xs[i0]);
            lerp_samples(&samples[i0], &samples[i1], f, axis.weighting)
        }
        None => match below.or(above) {
            Some(i) => samples[i],
            // Only reachable with no candidates at all.
            None => Sample::flagged_sentinel(),
        },
    }
}

fn num_distinct(xs: &[f64], indices: &[usize]) -> usize {
    indices.iter().dedup_by(|&&a, &&b| xs[a] == xs[b]).count()
}

/// A (weighted) least-squares polynomial through the candidates, evaluated at
/// `x`. Errors, SNRs and weights are interpolated linearly.
fn polynomial(
    xs: &[f64],
    samples: &[Sample],
    candidates: &[usize],
    x: f64,
    order: u8,
    axis: &InterpolationAxis,
) -> Result<Sample, InterpError> {
    let points: Vec<usize> = match axis.weighting {
        Weighting::Weighted => candidates
            .iter()
            .copied()
            .filter(|&i| samples[i].weight > 0.0)
            .collect(),
        Weighting::Unweighted => candidates.to_vec(),
    };
    let needed = usize::from(order) + 1;
    let available = num_distinct(xs, &points);
    let insufficient = InterpError::InsufficientPoints {
        axis: axis.kind,
        needed,
        available,
    };
    if available < needed {
        return Err(insufficient);
    }
    if let Some(s) = clamp_to_edge(xs, samples, &points, x, axis) {
        return Ok(s);
    }

    let px: Vec<f64> = points.iter().map(|&i| xs[i]).collect();
    let py: Vec<f64> = points.iter().map(|&i| samples[i].value).collect();
    let pw: Vec<f64> = points
        .iter()
        .map(|&i| match axis.weighting {
            Weighting::Weighted => samples[i].weight,
            Weighting::Unweighted => 1.0,
        })
        .collect();
    let value = fit_polynomial(&px, &py, &pw, x, order).ok_or(insufficient)?;

    let mut s = linear(xs, samples, &points, x, axis);
    s.value = value;
    Ok(s)
}

/// Fit a polynomial of the given order to `(xs, ys)` with weights `ws` by
/// least squares, and evaluate it at `x0`. Coordinates are centred on and
/// scaled about `x0`, so the value is the constant coefficient. Returns `None`
/// if the normal equations are singular.
pub(crate) fn fit_polynomial(xs: &[f64], ys: &[f64], ws: &[f64], x0: f64, order: u8) -> Option<f64> {
    let n = usize::from(order) + 1;
    let scale = xs.iter().map(|&x| (x - x0).abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return None;
    }

    let mut ata = Array2::<f64>::zeros((n, n));
    let mut aty = Array1::<f64>::zeros(n);
    let mut powers = vec![0.0; n];
    for ((&x, &y), &w) in xs.iter().zip(ys).zip(ws) {
        let t = (x - x0) / scale;
        let mut p = 1.0;
        for power in powers.iter_mut() {
            *power = p;
            p *= t;
        }
        for j in 0..n {
            aty[j] += w * powers[j] * y;
            for k in 0..n {
                ata[(j, k)] += w * powers[j] * powers[k];
            }
        }
    }
    solve_linear_system(ata, aty).map(|c| c[0])
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let max_abs = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = max_abs * 1e-12;

    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| a[(r1, col)].abs().total_cmp(&a[(r2, col)].abs()))?;
        if a[(pivot, col)].abs() <= tolerance {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap((pivot, k), (col, k));
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[(row, col)] / a[(col, col)];
            for k in col..n {
                a[(row, k)] -= factor * a[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let sum: f64 = (row + 1..n).map(|k| a[(row, k)] * x[k]).sum();
        x[row] = (b[row] - sum) / a[(row, row)];
    }
    Some(x)
}

/// A natural cubic spline through the candidates (one per distinct
/// coordinate), evaluated at `x`. Errors, SNRs and weights are interpolated
/// linearly.
fn spline(
    xs: &[f64],
    samples: &[Sample],
    candidates: &[usize],
    x: f64,
    axis: &InterpolationAxis,
) -> Result<Sample, InterpError> {
    let points: Vec<usize> = candidates
        .iter()
        .copied()
        .dedup_by(|&a, &b| xs[a] == xs[b])
        .collect();
    if points.len() < SPLINE_MIN_POINTS {
        return Err(InterpError::InsufficientPoints {
            axis: axis.kind,
            needed: SPLINE_MIN_POINTS,
            available: points.len(),
        });
    }
    if let Some(s) = clamp_to_edge(xs, samples, &points, x, axis) {
        return Ok(s);
    }

    let px: Vec<f64> = points.iter().map(|&i| xs[i]).collect();
    let py: Vec<f64> = points.iter().map(|&i| samples[i].value).collect();
    let value = natural_cubic_spline(&px, &py, x);

    let mut s = linear(xs, samples, &points, x, axis);
    s.value = value;
    Ok(s)
}

/// Evaluate the natural cubic spline through `(xs, ys)` at `x`. `xs` must be
/// strictly increasing with at least 3 elements. Outside the span the spline
/// continues linearly.
pub(crate) fn natural_cubic_spline(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    // Second derivatives; zero at both ends. The interior ones satisfy a
    // tridiagonal system, solved with the Thomas algorithm.
    let mut m = vec![0.0; n];
    let num_inner = n - 2;
    let mut diag = vec![0.0; num_inner];
    let mut rhs = vec![0.0; num_inner];
    for r in 0..num_inner {
        let i = r + 1;
        diag[r] = 2.0 * (h[i - 1] + h[i]);
        rhs[r] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }
    for r in 1..num_inner {
        let w = h[r] / diag[r - 1];
        diag[r] -= w * h[r];
        rhs[r] -= w * rhs[r - 1];
    }
    for r in (0..num_inner).rev() {
        m[r + 1] = (rhs[r] - h[r + 1] * m[r + 2]) / diag[r];
    }

    if x < xs[0] {
        let slope = (ys[1] - ys[0]) / h[0] - h[0] * (2.0 * m[0] + m[1]) / 6.0;
        return ys[0] + slope * (x - xs[0]);
    }
    if x > xs[n - 1] {
        let k = n - 2;
        let slope = (ys[n - 1] - ys[k]) / h[k] + h[k] * (m[k] + 2.0 * m[n - 1]) / 6.0;
        return ys[n - 1] + slope * (x - xs[n - 1]);
    }

    let k = xs.partition_point(|&xi| xi <= x).saturating_sub(1).min(n - 2);
    let hk = h[k];
    let a = xs[k + 1] - x;
    let b = x - xs[k];
    m[k] * a.powi(3) / (6.0 * hk)
        + m[k + 1] * b.powi(3) / (6.0 * hk)
        + (ys[k] / hk - m[k] * hk / 6.0) * a
        + (ys[k + 1] / hk - m[k + 1] * hk / 6.0) * b
}

/// The samples an interpolation of type `interp` at `x` would touch if no
/// samples were flagged: the nearest one, the bracketing pair, or the four
/// surrounding ones.
pub(crate) fn stencil(xs: &[f64], x: f64, interp: InterpType) -> Vec<usize> {
    let n = xs.len();
    // The first index with a coordinate >= x.
    let upper = xs.partition_point(|&xi| xi < x);
    match interp {
        InterpType::Nearest => {
            let all: Vec<usize> = (0..n).collect();
            nearest(xs, &all, x).into_iter().collect()
        }
        InterpType::Linear => {
            if upper < n && xs[upper] == x {
                vec![upper]
            } else {
                upper
                    .checked_sub(1)
                    .into_iter()
                    .chain((upper < n).then_some(upper))
                    .collect()
            }
        }
        InterpType::Polynomial(_) | InterpType::Spline => {
            (upper.saturating_sub(2)..(upper + 2).min(n)).collect()
        }
    }
}
