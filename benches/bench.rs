// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use ndarray::prelude::*;
use vec1::Vec1;

use caltab::{
    AxisKind, CacheBuilder, CalIndexMap, CalInterpolationEngine, CalSolutionRow, InterpType,
    InterpolationAxis, QueryPoint, SpectralWindows,
};

const NUM_ANTENNAS: i32 = 128;
const NUM_TIMES: usize = 50;
const NUM_CHANS: usize = 32;

fn make_engine(time_interp: InterpType) -> CalInterpolationEngine {
    let mut builder = CacheBuilder::new();
    for i_time in 0..NUM_TIMES {
        let time = 60.0 * i_time as f64;
        for antenna in 0..NUM_ANTENNAS {
            let param = Array2::from_shape_fn((2, NUM_CHANS), |(p, c)| {
                (antenna as f32 + p as f32) * (1.0 + 0.01 * c as f32) + 0.001 * time as f32
            });
            builder.push(CalSolutionRow::new(time, antenna, 0, 0, param));
        }
    }
    let freqs: Vec<f64> = (0..NUM_CHANS).map(|c| 150e6 + 40e3 * c as f64).collect();
    let mut spws = SpectralWindows::new();
    spws.insert(0, Vec1::try_from_vec(freqs).unwrap());
    builder
        .with_spectral_windows(spws)
        .finalize(
            &[InterpolationAxis::new(AxisKind::Time, time_interp)],
            CalIndexMap::identity(),
        )
        .unwrap()
}

fn lookups(c: &mut Criterion) {
    for interp in [InterpType::Nearest, InterpType::Linear, InterpType::Spline] {
        let engine = make_engine(interp);
        let query = QueryPoint::new(64, 0, 0, 1234.5, 150.5e6);
        c.bench_function(&format!("{interp} lookup"), |b| {
            b.iter(|| engine.lookup(black_box(&query)).unwrap())
        });
    }

    let engine = make_engine(InterpType::Linear);
    let query = QueryPoint::new(64, 0, 0, 1234.5, 0.0);
    let freqs: Vec<f64> = (0..768).map(|i| 150e6 + 1.6e3 * i as f64).collect();
    c.bench_function("linear lookup_spectrum, 768 channels", |b| {
        b.iter(|| engine.lookup_spectrum(black_box(&query), &freqs).unwrap())
    });
}

criterion_group!(benches, lookups);
criterion_main!(benches);
