//! Criterion benchmarks for the EQ chain
//!
//! Measures:
//! - Chain throughput as the band count grows
//! - Buffer size sensitivity
//! - Preamp-only passthrough overhead

use attune_benchmarks::generate_sine_wave;
use attune_core::domain::combine::CombinedFilterSet;
use attune_core::domain::dsp::EqChain;
use attune_core::domain::profile::{FilterBand, FilterKind};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SAMPLE_RATE: u32 = 48000;

fn filter_set(bands: usize) -> CombinedFilterSet {
    CombinedFilterSet {
        bands: (0..bands)
            .map(|i| FilterBand {
                center_frequency_hz: 60.0 * 1.5_f64.powi(i as i32),
                gain_db: if i % 2 == 0 { 3.0 } else { -3.0 },
                q_factor: 1.41,
                kind: match i {
                    0 => FilterKind::LowShelf,
                    i if i == bands - 1 => FilterKind::HighShelf,
                    _ => FilterKind::Peaking,
                },
            })
            .collect(),
        preamp_db: -4.0,
    }
}

fn bench_band_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_band_count");

    for bands in [1usize, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(bands), &bands, |b, &bands| {
            let mut chain = EqChain::from_filter_set(&filter_set(bands), SAMPLE_RATE, 2);
            let signal = generate_sine_wave(440.0, SAMPLE_RATE, 1024);

            b.iter(|| {
                let mut buffer = signal.clone();
                chain.process(black_box(&mut buffer));
                black_box(buffer);
            });
        });
    }

    group.finish();
}

fn bench_buffer_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_buffer_size");

    for frames in [128usize, 512, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let mut chain = EqChain::from_filter_set(&filter_set(10), SAMPLE_RATE, 2);
            let signal = generate_sine_wave(440.0, SAMPLE_RATE, frames * 2);

            b.iter(|| {
                let mut buffer = signal.clone();
                chain.process(black_box(&mut buffer));
                black_box(buffer);
            });
        });
    }

    group.finish();
}

fn bench_passthrough(c: &mut Criterion) {
    c.bench_function("chain_preamp_only", |b| {
        let mut chain = EqChain::from_filter_set(&filter_set(0), SAMPLE_RATE, 2);
        let signal = generate_sine_wave(440.0, SAMPLE_RATE, 1024);

        b.iter(|| {
            let mut buffer = signal.clone();
            chain.process(black_box(&mut buffer));
            black_box(buffer);
        });
    });
}

criterion_group!(benches, bench_band_count, bench_buffer_size, bench_passthrough);
criterion_main!(benches);
