//! Benchmarks for swing extraction and moving averages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ict_core::traits::Indicator;
use ict_core::types::Candle;
use ict_indicators::{swing_points, Sma, SwingDetector};

fn generate_candles(size: usize) -> Vec<Candle> {
    (0..size)
        .map(|i| {
            let mid = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Candle::new(i as i64 * 60_000, mid, mid + 0.5, mid - 0.5, mid + 0.1, 1.0)
        })
        .collect()
}

fn benchmark_swings(c: &mut Criterion) {
    let mut group = c.benchmark_group("Swings");

    for size in [1000, 10000, 100000].iter() {
        let candles = generate_candles(*size);

        group.bench_with_input(BenchmarkId::new("batch", size), &candles, |b, candles| {
            b.iter(|| swing_points(black_box(candles), 5).count())
        });

        group.bench_with_input(BenchmarkId::new("streaming", size), &candles, |b, candles| {
            b.iter(|| {
                let mut detector = SwingDetector::new(5);
                candles
                    .iter()
                    .map(|c| detector.push(*c).len())
                    .sum::<usize>()
            })
        });
    }

    group.finish();
}

fn benchmark_sma(c: &mut Criterion) {
    let mut group = c.benchmark_group("SMA");

    for size in [1000, 10000, 100000].iter() {
        let closes: Vec<f64> = generate_candles(*size).iter().map(|c| c.close).collect();

        group.bench_with_input(BenchmarkId::new("standard", size), &closes, |b, closes| {
            let sma = Sma::new(50);
            b.iter(|| sma.calculate(black_box(closes)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_swings, benchmark_sma);
criterion_main!(benches);
