//! Criterion benchmarks for replay navigation and document parsing.
//!
//! Scrubbing calls `seek_by_fraction` on every pointer move and each call
//! feeds the alert detector, so both must stay cheap on long series.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pw_common::ReplaySeries;
use pw_core::alert::AlertEdgeDetector;
use pw_core::replay::scenarios::{self, SeriesBuilder};
use pw_core::replay::ReplayStore;

fn long_series(n: usize) -> ReplaySeries {
    SeriesBuilder::new(format!("bench_{n}"), "Bench")
        .frames((0..n).map(|i| {
            let x = (i as u64).wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((x % 1_000) as f64 / 1_000.0, x % 300)
        }))
        .build()
        .expect("bench series")
}

fn bench_scrub(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay/scrub");

    for n in [48usize, 2_000usize] {
        let series = Arc::new(long_series(n));
        let fractions: Vec<f64> = (0..1_000).map(|i| (i as f64 * 0.618_034) % 1.0).collect();
        group.throughput(Throughput::Elements(fractions.len() as u64));
        group.bench_with_input(BenchmarkId::new("seek_by_fraction", n), &fractions, |b, fractions| {
            let mut store = ReplayStore::new();
            store.load(Arc::clone(&series)).expect("load");
            let mut detector = AlertEdgeDetector::new(series.alert_frame_index());
            b.iter(|| {
                let mut edges = 0usize;
                for &f in fractions {
                    if let Some(change) = store.seek_by_fraction(black_box(f)) {
                        edges += usize::from(detector.observe(change.to).is_some());
                    }
                }
                black_box(edges)
            });
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay/parse");
    let dixie = scenarios::dixie_2021().to_json_pretty().expect("serialize");
    let long = long_series(2_000).to_json_pretty().expect("serialize");

    group.bench_function("dixie_2021", |b| {
        b.iter(|| black_box(ReplaySeries::from_json(black_box(&dixie)).map(|s| s.len())));
    });
    group.bench_function("long_2000", |b| {
        b.iter(|| black_box(ReplaySeries::from_json(black_box(&long)).map(|s| s.len())));
    });
    group.finish();
}

criterion_group!(benches, bench_scrub, bench_parse);
criterion_main!(benches);
