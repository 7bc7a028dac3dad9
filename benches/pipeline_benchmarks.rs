use climbrs::models::{DraftingRegime, RiderProfile, Route};
use climbrs::physics::PhysicsSolver;
use climbrs::pipeline::StageAnalyzer;
use climbrs::route::{gaussian_filter, RawSample, RoutePreprocessor};
use climbrs::segmentation::{SegmentationConfig, Segmenter};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmarks for the numerical stages with growing route sizes

fn create_route(points: usize) -> Route {
    let samples: Vec<RawSample> = (0..points)
        .map(|i| {
            let x = i as f64;
            RawSample {
                latitude: 45.0 + x * 0.0005,
                longitude: 6.0,
                // Long climbs with short-period noise on top
                elevation: 800.0 + 400.0 * (x / 300.0).sin() + 3.0 * (x * 1.7).sin(),
            }
        })
        .collect();
    RoutePreprocessor::default().build(&samples)
}

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gaussian Smoothing");

    for &size in &[1_000, 10_000, 50_000] {
        let elevations: Vec<f64> = (0..size).map(|i| (i as f64 * 0.01).sin() * 100.0).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sigma_2", size), &elevations, |b, data| {
            b.iter(|| gaussian_filter(black_box(data), 2.0));
        });
    }

    group.finish();
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Segmentation");
    let segmenter = Segmenter::new(SegmentationConfig::default());

    for &size in &[1_000, 10_000, 50_000] {
        let route = create_route(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("segment", size), &route, |b, route| {
            b.iter(|| segmenter.segment(black_box(route)));
        });
    }

    group.finish();
}

fn bench_physics(c: &mut Criterion) {
    let mut group = c.benchmark_group("Physics");
    let solver = PhysicsSolver::default();
    let rider = RiderProfile::default();

    group.bench_function("duration_from_power", |b| {
        b.iter(|| {
            solver.duration_from_power(
                black_box(5.5),
                black_box(8.0),
                black_box(650.0),
                &rider,
                DraftingRegime::SemiDraft,
            )
        });
    });

    group.bench_function("power_from_duration", |b| {
        b.iter(|| {
            solver.power_from_duration(
                black_box(1500.0),
                black_box(8.0),
                black_box(650.0),
                &rider,
                DraftingRegime::SemiDraft,
            )
        });
    });

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stage Analysis");
    let analyzer = StageAnalyzer::default();

    for &size in &[2_000, 20_000] {
        let route = create_route(size);

        group.bench_with_input(BenchmarkId::new("analyze", size), &route, |b, route| {
            b.iter(|| analyzer.analyze(black_box(route)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_smoothing,
    bench_segmentation,
    bench_physics,
    bench_full_pipeline
);
criterion_main!(benches);
