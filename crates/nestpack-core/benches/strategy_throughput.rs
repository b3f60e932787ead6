use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nestpack_core::prelude::*;

fn random_polygon(rng: &mut StdRng, id: &str) -> PackablePolygon {
    let sides = rng.gen_range(3..=7);
    let radius = rng.gen_range(0.5..2.5);
    let jitter = rng.gen_range(0.0..0.3);
    let points: Vec<Point> = (0..sides)
        .map(|i| {
            let angle = (i as f64) * std::f64::consts::TAU / sides as f64;
            let r = radius + rng.gen_range(-jitter..jitter);
            Point::new(r * angle.cos() + radius, r * angle.sin() + radius)
        })
        .collect();
    PackablePolygon::new(id, points).expect("generated polygon is valid")
}

fn candidate_pool(seed: u64, count: usize) -> Vec<PackablePolygon> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| random_polygon(&mut rng, &format!("shape-{i}")))
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let sheet = SheetSize::new(48.0, 96.0);
    let pool = candidate_pool(42, 60);

    let mut group = c.benchmark_group("strategy_throughput");
    for strategy in [
        StrategyKind::Raster,
        StrategyKind::BottomLeft,
        StrategyKind::Gravity,
        StrategyKind::Nfp,
    ] {
        let config = PackerConfig::builder().strategy(strategy).spacing(0.0625).build();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &config,
            |b, config| {
                b.iter(|| {
                    let result = pack(
                        sheet,
                        black_box(&pool),
                        config,
                        None,
                        &CancellationToken::new(),
                    )
                    .expect("valid config");
                    black_box(result.placements.len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
