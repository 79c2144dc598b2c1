use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

#[path = "../tests/util.rs"]
mod util;

use fvbox::assembly::FiniteDifferenceLinearizer;
use fvbox::config::{CacheConfig, LinearizerConfig};
use util::*;

fn bench_update_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_context");
    let n = 1024;
    let grid = line_grid(n);

    for &cached in &[false, true] {
        let cache = CacheConfig {
            enable_intensive_quantity_cache: cached,
            ..Default::default()
        };
        let model = tracer_model(n, cache);
        let mut ctx = context(&model, &grid);

        group.bench_with_input(BenchmarkId::new("update_all", cached), &cached, |b, _| {
            b.iter(|| {
                for cell in 0..n {
                    ctx.update_all(black_box(&cell)).expect("update");
                }
            })
        });
    }
    group.finish();
}

fn bench_linearize(c: &mut Criterion) {
    let n = 256;
    let grid = line_grid(n);
    let model = tracer_model(n, CacheConfig::default());
    let mut ctx = context(&model, &grid);
    let mut lin = FiniteDifferenceLinearizer::<Tracer>::new(LinearizerConfig::default()).expect("config");

    c.bench_function("linearize_line", |b| {
        b.iter(|| {
            for cell in 0..n {
                ctx.update_all(&cell).expect("update");
                lin.linearize(&mut ctx, &TracerResidual).expect("linearize");
            }
            black_box(lin.jacobian().get(0, 0, 0, 0))
        })
    });
}

criterion_group!(benches, bench_update_all, bench_linearize);
criterion_main!(benches);
