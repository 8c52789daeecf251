//! Benchmarks the five computations over a generated route-step CSV, one
//! `criterion` function per computation.

use std::io::Write;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use route_step_analytics::cli::Computation;
use route_step_analytics::run_computation_discarding_output;

const ROWS: u32 = 200_000;
const NUM_ROUTES: u32 = 20_000;
const NUM_TOWNS: u32 = 500;
const NUM_DRIVERS: u32 = 1_000;

fn generate_csv() -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("failed to create temp file");
    writeln!(f, "route_id;step_id;town_a;town_b;distance;driver_name").unwrap();
    for i in 0..ROWS {
        let route_id = i % NUM_ROUTES;
        let step_id = (i / NUM_ROUTES) + 1;
        let town_a = i % NUM_TOWNS;
        let town_b = (i + 1) % NUM_TOWNS;
        let distance = (i % 500) as f32 / 10.0;
        let driver = i % NUM_DRIVERS;
        writeln!(
            f,
            "{route_id};{step_id};Town{town_a};Town{town_b};{distance};Driver{driver}"
        )
        .unwrap();
    }
    f.flush().unwrap();
    f
}

fn benchmark(c: &mut Criterion) {
    let csv = generate_csv();
    let path = csv.path().to_str().unwrap().to_string();

    let mut group = c.benchmark_group("Route Step Computations");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(10));

    for (name, computation) in [
        ("d1", Computation::D1),
        ("d2", Computation::D2),
        ("l", Computation::L),
        ("s", Computation::S),
        ("t", Computation::T),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| run_computation_discarding_output(computation, &path).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
