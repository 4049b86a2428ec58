use criterion::*;
use std::hint::black_box;

use arena_replay::core::DeterministicRng;
use arena_replay::sim::config::{DispatchConfig, WorldBounds};
use arena_replay::sim::spawn;
use arena_replay::sim::{PhysicsIntegrator, World};

const DT: f32 = 1.0 / 60.0;

fn make_world(enemies: usize) -> World {
    let bounds = WorldBounds::default();
    let mut rng = DeterministicRng::new(7);
    let mut world = World::new();
    for _ in 0..enemies {
        world.spawn(spawn::enemy(&mut rng, &bounds));
    }
    world
}

fn dispatch_benchmark(c: &mut Criterion) {
    let bounds = WorldBounds::default();
    let mut group = c.benchmark_group("physics_dispatch");

    for &count in &[64usize, 1_024, 16_384] {
        let world = make_world(count);

        let mut sequential = PhysicsIntegrator::sequential();
        group.bench_with_input(BenchmarkId::new("sequential", count), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut w| {
                    sequential.step(&mut w, DT, &bounds);
                    black_box(w);
                },
                BatchSize::LargeInput,
            );
        });

        let mut parallel = PhysicsIntegrator::new(&DispatchConfig {
            parallel_threshold: 0,
            ..DispatchConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut w| {
                    parallel.step(&mut w, DT, &bounds);
                    black_box(w);
                },
                BatchSize::LargeInput,
            );
        });
        parallel.shutdown();
    }

    group.finish();
}

criterion_group!(benches, dispatch_benchmark);
criterion_main!(benches);
