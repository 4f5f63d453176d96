use criterion::*;
use std::hint::black_box;

use aspect_ecs::{Command, EntityManager, TypeRegistry};

mod common;
use common::*;

fn registry_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("index_of_warm", |b| {
        let registry = TypeRegistry::new();
        registry.index_of::<Wealth>().unwrap();
        b.iter(|| black_box(registry.index_of::<Wealth>().unwrap()));
    });

    group.bench_function("signature_of_three", |b| {
        let registry = TypeRegistry::new();
        b.iter(|| black_box(registry.signature_of::<(Position, Wealth, Productivity)>().unwrap()));
    });

    group.finish();
}

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    group.throughput(Throughput::Elements(AGENTS_SMALL as u64));

    group.bench_function("populate_10k", |b| {
        b.iter_batched(
            || (),
            |_| black_box(populate(AGENTS_SMALL).unwrap()),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("kill_and_bury_10k", |b| {
        b.iter_batched(
            || populate(AGENTS_SMALL).unwrap(),
            |manager: EntityManager| {
                for entity in manager.alive_entities() {
                    manager.defer(Command::Kill { entity });
                }
                manager.apply_deferred_commands().unwrap();
                black_box(manager.bury_dead().unwrap());
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, registry_benchmark, spawn_benchmark);
criterion_main!(benches);
