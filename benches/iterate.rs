use criterion::*;
use std::hint::black_box;

use aspect_ecs::{AliveView, Aspect, CheckedAliveView, Entity};

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for &agents in &[AGENTS_SMALL, AGENTS_MED] {
        let manager = populate(agents).unwrap();
        let registry = manager.registry();

        group.throughput(Throughput::Elements(agents as u64));

        group.bench_with_input(BenchmarkId::new("forward_write_wealth", agents), &agents, |b, _| {
            let aspect = Aspect::of::<(Wealth,)>(registry).unwrap();
            let view = AliveView::new(&manager, aspect).unwrap();
            b.iter(|| {
                let visited = view
                    .each_all::<(Wealth,), _>(&mut |_: Entity, wealth: &mut Wealth| {
                        wealth.value *= 1.0001;
                    })
                    .unwrap();
                black_box(visited);
            });
        });

        group.bench_with_input(BenchmarkId::new("checked_prod_to_wealth", agents), &agents, |b, _| {
            let aspect = Aspect::of::<(Productivity, Wealth)>(registry).unwrap();
            let view = CheckedAliveView::new(&manager, aspect).unwrap();
            b.iter(|| {
                let visited = view
                    .each_all::<(Productivity, Wealth), _>(
                        &mut |_: Entity, productivity: &mut Productivity, wealth: &mut Wealth| {
                            wealth.value += productivity.rate;
                        },
                    )
                    .unwrap();
                black_box(visited);
            });
        });

        group.bench_with_input(BenchmarkId::new("checked_entities_only", agents), &agents, |b, _| {
            let aspect = Aspect::of::<(Productivity, Position)>(registry).unwrap();
            let view = CheckedAliveView::new(&manager, aspect).unwrap();
            b.iter(|| black_box(view.entities().len()));
        });
    }

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
