#[macro_use]
extern crate criterion;

use criterion::Criterion;
use rtype_ecs::Registry;

struct Position {
    x: f32,
    y: f32,
}
struct Velocity {
    x: f32,
    y: f32,
}

fn spawn_entities(c: &mut Criterion) {
    c.bench_function("spawn 2500 entities with two components", move |b| {
        b.iter_with_setup(
            || {
                let mut registry = Registry::new();
                registry.register_component::<Position>();
                registry.register_component::<Velocity>();
                registry
            },
            |mut registry| {
                for i in 0..2500 {
                    let e = registry.spawn_entity();
                    registry.add_component(e, Position { x: i as f32, y: i as f32 });
                    registry.add_component(e, Velocity { x: 1.0, y: 0.0 });
                }
            },
        );
    });
}

fn zipper_iteration(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.register_component::<Position>();
    registry.register_component::<Velocity>();
    for i in 0..2500 {
        let e = registry.spawn_entity();
        registry.add_component(e, Position { x: i as f32, y: i as f32 });
        registry.add_component(e, Velocity { x: 1.0, y: 0.0 });
    }

    c.bench_function("zip over 2500 entities", move |b| {
        b.iter(|| {
            let mut zipper = registry.get_filtered_zipper::<(Position, Velocity)>();
            while let Some((_, (pos, vel))) = zipper.next() {
                pos.x += vel.x;
                pos.y += vel.y;
            }
        });
    });
}

criterion_group!(benches, spawn_entities, zipper_iteration);
criterion_main!(benches);
