use aspect_ecs::{
    AliveView, BaseSystem, CheckedAliveView, CheckedStorageView, Command, ComponentCallback,
    ECSError, Entity, ExecutionError, Scheduler, StorageView, System, SystemState,
};

mod common;
use common::{Health, Position, Velocity};

/// Records every call it receives.
#[derive(Default)]
struct SampleSystem {
    calls: Vec<(Entity, i32, f64, String)>,
}

impl ComponentCallback<(i32, f64, String)> for SampleSystem {
    fn call(&mut self, entity: Entity, (int, double, string): (&mut i32, &mut f64, &mut String)) {
        self.calls.push((entity, *int, *double, string.clone()));
    }
}

#[test]
fn sample_system_visits_each_entity_once_with_stored_values() {
    let manager = common::manager();
    let e0 = common::spawn_with(&manager, |m, e| {
        m.create_component(e, 3_i32).unwrap();
        m.create_component(e, 0.5_f64).unwrap();
        m.create_component(e, String::from("heh")).unwrap();
    });
    let e1 = common::spawn_with(&manager, |m, e| {
        m.create_component(e, 123_i32).unwrap();
        m.create_component(e, 0.999_f64).unwrap();
        m.create_component(e, String::from("working!")).unwrap();
    });

    let mut system =
        System::<SampleSystem, AliveView<'_>, (i32, f64, String)>::new(&manager, SampleSystem::default()).unwrap();
    assert_eq!(system.aspect().required().count(), 3);

    assert_eq!(system.process_all().unwrap(), 2);
    assert_eq!(
        system.function().calls,
        vec![
            (e0, 3, 0.5, String::from("heh")),
            (e1, 123, 0.999, String::from("working!")),
        ]
    );
}

#[test]
fn closures_serve_as_system_functions() {
    let manager = common::manager();
    let entity = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        m.create_component(e, Velocity { dx: 1.0, dy: 2.0 }).unwrap();
    });

    let mut system = System::<_, CheckedAliveView<'_>, (Position, Velocity)>::named(
        "movement",
        &manager,
        |_: Entity, position: &mut Position, velocity: &mut Velocity| {
            position.x += velocity.dx;
            position.y += velocity.dy;
        },
    )
    .unwrap();

    assert_eq!(system.name(), "movement");
    system.process_all().unwrap();
    system.process_all().unwrap();
    assert_eq!(manager.component::<Position>(entity).unwrap(), Position { x: 2.0, y: 4.0 });
}

#[test]
fn process_one_bypasses_filtering() {
    let manager = common::manager();
    let before = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(5)).unwrap();
    });

    let mut seen = Vec::new();
    let mut system = System::<_, StorageView<'_>, (Health,)>::new(&manager, |e: Entity, health: &mut Health| {
        seen.push((e, health.0));
    })
    .unwrap();

    assert_eq!(system.process_all().unwrap(), 0);
    system.process_one(before).unwrap();
    drop(system);

    assert_eq!(seen, vec![(before, 5)]);
}

#[test]
fn state_returns_to_constructed_after_a_failed_pass() {
    let manager = common::manager();
    common::spawn_with(&manager, |_, _| {});

    let mut system =
        System::<_, AliveView<'_>, (Health,)>::new(&manager, |_: Entity, _: &mut Health| {}).unwrap();
    assert_eq!(system.state(), SystemState::Constructed);

    assert!(matches!(
        system.process_all(),
        Err(ECSError::Execute(ExecutionError::MissingComponent { .. }))
    ));
    assert_eq!(system.state(), SystemState::Constructed);
}

#[test]
fn duplicate_component_types_fail_at_construction() {
    let manager = common::manager();
    let result = System::<_, AliveView<'_>, (Health, Health)>::new(
        &manager,
        |_: Entity, _: &mut Health, _: &mut Health| {},
    );
    assert!(matches!(
        result,
        Err(ECSError::Execute(ExecutionError::DuplicateComponent { .. }))
    ));
}

#[test]
fn stateful_function_is_reachable_between_passes() {
    let manager = common::manager();
    common::spawn_with(&manager, |m, e| {
        m.create_component(e, 1_i32).unwrap();
        m.create_component(e, 1.0_f64).unwrap();
        m.create_component(e, String::new()).unwrap();
    });

    let mut system =
        System::<SampleSystem, CheckedStorageView<'_>, (i32, f64, String)>::new(&manager, SampleSystem::default())
            .unwrap();
    assert_eq!(system.process_all().unwrap(), 0);

    let late = common::spawn_with(&manager, |m, e| {
        m.create_component(e, 2_i32).unwrap();
        m.create_component(e, 2.0_f64).unwrap();
        m.create_component(e, String::from("late")).unwrap();
    });
    assert_eq!(system.process_all().unwrap(), 1);

    system.function_mut().calls.clear();
    assert_eq!(system.process_all().unwrap(), 1);
    let recorded = system.into_function().calls;
    assert_eq!(recorded, vec![(late, 2, 2.0, String::from("late"))]);
}

#[test]
fn scheduler_runs_systems_in_order_and_settles_structure() {
    let manager = common::manager();
    let registry = manager.registry_handle();
    let doomed = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(0)).unwrap();
    });
    let healthy = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(5)).unwrap();
    });

    let reaper = System::<_, AliveView<'_>, (Health,)>::named("reaper", &manager, |e: Entity, health: &mut Health| {
        if health.0 == 0 {
            manager.defer(Command::Kill { entity: e });
        }
    })
    .unwrap();

    let healer = System::<_, AliveView<'_>, (Health,)>::named("healer", &manager, |e: Entity, health: &mut Health| {
        health.0 += 1;
        manager.defer(Command::add(&registry, e, Position { x: 0.0, y: 0.0 }).unwrap());
    })
    .unwrap();

    let mut scheduler = Scheduler::new(&manager);
    let reaper_id = scheduler.add_system(reaper);
    scheduler.add_system(healer);
    assert_eq!(scheduler.len(), 2);
    assert_eq!(scheduler.system(reaper_id).map(|s| s.name()), Some("reaper"));

    let report = scheduler.run().unwrap();
    assert_eq!(report.tick, 1);
    assert_eq!(report.processed, 3);
    assert_eq!(report.commands, 2);
    assert_eq!(report.buried, 1);

    assert!(!manager.is_valid(doomed));
    assert_eq!(manager.alive_entities(), vec![healthy]);
    assert_eq!(manager.component::<Health>(healthy).unwrap(), Health(6));
    assert!(manager.has_component::<Position>(healthy));

    let report = scheduler.run_for(3).unwrap();
    assert_eq!(report.tick, 4);
    assert_eq!(scheduler.tick(), 4);
    assert_eq!(manager.component::<Health>(healthy).unwrap(), Health(9));
}

#[test]
fn base_system_exposes_the_object_safe_surface() {
    let manager = common::manager();
    let entity = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let mut boxed: Box<dyn BaseSystem + '_> = Box::new(
        System::<_, AliveView<'_>, (Health,)>::named("boxed", &manager, |_: Entity, health: &mut Health| {
            health.0 += 10;
        })
        .unwrap(),
    );

    assert_eq!(boxed.name(), "boxed");
    assert_eq!(boxed.state(), SystemState::Constructed);
    assert_eq!(boxed.aspect().required().count(), 1);
    assert_eq!(boxed.process().unwrap(), 1);
    boxed.process_entity(entity).unwrap();
    assert_eq!(manager.component::<Health>(entity).unwrap(), Health(21));
}
