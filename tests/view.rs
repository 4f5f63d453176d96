use aspect_ecs::{
    AliveView, Aspect, CheckedAliveView, CheckedStorageView, Command, ECSError, Entity,
    ExecutionError, StorageView,
};

mod common;
use common::{Frozen, Health, Position, Velocity};

struct NeverStored;

#[test]
fn empty_candidates_make_zero_calls() {
    let manager = common::manager();
    let aspect = Aspect::of::<(NeverStored,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();

    let mut calls = 0;
    let visited = view
        .each_all::<(NeverStored,), _>(&mut |_: Entity, _: &mut NeverStored| calls += 1)
        .unwrap();

    assert_eq!(visited, 0);
    assert_eq!(calls, 0);
}

#[test]
fn empty_admitted_sequence_makes_zero_calls() {
    let manager = common::manager();
    common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let aspect = Aspect::of::<(Health, Velocity)>(manager.registry()).unwrap();
    let view = CheckedAliveView::new(&manager, aspect).unwrap();

    let mut calls = 0;
    let visited = view
        .each_all::<(Health, Velocity), _>(&mut |_: Entity, _: &mut Health, _: &mut Velocity| calls += 1)
        .unwrap();
    assert_eq!((visited, calls), (0, 0));
}

#[test]
fn components_arrive_in_declaration_order() {
    let manager = common::manager();
    let entity = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(10)).unwrap();
        m.create_component(e, Position { x: 1.0, y: 2.0 }).unwrap();
    });

    let aspect = Aspect::of::<(Position, Health)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();

    let mut seen = Vec::new();
    view.each_all::<(Position, Health), _>(&mut |e: Entity, position: &mut Position, health: &mut Health| {
        seen.push((e, *position, *health));
        position.x += 1.0;
        health.0 += 1;
    })
    .unwrap();

    assert_eq!(seen, vec![(entity, Position { x: 1.0, y: 2.0 }, Health(10))]);
    assert_eq!(manager.component::<Position>(entity).unwrap().x, 2.0);
    assert_eq!(manager.component::<Health>(entity).unwrap(), Health(11));
}

#[test]
fn unchecked_view_reports_a_missing_component() {
    let manager = common::manager();
    let complete = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });
    let lacking = common::spawn_with(&manager, |_, _| {});

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();

    let mut calls = Vec::new();
    let result = view.each_all::<(Health,), _>(&mut |e: Entity, _: &mut Health| calls.push(e));

    match result {
        Err(ECSError::Execute(ExecutionError::MissingComponent { entity, .. })) => assert_eq!(entity, lacking),
        other => panic!("expected a missing component, got {other:?}"),
    }
    assert_eq!(calls, vec![complete]);
}

#[test]
fn checked_view_skips_entities_that_do_not_fit() {
    let manager = common::manager();
    common::spawn_with(&manager, |_, _| {});
    let fitting = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = CheckedAliveView::new(&manager, aspect).unwrap();

    assert_eq!(view.entities(), vec![fitting]);
    assert_eq!(
        view.each_all::<(Health,), _>(&mut |_: Entity, health: &mut Health| health.0 = 9).unwrap(),
        1
    );
    assert_eq!(manager.component::<Health>(fitting).unwrap(), Health(9));
}

#[test]
fn excluded_components_are_skipped_by_checked_views() {
    let manager = common::manager();
    let moving = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
    });
    common::spawn_with(&manager, |m, e| {
        m.create_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        m.create_component(e, Frozen).unwrap();
    });

    let mut aspect = Aspect::of::<(Position,)>(manager.registry()).unwrap();
    aspect.exclude::<Frozen>(manager.registry()).unwrap();
    let view = CheckedAliveView::new(&manager, aspect).unwrap();

    assert_eq!(view.entities(), vec![moving]);
}

#[test]
fn each_one_bypasses_filter_and_strategy() {
    let manager = common::manager();
    let aspect = Aspect::of::<(Health, Velocity)>(manager.registry()).unwrap();
    let view = CheckedStorageView::new(&manager, aspect).unwrap();

    let outsider = manager.create_entity().unwrap();
    manager.create_component(outsider, Health(4)).unwrap();

    assert!(view.entities().is_empty());
    let mut calls = 0;
    view.each_one::<(Health,), _>(outsider, &mut |_: Entity, health: &mut Health| {
        calls += 1;
        health.0 *= 2;
    })
    .unwrap();

    assert_eq!(calls, 1);
    assert_eq!(manager.component::<Health>(outsider).unwrap(), Health(8));
}

#[test]
fn each_one_reports_a_missing_component() {
    let manager = common::manager();
    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();
    let entity = manager.create_entity().unwrap();

    let result = view.each_one::<(Health,), _>(entity, &mut |_: Entity, _: &mut Health| {});
    assert!(matches!(
        result,
        Err(ECSError::Execute(ExecutionError::MissingComponent { .. }))
    ));
}

#[test]
fn duplicate_component_types_are_rejected() {
    let manager = common::manager();
    common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();
    let result = view.each_all::<(Health, Health), _>(&mut |_: Entity, _: &mut Health, _: &mut Health| {});

    assert!(matches!(
        result,
        Err(ECSError::Execute(ExecutionError::DuplicateComponent { .. }))
    ));
}

#[test]
fn storage_view_sees_only_entities_added_after_it() {
    let manager = common::manager();
    common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = StorageView::new(&manager, aspect).unwrap();
    let late = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(2)).unwrap();
    });

    let mut seen = Vec::new();
    view.each_all::<(Health,), _>(&mut |e: Entity, health: &mut Health| seen.push((e, health.0)))
        .unwrap();
    assert_eq!(seen, vec![(late, 2)]);
}

#[test]
fn callbacks_may_create_entities_and_defer_structure() {
    let manager = common::manager();
    let parent = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(3)).unwrap();
    });

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();
    let registry = manager.registry_handle();

    let mut children = Vec::new();
    let mut rejected = None;
    view.each_all::<(Health,), _>(&mut |_: Entity, _: &mut Health| {
        let child = manager.create_entity().unwrap();
        manager.create_component(child, Position { x: 0.0, y: 0.0 }).unwrap();
        rejected = Some(manager.add_entity(child));
        manager.defer(Command::add(&registry, child, Velocity { dx: 1.0, dy: 1.0 }).unwrap());
        children.push(child);
    })
    .unwrap();

    assert!(matches!(
        rejected,
        Some(Err(ECSError::Execute(ExecutionError::StructuralChangeDuringPass)))
    ));
    assert_eq!(manager.alive_entities(), vec![parent]);

    manager.apply_deferred_commands().unwrap();
    let child = children[0];
    manager.add_entity(child).unwrap();
    assert!(manager.has_component::<Velocity>(child));
    assert_eq!(manager.alive_entities(), vec![parent, child]);
}

#[test]
fn nested_access_to_a_borrowed_column_fails_fast() {
    let manager = common::manager();
    let entity = common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });

    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();

    let mut nested = None;
    view.each_all::<(Health,), _>(&mut |_: Entity, _: &mut Health| {
        nested = Some(manager.component::<Health>(entity));
    })
    .unwrap();

    assert!(matches!(
        nested,
        Some(Err(ECSError::Execute(ExecutionError::ComponentBorrowed { .. })))
    ));
}

#[test]
fn destroying_an_entity_with_a_borrowed_column_changes_nothing() {
    let manager = common::manager();
    let aspect = Aspect::of::<(Health,)>(manager.registry()).unwrap();
    let view = AliveView::new(&manager, aspect).unwrap();

    common::spawn_with(&manager, |m, e| {
        m.create_component(e, Health(1)).unwrap();
    });
    let other = manager.create_entity().unwrap();
    manager.create_component(other, Health(7)).unwrap();
    manager.create_component(other, Position { x: 1.0, y: 2.0 }).unwrap();

    let mut attempt = None;
    view.each_all::<(Health,), _>(&mut |_: Entity, _: &mut Health| {
        attempt = Some(manager.destroy_entity(other));
    })
    .unwrap();
    assert!(matches!(
        attempt,
        Some(Err(ECSError::Execute(ExecutionError::ComponentBorrowed { .. })))
    ));

    assert!(manager.is_valid(other));
    assert!(manager.has_component::<Health>(other));
    assert!(manager.has_component::<Position>(other));
    assert_eq!(manager.component::<Health>(other).unwrap(), Health(7));

    manager.destroy_entity(other).unwrap();
    assert!(!manager.is_valid(other));
}
