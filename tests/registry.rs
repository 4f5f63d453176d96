use std::collections::BTreeSet;
use std::sync::Arc;

use aspect_ecs::engine::component::ensure_distinct;
use aspect_ecs::engine::storage::TypeErasedAttribute;
use aspect_ecs::{
    component_id_of, register_component, ComponentID, ExecutionError, RegistryError, TypeRegistry,
};
use rayon::prelude::*;

mod common;
use common::{Health, Position, Velocity};

struct Marker<const N: usize>;

#[test]
fn indices_are_dense_and_follow_first_request_order() {
    common::init_logging();
    let registry = TypeRegistry::new();

    assert_eq!(registry.count(), 0);
    assert_eq!(registry.index_of::<Position>().unwrap(), 0);
    assert_eq!(registry.index_of::<Velocity>().unwrap(), 1);
    assert_eq!(registry.index_of::<Health>().unwrap(), 2);
    assert_eq!(registry.count(), 3);
}

#[test]
fn repeated_requests_return_the_same_index() {
    let registry = TypeRegistry::new();
    let first = registry.index_of::<Velocity>().unwrap();
    registry.index_of::<Position>().unwrap();

    assert_eq!(registry.index_of::<Velocity>().unwrap(), first);
    assert_eq!(registry.get::<Velocity>(), Some(first));
    assert_eq!(registry.count(), 2);
}

#[test]
fn independent_registries_follow_their_own_order() {
    let forward = TypeRegistry::new();
    forward.index_of::<Position>().unwrap();
    forward.index_of::<Health>().unwrap();

    let backward = TypeRegistry::new();
    backward.index_of::<Health>().unwrap();
    backward.index_of::<Position>().unwrap();

    assert_eq!(forward.get::<Position>(), Some(0));
    assert_eq!(backward.get::<Position>(), Some(1));
    assert_eq!(backward.get::<Health>(), Some(0));
}

#[test]
fn lookup_does_not_register() {
    let registry = TypeRegistry::new();
    assert_eq!(registry.get::<Position>(), None);
    assert_eq!(registry.count(), 0);
}

#[test]
fn exhaustion_is_an_error_and_leaves_the_registry_intact() {
    let registry = TypeRegistry::with_capacity(2);
    registry.index_of::<Position>().unwrap();
    registry.index_of::<Velocity>().unwrap();

    let error = registry.index_of::<Health>().unwrap_err();
    assert!(matches!(error, RegistryError::Exhausted { capacity: 2, .. }));
    assert_eq!(registry.count(), 2);
    assert_eq!(registry.index_of::<Position>().unwrap(), 0);
    assert_eq!(registry.get::<Health>(), None);
}

#[test]
fn descriptions_and_factories_are_recorded() {
    let registry = TypeRegistry::new();
    let id = registry.index_of::<Health>().unwrap();

    let desc = registry.description(id).unwrap();
    assert_eq!(desc.component_id, id);
    assert!(desc.name.ends_with("Health"));
    assert_eq!(desc.size, std::mem::size_of::<Health>());
    assert!(desc.matches_type::<Health>());

    let column = registry.factory(id).unwrap()(id);
    assert!(column.element_type_name().ends_with("Health"));
    assert!(matches!(
        registry.factory(7),
        Err(RegistryError::UnknownComponentId { component_id: 7 })
    ));
}

#[test]
fn signature_of_sets_one_bit_per_type() {
    let registry = TypeRegistry::new();
    registry.index_of::<Health>().unwrap();

    let signature = registry.signature_of::<(Position, Velocity)>().unwrap();
    assert_eq!(signature.count(), 2);
    assert!(signature.has(1));
    assert!(signature.has(2));
    assert!(!signature.has(0));
}

#[test]
fn clear_resets_the_index_space() {
    let registry = TypeRegistry::new();
    registry.index_of::<Position>().unwrap();
    registry.index_of::<Velocity>().unwrap();

    registry.clear();
    assert_eq!(registry.count(), 0);
    assert_eq!(registry.index_of::<Velocity>().unwrap(), 0);
}

#[test]
fn global_registry_is_shared() {
    let a = TypeRegistry::global();
    let b = TypeRegistry::global();
    assert!(Arc::ptr_eq(&a, &b));

    struct OnlyHere;
    let id = register_component::<OnlyHere>().unwrap();
    assert_eq!(component_id_of::<OnlyHere>(), Some(id));
}

#[test]
fn duplicate_ids_are_detected() {
    assert!(ensure_distinct(&[0, 3, 5]).is_ok());
    assert_eq!(
        ensure_distinct(&[0, 3, 0]),
        Err(ExecutionError::DuplicateComponent { component_id: 0 })
    );
}

fn register_markers(registry: &TypeRegistry, reverse: bool) -> Vec<ComponentID> {
    let mut ids = if reverse {
        vec![
            registry.index_of::<Marker<7>>().unwrap(),
            registry.index_of::<Marker<6>>().unwrap(),
            registry.index_of::<Marker<5>>().unwrap(),
            registry.index_of::<Marker<4>>().unwrap(),
            registry.index_of::<Marker<3>>().unwrap(),
            registry.index_of::<Marker<2>>().unwrap(),
            registry.index_of::<Marker<1>>().unwrap(),
            registry.index_of::<Marker<0>>().unwrap(),
        ]
    } else {
        vec![
            registry.index_of::<Marker<0>>().unwrap(),
            registry.index_of::<Marker<1>>().unwrap(),
            registry.index_of::<Marker<2>>().unwrap(),
            registry.index_of::<Marker<3>>().unwrap(),
            registry.index_of::<Marker<4>>().unwrap(),
            registry.index_of::<Marker<5>>().unwrap(),
            registry.index_of::<Marker<6>>().unwrap(),
            registry.index_of::<Marker<7>>().unwrap(),
        ]
    };
    if reverse {
        ids.reverse();
    }
    ids
}

#[test]
fn concurrent_first_registration_hands_out_unique_indices() {
    common::init_logging();
    let registry = TypeRegistry::new();

    let results: Vec<Vec<ComponentID>> = (0..64)
        .into_par_iter()
        .map(|i| register_markers(&registry, i % 2 == 1))
        .collect();

    assert_eq!(registry.count(), 8);
    for ids in &results {
        assert_eq!(ids, &results[0]);
    }

    let distinct: BTreeSet<ComponentID> = results[0].iter().copied().collect();
    assert_eq!(distinct, (0..8).collect::<BTreeSet<ComponentID>>());
}
