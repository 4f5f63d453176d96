#![allow(dead_code)]

use std::sync::Arc;

use aspect_ecs::{Entity, EntityManager, TypeRegistry};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Manager with its own registry so tests never share component indices.
pub fn manager() -> EntityManager {
    init_logging();
    EntityManager::with_registry(Arc::new(TypeRegistry::new()))
}

/// Creates an entity, attaches components with `attach` and announces it alive.
pub fn spawn_with(manager: &EntityManager, attach: impl FnOnce(&EntityManager, Entity)) -> Entity {
    let entity = manager.create_entity().unwrap();
    attach(manager, entity);
    manager.add_entity(entity).unwrap();
    entity
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frozen;
