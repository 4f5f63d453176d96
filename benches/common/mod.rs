#![allow(dead_code)]

use std::sync::Arc;

use aspect_ecs::engine::error::ECSResult;
use aspect_ecs::{EntityManager, TypeRegistry};

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Wealth {
    pub value: f32,
}

#[derive(Clone, Copy)]
pub struct Productivity {
    pub rate: f32,
}

/// Every agent gets `Wealth` and `Position`; every other one also gets
/// `Productivity`.
pub fn populate(agent_count: usize) -> ECSResult<EntityManager> {
    let manager = EntityManager::with_registry(Arc::new(TypeRegistry::new()));
    for i in 0..agent_count {
        let entity = manager.create_entity()?;
        manager.create_component(entity, Wealth { value: 1.0 })?;
        manager.create_component(entity, Position { x: i as f32, y: 0.0 })?;
        if i % 2 == 0 {
            manager.create_component(entity, Productivity { rate: 0.01 })?;
        }
        manager.add_entity(entity)?;
    }
    Ok(manager)
}
