//! # Commands
//!
//! Deferred structural changes to the entity manager.
//!
//! ## Purpose
//! While a processing pass iterates the alive sequence (or a storage filter's
//! sequence), adding or removing entities from that sequence is rejected.
//! Callbacks that want to spawn, kill or reshape entities record a [`Command`]
//! with [`EntityManager::defer`](crate::engine::manager::EntityManager::defer)
//! instead; the queue is drained by
//! [`EntityManager::apply_deferred_commands`](crate::engine::manager::EntityManager::apply_deferred_commands)
//! at a synchronization point (the scheduler does this between systems).
//!
//! ## Invariants
//! - Commands are applied in the order they were recorded.
//! - Target entities must still be valid when their command is applied.
//! - Component values must match the type registered for their id; a mismatch
//!   surfaces as a [`TypeMismatchError`](crate::engine::error::TypeMismatchError).

use std::any::Any;

use crate::engine::component::{Component, TypeRegistry};
use crate::engine::entity::Entity;
use crate::engine::error::RegistryError;
use crate::engine::types::{ComponentID, Signature};


/// Type-erased set of component values for a spawned entity.
#[derive(Default)]
pub struct Bundle {
    signature: Signature,
    values: Vec<(ComponentID, Box<dyn Any + Send>)>,
}

impl Bundle {
    /// Creates an empty bundle.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Inserts a value under the id `registry` assigns to `T`, replacing a
    /// value of the same type already in the bundle.
    pub fn with<T: Component>(mut self, registry: &TypeRegistry, value: T) -> Result<Self, RegistryError> {
        let component_id = registry.index_of::<T>()?;
        self.values.retain(|(id, _)| *id != component_id);
        self.signature.set(component_id);
        self.values.push((component_id, Box::new(value)));
        Ok(self)
    }

    /// Clears all stored values.
    #[inline]
    pub fn clear(&mut self) {
        self.signature = Signature::default();
        self.values.clear();
    }

    /// Components present in this bundle.
    #[inline]
    pub fn signature(&self) -> Signature { self.signature }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns `true` if the bundle holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub(crate) fn into_values(self) -> Vec<(ComponentID, Box<dyn Any + Send>)> {
        self.values
    }
}

/// A deferred change to the entity manager.
pub enum Command {
    /// Allocates an entity, stores the bundle's values and announces it alive.
    Spawn {
        /// Initial component values.
        bundle: Bundle,
    },

    /// Destroys an entity: it leaves the alive sequence if it was alive, its
    /// components are dropped and its handle becomes stale.
    Despawn {
        /// Entity to destroy.
        entity: Entity,
    },

    /// Removes an entity from the alive sequence and queues it for burial at
    /// the end of the tick.
    Kill {
        /// Entity to kill.
        entity: Entity,
    },

    /// Stores a component value for an entity, replacing any previous one.
    Add {
        /// Target entity.
        entity: Entity,
        /// Component type to store.
        component_id: ComponentID,
        /// Value; must be of the type registered for `component_id`.
        value: Box<dyn Any + Send>,
    },

    /// Drops a component value from an entity.
    Remove {
        /// Target entity.
        entity: Entity,
        /// Component type to drop.
        component_id: ComponentID,
    },
}

impl Command {
    /// Builds an [`Command::Add`] for `T`, registering it if needed.
    pub fn add<T: Component>(registry: &TypeRegistry, entity: Entity, value: T) -> Result<Self, RegistryError> {
        Ok(Command::Add {
            entity,
            component_id: registry.index_of::<T>()?,
            value: Box::new(value),
        })
    }

    /// Builds a [`Command::Remove`] for `T`, registering it if needed.
    pub fn remove<T: Component>(registry: &TypeRegistry, entity: Entity) -> Result<Self, RegistryError> {
        Ok(Command::Remove { entity, component_id: registry.index_of::<T>()? })
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn { bundle } => f.debug_struct("Spawn").field("components", &bundle.signature()).finish(),
            Command::Despawn { entity } => f.debug_struct("Despawn").field("entity", entity).finish(),
            Command::Kill { entity } => f.debug_struct("Kill").field("entity", entity).finish(),
            Command::Add { entity, component_id, .. } => f
                .debug_struct("Add")
                .field("entity", entity)
                .field("component_id", component_id)
                .finish_non_exhaustive(),
            Command::Remove { entity, component_id } => f
                .debug_struct("Remove")
                .field("entity", entity)
                .field("component_id", component_id)
                .finish(),
        }
    }
}
