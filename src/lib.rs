//! # Aspect ECS
//!
//! Entity-Component-System runtime built around component bitmasks and
//! composable views.
//!
//! ## Design Goals
//! - One stable bit per component type, assigned on first use
//! - Views composed from a candidate filter and an iteration strategy
//! - Systems that receive each entity's components in declaration order
//! - Structural changes during a pass fail fast or are deferred, never racy
//!
//! ## Quick start
//! ```rust
//! use aspect_ecs::prelude::*;
//!
//! # fn main() -> ECSResult<()> {
//! let manager = EntityManager::with_registry(std::sync::Arc::new(TypeRegistry::new()));
//! let entity = manager.create_entity()?;
//! manager.create_component(entity, 3_i32)?;
//! manager.add_entity(entity)?;
//!
//! let mut system = System::<_, AliveView<'_>, (i32,)>::new(
//!     &manager,
//!     |_: Entity, value: &mut i32| *value += 1,
//! )?;
//! assert_eq!(system.process_all()?, 1);
//! assert_eq!(manager.component::<i32>(entity)?, 4);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::manager::EntityManager;

pub use engine::entity::Entity;

pub use engine::component::{
    Component,
    ComponentDesc,
    ComponentSet,
    TypeRegistry,
    register_component,
    component_id_of,
};

pub use engine::aspect::Aspect;

pub use engine::filter::{
    Filter,
    AliveFilter,
    StorageFilter,
};

pub use engine::iterator::{
    IteratorStrategy,
    ForwardIterator,
    CheckingIterator,
};

pub use engine::view::{
    View,
    EntityView,
    ComponentCallback,
    AliveView,
    CheckedAliveView,
    StorageView,
    CheckedStorageView,
};

pub use engine::systems::{
    System,
    BaseSystem,
    SystemState,
};

pub use engine::scheduler::{
    Scheduler,
    TickReport,
};

pub use engine::listener::{
    EntityListener,
    ListenerId,
};

pub use engine::commands::{
    Bundle,
    Command,
};

pub use engine::error::{
    ECSResult,
    ECSError,
    RegistryError,
    ExecutionError,
    ListenerError,
    EntityError,
    TypeMismatchError,
};

pub use engine::types::{
    EntityID,
    ComponentID,
    Signature,
    COMPONENT_CAP,
    check_component_id,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use aspect_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        EntityManager,
        Entity,
        TypeRegistry,
        Aspect,
        AliveFilter,
        StorageFilter,
        ForwardIterator,
        CheckingIterator,
        View,
        AliveView,
        CheckedAliveView,
        StorageView,
        CheckedStorageView,
        ComponentCallback,
        System,
        BaseSystem,
        Scheduler,
        Command,
        Bundle,
        ECSResult,
        ECSError,
    };
}
