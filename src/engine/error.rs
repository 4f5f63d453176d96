//! Error types for registration, entity lifecycle, listeners and view execution.
//!
//! This module declares focused, composable error types used across the
//! runtime. Each error carries enough context to make failures actionable while
//! remaining small and cheap to pass around or convert into the aggregate
//! [`ECSError`].
//!
//! ## Failure families
//! * **Registry** ([`RegistryError`]): the component index space is exhausted,
//!   or a type that was never registered is looked up by an operation that must
//!   not register it implicitly.
//! * **Execution** ([`ExecutionError`]): an entity admitted by a view lacks a
//!   component its aspect guaranteed, or a processing pass collides with another
//!   borrow of the same data.
//! * **Listener lifecycle** ([`ListenerError`]): double subscription or use of
//!   an id after it was unsubscribed.
//! * **Entity lifecycle** ([`EntityError`]): stale handles, wrong alive state,
//!   allocator capacity.
//!
//! None of these are retried anywhere. A processing pass returns the first error
//! it meets and there is no partial-completion contract.
//!
//! ## Typical flow
//! ```ignore
//! fn spawn_tagged(manager: &EntityManager) -> ECSResult<Entity> {
//!     let entity = manager.create_entity()?;            // EntityError -> ECSError
//!     manager.create_component(entity, Tag)?;           // RegistryError -> ECSError
//!     manager.add_entity(entity)?;                      // ListenerError -> ECSError
//!     Ok(entity)
//! }
//! ```

use std::any::TypeId;

use thiserror::Error;

use crate::engine::entity::Entity;
use crate::engine::listener::ListenerId;
use crate::engine::types::ComponentID;


/// Result alias used by every fallible operation in the crate.
pub type ECSResult<T> = Result<T, ECSError>;

/// Aggregate error for all runtime operations.
#[derive(Debug, Error)]
pub enum ECSError {
    /// Type registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Processing pass or component access failure.
    #[error(transparent)]
    Execute(#[from] ExecutionError),

    /// Listener subscription misuse.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Entity lifecycle misuse.
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// A type-erased value did not match its column type.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
}

/// Failures of the component type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every bit of the component mask is already assigned.
    ///
    /// Fatal: the mask width cannot represent another component type.
    #[error("component index space exhausted ({capacity} types) while registering `{name}`")]
    Exhausted {
        /// Number of indices the registry can hand out.
        capacity: usize,
        /// Type that could not be registered.
        name: &'static str,
    },

    /// A component id lies outside the signature width.
    #[error("component id {component_id} is outside the {capacity}-bit component mask")]
    OutOfRange {
        /// Offending id.
        component_id: ComponentID,
        /// Width of the mask.
        capacity: usize,
    },

    /// A component id has no descriptor or storage factory.
    #[error("component id {component_id} is not registered")]
    UnknownComponentId {
        /// Offending id.
        component_id: ComponentID,
    },
}

/// Failures raised while executing a processing pass or accessing component data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// An entity admitted by a view does not carry a component the view's
    /// aspect guaranteed.
    ///
    /// This is an internal-consistency violation; the pass is aborted.
    #[error("entity {entity} has no `{name}` component (id {component_id:?})")]
    MissingComponent {
        /// Entity being processed.
        entity: Entity,
        /// Requested component id, if the type was ever registered.
        component_id: Option<ComponentID>,
        /// Rust type name of the component.
        name: &'static str,
    },

    /// A component column is already borrowed, usually by the pass that is
    /// currently invoking the caller.
    #[error("component `{name}` is already borrowed by an in-flight pass")]
    ComponentBorrowed {
        /// Rust type name of the component.
        name: &'static str,
    },

    /// The alive sequence or a storage filter's sequence was changed while a
    /// processing pass was iterating it.
    #[error("structural change requested while a processing pass iterates the entity sequence")]
    StructuralChangeDuringPass,

    /// A system's component list names the same type more than once.
    #[error("component id {component_id} is requested more than once")]
    DuplicateComponent {
        /// Duplicated id.
        component_id: ComponentID,
    },

    /// A system was asked to process while it was already processing.
    #[error("system `{system}` is already processing")]
    Reentrant {
        /// System name.
        system: &'static str,
    },
}

/// Misuse of the listener subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The same listener object is already subscribed.
    #[error("listener is already subscribed as {id}")]
    AlreadySubscribed {
        /// Id of the existing subscription.
        id: ListenerId,
    },

    /// No subscription exists for the id (never subscribed, or already removed).
    #[error("listener {id} is not subscribed")]
    NotSubscribed {
        /// Offending id.
        id: ListenerId,
    },
}

/// Entity lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The handle refers to a destroyed entity or a recycled slot.
    #[error("stale or dead entity reference {entity}")]
    Stale {
        /// Offending handle.
        entity: Entity,
    },

    /// The entity is valid but not currently alive.
    #[error("entity {entity} is not alive")]
    NotAlive {
        /// Offending handle.
        entity: Entity,
    },

    /// The entity was already announced as alive.
    #[error("entity {entity} is already alive")]
    AlreadyAlive {
        /// Offending handle.
        entity: Entity,
    },

    /// The allocator cannot hand out more indices.
    #[error("entity limit reached ({needed} needed; capacity {capacity})")]
    Capacity {
        /// Slots the operation attempted to allocate.
        needed: u64,
        /// Current upper bound.
        capacity: u64,
    },
}

/// Returned when a type-erased value is written into a column of another type.
///
/// This is a logic error surfaced by storage when component ids diverge, e.g.
/// a deferred command carrying a `Velocity` for the `Position` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("type mismatch: expected {expected_name}, actual {actual:?}")]
pub struct TypeMismatchError {
    /// Column element type.
    pub expected: TypeId,
    /// Column element type name, for diagnostics.
    pub expected_name: &'static str,
    /// Dynamic type of the provided value.
    pub actual: TypeId,
}
