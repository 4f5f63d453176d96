//! # Component Registry
//!
//! This module assigns every Rust component type a stable bit index
//! ([`ComponentID`]) and describes compile-time lists of component types
//! ([`ComponentSet`]) so that aspects, views and systems can turn "these types"
//! into "these bits" and "these columns".
//!
//! ## Design
//! - Indices are handed out on first request, densely from 0, in request order.
//!   A type keeps its index for the lifetime of the registry.
//! - Each registered type records a [`ComponentDesc`] and a storage factory that
//!   allocates an empty type-erased column for it.
//! - The registry is an explicit, injectable service. A process-wide instance is
//!   available through [`TypeRegistry::global`]; tests can build their own or
//!   [`clear`](TypeRegistry::clear) one between runs.
//!
//! ## Invariants
//! - The mapping is append-only and idempotent.
//! - Indices never exceed the configured capacity (at most [`COMPONENT_CAP`]);
//!   running out is [`RegistryError::Exhausted`], never a wrap.
//!
//! ## Concurrency
//! The counter is atomic and the type map sits behind an `RwLock`: lookups of
//! already-registered types only take the read lock, the write lock is taken
//! once per type on first use, and [`TypeRegistry::count`] is lock-free.

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    mem::{size_of, align_of},
    sync::{Arc, OnceLock, atomic::{AtomicU16, Ordering}},
};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::engine::entity::Entity;
use crate::engine::error::{ECSResult, ExecutionError, RegistryError};
use crate::engine::storage::{Attribute, ComponentStorage, LockedAttribute, TypeErasedAttribute};
use crate::engine::types::{ComponentID, Signature, COMPONENT_CAP};


/// Marker for types that can be stored as components.
pub trait Component: Send + Sync + 'static {}

impl<T> Component for T where T: Send + Sync + 'static {}

/// Factory function for constructing an empty type-erased component column.
pub type FactoryFn = fn(ComponentID) -> Arc<dyn TypeErasedAttribute>;

fn new_attribute_storage<T: Component>(component_id: ComponentID) -> Arc<dyn TypeErasedAttribute> {
    Arc::new(RwLock::new(Attribute::<T>::new(component_id)))
}

/// Describes a registered component type.
///
/// ## Purpose
/// Provides metadata about a component type for diagnostics and tooling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    /// Bit index assigned by the registry.
    pub component_id: ComponentID,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,
}

impl ComponentDesc {
    /// Constructs a descriptor for type `T` with `component_id = 0`;
    /// finalize it with [`with_id`](Self::with_id).
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            component_id: 0,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    /// Returns `true` if this descriptor refers to type `T`.
    #[inline]
    pub fn matches_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns a copy of this descriptor with `component_id` set.
    #[inline]
    pub fn with_id(mut self, component_id: ComponentID) -> Self {
        self.component_id = component_id;
        self
    }
}

impl std::fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComponentDesc {{ id: {}, name: {}, size: {}, align: {} }}",
            self.component_id, self.name, self.size, self.align
        )
    }
}

#[derive(Clone, Copy)]
struct ComponentEntry {
    desc: ComponentDesc,
    factory: FactoryFn,
}

#[derive(Default)]
struct RegistryTables {
    by_type: HashMap<TypeId, ComponentID>,
    by_id: Vec<ComponentEntry>,
}

/// Mapping between Rust component types and their bit indices.
///
/// ## Invariants
/// - `tables.by_id.len() == next_id` whenever the write lock is released.
/// - Every entry in `by_type` has a matching `by_id[id]`.
pub struct TypeRegistry {
    capacity: usize,
    next_id: AtomicU16,
    tables: RwLock<RegistryTables>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<TypeRegistry>> = OnceLock::new();

impl Default for TypeRegistry {
    fn default() -> Self { Self::new() }
}

impl TypeRegistry {
    /// Creates an empty registry able to index [`COMPONENT_CAP`] types.
    pub fn new() -> Self { Self::with_capacity(COMPONENT_CAP) }

    /// Creates an empty registry able to index `capacity` types.
    ///
    /// `capacity` is clamped to [`COMPONENT_CAP`], the signature width.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(COMPONENT_CAP),
            next_id: AtomicU16::new(0),
            tables: RwLock::new(RegistryTables::default()),
        }
    }

    /// Returns the process-wide registry, creating it on first use.
    pub fn global() -> Arc<TypeRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(TypeRegistry::new()))
            .clone()
    }

    /// Maximum number of types this registry can index.
    #[inline]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Number of distinct types indexed so far.
    #[inline]
    pub fn count(&self) -> usize {
        self.next_id.load(Ordering::Acquire) as usize
    }

    /// Returns the bit index of `T`, assigning the next free one on first call.
    ///
    /// ## Errors
    /// [`RegistryError::Exhausted`] if `T` is new and every index is taken.
    pub fn index_of<T: Component>(&self) -> Result<ComponentID, RegistryError> {
        if let Some(component_id) = self.get::<T>() {
            return Ok(component_id);
        }

        let type_id = TypeId::of::<T>();
        let mut tables = self.tables.write();
        if let Some(&existing) = tables.by_type.get(&type_id) {
            return Ok(existing);
        }

        let component_id = self.next_id.load(Ordering::Acquire);
        if component_id as usize >= self.capacity {
            return Err(RegistryError::Exhausted {
                capacity: self.capacity,
                name: type_name::<T>(),
            });
        }

        tables.by_type.insert(type_id, component_id);
        tables.by_id.push(ComponentEntry {
            desc: ComponentDesc::of::<T>().with_id(component_id),
            factory: new_attribute_storage::<T>,
        });
        self.next_id.fetch_add(1, Ordering::AcqRel);
        drop(tables);

        log::debug!("registered component `{}` as bit {}", type_name::<T>(), component_id);
        Ok(component_id)
    }

    /// Returns the bit index of `T` without registering it.
    pub fn get<T: 'static>(&self) -> Option<ComponentID> {
        self.component_id_of_type_id(TypeId::of::<T>())
    }

    /// Returns the bit index associated with a runtime `TypeId`, if registered.
    pub fn component_id_of_type_id(&self, type_id: TypeId) -> Option<ComponentID> {
        self.tables.read().by_type.get(&type_id).copied()
    }

    /// Returns the descriptor for `component_id`, if registered.
    pub fn description(&self, component_id: ComponentID) -> Option<ComponentDesc> {
        self.tables
            .read()
            .by_id
            .get(component_id as usize)
            .map(|entry| entry.desc)
    }

    /// Returns the column factory for `component_id`, if registered.
    pub fn factory(&self, component_id: ComponentID) -> Result<FactoryFn, RegistryError> {
        self.tables
            .read()
            .by_id
            .get(component_id as usize)
            .map(|entry| entry.factory)
            .ok_or(RegistryError::UnknownComponentId { component_id })
    }

    /// Registers every type of `C` and returns their combined mask.
    pub fn signature_of<C: ComponentSet>(&self) -> ECSResult<Signature> {
        Ok(Signature::try_from(C::register(self)?.as_slice())?)
    }

    /// Forgets every registration.
    ///
    /// Only meant for isolating test runs: signatures built before the reset
    /// refer to indices that may be handed to other types afterwards.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_type.clear();
        tables.by_id.clear();
        self.next_id.store(0, Ordering::Release);
    }
}

/// Registers `T` in the process-wide registry and returns its index.
pub fn register_component<T: Component>() -> Result<ComponentID, RegistryError> {
    TypeRegistry::global().index_of::<T>()
}

/// Returns the process-wide index of `T`, if registered.
pub fn component_id_of<T: 'static>() -> Option<ComponentID> {
    TypeRegistry::global().get::<T>()
}

/// Fails if `component_ids` names the same component twice.
pub fn ensure_distinct(component_ids: &[ComponentID]) -> Result<(), ExecutionError> {
    for (position, &component_id) in component_ids.iter().enumerate() {
        if component_ids[..position].contains(&component_id) {
            return Err(ExecutionError::DuplicateComponent { component_id });
        }
    }
    Ok(())
}

/// A compile-time list of component types, implemented for tuples `(A,)`
/// through `(A, B, C, D, E, F, G, H)`.
///
/// ## Purpose
/// Gives views and systems everything they need about "the components this
/// system asks for":
/// * their bit indices (for building an aspect),
/// * their typed storage columns,
/// * exclusive borrows of those columns for the duration of a pass,
/// * per-entity mutable references, in declaration order.
pub trait ComponentSet: 'static {
    /// Shared handles to the typed columns.
    type Columns;
    /// Exclusive borrows of the columns, held for one pass.
    type Guards<'c>;
    /// Mutable references to one entity's components, in declaration order.
    type Refs<'g>;

    /// Registers every type and returns their indices in declaration order.
    fn register(registry: &TypeRegistry) -> Result<Vec<ComponentID>, RegistryError>;

    /// Resolves the typed columns.
    ///
    /// `entity` names the first entity the columns are needed for; it is only
    /// used to report a missing column as a missing component of that entity.
    fn columns(
        registry: &TypeRegistry,
        storage: &ComponentStorage,
        entity: Entity,
    ) -> ECSResult<Self::Columns>;

    /// Takes exclusive borrows of all columns without blocking.
    fn lock(columns: &Self::Columns) -> ECSResult<Self::Guards<'_>>;

    /// Fetches one entity's components from the borrowed columns.
    fn fetch<'g, 'c>(guards: &'g mut Self::Guards<'c>, entity: Entity) -> ECSResult<Self::Refs<'g>>;
}

fn typed_column<T: Component>(
    registry: &TypeRegistry,
    storage: &ComponentStorage,
    entity: Entity,
) -> ECSResult<Arc<LockedAttribute<T>>> {
    let missing = |component_id| ExecutionError::MissingComponent {
        entity,
        component_id,
        name: type_name::<T>(),
    };

    let component_id = registry.get::<T>().ok_or_else(|| missing(None))?;
    storage
        .column::<T>(component_id)?
        .ok_or_else(|| missing(Some(component_id)).into())
}

fn lock_column<T: Component>(
    column: &LockedAttribute<T>,
) -> Result<RwLockWriteGuard<'_, Attribute<T>>, ExecutionError> {
    column
        .try_write()
        .ok_or(ExecutionError::ComponentBorrowed { name: type_name::<T>() })
}

fn fetch_component<'g, T: Component>(
    column: &'g mut Attribute<T>,
    entity: Entity,
) -> Result<&'g mut T, ExecutionError> {
    let component_id = column.component_id();
    column.get_mut(entity).ok_or(ExecutionError::MissingComponent {
        entity,
        component_id: Some(component_id),
        name: type_name::<T>(),
    })
}

macro_rules! impl_component_set {
    ( $( $ty: ident ),+ ) => {
        impl<$( $ty: Component ),+> ComponentSet for ($( $ty, )+) {
            type Columns = ($( Arc<LockedAttribute<$ty>>, )+);
            type Guards<'c> = ($( RwLockWriteGuard<'c, Attribute<$ty>>, )+);
            type Refs<'g> = ($( &'g mut $ty, )+);

            fn register(registry: &TypeRegistry) -> Result<Vec<ComponentID>, RegistryError> {
                Ok(vec![$( registry.index_of::<$ty>()? ),+])
            }

            fn columns(
                registry: &TypeRegistry,
                storage: &ComponentStorage,
                entity: Entity,
            ) -> ECSResult<Self::Columns> {
                Ok(($( typed_column::<$ty>(registry, storage, entity)?, )+))
            }

            #[allow(non_snake_case)]
            fn lock(columns: &Self::Columns) -> ECSResult<Self::Guards<'_>> {
                let ($( $ty, )+) = columns;
                Ok(($( lock_column::<$ty>($ty)?, )+))
            }

            #[allow(non_snake_case)]
            fn fetch<'g, 'c>(
                guards: &'g mut Self::Guards<'c>,
                entity: Entity,
            ) -> ECSResult<Self::Refs<'g>> {
                let ($( $ty, )+) = guards;
                Ok(($( fetch_component::<$ty>(&mut **$ty, entity)?, )+))
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
