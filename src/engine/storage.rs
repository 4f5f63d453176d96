//! Sparse-set component columns and type-erased access to them.
//!
//! This module implements the per-type component storage the entity manager
//! writes into and views read from: one [`Attribute<T>`] column per registered
//! component type, addressed by the type's [`ComponentID`].
//!
//! # What this module provides
//!
//! - **`Attribute<T>`**: a sparse set for a single element type `T`. Values are
//!   packed densely; a sparse table maps an entity's slot index to its row.
//! - **`TypeErasedAttribute`**: a dynamically-typed interface for working with a
//!   column without knowing `T` at compile time (deferred commands, teardown of
//!   a destroyed entity's components).
//! - **`ComponentStorage`**: the table of columns, indexed by component id.
//!
//! # Storage model
//!
//! ```text
//! sparse: [ -, 1, -, 0, ... ]   entity index -> dense row
//! dense:  [ T(e3), T(e1) ]
//! owners: [ e3,    e1    ]      full handle of each row's entity
//! ```
//!
//! Removal is swap-remove: the last row moves into the vacated one and its
//! sparse entry is patched. Dense order is therefore not insertion order.
//!
//! # Borrowing
//!
//! Every column sits behind its own `RwLock` inside an `Arc`. A processing pass
//! clones the `Arc`s of the columns it needs and write-locks each of them with
//! `try_write`, so two columns can be borrowed mutably at the same time and a
//! collision with another borrow fails fast instead of deadlocking.
//!
//! # Invariants
//!
//! - `dense.len() == owners.len()`.
//! - `sparse[owners[row].index()] == Some(row)` for every row.
//! - A row is only handed out for the exact handle (index and version) that
//!   owns it; stale handles never alias a recycled slot's data.

use std::any::{Any, TypeId, type_name};
use std::mem;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::component::Component;
use crate::engine::entity::Entity;
use crate::engine::error::{ECSError, ECSResult, ExecutionError, TypeMismatchError};
use crate::engine::types::{ComponentID, Signature, COMPONENT_CAP, check_component_id};


/// Sparse-set column holding every value of one component type.
pub struct Attribute<T> {
    component_id: ComponentID,
    sparse: Vec<Option<u32>>,
    dense: Vec<T>,
    owners: Vec<Entity>,
}

/// A column behind its borrow lock.
pub type LockedAttribute<T> = RwLock<Attribute<T>>;

impl<T> Attribute<T> {
    /// Creates an empty column for `component_id`.
    pub fn new(component_id: ComponentID) -> Self {
        Self {
            component_id,
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Bit index of the component type stored here.
    #[inline]
    pub fn component_id(&self) -> ComponentID { self.component_id }

    #[inline]
    fn row(&self, entity: Entity) -> Option<usize> {
        let row = (*self.sparse.get(entity.index() as usize)?)? as usize;
        (self.owners[row] == entity).then_some(row)
    }

    /// Stores `value` for `entity`.
    ///
    /// Returns the value it replaced, if `entity` already had one. A row left
    /// behind by an older handle of the same slot is overwritten silently.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }

        match self.sparse[index] {
            Some(row) => {
                let row = row as usize;
                let same_owner = self.owners[row] == entity;
                self.owners[row] = entity;
                let previous = mem::replace(&mut self.dense[row], value);
                same_owner.then_some(previous)
            }
            None => {
                self.sparse[index] = Some(self.dense.len() as u32);
                self.dense.push(value);
                self.owners.push(entity);
                None
            }
        }
    }

    /// Returns the value stored for `entity`.
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.row(entity).map(|row| &self.dense[row])
    }

    /// Returns the value stored for `entity`, mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.row(entity).map(move |row| &mut self.dense[row])
    }

    /// Returns `true` if `entity` has a value in this column.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool { self.row(entity).is_some() }

    /// Removes and returns the value stored for `entity`.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let row = self.row(entity)?;
        self.sparse[entity.index() as usize] = None;

        let value = self.dense.swap_remove(row);
        self.owners.swap_remove(row);

        if let Some(&moved) = self.owners.get(row) {
            self.sparse[moved.index() as usize] = Some(row as u32);
        }
        Some(value)
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize { self.dense.len() }

    /// Returns `true` if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool { self.dense.is_empty() }

    /// Entities owning a value, in dense order.
    #[inline]
    pub fn entities(&self) -> &[Entity] { &self.owners }

    /// Iterates `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter())
    }
}

/// Dynamically-typed interface to a locked column.
///
/// Every method takes the column lock itself with a non-blocking attempt and
/// reports [`ExecutionError::ComponentBorrowed`] when a pass holds it.
pub trait TypeErasedAttribute: Send + Sync {
    /// Returns the `TypeId` of the element type stored by this column.
    fn element_type_id(&self) -> TypeId;

    /// Returns the human-readable name of the element type stored.
    fn element_type_name(&self) -> &'static str;

    /// Returns `true` while a pass or another caller holds the column lock.
    fn is_borrowed(&self) -> bool;

    /// Returns `true` if `entity` has a value in this column.
    fn contains_dyn(&self, entity: Entity) -> ECSResult<bool>;

    /// Stores a boxed value for `entity`, replacing any previous one.
    ///
    /// ## Errors
    /// [`TypeMismatchError`] if the box does not hold the column's type.
    fn insert_dyn(&self, entity: Entity, value: Box<dyn Any + Send>) -> ECSResult<()>;

    /// Drops the value stored for `entity`; returns whether there was one.
    fn remove_dyn(&self, entity: Entity) -> ECSResult<bool>;

    /// Number of stored values.
    fn len_dyn(&self) -> ECSResult<usize>;

    /// Converts the shared handle for downcasting to the concrete column.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

fn borrowed<T>() -> ECSError {
    ExecutionError::ComponentBorrowed { name: type_name::<T>() }.into()
}

impl<T: Component> TypeErasedAttribute for LockedAttribute<T> {
    fn element_type_id(&self) -> TypeId { TypeId::of::<T>() }

    fn element_type_name(&self) -> &'static str { type_name::<T>() }

    fn is_borrowed(&self) -> bool { self.try_write().is_none() }

    fn contains_dyn(&self, entity: Entity) -> ECSResult<bool> {
        let column = self.try_read().ok_or_else(borrowed::<T>)?;
        Ok(column.contains(entity))
    }

    fn insert_dyn(&self, entity: Entity, value: Box<dyn Any + Send>) -> ECSResult<()> {
        let actual = (*value).type_id();
        let value = value.downcast::<T>().map_err(|_| TypeMismatchError {
            expected: TypeId::of::<T>(),
            expected_name: type_name::<T>(),
            actual,
        })?;

        let mut column = self.try_write().ok_or_else(borrowed::<T>)?;
        column.insert(entity, *value);
        Ok(())
    }

    fn remove_dyn(&self, entity: Entity) -> ECSResult<bool> {
        let mut column = self.try_write().ok_or_else(borrowed::<T>)?;
        Ok(column.remove(entity).is_some())
    }

    fn len_dyn(&self) -> ECSResult<usize> {
        let column = self.try_read().ok_or_else(borrowed::<T>)?;
        Ok(column.len())
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}

fn downcast_column<T: Component>(
    column: Arc<dyn TypeErasedAttribute>,
) -> Result<Arc<LockedAttribute<T>>, TypeMismatchError> {
    let expected = column.element_type_id();
    let expected_name = column.element_type_name();
    column
        .into_any_arc()
        .downcast::<LockedAttribute<T>>()
        .map_err(|_| TypeMismatchError {
            expected,
            expected_name,
            actual: TypeId::of::<T>(),
        })
}

/// Table of component columns indexed by [`ComponentID`].
///
/// Columns are created lazily the first time a value of their type is stored.
/// The table lock is only held long enough to clone or install a column
/// handle, never across a pass.
pub struct ComponentStorage {
    columns: RwLock<Vec<Option<Arc<dyn TypeErasedAttribute>>>>,
}

impl Default for ComponentStorage {
    fn default() -> Self { Self::new() }
}

impl ComponentStorage {
    /// Creates a table with no columns.
    pub fn new() -> Self {
        Self { columns: RwLock::new(vec![None; COMPONENT_CAP]) }
    }

    /// Returns the type-erased column for `component_id`, if one exists.
    pub fn erased(&self, component_id: ComponentID) -> Option<Arc<dyn TypeErasedAttribute>> {
        self.columns
            .read()
            .get(component_id as usize)
            .and_then(|slot| slot.clone())
    }

    /// Returns the typed column for `component_id`, if one exists.
    ///
    /// ## Errors
    /// [`TypeMismatchError`] if the column holds another type than `T`.
    pub fn column<T: Component>(
        &self,
        component_id: ComponentID,
    ) -> ECSResult<Option<Arc<LockedAttribute<T>>>> {
        match self.erased(component_id) {
            Some(column) => Ok(Some(downcast_column::<T>(column)?)),
            None => Ok(None),
        }
    }

    /// Returns the typed column for `component_id`, creating it if needed.
    pub fn column_or_insert<T: Component>(
        &self,
        component_id: ComponentID,
    ) -> ECSResult<Arc<LockedAttribute<T>>> {
        if let Some(column) = self.column::<T>(component_id)? {
            return Ok(column);
        }

        let index = check_component_id(component_id)? as usize;
        let mut columns = self.columns.write();
        let slot = &mut columns[index];
        if let Some(existing) = slot.clone() {
            return Ok(downcast_column::<T>(existing)?);
        }

        let column: Arc<LockedAttribute<T>> = Arc::new(RwLock::new(Attribute::new(component_id)));
        *slot = Some(column.clone() as Arc<dyn TypeErasedAttribute>);
        log::trace!("created column for `{}` (id {})", type_name::<T>(), component_id);
        Ok(column)
    }

    /// Returns the type-erased column for `component_id`, creating it with
    /// `factory` if needed.
    pub fn erased_or_insert_with(
        &self,
        component_id: ComponentID,
        factory: impl FnOnce() -> Arc<dyn TypeErasedAttribute>,
    ) -> ECSResult<Arc<dyn TypeErasedAttribute>> {
        if let Some(column) = self.erased(component_id) {
            return Ok(column);
        }

        let index = check_component_id(component_id)? as usize;
        let mut columns = self.columns.write();
        Ok(columns[index].get_or_insert_with(factory).clone())
    }

    /// Fails with [`ExecutionError::ComponentBorrowed`] if any column named by
    /// `signature` is currently locked.
    pub fn ensure_unborrowed(&self, signature: &Signature) -> Result<(), ExecutionError> {
        for component_id in signature.iterate_over_components() {
            if let Some(column) = self.erased(component_id) {
                if column.is_borrowed() {
                    return Err(ExecutionError::ComponentBorrowed { name: column.element_type_name() });
                }
            }
        }
        Ok(())
    }

    /// Number of columns created so far.
    pub fn column_count(&self) -> usize {
        self.columns.read().iter().filter(|slot| slot.is_some()).count()
    }
}
