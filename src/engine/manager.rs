//! Entity bookkeeping: handles, component bits, the alive sequence and listeners.
//!
//! This module defines [`EntityManager`], the world state every filter, view
//! and system reads. It is responsible for:
//!
//! * allocating and recycling entity handles,
//! * recording which component types each entity carries (its *bits*),
//! * storing component values in per-type columns,
//! * maintaining the ordered sequence of alive entities,
//! * notifying subscribed listeners when that sequence changes,
//! * queueing deferred structural commands and applying them on demand.
//!
//! ## Entity lifecycle
//!
//! ```text
//! create_entity -> Allocated --add_entity--> Alive --remove_entity--> Allocated (queued dead)
//!                      ^                                                 |
//!                      +------------- destroy_entity / bury_dead --------+--> stale
//! ```
//!
//! Components can be attached in any non-stale state. Attaching components
//! before [`add_entity`](EntityManager::add_entity) means listeners see a fully
//! formed entity.
//!
//! ## Concurrency model
//!
//! All methods take `&self`. Each piece of state sits behind its own lock so a
//! processing pass can read the alive sequence while its callback creates
//! entities or edits components of types it is not iterating.
//!
//! Changing the alive sequence while a pass iterates it is not allowed: the
//! write is attempted without blocking and fails with
//! [`ExecutionError::StructuralChangeDuringPass`]. Record a
//! [`Command`] with [`defer`](EntityManager::defer) instead.

use std::any::type_name;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};

use crate::engine::commands::{Bundle, Command};
use crate::engine::component::{Component, TypeRegistry};
use crate::engine::entity::{Entities, Entity, SlotState};
use crate::engine::error::{ECSResult, EntityError, ExecutionError};
use crate::engine::listener::{EntityListener, ListenerId, Listeners};
use crate::engine::storage::ComponentStorage;
use crate::engine::types::{ComponentID, Signature, check_component_id};


/// Owner of all entity and component state.
///
/// ## Invariants
/// - The alive sequence holds each alive entity exactly once, in the order the
///   entities were added; removal preserves the relative order of the rest.
/// - `bits[e.index()]` has bit `id` set iff the column `id` holds a value for `e`.
/// - Listeners are notified after the alive sequence has been updated.
pub struct EntityManager {
    registry: Arc<TypeRegistry>,
    entities: Mutex<Entities>,
    bits: RwLock<Vec<Signature>>,
    alive: RwLock<Vec<Entity>>,
    dead: Mutex<Vec<Entity>>,
    storage: ComponentStorage,
    listeners: Listeners,
    deferred: Mutex<Vec<Command>>,
}

impl Default for EntityManager {
    fn default() -> Self { Self::new() }
}

impl EntityManager {
    /// Creates an empty manager backed by the process-wide type registry.
    pub fn new() -> Self { Self::with_registry(TypeRegistry::global()) }

    /// Creates an empty manager backed by `registry`.
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entities: Mutex::new(Entities::new()),
            bits: RwLock::new(Vec::new()),
            alive: RwLock::new(Vec::new()),
            dead: Mutex::new(Vec::new()),
            storage: ComponentStorage::new(),
            listeners: Listeners::new(),
            deferred: Mutex::new(Vec::new()),
        }
    }

    /// The type registry component ids are resolved against.
    #[inline]
    pub fn registry(&self) -> &TypeRegistry { &self.registry }

    /// Shared handle to the type registry.
    #[inline]
    pub fn registry_handle(&self) -> Arc<TypeRegistry> { Arc::clone(&self.registry) }

    /// Component columns.
    #[inline]
    pub fn storage(&self) -> &ComponentStorage { &self.storage }

    // ---------------------------------------------------------------------
    // Entity lifecycle
    // ---------------------------------------------------------------------

    /// Allocates a new entity handle. The entity is valid but not yet alive.
    pub fn create_entity(&self) -> ECSResult<Entity> {
        let entity = self.entities.lock().allocate()?;
        log::trace!("created entity {}", entity);
        Ok(entity)
    }

    /// Appends `entity` to the alive sequence and notifies listeners.
    ///
    /// ## Errors
    /// - [`EntityError::Stale`] for a destroyed handle.
    /// - [`EntityError::AlreadyAlive`] if it was already added.
    /// - [`ExecutionError::StructuralChangeDuringPass`] while a pass iterates
    ///   the alive sequence or a listener is not ready. Nothing is changed.
    ///
    /// Every listener is notified; the first listener error is returned after
    /// the entity has been added.
    pub fn add_entity(&self, entity: Entity) -> ECSResult<()> {
        {
            let mut entities = self.entities.lock();
            match entities.state(entity) {
                None | Some(SlotState::Free) => return Err(EntityError::Stale { entity }.into()),
                Some(SlotState::Alive) => return Err(EntityError::AlreadyAlive { entity }.into()),
                Some(SlotState::Allocated) => {}
            }

            let mut alive = self.alive.try_write().ok_or(ExecutionError::StructuralChangeDuringPass)?;
            self.listeners.ensure_ready()?;
            entities.set_state(entity, SlotState::Alive)?;
            alive.push(entity);
        }
        self.dead.lock().retain(|dead| *dead != entity);

        log::debug!("entity {} added", entity);
        self.listeners.notify_added(entity)
    }

    /// Removes `entity` from the alive sequence, notifies listeners and queues
    /// it for [`bury_dead`](Self::bury_dead). Its components are kept until then.
    ///
    /// ## Errors
    /// - [`EntityError::Stale`] for a destroyed handle.
    /// - [`EntityError::NotAlive`] if it is not in the alive sequence.
    /// - [`ExecutionError::StructuralChangeDuringPass`] while a pass iterates
    ///   the alive sequence or a listener is not ready. Nothing is changed.
    ///
    /// Every listener is notified; the first listener error is returned after
    /// the removal has taken effect.
    pub fn remove_entity(&self, entity: Entity) -> ECSResult<()> {
        {
            let mut entities = self.entities.lock();
            match entities.state(entity) {
                None | Some(SlotState::Free) => return Err(EntityError::Stale { entity }.into()),
                Some(SlotState::Allocated) => return Err(EntityError::NotAlive { entity }.into()),
                Some(SlotState::Alive) => {}
            }

            let mut alive = self.alive.try_write().ok_or(ExecutionError::StructuralChangeDuringPass)?;
            self.listeners.ensure_ready()?;
            if let Some(position) = alive.iter().position(|e| *e == entity) {
                alive.remove(position);
            }
            entities.set_state(entity, SlotState::Allocated)?;
        }
        self.dead.lock().push(entity);

        log::debug!("entity {} removed", entity);
        self.listeners.notify_removed(entity)
    }

    /// Destroys `entity`: removes it from the alive sequence if needed, drops
    /// all of its components and makes the handle stale.
    ///
    /// ## Errors
    /// - [`EntityError::Stale`] for a destroyed handle.
    /// - [`ExecutionError::ComponentBorrowed`] if a column holding one of its
    ///   components is locked by a pass. Nothing is changed.
    /// - Any error of [`remove_entity`](Self::remove_entity).
    pub fn destroy_entity(&self, entity: Entity) -> ECSResult<()> {
        self.ensure_valid(entity)?;
        let signature = self.bits_of(entity);
        self.storage.ensure_unborrowed(&signature)?;

        if self.is_alive(entity) {
            self.remove_entity(entity)?;
        }
        for component_id in signature.iterate_over_components() {
            self.remove_erased(entity, component_id)?;
        }

        self.entities.lock().release(entity)?;
        self.dead.lock().retain(|dead| *dead != entity);
        log::trace!("destroyed entity {}", entity);
        Ok(())
    }

    /// Destroys every entity removed since the last call that was not added
    /// again in between. Returns how many were destroyed.
    ///
    /// The first failure stops the burial; the failing entity and the ones
    /// after it stay queued for the next call.
    pub fn bury_dead(&self) -> ECSResult<usize> {
        let dead = std::mem::take(&mut *self.dead.lock());
        let mut buried = 0;
        let mut pending = dead.into_iter();
        while let Some(entity) = pending.next() {
            if !self.is_valid(entity) || self.is_alive(entity) {
                continue;
            }
            if let Err(error) = self.destroy_entity(entity) {
                let mut queue = self.dead.lock();
                let queued_meanwhile = std::mem::take(&mut *queue);
                queue.push(entity);
                queue.extend(pending);
                queue.extend(queued_meanwhile);
                return Err(error);
            }
            buried += 1;
        }
        if buried > 0 {
            log::debug!("buried {} dead entities", buried);
        }
        Ok(buried)
    }

    /// Returns `true` if `entity` is allocated or alive.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool { self.entities.lock().is_valid(entity) }

    /// Returns `true` if `entity` is in the alive sequence.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool { self.entities.lock().is_alive(entity) }

    fn ensure_valid(&self, entity: Entity) -> Result<(), EntityError> {
        if self.is_valid(entity) { Ok(()) } else { Err(EntityError::Stale { entity }) }
    }

    /// Snapshot of the alive sequence.
    pub fn alive_entities(&self) -> Vec<Entity> { self.alive.read().clone() }

    /// Number of alive entities.
    pub fn alive_count(&self) -> usize { self.alive.read().len() }

    /// Borrows the alive sequence in place.
    ///
    /// While the guard lives, [`add_entity`](Self::add_entity) and
    /// [`remove_entity`](Self::remove_entity) fail with
    /// [`ExecutionError::StructuralChangeDuringPass`].
    pub fn alive_guard(&self) -> MappedRwLockReadGuard<'_, [Entity]> {
        RwLockReadGuard::map(self.alive.read_recursive(), |alive| alive.as_slice())
    }

    // ---------------------------------------------------------------------
    // Component bits
    // ---------------------------------------------------------------------

    /// The component bits of `entity`. Stale handles read as empty.
    pub fn bits_of(&self, entity: Entity) -> Signature {
        if !self.is_valid(entity) {
            return Signature::default();
        }
        self.bits
            .read()
            .get(entity.index() as usize)
            .copied()
            .unwrap_or_default()
    }

    fn update_bits(&self, entity: Entity, update: impl FnOnce(&mut Signature)) {
        let index = entity.index() as usize;
        let mut bits = self.bits.write();
        if index >= bits.len() {
            bits.resize(index + 1, Signature::default());
        }
        update(&mut bits[index]);
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Stores `value` as `entity`'s `T` component and sets its bit.
    ///
    /// Returns the value it replaced, if any. Registers `T` on first use.
    pub fn create_component<T: Component>(&self, entity: Entity, value: T) -> ECSResult<Option<T>> {
        self.ensure_valid(entity)?;
        let component_id = self.registry.index_of::<T>()?;
        let column = self.storage.column_or_insert::<T>(component_id)?;

        let previous = column
            .try_write()
            .ok_or(ExecutionError::ComponentBorrowed { name: type_name::<T>() })?
            .insert(entity, value);
        self.update_bits(entity, |bits| bits.set(component_id));
        Ok(previous)
    }

    /// Removes `entity`'s `T` component and clears its bit.
    pub fn remove_component<T: Component>(&self, entity: Entity) -> ECSResult<Option<T>> {
        self.ensure_valid(entity)?;
        let Some(component_id) = self.registry.get::<T>() else { return Ok(None) };
        let Some(column) = self.storage.column::<T>(component_id)? else { return Ok(None) };

        let removed = column
            .try_write()
            .ok_or(ExecutionError::ComponentBorrowed { name: type_name::<T>() })?
            .remove(entity);
        self.update_bits(entity, |bits| bits.clear(component_id));
        Ok(removed)
    }

    /// Returns `true` if `entity` has a `T` component.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .get::<T>()
            .is_some_and(|component_id| self.bits_of(entity).has(component_id))
    }

    /// Calls `f` with a shared borrow of `entity`'s `T` component.
    pub fn with_component<T: Component, R>(&self, entity: Entity, f: impl FnOnce(&T) -> R) -> ECSResult<R> {
        self.ensure_valid(entity)?;
        let missing = |component_id| ExecutionError::MissingComponent { entity, component_id, name: type_name::<T>() };

        let component_id = self.registry.get::<T>().ok_or_else(|| missing(None))?;
        let column = self.storage.column::<T>(component_id)?.ok_or_else(|| missing(Some(component_id)))?;
        let column = column
            .try_read()
            .ok_or(ExecutionError::ComponentBorrowed { name: type_name::<T>() })?;
        let value = column.get(entity).ok_or_else(|| missing(Some(component_id)))?;
        Ok(f(value))
    }

    /// Calls `f` with an exclusive borrow of `entity`'s `T` component.
    pub fn with_component_mut<T: Component, R>(&self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> ECSResult<R> {
        self.ensure_valid(entity)?;
        let missing = |component_id| ExecutionError::MissingComponent { entity, component_id, name: type_name::<T>() };

        let component_id = self.registry.get::<T>().ok_or_else(|| missing(None))?;
        let column = self.storage.column::<T>(component_id)?.ok_or_else(|| missing(Some(component_id)))?;
        let mut column = column
            .try_write()
            .ok_or(ExecutionError::ComponentBorrowed { name: type_name::<T>() })?;
        let value = column.get_mut(entity).ok_or_else(|| missing(Some(component_id)))?;
        Ok(f(value))
    }

    /// Returns a copy of `entity`'s `T` component.
    pub fn component<T: Component + Clone>(&self, entity: Entity) -> ECSResult<T> {
        self.with_component(entity, T::clone)
    }

    fn insert_erased(&self, entity: Entity, component_id: ComponentID, value: Box<dyn std::any::Any + Send>) -> ECSResult<()> {
        self.ensure_valid(entity)?;
        let factory = self.registry.factory(component_id)?;
        let column = self.storage.erased_or_insert_with(component_id, || factory(component_id))?;
        column.insert_dyn(entity, value)?;
        self.update_bits(entity, |bits| bits.set(component_id));
        Ok(())
    }

    fn remove_erased(&self, entity: Entity, component_id: ComponentID) -> ECSResult<()> {
        self.ensure_valid(entity)?;
        check_component_id(component_id)?;
        if let Some(column) = self.storage.erased(component_id) {
            column.remove_dyn(entity)?;
        }
        self.update_bits(entity, |bits| bits.clear(component_id));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Subscribes `listener` to alive-sequence changes.
    pub fn add_listener(&self, listener: Arc<dyn EntityListener>) -> ECSResult<ListenerId> {
        Ok(self.listeners.subscribe(listener)?)
    }

    /// Cancels the subscription `id`.
    pub fn remove_listener(&self, id: ListenerId) -> ECSResult<()> {
        Ok(self.listeners.unsubscribe(id)?)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize { self.listeners.len() }

    // ---------------------------------------------------------------------
    // Deferred commands
    // ---------------------------------------------------------------------

    /// Queues a structural command for [`apply_deferred_commands`](Self::apply_deferred_commands).
    pub fn defer(&self, command: Command) {
        self.deferred.lock().push(command);
    }

    /// Number of queued commands.
    pub fn deferred_count(&self) -> usize { self.deferred.lock().len() }

    /// Applies every queued command in recording order and returns how many
    /// were applied.
    ///
    /// Commands queued while applying (by listeners) are applied in the same
    /// call. The first failing command aborts the drain; commands after it stay
    /// queued.
    pub fn apply_deferred_commands(&self) -> ECSResult<usize> {
        let mut applied = 0;
        loop {
            let batch = std::mem::take(&mut *self.deferred.lock());
            if batch.is_empty() {
                break;
            }

            let mut pending = batch.into_iter();
            while let Some(command) = pending.next() {
                log::trace!("applying deferred {:?}", command);
                if let Err(error) = self.apply(command) {
                    let mut deferred = self.deferred.lock();
                    let queued_meanwhile = std::mem::take(&mut *deferred);
                    deferred.extend(pending);
                    deferred.extend(queued_meanwhile);
                    return Err(error);
                }
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn apply(&self, command: Command) -> ECSResult<()> {
        match command {
            Command::Spawn { bundle } => self.spawn(bundle).map(|_| ()),
            Command::Despawn { entity } => self.destroy_entity(entity),
            Command::Kill { entity } => self.remove_entity(entity),
            Command::Add { entity, component_id, value } => self.insert_erased(entity, component_id, value),
            Command::Remove { entity, component_id } => self.remove_erased(entity, component_id),
        }
    }

    /// Allocates an entity, stores every value of `bundle` and adds it.
    pub fn spawn(&self, bundle: Bundle) -> ECSResult<Entity> {
        let entity = self.create_entity()?;
        for (component_id, value) in bundle.into_values() {
            self.insert_erased(entity, component_id, value)?;
        }
        self.add_entity(entity)?;
        Ok(entity)
    }
}
