//! # Filters
//!
//! A filter supplies the candidate entity sequence a view iterates.
//!
//! Two filters are provided:
//!
//! * [`AliveFilter`] borrows the manager's alive sequence in place. Nothing is
//!   copied and nothing is subscribed.
//! * [`StorageFilter`] keeps its own sequence, fed by a listener subscribed to
//!   the manager for as long as the filter exists. Entities already alive when
//!   the filter is created are *not* back-filled.
//!
//! Neither filter checks component bits; pairing a filter with
//! [`CheckingIterator`](crate::engine::iterator::CheckingIterator) is how a view
//! narrows candidates down to entities matching its aspect.
//!
//! While a candidate sequence is borrowed (for the duration of a pass),
//! changes to that same sequence fail with
//! [`ExecutionError::StructuralChangeDuringPass`](crate::engine::error::ExecutionError::StructuralChangeDuringPass)
//! and leave both the manager and the filter untouched.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::engine::entity::Entity;
use crate::engine::error::ECSResult;
use crate::engine::listener::{EntityListener, ListenerId};
use crate::engine::manager::EntityManager;


/// Source of candidate entities for a view.
pub trait Filter<'m>: Sized {
    /// Borrow of the candidate sequence.
    type Entities<'a>: Deref<Target = [Entity]>
    where
        Self: 'a;

    /// Binds a filter to `manager`.
    fn new(manager: &'m EntityManager) -> ECSResult<Self>;

    /// Borrows the current candidate sequence, in order.
    fn entities(&self) -> Self::Entities<'_>;
}

/// Candidates are exactly the manager's alive entities, in insertion order.
pub struct AliveFilter<'m> {
    manager: &'m EntityManager,
}

impl<'m> Filter<'m> for AliveFilter<'m> {
    type Entities<'a> = MappedRwLockReadGuard<'m, [Entity]> where Self: 'a;

    fn new(manager: &'m EntityManager) -> ECSResult<Self> {
        Ok(Self { manager })
    }

    #[inline]
    fn entities(&self) -> Self::Entities<'_> {
        self.manager.alive_guard()
    }
}

/// Listener half of a [`StorageFilter`].
///
/// Reports itself not ready while its sequence is borrowed, so the manager
/// rejects alive-sequence changes during a pass over this filter instead of
/// letting the two diverge.
///
/// ## Invariants
/// - Holds each entity at most once, in notification order.
/// - An entity removed from the manager is erased, not merely searched for.
#[derive(Default)]
pub struct StorageListener {
    entities: RwLock<Vec<Entity>>,
}

impl EntityListener for StorageListener {
    #[inline]
    fn is_ready(&self) -> bool { self.entities.try_write().is_some() }

    fn on_entity_added(&self, entity: Entity) -> ECSResult<()> {
        self.entities.write().push(entity);
        Ok(())
    }

    fn on_entity_removed(&self, entity: Entity) -> ECSResult<()> {
        let mut entities = self.entities.write();
        if let Some(position) = entities.iter().position(|e| *e == entity) {
            entities.remove(position);
        }
        Ok(())
    }
}

/// Candidates are the entities added to the manager since this filter was
/// created and not removed since.
///
/// Subscribes on construction and unsubscribes on drop.
pub struct StorageFilter<'m> {
    manager: &'m EntityManager,
    listener: Arc<StorageListener>,
    id: ListenerId,
}

impl StorageFilter<'_> {
    /// Subscription id of the internal listener.
    #[inline]
    pub fn listener_id(&self) -> ListenerId { self.id }
}

impl<'m> Filter<'m> for StorageFilter<'m> {
    type Entities<'a> = MappedRwLockReadGuard<'a, [Entity]> where Self: 'a;

    fn new(manager: &'m EntityManager) -> ECSResult<Self> {
        let listener = Arc::new(StorageListener::default());
        let id = manager.add_listener(listener.clone())?;
        Ok(Self { manager, listener, id })
    }

    #[inline]
    fn entities(&self) -> Self::Entities<'_> {
        RwLockReadGuard::map(self.listener.entities.read_recursive(), |entities| entities.as_slice())
    }
}

impl Drop for StorageFilter<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.manager.remove_listener(self.id) {
            log::warn!("storage filter could not unsubscribe: {}", error);
        }
    }
}
