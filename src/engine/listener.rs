//! # Entity Listeners
//!
//! Observers of the entity manager's alive sequence.
//!
//! ## Purpose
//! A listener is told every time an entity is announced alive or removed from
//! the alive sequence. Storage filters use this to maintain their own copy of
//! the entities they care about.
//!
//! ## Design
//! Subscriptions are identified by a [`ListenerId`] handed out at subscribe
//! time. The registry holds shared handles, so a listener stays reachable for
//! exactly as long as it is subscribed or otherwise owned. Notification walks a
//! snapshot of the subscriber list: listeners may subscribe or unsubscribe
//! others from inside a callback without deadlocking.
//!
//! Before the manager changes its alive sequence it asks every subscriber
//! whether it can take a notification right now. A single refusal rejects the
//! change before anything is modified, so a listener never misses an update.
//!
//! ## Invariants
//! - The same listener object is subscribed at most once.
//! - An id is never reused by one registry.
//! - Every subscriber is notified, even when an earlier one fails.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::engine::entity::Entity;
use crate::engine::error::{ECSResult, ExecutionError, ListenerError};


/// Receives alive-sequence changes from an entity manager.
pub trait EntityListener: Send + Sync {
    /// Returns `false` while a notification could not be applied, e.g. because
    /// a pass borrows the state this listener maintains.
    #[inline]
    fn is_ready(&self) -> bool { true }

    /// Called after `entity` was appended to the alive sequence.
    fn on_entity_added(&self, entity: Entity) -> ECSResult<()>;

    /// Called after `entity` was removed from the alive sequence.
    fn on_entity_removed(&self, entity: Entity) -> ECSResult<()>;
}

/// Handle for one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

#[inline]
fn same_listener(a: &Arc<dyn EntityListener>, b: &Arc<dyn EntityListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Subscriber registry owned by an entity manager.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(ListenerId, Arc<dyn EntityListener>)>>,
}

impl Listeners {
    /// Creates an empty registry.
    pub fn new() -> Self { Self::default() }

    /// Subscribes `listener`.
    ///
    /// ## Errors
    /// [`ListenerError::AlreadySubscribed`] if this exact object is subscribed.
    pub fn subscribe(&self, listener: Arc<dyn EntityListener>) -> Result<ListenerId, ListenerError> {
        let mut subscribers = self.subscribers.lock();
        if let Some((id, _)) = subscribers.iter().find(|(_, existing)| same_listener(existing, &listener)) {
            return Err(ListenerError::AlreadySubscribed { id: *id });
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.push((id, listener));
        log::trace!("subscribed {}", id);
        Ok(id)
    }

    /// Removes the subscription `id`.
    ///
    /// ## Errors
    /// [`ListenerError::NotSubscribed`] if `id` is unknown or already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> Result<(), ListenerError> {
        let mut subscribers = self.subscribers.lock();
        let position = subscribers
            .iter()
            .position(|(existing, _)| *existing == id)
            .ok_or(ListenerError::NotSubscribed { id })?;
        subscribers.remove(position);
        log::trace!("unsubscribed {}", id);
        Ok(())
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize { self.subscribers.lock().len() }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool { self.subscribers.lock().is_empty() }

    fn snapshot(&self) -> Vec<Arc<dyn EntityListener>> {
        self.subscribers
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Fails with [`ExecutionError::StructuralChangeDuringPass`] if any
    /// subscriber is not ready for a notification.
    pub fn ensure_ready(&self) -> Result<(), ExecutionError> {
        if self.snapshot().iter().all(|listener| listener.is_ready()) {
            Ok(())
        } else {
            Err(ExecutionError::StructuralChangeDuringPass)
        }
    }

    /// Tells every subscriber that `entity` became alive.
    ///
    /// Returns the first listener error after all subscribers were notified.
    pub fn notify_added(&self, entity: Entity) -> ECSResult<()> {
        self.notify(|listener| listener.on_entity_added(entity))
    }

    /// Tells every subscriber that `entity` left the alive sequence.
    ///
    /// Returns the first listener error after all subscribers were notified.
    pub fn notify_removed(&self, entity: Entity) -> ECSResult<()> {
        self.notify(|listener| listener.on_entity_removed(entity))
    }

    fn notify(&self, mut deliver: impl FnMut(&dyn EntityListener) -> ECSResult<()>) -> ECSResult<()> {
        let mut first_error = None;
        for listener in self.snapshot() {
            if let Err(error) = deliver(listener.as_ref()) {
                log::warn!("listener rejected a notification: {}", error);
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
