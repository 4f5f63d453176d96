//! Entity handles and the index/version allocator.
//!
//! An [`Entity`] is an opaque, copyable handle. It carries no data; it is the
//! join key between the manager's per-entity bitmask and the component records
//! held by storage. Indices are recycled, and every recycle bumps the slot's
//! version so old handles are detected as stale.

use std::fmt;

use crate::engine::error::EntityError;
use crate::engine::types::{
    EntityID, IndexID, VersionID,
    INDEX_BITS, INDEX_MASK, INDEX_CAP, ENTITY_GROWTH,
};


/// Lightweight handle naming one entity.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub EntityID);

#[inline]
const fn make_id(index: IndexID, version: VersionID) -> EntityID {
    ((version as EntityID) << INDEX_BITS) | (index as EntityID)
}

impl Entity {
    /// Builds a handle from its parts.
    #[inline]
    pub const fn new(index: IndexID, version: VersionID) -> Self {
        Entity(make_id(index, version))
    }

    /// Slot index of this entity.
    #[inline]
    pub const fn index(self) -> IndexID { (self.0 & INDEX_MASK) as IndexID }

    /// Generation of the slot at the time this handle was issued.
    #[inline]
    pub const fn version(self) -> VersionID { (self.0 >> INDEX_BITS) as VersionID }

    /// Raw packed identifier.
    #[inline]
    pub const fn id(self) -> EntityID { self.0 }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.version())
    }
}

/// Lifecycle of one allocator slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Not handed out.
    #[default]
    Free,
    /// Handed out, not (yet or any more) announced alive.
    Allocated,
    /// Announced alive.
    Alive,
}

/// Index/version allocator.
///
/// ## Invariants
/// - `versions.len() == states.len()`.
/// - Every index in `free_store` is in state [`SlotState::Free`].
/// - `free_store` pops the lowest free index first when freshly grown.
#[derive(Default)]
pub struct Entities {
    versions: Vec<VersionID>,
    states: Vec<SlotState>,
    free_store: Vec<IndexID>,
}

impl Entities {
    /// Creates an empty allocator.
    pub fn new() -> Self { Self::default() }

    fn ensure_capacity(&mut self, additional_entities: IndexID) -> Result<(), EntityError> {
        if additional_entities == 0 { return Ok(()); }

        let current = self.versions.len() as u64;
        let capacity = INDEX_CAP as u64 + 1;
        if current >= capacity {
            return Err(EntityError::Capacity { needed: current + 1, capacity });
        }
        let needed = (current + additional_entities as u64).min(capacity);

        self.versions.resize(needed as usize, 0);
        self.states.resize(needed as usize, SlotState::Free);

        for index in (current..needed).rev() {
            self.free_store.push(index as IndexID);
        }
        Ok(())
    }

    /// Hands out a fresh handle in state [`SlotState::Allocated`].
    pub fn allocate(&mut self) -> Result<Entity, EntityError> {
        let index = match self.free_store.pop() {
            Some(index) => index,
            None => {
                self.ensure_capacity(ENTITY_GROWTH)?;
                self.free_store
                    .pop()
                    .ok_or(EntityError::Capacity { needed: 1, capacity: 0 })?
            }
        };
        self.states[index as usize] = SlotState::Allocated;
        Ok(Entity::new(index, self.versions[index as usize]))
    }

    /// Returns the slot state for a handle, or `None` if the handle is stale.
    pub fn state(&self, entity: Entity) -> Option<SlotState> {
        let index = entity.index() as usize;
        match (self.versions.get(index), self.states.get(index)) {
            (Some(&version), Some(&state)) if version == entity.version() && state != SlotState::Free => {
                Some(state)
            }
            _ => None,
        }
    }

    /// Moves a valid handle to `state`.
    pub fn set_state(&mut self, entity: Entity, state: SlotState) -> Result<(), EntityError> {
        self.state(entity).ok_or(EntityError::Stale { entity })?;
        self.states[entity.index() as usize] = state;
        Ok(())
    }

    /// Returns `true` if the handle names a slot that is allocated or alive.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool { self.state(entity).is_some() }

    /// Returns `true` if the handle names an alive entity.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.state(entity) == Some(SlotState::Alive)
    }

    /// Releases the slot and bumps its version so the handle becomes stale.
    pub fn release(&mut self, entity: Entity) -> Result<(), EntityError> {
        self.state(entity).ok_or(EntityError::Stale { entity })?;
        let index = entity.index() as usize;
        self.versions[index] = self.versions[index].wrapping_add(1);
        self.states[index] = SlotState::Free;
        self.free_store.push(entity.index());
        Ok(())
    }

    /// Number of slots ever allocated.
    #[inline]
    pub fn slots(&self) -> usize { self.versions.len() }
}
