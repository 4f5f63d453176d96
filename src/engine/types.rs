//! Core ECS Types, Identifiers, and Bit-Level Layouts
//!
//! This module defines the **fundamental types, identifiers, bit layouts, and
//! signatures** shared by every other part of the runtime: the type registry,
//! aspects, the entity manager, filters, iterator strategies, views and systems.
//!
//! ## Entity Representation
//!
//! Entities are encoded as a packed 64-bit integer:
//!
//! ```text
//! | version (32) | index (32) |
//! ```
//!
//! - **Index** identifies the slot in the entity allocator.
//! - **Version** enables stale-handle detection after an index is recycled.
//!
//! ## Component Signatures
//!
//! Component types are identified by compact [`ComponentID`] values handed out
//! by the type registry. A [`Signature`] is a fixed-width bitset with one bit per
//! registered component type. It is used both as the per-entity record of
//! "which components does this entity currently have" and as the storage of an
//! aspect's required / excluded masks.
//!
//! The width is fixed at compile time by [`COMPONENT_CAP`]; registering more
//! component types than the mask can represent is an error, never a wrap.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::engine::error::RegistryError;


/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Globally unique entity identifier encoded as a packed 64-bit value.
pub type EntityID = u64;
/// Index of an entity slot in the allocator.
pub type IndexID = u32;
/// Generation counter used to detect stale entities.
pub type VersionID = u32;

/// Unique identifier for a system.
pub type SystemID = u16;
/// Scheduler tick counter.
pub type Tick = u64;

/// Total number of bits in an [`EntityID`].
pub const ENTITY_BITS: Bits = 64;
/// Number of bits reserved for entity versioning.
pub const VERSION_BITS: Bits = 32;
/// Number of bits reserved for the entity index.
pub const INDEX_BITS: Bits = ENTITY_BITS - VERSION_BITS;

const _: [(); 1] = [(); (INDEX_BITS > 0) as usize];
const _: [(); 1] = [(); (VERSION_BITS < ENTITY_BITS) as usize];

const fn mask(bits: Bits) -> EntityID {
    if bits == 0 { 0 } else { ((1 as EntityID) << bits) - 1 }
}

/// Mask selecting the index portion of an [`EntityID`].
pub const INDEX_MASK: EntityID = mask(INDEX_BITS);
/// Maximum number of entity slots.
pub const INDEX_CAP: IndexID = INDEX_MASK as IndexID;

/// Number of slots the entity allocator grows by when it runs out of free indices.
pub const ENTITY_GROWTH: IndexID = 1024;

/// Unique identifier for a component type (its bit position in a [`Signature`]).
pub type ComponentID = u16;

/// Maximum number of registered component types (the signature width in bits).
pub const COMPONENT_CAP: usize = 256;
/// Number of `u64` words required to represent a full component signature.
pub const SIGNATURE_SIZE: usize = (COMPONENT_CAP + 63) / 64;

const _: [(); 1] = [(); (COMPONENT_CAP <= ComponentID::MAX as usize) as usize];
const _: [(); 1] = [(); (COMPONENT_CAP % 64 == 0) as usize];

/// Returns `component_id` if it has a bit in a [`Signature`].
///
/// ## Errors
/// [`RegistryError::OutOfRange`] for ids at or beyond [`COMPONENT_CAP`].
#[inline]
pub fn check_component_id(component_id: ComponentID) -> Result<ComponentID, RegistryError> {
    if (component_id as usize) < COMPONENT_CAP {
        Ok(component_id)
    } else {
        Err(RegistryError::OutOfRange { component_id, capacity: COMPONENT_CAP })
    }
}

/// Bitset representing a set of component types.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Packed component bitset.
    pub components: [u64; SIGNATURE_SIZE],
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            components: [0u64; SIGNATURE_SIZE],
        }
    }
}

impl Signature {
    /// Creates an empty signature.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Sets the bit corresponding to `component_id`.
    ///
    /// Callers pass ids checked against [`COMPONENT_CAP`].
    #[inline]
    pub(crate) fn set(&mut self, component_id: ComponentID) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.components[index] |= 1u64 << bits;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub(crate) fn clear(&mut self, component_id: ComponentID) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.components[index] &= !(1u64 << bits);
    }

    /// Returns `true` if `component_id` is present in this signature.
    /// Ids outside the mask are never present.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.components
            .get(index)
            .is_some_and(|word| (word >> bits) & 1 == 1)
    }

    /// Returns `true` if all components in `signature` are present.
    #[inline]
    pub fn contains_all(&self, signature: &Signature) -> bool {
        self.components
            .iter()
            .zip(signature.components.iter())
            .all(|(mine, theirs)| (mine & theirs) == *theirs)
    }

    /// Returns `true` if at least one component is present in both signatures.
    #[inline]
    pub fn intersects(&self, signature: &Signature) -> bool {
        self.components
            .iter()
            .zip(signature.components.iter())
            .any(|(mine, theirs)| (mine & theirs) != 0)
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.components.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|&word| word == 0)
    }

    /// Iterates over all component IDs set in this signature, in ascending order.
    pub fn iterate_over_components(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let base = word_index * 64;
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some((base + tz) as ComponentID)
                })
            })
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(mut self, rhs: Signature) -> Signature {
        self |= rhs;
        self
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Signature) {
        for (mine, theirs) in self.components.iter_mut().zip(rhs.components.iter()) {
            *mine |= *theirs;
        }
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(mut self, rhs: Signature) -> Signature {
        for (mine, theirs) in self.components.iter_mut().zip(rhs.components.iter()) {
            *mine &= *theirs;
        }
        self
    }
}

impl TryFrom<&[ComponentID]> for Signature {
    type Error = RegistryError;

    fn try_from(component_ids: &[ComponentID]) -> Result<Self, RegistryError> {
        let mut signature = Signature::default();
        for &component_id in component_ids {
            signature.set(check_component_id(component_id)?);
        }
        Ok(signature)
    }
}

/// Prints the low bits up to the highest set bit, most significant first,
/// the way `std::bitset` prints.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(highest) = self.iterate_over_components().last() else {
            return f.write_str("0");
        };
        for component_id in (0..=highest).rev() {
            f.write_str(if self.has(component_id) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iterate_over_components()).finish()
    }
}
