//! # Aspect
//!
//! The admission test a system applies to an entity's component bits.
//!
//! An [`Aspect`] holds a *required* mask and an *excluded* mask. An entity
//! fits when it has every required component and none of the excluded ones.
//! Systems build their aspect once, from the component list they declare;
//! the excluded mask is empty unless a caller opts in.
//!
//! ## Typical flow
//! ```ignore
//! let mut aspect = Aspect::of::<(Position, Velocity)>(&registry)?;
//! aspect.exclude::<Frozen>(&registry)?;
//! assert!(aspect.fits(&manager.bits_of(entity)));
//! ```

use crate::engine::component::{Component, ComponentSet, TypeRegistry};
use crate::engine::error::RegistryError;
use crate::engine::types::{ComponentID, Signature, check_component_id};


/// Required and excluded component masks.
///
/// ## Invariants
/// - The empty aspect fits every bitset.
/// - Bits are only ever added; an aspect is not narrowed after construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Aspect {
    required: Signature,
    excluded: Signature,
}

impl Aspect {
    /// Creates an aspect that admits everything.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Creates an aspect requiring every type of `C`.
    pub fn of<C: ComponentSet>(registry: &TypeRegistry) -> Result<Self, RegistryError> {
        let mut aspect = Self::new();
        aspect.require_all::<C>(registry)?;
        Ok(aspect)
    }

    /// Requires `T`, registering it if needed.
    pub fn require<T: Component>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, RegistryError> {
        let component_id = registry.index_of::<T>()?;
        self.require_id(component_id)
    }

    /// Requires every type of `C`, registering them if needed.
    pub fn require_all<C: ComponentSet>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, RegistryError> {
        for component_id in C::register(registry)? {
            self.required.set(component_id);
        }
        Ok(self)
    }

    /// Excludes `T`, registering it if needed.
    pub fn exclude<T: Component>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, RegistryError> {
        let component_id = registry.index_of::<T>()?;
        self.exclude_id(component_id)
    }

    /// Excludes every type of `C`, registering them if needed.
    pub fn exclude_all<C: ComponentSet>(&mut self, registry: &TypeRegistry) -> Result<&mut Self, RegistryError> {
        for component_id in C::register(registry)? {
            self.excluded.set(component_id);
        }
        Ok(self)
    }

    /// Sets a required bit directly.
    ///
    /// ## Errors
    /// [`RegistryError::OutOfRange`] if `component_id` has no bit in the mask.
    #[inline]
    pub fn require_id(&mut self, component_id: ComponentID) -> Result<&mut Self, RegistryError> {
        self.required.set(check_component_id(component_id)?);
        Ok(self)
    }

    /// Sets an excluded bit directly.
    ///
    /// ## Errors
    /// [`RegistryError::OutOfRange`] if `component_id` has no bit in the mask.
    #[inline]
    pub fn exclude_id(&mut self, component_id: ComponentID) -> Result<&mut Self, RegistryError> {
        self.excluded.set(check_component_id(component_id)?);
        Ok(self)
    }

    /// The required mask.
    #[inline]
    pub fn required(&self) -> &Signature { &self.required }

    /// The excluded mask.
    #[inline]
    pub fn excluded(&self) -> &Signature { &self.excluded }

    /// Returns `true` if the aspect admits everything.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }

    /// Returns `true` if `bits` has every required and no excluded component.
    ///
    /// Pure; extra bits outside both masks are ignored.
    #[inline]
    pub fn fits(&self, bits: &Signature) -> bool {
        bits.contains_all(&self.required) && !bits.intersects(&self.excluded)
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.excluded.is_empty() {
            write!(f, "all({})", self.required)
        } else {
            write!(f, "all({}) none({})", self.required, self.excluded)
        }
    }
}
