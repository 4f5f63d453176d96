//! # Views
//!
//! A view composes a [`Filter`] (where candidates come from) with an
//! [`IteratorStrategy`] (which candidates are visited) over one
//! [`EntityManager`], and carries the [`Aspect`] the strategy checks against.
//!
//! ## Purpose
//! Views drive processing passes: for every visited entity they fetch the
//! requested components and hand them, in declaration order, to a
//! [`ComponentCallback`].
//!
//! ## Behavior
//! - The filter, strategy and aspect are fixed at construction.
//! - A pass over an empty admitted sequence invokes the callback zero times
//!   and touches no component storage.
//! - An admitted entity lacking a requested component aborts the pass with
//!   [`ExecutionError::MissingComponent`]; callbacks already made stand.
//! - Component columns are borrowed exclusively for the whole pass. A callback
//!   may create entities and edit components of other types, but not add or
//!   remove entities from the sequence being iterated; use deferred commands
//!   for that.
//!
//! ## Example
//! ```ignore
//! let view = CheckedAliveView::new(&manager, Aspect::of::<(Health,)>(manager.registry())?)?;
//! let visited = view.each_all::<(Health,), _>(&mut |_: Entity, health: &mut Health| {
//!     health.0 -= 1;
//! })?;
//! ```

use std::any::type_name;

use crate::engine::aspect::Aspect;
use crate::engine::component::{Component, ComponentSet, ensure_distinct};
use crate::engine::entity::Entity;
use crate::engine::error::ECSResult;
use crate::engine::filter::{AliveFilter, Filter, StorageFilter};
use crate::engine::iterator::{CheckingIterator, ForwardIterator, IteratorStrategy};
use crate::engine::manager::EntityManager;


/// Per-entity work invoked by a processing pass.
///
/// Implemented for every `FnMut(Entity, &mut A, &mut B, ...)` of up to eight
/// components, and implementable directly by system types that carry state.
pub trait ComponentCallback<C: ComponentSet> {
    /// Processes one entity's components, in declaration order.
    fn call(&mut self, entity: Entity, components: C::Refs<'_>);
}

macro_rules! impl_component_callback {
    ( $( $ty: ident ),+ ) => {
        impl<Func, $( $ty: Component ),+> ComponentCallback<($( $ty, )+)> for Func
        where
            Func: FnMut(Entity, $( &mut $ty ),+),
        {
            #[allow(non_snake_case)]
            #[inline]
            fn call(&mut self, entity: Entity, components: <($( $ty, )+) as ComponentSet>::Refs<'_>) {
                let ($( $ty, )+) = components;
                self(entity, $( $ty ),+)
            }
        }
    };
}

impl_component_callback!(A);
impl_component_callback!(A, B);
impl_component_callback!(A, B, C);
impl_component_callback!(A, B, C, D);
impl_component_callback!(A, B, C, D, E);
impl_component_callback!(A, B, C, D, E, F);
impl_component_callback!(A, B, C, D, E, F, G);
impl_component_callback!(A, B, C, D, E, F, G, H);

/// What a system needs from its view.
pub trait EntityView<'m>: Sized {
    /// Builds the view over `manager` with `aspect`.
    fn build(manager: &'m EntityManager, aspect: Aspect) -> ECSResult<Self>;

    /// The aspect candidates are checked against.
    fn aspect(&self) -> &Aspect;

    /// Runs `callback` over every admitted entity; returns how many were visited.
    fn each_all<C, Cb>(&self, callback: &mut Cb) -> ECSResult<usize>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized;

    /// Runs `callback` on `entity` without consulting filter or strategy.
    fn each_one<C, Cb>(&self, entity: Entity, callback: &mut Cb) -> ECSResult<()>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized;
}

/// Filter and iterator strategy bound to one manager and aspect.
pub struct View<'m, F, I> {
    manager: &'m EntityManager,
    filter: F,
    strategy: I,
    aspect: Aspect,
}

impl<'m, F, I> View<'m, F, I>
where
    F: Filter<'m>,
    I: IteratorStrategy,
{
    /// Creates a view. A storage-backed filter subscribes here.
    pub fn new(manager: &'m EntityManager, aspect: Aspect) -> ECSResult<Self> {
        let filter = F::new(manager)?;
        log::trace!(
            "view <{}, {}> built with aspect {}",
            type_name::<F>(),
            type_name::<I>(),
            aspect
        );
        Ok(Self { manager, filter, strategy: I::default(), aspect })
    }

    /// The aspect candidates are checked against.
    #[inline]
    pub fn aspect(&self) -> &Aspect { &self.aspect }

    /// The manager this view reads.
    #[inline]
    pub fn manager(&self) -> &'m EntityManager { self.manager }

    /// The filter supplying candidates.
    #[inline]
    pub fn filter(&self) -> &F { &self.filter }

    /// Entities a pass would visit right now, in order.
    pub fn entities(&self) -> Vec<Entity> {
        let candidates = self.filter.entities();
        self.strategy
            .iterate(&candidates, &self.aspect, self.manager)
            .collect()
    }

    /// Runs `callback` over every admitted entity, in order.
    ///
    /// Returns the number of callbacks made.
    ///
    /// ## Errors
    /// - [`ExecutionError::DuplicateComponent`] if `C` names a type twice.
    /// - [`ExecutionError::MissingComponent`] if an admitted entity lacks one
    ///   of `C`'s components.
    /// - [`ExecutionError::ComponentBorrowed`] if a column of `C` is already
    ///   borrowed by an enclosing pass.
    ///
    /// [`ExecutionError::DuplicateComponent`]: crate::engine::error::ExecutionError::DuplicateComponent
    /// [`ExecutionError::MissingComponent`]: crate::engine::error::ExecutionError::MissingComponent
    /// [`ExecutionError::ComponentBorrowed`]: crate::engine::error::ExecutionError::ComponentBorrowed
    pub fn each_all<C, Cb>(&self, callback: &mut Cb) -> ECSResult<usize>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized,
    {
        let candidates = self.filter.entities();
        let mut admitted = self
            .strategy
            .iterate(&candidates, &self.aspect, self.manager)
            .peekable();

        let Some(&first) = admitted.peek() else {
            return Ok(0);
        };

        let registry = self.manager.registry();
        ensure_distinct(&C::register(registry)?)?;
        let columns = C::columns(registry, self.manager.storage(), first)?;
        let mut guards = C::lock(&columns)?;

        let mut visited = 0;
        for entity in admitted {
            let components = C::fetch(&mut guards, entity)?;
            callback.call(entity, components);
            visited += 1;
        }
        Ok(visited)
    }

    /// Runs `callback` on `entity` alone.
    ///
    /// The filter and strategy are bypassed: the entity need not be a
    /// candidate nor fit the aspect, only carry every component of `C`.
    pub fn each_one<C, Cb>(&self, entity: Entity, callback: &mut Cb) -> ECSResult<()>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized,
    {
        let registry = self.manager.registry();
        ensure_distinct(&C::register(registry)?)?;
        let columns = C::columns(registry, self.manager.storage(), entity)?;
        let mut guards = C::lock(&columns)?;
        callback.call(entity, C::fetch(&mut guards, entity)?);
        Ok(())
    }
}

impl<'m, F, I> EntityView<'m> for View<'m, F, I>
where
    F: Filter<'m>,
    I: IteratorStrategy,
{
    fn build(manager: &'m EntityManager, aspect: Aspect) -> ECSResult<Self> {
        View::new(manager, aspect)
    }

    fn aspect(&self) -> &Aspect { &self.aspect }

    fn each_all<C, Cb>(&self, callback: &mut Cb) -> ECSResult<usize>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized,
    {
        View::each_all::<C, Cb>(self, callback)
    }

    fn each_one<C, Cb>(&self, entity: Entity, callback: &mut Cb) -> ECSResult<()>
    where
        C: ComponentSet,
        Cb: ComponentCallback<C> + ?Sized,
    {
        View::each_one::<C, Cb>(self, entity, callback)
    }
}

/// Every alive entity, unchecked.
pub type AliveView<'m> = View<'m, AliveFilter<'m>, ForwardIterator>;
/// Every alive entity that fits the aspect.
pub type CheckedAliveView<'m> = View<'m, AliveFilter<'m>, CheckingIterator>;
/// Entities added since the view was built, unchecked.
pub type StorageView<'m> = View<'m, StorageFilter<'m>, ForwardIterator>;
/// Entities added since the view was built that fit the aspect.
pub type CheckedStorageView<'m> = View<'m, StorageFilter<'m>, CheckingIterator>;
