//! ECS System Abstractions
//!
//! A **system** pairs a fixed list of component types with a per-entity
//! callback and a view that decides which entities the callback sees.
//!
//! ## Construction
//!
//! [`System::new`] registers every requested component type, builds the
//! [`Aspect`] requiring all of them, and builds the view with that aspect. The
//! aspect is never recomputed: the set of components a system queries is fixed
//! for its lifetime.
//!
//! ## Processing
//!
//! - [`System::process_all`] runs the callback over every entity the view
//!   admits, in the view's order.
//! - [`System::process_one`] runs it on one named entity, bypassing the view's
//!   filter and strategy.
//!
//! The callback receives the entity handle followed by a mutable reference to
//! each requested component, in the exact order the types were declared.
//!
//! ## State machine
//!
//! ```text
//! Constructed --process_*--> Processing --pass ends--> Constructed
//! ```
//!
//! A pass started while another one is in flight is rejected with
//! [`ExecutionError::Reentrant`]. Both processing methods take `&mut self`,
//! which already rules this out for safe callers; the flag keeps the state
//! observable and guards callbacks reaching the system through other means.
//!
//! ## Scheduling
//!
//! [`BaseSystem`] is the object-safe face of a system, used by the
//! [`Scheduler`](crate::engine::scheduler::Scheduler) to run heterogeneous
//! systems in registration order.

use std::any::type_name;
use std::marker::PhantomData;

use crate::engine::aspect::Aspect;
use crate::engine::component::{ComponentSet, ensure_distinct};
use crate::engine::entity::Entity;
use crate::engine::error::{ECSResult, ExecutionError};
use crate::engine::manager::EntityManager;
use crate::engine::view::{ComponentCallback, EntityView};


/// Processing state of a system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SystemState {
    /// Idle; ready to process.
    #[default]
    Constructed,
    /// A pass is in flight.
    Processing,
}

/// Object-safe interface of a system.
pub trait BaseSystem {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Current processing state.
    fn state(&self) -> SystemState;

    /// The aspect the system's view checks against.
    fn aspect(&self) -> &Aspect;

    /// Runs a pass over every admitted entity; returns how many were visited.
    fn process(&mut self) -> ECSResult<usize>;

    /// Runs the callback on `entity` alone.
    fn process_entity(&mut self, entity: Entity) -> ECSResult<()>;
}

/// Generic system over components `C`, callback `D` and view `V`.
///
/// `D` is the system's per-entity function: a closure
/// `FnMut(Entity, &mut C1, &mut C2, ...)` or a type implementing
/// [`ComponentCallback<C>`] directly when the system carries state.
pub struct System<'m, D, V, C> {
    name: &'static str,
    function: D,
    view: V,
    state: SystemState,
    _marker: PhantomData<(&'m EntityManager, fn() -> C)>,
}

impl<'m, D, V, C> System<'m, D, V, C>
where
    C: ComponentSet,
    D: ComponentCallback<C>,
    V: EntityView<'m>,
{
    /// Builds a system named after its callback type.
    pub fn new(manager: &'m EntityManager, function: D) -> ECSResult<Self> {
        Self::named(type_name::<D>(), manager, function)
    }

    /// Builds a system with an explicit name.
    ///
    /// ## Errors
    /// - [`RegistryError::Exhausted`](crate::engine::error::RegistryError::Exhausted)
    ///   if a component type cannot be indexed.
    /// - [`ExecutionError::DuplicateComponent`] if `C` names a type twice.
    pub fn named(name: &'static str, manager: &'m EntityManager, function: D) -> ECSResult<Self> {
        let component_ids = C::register(manager.registry())?;
        ensure_distinct(&component_ids)?;

        let mut aspect = Aspect::new();
        for component_id in component_ids {
            aspect.require_id(component_id)?;
        }

        let view = V::build(manager, aspect)?;
        log::debug!("system `{}` constructed with aspect {}", name, aspect);

        Ok(Self {
            name,
            function,
            view,
            state: SystemState::Constructed,
            _marker: PhantomData,
        })
    }

    fn begin(&mut self) -> Result<(), ExecutionError> {
        if self.state == SystemState::Processing {
            return Err(ExecutionError::Reentrant { system: self.name });
        }
        self.state = SystemState::Processing;
        Ok(())
    }

    /// Runs the callback over every entity the view admits.
    ///
    /// Returns the number of callbacks made. On error the pass stops at the
    /// failing entity and the system returns to [`SystemState::Constructed`].
    pub fn process_all(&mut self) -> ECSResult<usize> {
        self.begin()?;
        let result = self.view.each_all::<C, D>(&mut self.function);
        self.state = SystemState::Constructed;

        if let Ok(visited) = &result {
            log::trace!("system `{}` processed {} entities", self.name, visited);
        }
        result
    }

    /// Runs the callback on `entity`, whether or not the view would admit it.
    pub fn process_one(&mut self, entity: Entity) -> ECSResult<()> {
        self.begin()?;
        let result = self.view.each_one::<C, D>(entity, &mut self.function);
        self.state = SystemState::Constructed;
        result
    }

    /// System name.
    #[inline]
    pub fn name(&self) -> &'static str { self.name }

    /// Current processing state.
    #[inline]
    pub fn state(&self) -> SystemState { self.state }

    /// The aspect computed at construction.
    #[inline]
    pub fn aspect(&self) -> &Aspect { self.view.aspect() }

    /// The view this system drives.
    #[inline]
    pub fn view(&self) -> &V { &self.view }

    /// The per-entity callback.
    #[inline]
    pub fn function(&self) -> &D { &self.function }

    /// The per-entity callback, mutably; lets callers read or reset state a
    /// callback accumulates between passes.
    #[inline]
    pub fn function_mut(&mut self) -> &mut D { &mut self.function }

    /// Consumes the system and returns its callback.
    pub fn into_function(self) -> D { self.function }
}

impl<'m, D, V, C> BaseSystem for System<'m, D, V, C>
where
    C: ComponentSet,
    D: ComponentCallback<C>,
    V: EntityView<'m>,
{
    fn name(&self) -> &'static str { self.name }

    fn state(&self) -> SystemState { self.state }

    fn aspect(&self) -> &Aspect { self.view.aspect() }

    fn process(&mut self) -> ECSResult<usize> { self.process_all() }

    fn process_entity(&mut self, entity: Entity) -> ECSResult<()> { self.process_one(entity) }
}
