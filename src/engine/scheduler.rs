//! World step: run systems, then settle structural changes.
//!
//! This module is responsible for:
//! * running registered systems one after another, in registration order,
//! * applying deferred commands at the synchronization points between them,
//! * burying entities removed during the tick,
//! * counting ticks.
//!
//! ## Structural synchronization
//!
//! Deferred commands are applied:
//! * **before** each system runs,
//! * **after** the last system completes.
//!
//! so every system observes the structural changes requested by the ones that
//! ran before it.

use crate::engine::error::ECSResult;
use crate::engine::manager::EntityManager;
use crate::engine::systems::BaseSystem;
use crate::engine::types::{SystemID, Tick};


/// Summary of one [`Scheduler::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick that just completed, starting at 1.
    pub tick: Tick,
    /// Callbacks made across all systems.
    pub processed: usize,
    /// Deferred commands applied.
    pub commands: usize,
    /// Entities destroyed by burial.
    pub buried: usize,
}

/// Ordered list of systems sharing one entity manager.
pub struct Scheduler<'m> {
    manager: &'m EntityManager,
    systems: Vec<Box<dyn BaseSystem + 'm>>,
    tick: Tick,
}

impl<'m> Scheduler<'m> {
    /// Creates an empty scheduler over `manager`.
    pub fn new(manager: &'m EntityManager) -> Self {
        Self { manager, systems: Vec::new(), tick: 0 }
    }

    /// Appends a system; returns its position in the run order.
    pub fn add_system(&mut self, system: impl BaseSystem + 'm) -> SystemID {
        let id = self.systems.len() as SystemID;
        log::debug!("scheduled system `{}` as #{}", system.name(), id);
        self.systems.push(Box::new(system));
        id
    }

    /// Returns the system at `id`.
    pub fn system(&self, id: SystemID) -> Option<&(dyn BaseSystem + 'm)> {
        self.systems.get(id as usize).map(|system| system.as_ref())
    }

    /// Number of scheduled systems.
    #[inline]
    pub fn len(&self) -> usize { self.systems.len() }

    /// Returns `true` if no system is scheduled.
    #[inline]
    pub fn is_empty(&self) -> bool { self.systems.is_empty() }

    /// Number of completed ticks.
    #[inline]
    pub fn tick(&self) -> Tick { self.tick }

    /// Runs one tick.
    ///
    /// The first error aborts the tick; the tick counter is not advanced.
    pub fn run(&mut self) -> ECSResult<TickReport> {
        let mut report = TickReport::default();

        for system in self.systems.iter_mut() {
            report.commands += self.manager.apply_deferred_commands()?;
            report.processed += system.process()?;
        }
        report.commands += self.manager.apply_deferred_commands()?;
        report.buried = self.manager.bury_dead()?;

        self.tick += 1;
        report.tick = self.tick;
        log::trace!(
            "tick {} done: {} processed, {} commands, {} buried",
            report.tick,
            report.processed,
            report.commands,
            report.buried
        );
        Ok(report)
    }

    /// Runs `ticks` ticks and returns the last report.
    pub fn run_for(&mut self, ticks: Tick) -> ECSResult<TickReport> {
        let mut report = TickReport { tick: self.tick, ..TickReport::default() };
        for _ in 0..ticks {
            report = self.run()?;
        }
        Ok(report)
    }
}
