//! # Iterator Strategies
//!
//! An iterator strategy turns a filter's candidate sequence into the sequence
//! of entities a view actually visits.
//!
//! * [`ForwardIterator`] visits every candidate, in order, with no checks.
//! * [`CheckingIterator`] visits, in order, only the candidates whose component
//!   bits fit the view's aspect.
//!
//! Both preserve candidate order and never yield an entity twice unless the
//! candidate sequence itself contains duplicates.

use std::iter::{Copied, FusedIterator};
use std::slice;

use crate::engine::aspect::Aspect;
use crate::engine::entity::Entity;
use crate::engine::manager::EntityManager;


/// Traversal policy over a candidate sequence.
pub trait IteratorStrategy: Default {
    /// Iterator over the admitted entities.
    type Iter<'a>: Iterator<Item = Entity>
    where
        Self: 'a;

    /// Starts a traversal of `candidates`.
    fn iterate<'a>(
        &'a self,
        candidates: &'a [Entity],
        aspect: &'a Aspect,
        manager: &'a EntityManager,
    ) -> Self::Iter<'a>;
}

/// Yields every candidate unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardIterator;

impl IteratorStrategy for ForwardIterator {
    type Iter<'a> = Copied<slice::Iter<'a, Entity>> where Self: 'a;

    #[inline]
    fn iterate<'a>(
        &'a self,
        candidates: &'a [Entity],
        _aspect: &'a Aspect,
        _manager: &'a EntityManager,
    ) -> Self::Iter<'a> {
        candidates.iter().copied()
    }
}

/// Yields only candidates whose bits fit the aspect.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckingIterator;

impl IteratorStrategy for CheckingIterator {
    type Iter<'a> = CheckedEntities<'a> where Self: 'a;

    #[inline]
    fn iterate<'a>(
        &'a self,
        candidates: &'a [Entity],
        aspect: &'a Aspect,
        manager: &'a EntityManager,
    ) -> Self::Iter<'a> {
        CheckedEntities { candidates: candidates.iter(), aspect, manager }
    }
}

/// Iterator returned by [`CheckingIterator`].
///
/// The end of the candidate sequence is tested before any bits are read, so a
/// traversal that reaches the end never inspects an entity past it.
pub struct CheckedEntities<'a> {
    candidates: slice::Iter<'a, Entity>,
    aspect: &'a Aspect,
    manager: &'a EntityManager,
}

impl Iterator for CheckedEntities<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let aspect = self.aspect;
        let manager = self.manager;
        self.candidates
            .find(|entity| aspect.fits(&manager.bits_of(**entity)))
            .copied()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.candidates.size_hint().1)
    }
}

impl FusedIterator for CheckedEntities<'_> {}
