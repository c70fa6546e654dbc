//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a 64-bit handle drawn from a strictly increasing
//! counter. Ids are never recycled within a run: once an entity is removed its
//! id stays retired, so a stale handle can never alias a newer entity.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A monotonic entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    ///
    /// Intended for collaborators that echo ids back (e.g. advisory
    /// commands); the id is only meaningful if it was issued by an
    /// [`IdAllocator`] in this run.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IdAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s from a monotonic counter.
///
/// Unlike a generational allocator there is no free-list: the counter only
/// moves forward, which is what makes "ids are never reassigned" hold even
/// across a dungeon reset.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create a new allocator starting at id 0.
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// # Panics
    ///
    /// Panics if the 64-bit counter is exhausted.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .expect("entity id space exhausted");
        id
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// Whether `id` was handed out by this allocator.
    pub fn was_issued(&self, id: EntityId) -> bool {
        id.0 < self.next
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
