//! Delve Registry -- id allocation and typed entity storage for the dungeon
//! simulation.
//!
//! This crate owns the shapes of every simulated object (enemies, items,
//! projectiles, locked doors) and the [`EntityRegistry`](registry::EntityRegistry)
//! that stores them. Ids come from a monotonic counter and are never reused,
//! so a handle held by an external collaborator can go stale but can never
//! point at the wrong entity.
//!
//! # Quick Start
//!
//! ```
//! use delve_registry::prelude::*;
//!
//! let mut registry = EntityRegistry::new();
//! let id = registry.allocate_id();
//! registry
//!     .add(Enemy {
//!         id,
//!         kind: "spider".to_owned(),
//!         position: Vec3::new(2.0, 0.5, 2.0),
//!         health: 20.0,
//!         max_health: 20.0,
//!         room: RoomId(0),
//!         last_attack_at: None,
//!     })
//!     .unwrap();
//!
//! assert_eq!(registry.enemy(id).map(|e| e.health), Some(20.0));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod registry;
pub mod vector;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by registry operations.
///
/// Lookups and removals of missing ids are deliberately not errors; only
/// attempts to break the one-entity-per-id invariant are.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An entity with this id is already live.
    #[error("entity {id} is already registered")]
    DuplicateId {
        /// The conflicting id.
        id: entity::EntityId,
    },

    /// The id was never handed out by this registry's allocator.
    #[error("entity id {id} was not issued by this registry")]
    NotIssued {
        /// The foreign id.
        id: entity::EntityId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        Door, Enemy, Entity, EntityKind, EntityRef, Item, Projectile, RoomId, Tracked, BOSS_KIND,
        KEY_ITEM, POTION_ITEM,
    };
    pub use crate::entity::{EntityId, IdAllocator};
    pub use crate::registry::{EntityRegistry, Pool};
    pub use crate::vector::Vec3;
    pub use crate::RegistryError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
