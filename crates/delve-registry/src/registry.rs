//! The [`EntityRegistry`] -- canonical owner of every live entity.
//!
//! Each entity kind lives in its own [`Pool`]: a dense `Vec` for iteration
//! plus a sparse `HashMap<EntityId, usize>` for O(1) lookup. Removal uses
//! `swap_remove` and patches the index of the moved element, so removal is
//! O(1) as well.
//!
//! # Mutating while iterating
//!
//! The simulation step both inspects and removes entities in the same pass.
//! Callers take a snapshot of ids with [`EntityRegistry::ids`] and walk that
//! list, re-fetching each entity by id. Ids removed earlier in the pass simply
//! resolve to `None`.
//!
//! ```
//! use delve_registry::prelude::*;
//!
//! let mut registry = EntityRegistry::new();
//! let id = registry.allocate_id();
//! registry
//!     .add(Item { id, item_type: "key".to_owned(), position: Vec3::ZERO })
//!     .unwrap();
//!
//! for id in registry.ids(EntityKind::Item) {
//!     registry.remove(id);
//! }
//! assert!(registry.is_empty());
//! assert!(registry.remove(id).is_none()); // no-op, not an error
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::component::{Door, Enemy, Entity, EntityKind, EntityRef, Item, Projectile, Tracked};
use crate::entity::{EntityId, IdAllocator};
use crate::RegistryError;

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Dense storage for one entity kind.
#[derive(Debug)]
pub struct Pool<T: Tracked> {
    dense: Vec<T>,
    index: HashMap<EntityId, usize>,
}

impl<T: Tracked> Pool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, value: T) {
        let id = value.id();
        self.index.insert(id, self.dense.len());
        self.dense.push(value);
    }

    fn remove(&mut self, id: EntityId) -> Option<T> {
        let row = self.index.remove(&id)?;
        let removed = self.dense.swap_remove(row);
        // The former last element now sits at `row`.
        if let Some(moved) = self.dense.get(row) {
            self.index.insert(moved.id(), row);
        }
        Some(removed)
    }

    /// Look up by id.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.index.get(&id).map(|&row| &self.dense[row])
    }

    /// Look up by id, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let row = *self.index.get(&id)?;
        self.dense.get_mut(row)
    }

    /// Whether the pool holds `id`.
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterate in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.dense.iter()
    }

    /// Iterate mutably in storage order.
    ///
    /// Ids must not be changed through this iterator.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.dense.iter_mut()
    }

    /// Snapshot of the ids currently stored, in storage order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.dense.iter().map(Tracked::id).collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn clear(&mut self) {
        self.dense.clear();
        self.index.clear();
    }
}

impl<T: Tracked> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Owns the id allocator and one pool per entity kind.
///
/// The registry is the only place entities are created or destroyed; the
/// simulation step, the companion, and advisory commands all go through
/// [`add`](Self::add) and [`remove`](Self::remove), so they observe the same
/// invariants:
///
/// - at most one live entity per id;
/// - ids are never reassigned (the allocator survives [`clear`](Self::clear));
/// - `remove` / `get` on a missing id is a no-op.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    allocator: IdAllocator,
    enemies: Pool<Enemy>,
    items: Pool<Item>,
    projectiles: Pool<Projectile>,
    doors: Pool<Door>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id for an entity about to be added.
    pub fn allocate_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Add an entity under the id it carries.
    ///
    /// Fails if the id was never issued by this registry or is already live.
    pub fn add(&mut self, entity: impl Into<Entity>) -> Result<EntityId, RegistryError> {
        let entity = entity.into();
        let id = entity.id();
        if !self.allocator.was_issued(id) {
            warn!(%id, kind = ?entity.kind(), "rejected entity with an unissued id");
            return Err(RegistryError::NotIssued { id });
        }
        if self.contains(id) {
            warn!(%id, kind = ?entity.kind(), "rejected entity with a live id");
            return Err(RegistryError::DuplicateId { id });
        }
        match entity {
            Entity::Enemy(e) => self.enemies.insert(e),
            Entity::Item(i) => self.items.insert(i),
            Entity::Projectile(p) => self.projectiles.insert(p),
            Entity::Door(d) => self.doors.insert(d),
        }
        Ok(id)
    }

    /// Remove an entity of any kind. Missing ids return `None`.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self
            .enemies
            .remove(id)
            .map(Tracked::into_entity)
            .or_else(|| self.items.remove(id).map(Tracked::into_entity))
            .or_else(|| self.projectiles.remove(id).map(Tracked::into_entity))
            .or_else(|| self.doors.remove(id).map(Tracked::into_entity));
        if let Some(entity) = &removed {
            debug!(%id, kind = ?entity.kind(), "entity removed");
        }
        removed
    }

    /// Look up an entity of any kind.
    pub fn get(&self, id: EntityId) -> Option<EntityRef<'_>> {
        if let Some(e) = self.enemies.get(id) {
            return Some(EntityRef::Enemy(e));
        }
        if let Some(i) = self.items.get(id) {
            return Some(EntityRef::Item(i));
        }
        if let Some(p) = self.projectiles.get(id) {
            return Some(EntityRef::Projectile(p));
        }
        self.doors.get(id).map(EntityRef::Door)
    }

    /// Whether `id` is currently live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.enemies.contains(id)
            || self.items.contains(id)
            || self.projectiles.contains(id)
            || self.doors.contains(id)
    }

    /// Snapshot of the live ids of one kind, for deferred mutation.
    pub fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        match kind {
            EntityKind::Enemy => self.enemies.ids(),
            EntityKind::Item => self.items.ids(),
            EntityKind::Projectile => self.projectiles.ids(),
            EntityKind::Door => self.doors.ids(),
        }
    }

    /// Number of live entities of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Enemy => self.enemies.len(),
            EntityKind::Item => self.items.len(),
            EntityKind::Projectile => self.projectiles.len(),
            EntityKind::Door => self.doors.len(),
        }
    }

    /// Total number of live entities.
    pub fn len(&self) -> usize {
        self.enemies.len() + self.items.len() + self.projectiles.len() + self.doors.len()
    }

    /// Whether no entity is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every live entity. The id counter keeps running.
    pub fn clear(&mut self) {
        debug!(
            removed = self.len(),
            ids_issued = self.allocator.issued(),
            "registry cleared"
        );
        self.enemies.clear();
        self.items.clear();
        self.projectiles.clear();
        self.doors.clear();
    }

    /// Number of ids issued since the registry was created.
    pub fn ids_issued(&self) -> u64 {
        self.allocator.issued()
    }

    // -- typed access -------------------------------------------------------

    /// Look up an enemy.
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.get(id)
    }

    /// Look up an enemy mutably.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.get_mut(id)
    }

    /// Look up an item.
    pub fn item(&self, id: EntityId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Look up a projectile.
    pub fn projectile(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    /// Look up a projectile mutably.
    pub fn projectile_mut(&mut self, id: EntityId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(id)
    }

    /// Look up a door.
    pub fn door(&self, id: EntityId) -> Option<&Door> {
        self.doors.get(id)
    }

    /// All live enemies.
    pub fn enemies(&self) -> std::slice::Iter<'_, Enemy> {
        self.enemies.iter()
    }

    /// All live enemies, mutably.
    pub fn enemies_mut(&mut self) -> std::slice::IterMut<'_, Enemy> {
        self.enemies.iter_mut()
    }

    /// All live items.
    pub fn items(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// All live projectiles.
    pub fn projectiles(&self) -> std::slice::Iter<'_, Projectile> {
        self.projectiles.iter()
    }

    /// All live (locked) doors.
    pub fn doors(&self) -> std::slice::Iter<'_, Door> {
        self.doors.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::RoomId;
    use crate::vector::Vec3;

    fn item(registry: &mut EntityRegistry, item_type: &str) -> EntityId {
        let id = registry.allocate_id();
        registry
            .add(Item {
                id,
                item_type: item_type.to_owned(),
                position: Vec3::ZERO,
            })
            .unwrap()
    }

    fn enemy(registry: &mut EntityRegistry, health: f64) -> EntityId {
        let id = registry.allocate_id();
        registry
            .add(Enemy {
                id,
                kind: "spider".to_owned(),
                position: Vec3::ZERO,
                health,
                max_health: 20.0,
                room: RoomId(0),
                last_attack_at: None,
            })
            .unwrap()
    }

    #[test]
    fn add_then_get_by_id() {
        let mut registry = EntityRegistry::new();
        let key = item(&mut registry, "key");
        let spider = enemy(&mut registry, 20.0);

        assert_eq!(registry.get(key).map(|e| e.kind()), Some(EntityKind::Item));
        assert_eq!(registry.get(spider).map(|e| e.kind()), Some(EntityKind::Enemy));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = EntityRegistry::new();
        let key = item(&mut registry, "key");
        let err = registry
            .add(Item {
                id: key,
                item_type: "potion".to_owned(),
                position: Vec3::ZERO,
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId { id } if id == key));
        assert_eq!(registry.item(key).unwrap().item_type, "key");
    }

    #[test]
    fn unissued_id_is_rejected() {
        let mut registry = EntityRegistry::new();
        let err = registry
            .add(Item {
                id: EntityId::from_raw(7),
                item_type: "key".to_owned(),
                position: Vec3::ZERO,
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotIssued { .. }));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut registry = EntityRegistry::new();
        let key = item(&mut registry, "key");
        assert!(registry.remove(key).is_some());
        assert!(registry.remove(key).is_none());
        assert!(registry.get(key).is_none());
    }

    #[test]
    fn swap_remove_keeps_index_consistent() {
        let mut registry = EntityRegistry::new();
        let ids: Vec<EntityId> = (0..5).map(|_| item(&mut registry, "potion")).collect();

        registry.remove(ids[1]);
        for &id in ids.iter().filter(|&&id| id != ids[1]) {
            assert_eq!(registry.item(id).map(|i| i.id), Some(id));
        }
        assert_eq!(registry.count(EntityKind::Item), 4);
    }

    #[test]
    fn removal_during_id_snapshot_pass() {
        let mut registry = EntityRegistry::new();
        for h in [0.0, 5.0, 0.0, 7.0] {
            enemy(&mut registry, h);
        }
        for id in registry.ids(EntityKind::Enemy) {
            if registry.enemy(id).is_some_and(Enemy::is_dead) {
                registry.remove(id);
            }
        }
        assert_eq!(registry.count(EntityKind::Enemy), 2);
        assert!(registry.enemies().all(|e| e.health > 0.0));
    }

    #[test]
    fn remove_searches_every_pool() {
        let mut registry = EntityRegistry::new();
        let spider = enemy(&mut registry, 20.0);
        let key = item(&mut registry, "key");
        let bolt = registry.allocate_id();
        registry
            .add(Projectile {
                id: bolt,
                position: Vec3::ZERO,
                velocity: Vec3::new(1.0, 0.0, 0.0),
                created_at: 0.0,
            })
            .unwrap();

        assert_eq!(registry.remove(bolt).map(|e| e.kind()), Some(EntityKind::Projectile));
        assert_eq!(registry.remove(key).map(|e| e.kind()), Some(EntityKind::Item));
        assert_eq!(registry.remove(spider).map(|e| e.kind()), Some(EntityKind::Enemy));
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_keeps_counter_running() {
        let mut registry = EntityRegistry::new();
        let first = item(&mut registry, "key");
        registry.clear();
        assert!(registry.is_empty());
        let second = item(&mut registry, "key");
        assert!(second > first);
        assert_eq!(registry.ids_issued(), 2);
    }
}
