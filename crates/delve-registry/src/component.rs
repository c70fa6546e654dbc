//! Entity shapes tracked by the registry.
//!
//! Every simulated object shares an id, a position and a kind tag; the rest
//! of the data is kind-specific. Each shape implements [`Tracked`] so the
//! registry can store it in its own dense pool.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityId;
use crate::vector::Vec3;

/// Enemy kind string reserved for the dungeon boss.
pub const BOSS_KIND: &str = "boss";

/// Item type string for keys (consumed by locked doors).
pub const KEY_ITEM: &str = "key";

/// Item type string for healing potions.
pub const POTION_ITEM: &str = "potion";

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Stable identifier of a room, as authored in the dungeon templates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// Type tag shared by all entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Hostile creature, including the boss.
    Enemy,
    /// Collectible item.
    Item,
    /// Player-cast projectile.
    Projectile,
    /// Locked door plugging a wall gap.
    Door,
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// A hostile creature.
///
/// The behaviour phase is not stored; it is derived from
/// [`health_fraction`](Self::health_fraction) whenever AI runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Unique id.
    pub id: EntityId,
    /// Kind string from the template (`"spider"`, `"boss"`, ...).
    pub kind: String,
    /// World position.
    pub position: Vec3,
    /// Current health, always within `[0, max_health]`.
    pub health: f64,
    /// Health at spawn.
    pub max_health: f64,
    /// Room the enemy was spawned in. Lookup only.
    pub room: RoomId,
    /// Simulation time of the last melee hit, if any.
    pub last_attack_at: Option<f64>,
}

impl Enemy {
    /// Whether this enemy is the dungeon boss.
    pub fn is_boss(&self) -> bool {
        self.kind == BOSS_KIND
    }

    /// Remaining health as a fraction of max health (`0.0` if max is zero).
    pub fn health_fraction(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    /// Subtract `amount` from health, clamping at zero. Returns the new health.
    pub fn apply_damage(&mut self, amount: f64) -> f64 {
        self.health = (self.health - amount.max(0.0)).clamp(0.0, self.max_health);
        self.health
    }

    /// Whether health has reached zero.
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// A collectible item lying in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id.
    pub id: EntityId,
    /// Item type string (`"key"`, `"potion"`, ...).
    pub item_type: String,
    /// World position.
    pub position: Vec3,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique id.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Velocity in units per second.
    pub velocity: Vec3,
    /// Simulation time the projectile was cast.
    pub created_at: f64,
}

impl Projectile {
    /// Seconds the projectile has existed at simulation time `now`.
    pub fn age(&self, now: f64) -> f64 {
        (now - self.created_at).max(0.0)
    }
}

/// A door plugging the gap between two rooms.
///
/// Only locked doors live in the registry; unlocking removes the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    /// Unique id.
    pub id: EntityId,
    /// Centre of the door on the wall line.
    pub position: Vec3,
    /// Room whose template declared the door.
    pub room: RoomId,
    /// Room the door leads to.
    pub target: RoomId,
    /// Whether the door blocks movement.
    pub locked: bool,
    /// Half-extent of the collider along x.
    pub half_width: f64,
    /// Half-extent of the collider along z.
    pub half_depth: f64,
}

impl Door {
    /// Whether this door connects `room` to anything (either side).
    pub fn touches(&self, room: RoomId) -> bool {
        self.room == room || self.target == room
    }
}

// ---------------------------------------------------------------------------
// Entity / EntityRef
// ---------------------------------------------------------------------------

/// An owned entity of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Entity {
    /// See [`Enemy`].
    Enemy(Enemy),
    /// See [`Item`].
    Item(Item),
    /// See [`Projectile`].
    Projectile(Projectile),
    /// See [`Door`].
    Door(Door),
}

impl Entity {
    /// The entity's id.
    pub fn id(&self) -> EntityId {
        self.as_ref().id()
    }

    /// The entity's kind tag.
    pub fn kind(&self) -> EntityKind {
        self.as_ref().kind()
    }

    /// The entity's position.
    pub fn position(&self) -> Vec3 {
        self.as_ref().position()
    }

    /// Borrow as an [`EntityRef`].
    pub fn as_ref(&self) -> EntityRef<'_> {
        match self {
            Entity::Enemy(e) => EntityRef::Enemy(e),
            Entity::Item(i) => EntityRef::Item(i),
            Entity::Projectile(p) => EntityRef::Projectile(p),
            Entity::Door(d) => EntityRef::Door(d),
        }
    }
}

/// A borrowed entity of any kind, returned by [`EntityRegistry::get`](crate::registry::EntityRegistry::get).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    /// See [`Enemy`].
    Enemy(&'a Enemy),
    /// See [`Item`].
    Item(&'a Item),
    /// See [`Projectile`].
    Projectile(&'a Projectile),
    /// See [`Door`].
    Door(&'a Door),
}

impl EntityRef<'_> {
    /// The entity's id.
    pub fn id(&self) -> EntityId {
        match self {
            EntityRef::Enemy(e) => e.id,
            EntityRef::Item(i) => i.id,
            EntityRef::Projectile(p) => p.id,
            EntityRef::Door(d) => d.id,
        }
    }

    /// The entity's kind tag.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Enemy(_) => EntityKind::Enemy,
            EntityRef::Item(_) => EntityKind::Item,
            EntityRef::Projectile(_) => EntityKind::Projectile,
            EntityRef::Door(_) => EntityKind::Door,
        }
    }

    /// The entity's position.
    pub fn position(&self) -> Vec3 {
        match self {
            EntityRef::Enemy(e) => e.position,
            EntityRef::Item(i) => i.position,
            EntityRef::Projectile(p) => p.position,
            EntityRef::Door(d) => d.position,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracked
// ---------------------------------------------------------------------------

/// Implemented by every entity shape so it can live in a registry pool.
pub trait Tracked: Sized {
    /// Kind tag of this shape.
    const KIND: EntityKind;

    /// The entity's id.
    fn id(&self) -> EntityId;

    /// Wrap into the owned [`Entity`] enum.
    fn into_entity(self) -> Entity;
}

macro_rules! impl_tracked {
    ($ty:ident) => {
        impl Tracked for $ty {
            const KIND: EntityKind = EntityKind::$ty;

            fn id(&self) -> EntityId {
                self.id
            }

            fn into_entity(self) -> Entity {
                Entity::$ty(self)
            }
        }

        impl From<$ty> for Entity {
            fn from(value: $ty) -> Self {
                Entity::$ty(value)
            }
        }
    };
}

impl_tracked!(Enemy);
impl_tracked!(Item);
impl_tracked!(Projectile);
impl_tracked!(Door);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spider(health: f64) -> Enemy {
        Enemy {
            id: EntityId::from_raw(1),
            kind: "spider".to_owned(),
            position: Vec3::ZERO,
            health,
            max_health: 20.0,
            room: RoomId(0),
            last_attack_at: None,
        }
    }

    #[test]
    fn damage_clamps_at_zero() {
        let mut e = spider(5.0);
        assert_eq!(e.apply_damage(10.0), 0.0);
        assert!(e.is_dead());
    }

    #[test]
    fn negative_damage_is_ignored() {
        let mut e = spider(5.0);
        assert_eq!(e.apply_damage(-10.0), 5.0);
    }

    #[test]
    fn health_fraction_and_boss_flag() {
        let mut e = spider(10.0);
        assert!((e.health_fraction() - 0.5).abs() < 1e-12);
        assert!(!e.is_boss());
        e.kind = BOSS_KIND.to_owned();
        assert!(e.is_boss());
    }

    #[test]
    fn entity_ref_reports_kind_and_id() {
        let entity: Entity = spider(20.0).into();
        assert_eq!(entity.kind(), EntityKind::Enemy);
        assert_eq!(entity.id(), EntityId::from_raw(1));
    }

    #[test]
    fn door_touches_both_sides() {
        let door = Door {
            id: EntityId::from_raw(9),
            position: Vec3::ZERO,
            room: RoomId(1),
            target: RoomId(2),
            locked: true,
            half_width: 1.0,
            half_depth: 0.25,
        };
        assert!(door.touches(RoomId(1)));
        assert!(door.touches(RoomId(2)));
        assert!(!door.touches(RoomId(3)));
    }

    #[test]
    fn enemy_entity_survives_json() {
        let entity: Entity = spider(12.0).into();
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entity"], "enemy");
        assert_eq!(json["kind"], "spider");

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn every_entity_kind_survives_json() {
        let entities: Vec<Entity> = vec![
            spider(20.0).into(),
            Item {
                id: EntityId::from_raw(2),
                item_type: KEY_ITEM.to_owned(),
                position: Vec3::new(1.0, 0.0, 2.0),
            }
            .into(),
        ];
        let text = serde_json::to_string(&entities).unwrap();
        let back: Vec<Entity> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entities);
    }
}
