//! Authored room templates.
//!
//! A [`DungeonTemplates`] value is the static description of a dungeon:
//! every room's size, the enemies and items it starts with, and its door
//! links. World positions are not authored; the
//! [`LayoutEngine`](crate::layout::LayoutEngine) derives them.
//!
//! Templates load from JSON in the level format the game has always used
//! (`"to"` for the target room, `"type"` for kinds). Fields the simulation
//! does not use, such as puzzle descriptions, are ignored.
//!
//! ```
//! use delve_engine::templates::{DungeonTemplates, RoomType};
//!
//! let templates = DungeonTemplates::from_json(r#"{
//!     "rooms": [
//!         { "id": 0, "type": "start", "size": [10, 10] }
//!     ]
//! }"#).unwrap();
//! assert_eq!(templates.rooms[0].room_type, RoomType::Start);
//! ```

use std::fmt;

use delve_registry::prelude::{RoomId, Vec3, BOSS_KIND, KEY_ITEM};
use serde::{Deserialize, Serialize};

/// The role a room plays in the dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// Where the player spawns. Exactly one per dungeon.
    Start,
    /// Holds keys and locked doors.
    Puzzle,
    /// Regular enemies.
    Combat,
    /// Holds the boss.
    Boss,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Puzzle => "puzzle",
            Self::Combat => "combat",
            Self::Boss => "boss",
        };
        f.write_str(name)
    }
}

/// An enemy or item placed at a room-local offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    /// Enemy kind or item type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset from the room centre.
    pub position: Vec3,
}

impl SpawnSpec {
    /// Shorthand constructor.
    pub fn new(kind: impl Into<String>, position: impl Into<Vec3>) -> Self {
        Self {
            kind: kind.into(),
            position: position.into(),
        }
    }
}

/// A directed link from one room to another through a door in its wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorLink {
    /// Room on the other side.
    #[serde(rename = "to")]
    pub target: RoomId,
    /// Door centre relative to the room centre. Must lie on a wall.
    #[serde(rename = "position")]
    pub offset: Vec3,
    /// Locked doors block movement until unlocked with a key.
    #[serde(default)]
    pub locked: bool,
}

impl DoorLink {
    /// An unlocked link.
    pub fn open(target: u32, offset: impl Into<Vec3>) -> Self {
        Self {
            target: RoomId(target),
            offset: offset.into(),
            locked: false,
        }
    }

    /// A locked link.
    pub fn locked(target: u32, offset: impl Into<Vec3>) -> Self {
        Self {
            locked: true,
            ..Self::open(target, offset)
        }
    }
}

/// The authored description of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTemplate {
    /// Unique room id.
    pub id: RoomId,
    /// Room role.
    #[serde(rename = "type")]
    pub room_type: RoomType,
    /// `[width, depth]` along x and z.
    pub size: [f64; 2],
    /// Enemies spawned at build time and on reset.
    #[serde(default)]
    pub enemies: Vec<SpawnSpec>,
    /// Items spawned at build time and on reset.
    #[serde(default)]
    pub items: Vec<SpawnSpec>,
    /// Door links in declaration order.
    #[serde(default)]
    pub doors: Vec<DoorLink>,
}

impl RoomTemplate {
    /// An empty room of the given type and size.
    pub fn new(id: u32, room_type: RoomType, width: f64, depth: f64) -> Self {
        Self {
            id: RoomId(id),
            room_type,
            size: [width, depth],
            enemies: Vec::new(),
            items: Vec::new(),
            doors: Vec::new(),
        }
    }

    /// Builder: add an enemy.
    pub fn with_enemy(mut self, kind: &str, position: impl Into<Vec3>) -> Self {
        self.enemies.push(SpawnSpec::new(kind, position));
        self
    }

    /// Builder: add an item.
    pub fn with_item(mut self, item_type: &str, position: impl Into<Vec3>) -> Self {
        self.items.push(SpawnSpec::new(item_type, position));
        self
    }

    /// Builder: add a door link.
    pub fn with_door(mut self, door: DoorLink) -> Self {
        self.doors.push(door);
        self
    }

    /// Extent along x.
    pub fn width(&self) -> f64 {
        self.size[0]
    }

    /// Extent along z.
    pub fn depth(&self) -> f64 {
        self.size[1]
    }
}

/// A full dungeon description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonTemplates {
    /// Rooms in authoring order. Order is preserved in the built dungeon.
    pub rooms: Vec<RoomTemplate>,
}

impl DungeonTemplates {
    /// Parse templates from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Look up a room template by id.
    pub fn room(&self, id: RoomId) -> Option<&RoomTemplate> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// The shipped four-room dungeon: a start room with two spiders, a
    /// puzzle room holding the key and a locked door north, a combat room
    /// with two shadows and a 15x15 boss room.
    pub fn default_dungeon() -> Self {
        let start = RoomTemplate::new(0, RoomType::Start, 10.0, 10.0)
            .with_enemy("spider", [2.0, 0.5, 2.0])
            .with_enemy("spider", [-2.0, 0.5, -2.0])
            .with_door(DoorLink::open(1, [5.0, 0.0, 0.0]));

        let puzzle = RoomTemplate::new(1, RoomType::Puzzle, 10.0, 10.0)
            .with_item(KEY_ITEM, [0.0, 0.5, 0.0])
            .with_door(DoorLink::open(0, [-5.0, 0.0, 0.0]))
            .with_door(DoorLink::locked(2, [0.0, 0.0, 5.0]));

        let combat = RoomTemplate::new(2, RoomType::Combat, 10.0, 10.0)
            .with_enemy("shadow", [3.0, 0.5, 3.0])
            .with_enemy("shadow", [-3.0, 0.5, -3.0])
            .with_door(DoorLink::open(1, [0.0, 0.0, -5.0]))
            .with_door(DoorLink::open(3, [5.0, 0.0, 0.0]));

        let boss = RoomTemplate::new(3, RoomType::Boss, 15.0, 15.0)
            .with_enemy(BOSS_KIND, [0.0, 0.5, 0.0])
            .with_door(DoorLink::open(2, [-7.5, 0.0, 0.0]));

        Self {
            rooms: vec![start, puzzle, combat, boss],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dungeon_shape() {
        let d = DungeonTemplates::default_dungeon();
        assert_eq!(d.rooms.len(), 4);
        assert_eq!(
            d.rooms.iter().filter(|r| r.room_type == RoomType::Start).count(),
            1
        );
        let puzzle = d.room(RoomId(1)).unwrap();
        assert_eq!(puzzle.items[0].kind, "key");
        assert!(puzzle.doors.iter().any(|l| l.locked && l.target == RoomId(2)));
        assert_eq!(d.room(RoomId(3)).unwrap().size, [15.0, 15.0]);
    }

    #[test]
    fn level_json_format_with_ignored_fields() {
        let json = r#"{
            "rooms": [
                {
                    "id": 1,
                    "type": "puzzle",
                    "size": [10, 10],
                    "items": [ { "type": "key", "position": [0, 0.5, 0] } ],
                    "puzzles": [ { "type": "pressure_plate", "position": [2, 0, 2] } ],
                    "doors": [ { "to": 2, "position": [0, 0, 5], "locked": true } ]
                }
            ]
        }"#;
        let t = DungeonTemplates::from_json(json).unwrap();
        let room = &t.rooms[0];
        assert_eq!(room.room_type, RoomType::Puzzle);
        assert_eq!(room.width(), 10.0);
        assert!(room.enemies.is_empty());
        assert_eq!(room.doors[0], DoorLink::locked(2, [0.0, 0.0, 5.0]));
    }

    #[test]
    fn door_lock_defaults_to_open() {
        let link: DoorLink = serde_json::from_str(r#"{ "to": 3, "position": [5, 0, 0] }"#).unwrap();
        assert!(!link.locked);
    }

    #[test]
    fn unknown_room_type_is_rejected() {
        let json = r#"{ "rooms": [ { "id": 0, "type": "treasure", "size": [4, 4] } ] }"#;
        assert!(DungeonTemplates::from_json(json).is_err());
    }
}
