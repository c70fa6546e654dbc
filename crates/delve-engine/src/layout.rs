//! Dungeon layout synthesis.
//!
//! The [`LayoutEngine`] turns [`DungeonTemplates`] into a placed
//! [`Dungeon`]:
//!
//! 1. The templates are validated (exactly one start room, unique ids, door
//!    targets exist, every door sits on a wall).
//! 2. Rooms are placed breadth-first from the start room at the origin. A
//!    room reached through a door on its parent's east wall is placed
//!    edge-to-edge to the east, and so on for the other walls. On the
//!    perpendicular axis the neighbour shifts so that its door back lines up
//!    with the parent's door.
//! 3. Every room wall becomes one or more solid [`WallSegment`]s, with a gap
//!    wide enough for the player centred on each door.
//!
//! Layout is all-or-nothing: any problem yields a [`LayoutError`] naming the
//! room, and no partial dungeon is produced.
//!
//! # Example
//!
//! ```
//! use delve_engine::layout::{LayoutEngine, LayoutParams};
//! use delve_engine::templates::DungeonTemplates;
//! use delve_registry::prelude::*;
//!
//! let engine = LayoutEngine::new(LayoutParams::default());
//! let dungeon = engine.build(&DungeonTemplates::default_dungeon()).unwrap();
//!
//! // The puzzle room sits directly east of the start room.
//! let puzzle = dungeon.room(RoomId(1)).unwrap();
//! assert_eq!(puzzle.position, Vec3::new(10.0, 0.0, 0.0));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use delve_registry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::templates::{DoorLink, DungeonTemplates, RoomTemplate, RoomType};

/// Tolerance for "this offset lies on that wall" and degenerate intervals.
const EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a dungeon cannot be built. Every variant that concerns a room
/// names it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// No template has type `start`.
    #[error("no room has type 'start'")]
    NoStartRoom,

    /// More than one template has type `start`.
    #[error("{second} is a second start room ({first} is already one)")]
    MultipleStartRooms {
        /// The first start room found.
        first: RoomId,
        /// The offending extra start room.
        second: RoomId,
    },

    /// Two templates share an id.
    #[error("{room} is declared more than once")]
    DuplicateRoom {
        /// The repeated id.
        room: RoomId,
    },

    /// A room's width or depth is not a positive finite number.
    #[error("{room} has invalid size {width} x {depth}")]
    InvalidSize {
        /// The offending room.
        room: RoomId,
        /// Declared width.
        width: f64,
        /// Declared depth.
        depth: f64,
    },

    /// A door links to a room id that no template declares.
    #[error("{room} has a door to {target}, which does not exist")]
    MissingRoom {
        /// Room owning the door.
        room: RoomId,
        /// Unknown target.
        target: RoomId,
    },

    /// A door offset is not on any of the room's four walls.
    #[error("{room} has a door to {target} at ({x}, {z}) that is not on a wall")]
    DoorOffWall {
        /// Room owning the door.
        room: RoomId,
        /// Door target.
        target: RoomId,
        /// Local x offset.
        x: f64,
        /// Local z offset.
        z: f64,
    },

    /// A room cannot be reached from the start room through door links.
    #[error("{room} is not reachable from the start room")]
    Disconnected {
        /// The unreachable room.
        room: RoomId,
    },

    /// Two placed rooms overlap.
    #[error("{room} overlaps {other}")]
    Overlap {
        /// The room placed later.
        room: RoomId,
        /// The room it overlaps.
        other: RoomId,
    },
}

// ---------------------------------------------------------------------------
// Geometry types
// ---------------------------------------------------------------------------

/// One of a room's four walls. North is +z, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallSide {
    /// +z
    North,
    /// -z
    South,
    /// +x
    East,
    /// -x
    West,
}

impl WallSide {
    /// All four sides in a fixed order.
    pub const ALL: [WallSide; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// The wall facing this one across a shared boundary.
    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    /// Whether the wall runs along the x axis.
    pub fn runs_along_x(self) -> bool {
        matches!(self, Self::North | Self::South)
    }

    /// Coordinate of `offset` along this wall.
    fn along(self, offset: Vec3) -> f64 {
        if self.runs_along_x() {
            offset.x
        } else {
            offset.z
        }
    }
}

/// Determine which wall of a `width` x `depth` room a door offset lies on.
///
/// Corners resolve to the first matching side in [`WallSide::ALL`] order.
pub fn wall_side(width: f64, depth: f64, offset: Vec3) -> Option<WallSide> {
    let (hw, hd) = (width / 2.0, depth / 2.0);
    let within_x = offset.x.abs() <= hw + EPSILON;
    let within_z = offset.z.abs() <= hd + EPSILON;
    WallSide::ALL.into_iter().find(|side| match side {
        WallSide::North => (offset.z - hd).abs() <= EPSILON && within_x,
        WallSide::South => (offset.z + hd).abs() <= EPSILON && within_x,
        WallSide::East => (offset.x - hw).abs() <= EPSILON && within_z,
        WallSide::West => (offset.x + hw).abs() <= EPSILON && within_z,
    })
}

/// Split a wall of `length` (centred on 0) into solid intervals around gaps
/// of `gap_width` centred on each of `gap_centres`.
///
/// Gaps may overlap each other or run past the wall ends; both are clamped.
pub fn wall_intervals(length: f64, gap_centres: &[f64], gap_width: f64) -> Vec<(f64, f64)> {
    let half = length / 2.0;
    let mut gaps: Vec<(f64, f64)> = gap_centres
        .iter()
        .map(|&c| (c - gap_width / 2.0, c + gap_width / 2.0))
        .collect();
    gaps.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut solid = Vec::with_capacity(gaps.len() + 1);
    let mut cursor = -half;
    for (lo, hi) in gaps {
        let end = lo.min(half);
        if end - cursor > EPSILON {
            solid.push((cursor, end));
        }
        cursor = cursor.max(hi);
    }
    if half - cursor > EPSILON {
        solid.push((cursor, half));
    }
    solid
}

/// A solid, axis-aligned wall box in the x/z plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    /// Room whose wall this is.
    pub room: RoomId,
    /// Which wall.
    pub side: WallSide,
    /// Box centre (y is 0).
    pub center: Vec3,
    /// Half extent along x.
    pub half_width: f64,
    /// Half extent along z.
    pub half_depth: f64,
}

/// A placed room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room id.
    pub id: RoomId,
    /// Room role.
    pub room_type: RoomType,
    /// Extent along x.
    pub width: f64,
    /// Extent along z.
    pub depth: f64,
    /// World position of the room centre.
    pub position: Vec3,
    /// Door links. Only `locked` changes after layout.
    pub doors: Vec<DoorLink>,
}

impl Room {
    /// Whether the planar point lies strictly inside the room footprint.
    pub fn contains(&self, point: Vec3) -> bool {
        self.contains_with_margin(point, 0.0)
    }

    /// Like [`contains`](Self::contains) with the footprint grown by `margin`
    /// on every side.
    pub fn contains_with_margin(&self, point: Vec3, margin: f64) -> bool {
        (point.x - self.position.x).abs() < self.width / 2.0 + margin
            && (point.z - self.position.z).abs() < self.depth / 2.0 + margin
    }

    /// Whether any door link of this room is locked.
    pub fn has_locked_door(&self) -> bool {
        self.doors.iter().any(|d| d.locked)
    }

    fn overlaps(&self, other: &Room) -> bool {
        (self.position.x - other.position.x).abs() < (self.width + other.width) / 2.0 - EPSILON
            && (self.position.z - other.position.z).abs()
                < (self.depth + other.depth) / 2.0 - EPSILON
    }
}

// ---------------------------------------------------------------------------
// LayoutParams
// ---------------------------------------------------------------------------

/// Geometry constants the layout needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Nominal door opening.
    pub door_width: f64,
    /// Player clearance added to each side of a door opening.
    pub player_radius: f64,
    /// Wall and door collider thickness.
    pub wall_thickness: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

impl LayoutParams {
    /// Take the layout constants out of a full config.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            door_width: config.layout.door_width,
            player_radius: config.player.radius,
            wall_thickness: config.layout.wall_thickness,
        }
    }

    /// Full width of the gap cut into a wall for one door.
    pub fn gap_width(&self) -> f64 {
        self.door_width + 2.0 * self.player_radius
    }
}

// ---------------------------------------------------------------------------
// Dungeon
// ---------------------------------------------------------------------------

/// The result of layout: placed rooms and wall geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    rooms: Vec<Room>,
    walls: Vec<WallSegment>,
    params: LayoutParams,
}

impl Dungeon {
    /// Rooms in template order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Look up a room by id.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// The first room whose footprint strictly contains `point`.
    pub fn room_at(&self, point: Vec3) -> Option<&Room> {
        self.rooms.iter().find(|r| r.contains(point))
    }

    /// All solid wall segments.
    pub fn walls(&self) -> &[WallSegment] {
        &self.walls
    }

    /// The constants the dungeon was built with.
    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Whether a locked door is owned by or leads to `room`.
    pub fn has_locked_door_touching(&self, room: RoomId) -> bool {
        self.rooms.iter().any(|r| {
            r.doors
                .iter()
                .any(|d| d.locked && (r.id == room || d.target == room))
        })
    }

    /// Set the lock flag on every link between `a` and `b`, in either
    /// direction. Returns how many links changed.
    pub fn set_link_locked(&mut self, a: RoomId, b: RoomId, locked: bool) -> usize {
        let mut changed = 0;
        for room in &mut self.rooms {
            for door in &mut room.doors {
                let joins = (room.id == a && door.target == b) || (room.id == b && door.target == a);
                if joins && door.locked != locked {
                    door.locked = locked;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Collider half extents `(x, z)` for a door on `side`.
    pub fn door_half_extents(&self, side: WallSide) -> (f64, f64) {
        let along = self.params.gap_width() / 2.0;
        let across = self.params.wall_thickness / 2.0;
        if side.runs_along_x() {
            (along, across)
        } else {
            (across, along)
        }
    }

    /// Restore every door lock flag to its template value.
    pub fn restore_locks(&mut self, templates: &DungeonTemplates) {
        for room in &mut self.rooms {
            if let Some(template) = templates.room(room.id) {
                room.doors.clone_from(&template.doors);
            }
        }
    }

    /// Register the template enemies, items and locked doors of every room.
    ///
    /// Entities land at `room.position + local offset`. Returns the id of the
    /// boss, if the templates contain one.
    pub fn populate(
        &self,
        templates: &DungeonTemplates,
        registry: &mut EntityRegistry,
        config: &SimConfig,
    ) -> Result<Option<EntityId>, RegistryError> {
        let mut boss = None;
        for room in &self.rooms {
            let Some(template) = templates.room(room.id) else {
                continue;
            };

            for spec in &template.enemies {
                let is_boss = spec.kind == BOSS_KIND;
                let max_health = if is_boss {
                    config.boss.max_health
                } else {
                    config.enemy.max_health
                };
                let id = registry.allocate_id();
                registry.add(Enemy {
                    id,
                    kind: spec.kind.clone(),
                    position: room.position + spec.position,
                    health: max_health,
                    max_health,
                    room: room.id,
                    last_attack_at: None,
                })?;
                if is_boss {
                    boss = Some(id);
                }
            }

            for spec in &template.items {
                let id = registry.allocate_id();
                registry.add(Item {
                    id,
                    item_type: spec.kind.clone(),
                    position: room.position + spec.position,
                })?;
            }

            for link in room.doors.iter().filter(|d| d.locked) {
                // Validated during layout.
                let Some(side) = wall_side(room.width, room.depth, link.offset) else {
                    continue;
                };
                let (half_width, half_depth) = self.door_half_extents(side);
                let id = registry.allocate_id();
                registry.add(Door {
                    id,
                    position: room.position + link.offset,
                    room: room.id,
                    target: link.target,
                    locked: true,
                    half_width,
                    half_depth,
                })?;
            }
        }
        Ok(boss)
    }
}

// ---------------------------------------------------------------------------
// LayoutEngine
// ---------------------------------------------------------------------------

/// Places room templates and derives wall geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    params: LayoutParams,
}

impl LayoutEngine {
    /// Create an engine with the given geometry constants.
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    /// Validate, place and wall the templates.
    pub fn build(&self, templates: &DungeonTemplates) -> Result<Dungeon, LayoutError> {
        let positions = self.place(templates)?;

        let rooms: Vec<Room> = templates
            .rooms
            .iter()
            .map(|t| Room {
                id: t.id,
                room_type: t.room_type,
                width: t.width(),
                depth: t.depth(),
                // place() positions every room or fails.
                position: positions.get(&t.id).copied().unwrap_or(Vec3::ZERO),
                doors: t.doors.clone(),
            })
            .collect();

        for (i, room) in rooms.iter().enumerate() {
            if let Some(other) = rooms[..i].iter().find(|o| o.overlaps(room)) {
                return Err(LayoutError::Overlap {
                    room: room.id,
                    other: other.id,
                });
            }
        }

        let walls = rooms.iter().flat_map(|r| self.wall_segments(r)).collect();
        tracing::debug!(rooms = rooms.len(), "dungeon layout built");
        Ok(Dungeon {
            rooms,
            walls,
            params: self.params,
        })
    }

    /// Breadth-first room placement. Returns one world position per room.
    pub fn place(
        &self,
        templates: &DungeonTemplates,
    ) -> Result<HashMap<RoomId, Vec3>, LayoutError> {
        let by_id = validate(templates)?;
        let start = find_start(templates)?;

        let mut positions = HashMap::with_capacity(templates.rooms.len());
        let mut queue = VecDeque::new();
        positions.insert(start.id, Vec3::ZERO);
        queue.push_back(start);

        while let Some(room) = queue.pop_front() {
            let origin = positions[&room.id];
            for link in &room.doors {
                if positions.contains_key(&link.target) {
                    continue;
                }
                let neighbour = by_id[&link.target];
                let position = neighbour_position(room, origin, link, neighbour);
                positions.insert(neighbour.id, position);
                queue.push_back(neighbour);
            }
        }

        if let Some(lost) = templates.rooms.iter().find(|r| !positions.contains_key(&r.id)) {
            return Err(LayoutError::Disconnected { room: lost.id });
        }
        Ok(positions)
    }

    /// Solid wall boxes for one placed room.
    pub fn wall_segments(&self, room: &Room) -> Vec<WallSegment> {
        let thickness = self.params.wall_thickness;
        let mut segments = Vec::new();

        for side in WallSide::ALL {
            let gaps: Vec<f64> = room
                .doors
                .iter()
                .filter(|d| wall_side(room.width, room.depth, d.offset) == Some(side))
                .map(|d| side.along(d.offset))
                .collect();

            let length = if side.runs_along_x() {
                room.width
            } else {
                room.depth
            };

            for (a, b) in wall_intervals(length, &gaps, self.params.gap_width()) {
                let mid = (a + b) / 2.0;
                let half_len = (b - a) / 2.0;
                let p = room.position;
                let (center, half_width, half_depth) = match side {
                    WallSide::North => (Vec3::new(p.x + mid, 0.0, p.z + room.depth / 2.0), half_len, thickness / 2.0),
                    WallSide::South => (Vec3::new(p.x + mid, 0.0, p.z - room.depth / 2.0), half_len, thickness / 2.0),
                    WallSide::East => (Vec3::new(p.x + room.width / 2.0, 0.0, p.z + mid), thickness / 2.0, half_len),
                    WallSide::West => (Vec3::new(p.x - room.width / 2.0, 0.0, p.z + mid), thickness / 2.0, half_len),
                };
                segments.push(WallSegment {
                    room: room.id,
                    side,
                    center,
                    half_width,
                    half_depth,
                });
            }
        }
        segments
    }
}

fn validate(templates: &DungeonTemplates) -> Result<HashMap<RoomId, &RoomTemplate>, LayoutError> {
    let mut by_id = HashMap::with_capacity(templates.rooms.len());
    for room in &templates.rooms {
        if by_id.insert(room.id, room).is_some() {
            return Err(LayoutError::DuplicateRoom { room: room.id });
        }
        let [width, depth] = room.size;
        if !(width > 0.0 && width.is_finite() && depth > 0.0 && depth.is_finite()) {
            return Err(LayoutError::InvalidSize {
                room: room.id,
                width,
                depth,
            });
        }
    }

    let known: HashSet<RoomId> = by_id.keys().copied().collect();
    for room in &templates.rooms {
        for link in &room.doors {
            if !known.contains(&link.target) {
                return Err(LayoutError::MissingRoom {
                    room: room.id,
                    target: link.target,
                });
            }
            if wall_side(room.width(), room.depth(), link.offset).is_none() {
                return Err(LayoutError::DoorOffWall {
                    room: room.id,
                    target: link.target,
                    x: link.offset.x,
                    z: link.offset.z,
                });
            }
        }
    }
    Ok(by_id)
}

fn find_start(templates: &DungeonTemplates) -> Result<&RoomTemplate, LayoutError> {
    let mut starts = templates
        .rooms
        .iter()
        .filter(|r| r.room_type == RoomType::Start);
    let first = starts.next().ok_or(LayoutError::NoStartRoom)?;
    if let Some(second) = starts.next() {
        return Err(LayoutError::MultipleStartRooms {
            first: first.id,
            second: second.id,
        });
    }
    Ok(first)
}

/// Where `neighbour` goes when reached from `room` (centred at `origin`)
/// through `link`.
fn neighbour_position(
    room: &RoomTemplate,
    origin: Vec3,
    link: &DoorLink,
    neighbour: &RoomTemplate,
) -> Vec3 {
    // validate() guarantees every door is on a wall.
    let side = wall_side(room.width(), room.depth(), link.offset).unwrap_or(WallSide::East);

    let reciprocal = neighbour
        .doors
        .iter()
        .find(|d| d.target == room.id)
        .filter(|d| {
            let back = wall_side(neighbour.width(), neighbour.depth(), d.offset);
            if back != Some(side.opposite()) {
                tracing::warn!(
                    room = %neighbour.id,
                    target = %room.id,
                    "door back is not on the facing wall; not aligning"
                );
                return false;
            }
            true
        });
    let shift = reciprocal.map_or(0.0, |back| side.along(link.offset) - side.along(back.offset));

    let reach_x = (room.width() + neighbour.width()) / 2.0;
    let reach_z = (room.depth() + neighbour.depth()) / 2.0;
    match side {
        WallSide::East => Vec3::new(origin.x + reach_x, 0.0, origin.z + shift),
        WallSide::West => Vec3::new(origin.x - reach_x, 0.0, origin.z + shift),
        WallSide::North => Vec3::new(origin.x + shift, 0.0, origin.z + reach_z),
        WallSide::South => Vec3::new(origin.x + shift, 0.0, origin.z - reach_z),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
