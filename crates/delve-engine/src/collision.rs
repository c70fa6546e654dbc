//! Sphere-vs-obstacle queries.
//!
//! Walls and locked doors are axis-aligned boxes in the x/z plane; moving
//! bodies are discs. A [`CollisionIndex`] borrows the current wall list and
//! registry and answers "would a disc of radius r at p touch anything solid?"
//! using parry's shape intersection tests (bundled with rapier2d).
//!
//! Nothing is cached: every query sees the doors that are locked right now,
//! so unlocking a door opens the gap for the very next query.

use delve_registry::prelude::{Door, EntityId, EntityRegistry, Vec3};
use rapier2d::parry::query;
use rapier2d::parry::shape::{Ball, Cuboid};
use rapier2d::prelude::{Isometry, Real, Vector};

use crate::layout::WallSegment;

/// What a blocked query ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obstacle {
    /// Index into the wall list.
    Wall(usize),
    /// A locked door entity.
    Door(EntityId),
}

/// Read-only view over the solid geometry of the dungeon.
#[derive(Clone, Copy)]
pub struct CollisionIndex<'a> {
    walls: &'a [WallSegment],
    registry: &'a EntityRegistry,
}

impl<'a> CollisionIndex<'a> {
    /// Borrow the current walls and doors.
    pub fn new(walls: &'a [WallSegment], registry: &'a EntityRegistry) -> Self {
        Self { walls, registry }
    }

    /// Whether a disc of `radius` centred on the planar `position` touches a
    /// wall segment or a locked door.
    pub fn blocked(&self, position: Vec3, radius: f64) -> bool {
        self.obstacle_at(position, radius).is_some()
    }

    /// The first obstacle a disc touches, walls before doors.
    pub fn obstacle_at(&self, position: Vec3, radius: f64) -> Option<Obstacle> {
        let disc = Disc::new(position, radius);

        if let Some(i) = self
            .walls
            .iter()
            .position(|w| disc.touches(w.center, w.half_width, w.half_depth))
        {
            return Some(Obstacle::Wall(i));
        }

        self.registry
            .doors()
            .filter(|d| d.locked)
            .find(|d| disc.touches_door(d))
            .map(|d| Obstacle::Door(d.id))
    }
}

struct Disc {
    pose: Isometry<Real>,
    ball: Ball,
}

impl Disc {
    fn new(center: Vec3, radius: f64) -> Self {
        Self {
            pose: planar_pose(center),
            ball: Ball::new(radius.max(0.0) as Real),
        }
    }

    fn touches(&self, center: Vec3, half_width: f64, half_depth: f64) -> bool {
        let cuboid = Cuboid::new(Vector::new(half_width as Real, half_depth as Real));
        // Ball vs cuboid is always supported.
        query::intersection_test(&self.pose, &self.ball, &planar_pose(center), &cuboid)
            .unwrap_or(false)
    }

    fn touches_door(&self, door: &Door) -> bool {
        self.touches(door.position, door.half_width, door.half_depth)
    }
}

/// World x/z maps to parry's x/y.
fn planar_pose(p: Vec3) -> Isometry<Real> {
    Isometry::translation(p.x as Real, p.z as Real)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
