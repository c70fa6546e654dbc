//! State capture and BLAKE3 state hashing.
//!
//! [`SimulationState`] is a serializable picture of everything that affects
//! future steps: the player, the companion, every live entity, door locks and
//! the clock. Entity ids are left out and entities are listed in id order, so
//! two simulations that issued ids from different starting points (a fresh
//! one and a reset one, say) capture identical states when their worlds
//! match.
//!
//! ```
//! use delve_engine::prelude::*;
//!
//! let mut a = Simulation::with_default_dungeon().unwrap();
//! let mut b = Simulation::with_default_dungeon().unwrap();
//! let input = InputFrame { right: true, ..InputFrame::default() };
//! a.run_steps(20, &input);
//! b.run_steps(20, &input);
//!
//! assert_eq!(a.state_hash(), b.state_hash());
//! assert_eq!(a.state_hash().len(), 64);
//! ```

use delve_registry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::companion::Companion;
use crate::events::Outcome;
use crate::player::Player;
use crate::tick::Simulation;

/// An enemy without its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub kind: String,
    pub position: Vec3,
    pub health: f64,
    pub room: RoomId,
    pub last_attack_at: Option<f64>,
}

/// An item without its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemState {
    pub item_type: String,
    pub position: Vec3,
}

/// A projectile without its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub created_at: f64,
}

/// One door link and whether it is currently locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub room: RoomId,
    pub target: RoomId,
    pub locked: bool,
}

/// Id-independent capture of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub step: u64,
    pub sim_time: f64,
    pub outcome: Outcome,
    pub boss_slain: bool,
    pub player: Player,
    pub companion: Companion,
    pub enemies: Vec<EnemyState>,
    pub items: Vec<ItemState>,
    pub projectiles: Vec<ProjectileState>,
    pub links: Vec<LinkState>,
}

impl SimulationState {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the serialized state.
    pub fn hash(&self) -> String {
        let bytes =
            serde_json::to_vec(self).expect("SimulationState should always be JSON-serializable");
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// Sort a pool's contents by id, then strip the ids.
fn by_id<'a, T, S>(items: impl Iterator<Item = &'a T>, strip: impl Fn(&T) -> S) -> Vec<S>
where
    T: Tracked + 'a,
{
    let mut sorted: Vec<&T> = items.collect();
    sorted.sort_by_key(|t| t.id());
    sorted.into_iter().map(strip).collect()
}

impl Simulation {
    /// Capture the current state.
    pub fn capture_state(&self) -> SimulationState {
        let registry = &self.registry;
        SimulationState {
            step: self.step_count(),
            sim_time: self.sim_time(),
            outcome: self.outcome,
            boss_slain: self.boss_slain,
            player: self.player.clone(),
            companion: self.companion.clone(),
            enemies: by_id(registry.enemies(), |e| EnemyState {
                kind: e.kind.clone(),
                position: e.position,
                health: e.health,
                room: e.room,
                last_attack_at: e.last_attack_at,
            }),
            items: by_id(registry.items(), |i| ItemState {
                item_type: i.item_type.clone(),
                position: i.position,
            }),
            projectiles: by_id(registry.projectiles(), |p| ProjectileState {
                position: p.position,
                velocity: p.velocity,
                created_at: p.created_at,
            }),
            links: self
                .dungeon
                .rooms()
                .iter()
                .flat_map(|room| {
                    room.doors.iter().map(move |link| LinkState {
                        room: room.id,
                        target: link.target,
                        locked: link.locked,
                    })
                })
                .collect(),
        }
    }

    /// BLAKE3 hash of [`capture_state`](Self::capture_state).
    pub fn state_hash(&self) -> String {
        self.capture_state().hash()
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn hash_is_hex_and_stable() {
        let sim = Simulation::with_default_dungeon().unwrap();
        let h = sim.state_hash();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, sim.state_hash());
    }

    #[test]
    fn hash_changes_with_state() {
        let mut sim = Simulation::with_default_dungeon().unwrap();
        let before = sim.state_hash();
        sim.step(&InputFrame::idle(), 1.0 / 60.0);
        assert_ne!(before, sim.state_hash());
    }

    #[test]
    fn capture_ignores_ids() {
        let mut sim = Simulation::with_default_dungeon().unwrap();
        let fresh = sim.capture_state();
        sim.reset().unwrap();
        assert_eq!(sim.capture_state(), fresh);
    }

    #[test]
    fn links_reflect_locks() {
        let sim = Simulation::with_default_dungeon().unwrap();
        let state = sim.capture_state();
        let locked: Vec<_> = state.links.iter().filter(|l| l.locked).collect();
        assert_eq!(locked.len(), 1);
        assert_eq!((locked[0].room, locked[0].target), (RoomId(1), RoomId(2)));
    }
}
