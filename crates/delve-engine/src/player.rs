//! Player state.

use delve_registry::prelude::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

/// The player avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// World position. `y` is height and never changes.
    pub position: Vec3,
    /// Unit planar facing used for casts and idle dashes.
    pub facing: Vec3,
    /// Unit planar movement direction from the last step, or zero.
    pub move_direction: Vec3,
    /// Current health in `[0, max_health]`.
    pub health: f64,
    /// Health cap.
    pub max_health: f64,
    /// Held item types, in pickup order. Duplicates allowed.
    pub inventory: Vec<String>,
    /// Sim time at which the active dash window closes.
    pub dash_until: Option<f64>,
    /// Sim time of the last cast.
    pub last_cast_at: Option<f64>,
}

impl Player {
    /// A fresh player at the configured spawn.
    pub fn spawn(config: &PlayerConfig) -> Self {
        Self {
            position: config.spawn,
            facing: config.spawn_facing.planar().normalize_or_zero(),
            move_direction: Vec3::ZERO,
            health: config.max_health,
            max_health: config.max_health,
            inventory: Vec::new(),
            dash_until: None,
            last_cast_at: None,
        }
    }

    /// Restore health, clamped to the cap. Returns the amount actually healed.
    pub fn heal(&mut self, amount: f64) -> f64 {
        let before = self.health;
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
        self.health - before
    }

    /// Lose health, clamped at zero. Returns the amount actually lost.
    pub fn damage(&mut self, amount: f64) -> f64 {
        let before = self.health;
        self.health = (self.health - amount.max(0.0)).max(0.0);
        before - self.health
    }

    /// Whether the player has run out of health.
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// How many of `item_type` the player holds.
    pub fn count_of(&self, item_type: &str) -> usize {
        self.inventory.iter().filter(|i| *i == item_type).count()
    }

    /// Remove one `item_type` from the inventory. Returns `false` if none is
    /// held.
    pub fn take_item(&mut self, item_type: &str) -> bool {
        match self.inventory.iter().position(|i| i == item_type) {
            Some(idx) => {
                self.inventory.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether a dash window is open at `now`.
    pub fn is_dashing(&self, now: f64) -> bool {
        self.dash_until.is_some_and(|until| now < until)
    }

    /// Whether the cast cooldown has elapsed at `now`.
    pub fn can_cast(&self, now: f64, cooldown: f64) -> bool {
        self.last_cast_at.map_or(true, |at| now - at >= cooldown)
    }
}
