//! Simulation tuning constants.
//!
//! [`SimConfig`] groups every gameplay constant the stepper, layout engine
//! and companion read. All sections implement `Default` with the values the
//! game ships with, and every field is `#[serde(default)]`, so a JSON config
//! file only needs to mention the values it overrides:
//!
//! ```
//! use delve_engine::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "boss": { "contact_dps": 20.0 } }"#).unwrap();
//! assert_eq!(config.boss.contact_dps, 20.0);
//! assert_eq!(config.player.speed, 5.0);
//! ```

use std::path::Path;

use delve_registry::prelude::{Vec3, KEY_ITEM, POTION_ITEM};
use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config text was not valid JSON for [`SimConfig`].
    #[error("failed to parse config: {details}")]
    Parse {
        /// Parser message.
        details: String,
    },

    /// A value is out of its allowed range.
    #[error("invalid config value '{field}': {reason}")]
    Invalid {
        /// Dotted field path, e.g. `"player.radius"`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Player movement and interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Walking speed in units per second.
    pub speed: f64,
    /// Collision sphere radius.
    pub radius: f64,
    /// Health cap (and starting health).
    pub max_health: f64,
    /// Position the player starts (and resets) at.
    pub spawn: Vec3,
    /// Facing at spawn.
    pub spawn_facing: Vec3,
    /// Distance covered by one dash.
    pub dash_distance: f64,
    /// Seconds a dash suppresses movement and further dashes.
    pub dash_window: f64,
    /// Items closer than this are picked up.
    pub pickup_radius: f64,
    /// Locked doors closer than this can be unlocked.
    pub interact_radius: f64,
    /// Minimum seconds between two casts.
    pub cast_cooldown: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            radius: 0.5,
            max_health: 100.0,
            spawn: Vec3::new(0.0, 0.1, 0.0),
            spawn_facing: Vec3::new(0.0, 0.0, 1.0),
            dash_distance: 3.0,
            dash_window: 0.5,
            pickup_radius: 0.7,
            interact_radius: 1.5,
            cast_cooldown: 0.2,
        }
    }
}

/// Player projectiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Projectile speed in units per second.
    pub projectile_speed: f64,
    /// Seconds before a projectile is removed.
    pub projectile_ttl: f64,
    /// Enemies closer than this to a projectile are hit.
    pub projectile_hit_radius: f64,
    /// Damage dealt per hit.
    pub projectile_damage: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectile_speed: 10.0,
            projectile_ttl: 1.0,
            projectile_hit_radius: 0.6,
            projectile_damage: 10.0,
        }
    }
}

/// Regular (non-boss) enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Health at spawn.
    pub max_health: f64,
    /// Chase speed in units per second.
    pub speed: f64,
    /// Distance at which an enemy can hit the player.
    pub melee_range: f64,
    /// Damage per melee hit.
    pub melee_damage: f64,
    /// Minimum seconds between two hits by the same enemy.
    pub attack_cooldown: f64,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            max_health: 20.0,
            speed: 2.0,
            melee_range: 1.0,
            melee_damage: 5.0,
            attack_cooldown: 1.0,
        }
    }
}

/// The boss and its phase thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Health at spawn.
    pub max_health: f64,
    /// Above this health fraction the boss is passive.
    pub passive_above: f64,
    /// Below this health fraction the boss is enraged.
    pub enraged_below: f64,
    /// Chase speed between the two thresholds.
    pub chase_speed: f64,
    /// Chase speed when enraged.
    pub enraged_speed: f64,
    /// Distance at which contact damage applies.
    pub contact_range: f64,
    /// Contact damage per second.
    pub contact_dps: f64,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            passive_above: 0.7,
            enraged_below: 0.3,
            chase_speed: 3.0,
            enraged_speed: 5.0,
            contact_range: 1.5,
            contact_dps: 10.0,
        }
    }
}

/// Companion assist policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Interventions available per episode.
    pub budget: u32,
    /// Minimum seconds between interventions, counted from episode start.
    pub cooldown: f64,
    /// Player health below which the companion always heals.
    pub low_health: f64,
    /// Enemy count above which the companion weakens enemies.
    pub crowd_threshold: usize,
    /// Flat damage applied to every non-boss enemy when weakening.
    pub weaken_amount: f64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            budget: 3,
            cooldown: 5.0,
            low_health: 30.0,
            crowd_threshold: 3,
            weaken_amount: 10.0,
        }
    }
}

/// Wall and door geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of a door opening (before player clearance is added).
    pub door_width: f64,
    /// Thickness of wall segments and door colliders.
    pub wall_thickness: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            door_width: 2.0,
            wall_thickness: 0.5,
        }
    }
}

/// Item vocabulary and effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemConfig {
    /// Item types that may be spawned by commands.
    pub known: Vec<String>,
    /// Health restored by a potion on pickup.
    pub potion_heal: f64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            known: vec![KEY_ITEM.to_owned(), POTION_ITEM.to_owned()],
            potion_heal: 20.0,
        }
    }
}

impl ItemConfig {
    /// Whether `item_type` is part of the vocabulary.
    pub fn is_known(&self, item_type: &str) -> bool {
        self.known.iter().any(|k| k == item_type)
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Time step used by [`Simulation::run_steps`](crate::tick::Simulation::run_steps).
    pub fixed_dt: f64,
    /// Player constants.
    pub player: PlayerConfig,
    /// Projectile constants.
    pub combat: CombatConfig,
    /// Regular enemy constants.
    pub enemy: EnemyConfig,
    /// Boss constants.
    pub boss: BossConfig,
    /// Companion constants.
    pub companion: CompanionConfig,
    /// Wall/door geometry.
    pub layout: LayoutConfig,
    /// Item vocabulary.
    pub items: ItemConfig,
}

impl Default for SimConfig {
    /// Defaults to 60 Hz and the shipped gameplay constants.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            player: PlayerConfig::default(),
            combat: CombatConfig::default(),
            enemy: EnemyConfig::default(),
            boss: BossConfig::default(),
            companion: CompanionConfig::default(),
            layout: LayoutConfig::default(),
            items: ItemConfig::default(),
        }
    }
}

/// Upper bound on the player's health pool.
pub const MAX_PLAYER_HEALTH: f64 = 100.0;

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive and finite, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be non-negative and finite, got {value}"),
        })
    }
}

impl SimConfig {
    /// Parse a JSON config, filling unspecified fields with defaults, and
    /// validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            details: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Check that every value is within its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fixed_dt", self.fixed_dt)?;

        non_negative("player.speed", self.player.speed)?;
        positive("player.radius", self.player.radius)?;
        positive("player.max_health", self.player.max_health)?;
        if self.player.max_health > MAX_PLAYER_HEALTH {
            return Err(ConfigError::Invalid {
                field: "player.max_health",
                reason: format!(
                    "must not exceed {MAX_PLAYER_HEALTH}, got {}",
                    self.player.max_health
                ),
            });
        }
        if !self.player.spawn.is_finite() {
            return Err(ConfigError::Invalid {
                field: "player.spawn",
                reason: "must be finite".to_owned(),
            });
        }
        non_negative("player.dash_distance", self.player.dash_distance)?;
        non_negative("player.dash_window", self.player.dash_window)?;
        non_negative("player.pickup_radius", self.player.pickup_radius)?;
        non_negative("player.interact_radius", self.player.interact_radius)?;
        non_negative("player.cast_cooldown", self.player.cast_cooldown)?;

        non_negative("combat.projectile_speed", self.combat.projectile_speed)?;
        positive("combat.projectile_ttl", self.combat.projectile_ttl)?;
        non_negative("combat.projectile_hit_radius", self.combat.projectile_hit_radius)?;
        non_negative("combat.projectile_damage", self.combat.projectile_damage)?;

        positive("enemy.max_health", self.enemy.max_health)?;
        non_negative("enemy.speed", self.enemy.speed)?;
        non_negative("enemy.melee_range", self.enemy.melee_range)?;
        non_negative("enemy.melee_damage", self.enemy.melee_damage)?;
        non_negative("enemy.attack_cooldown", self.enemy.attack_cooldown)?;

        positive("boss.max_health", self.boss.max_health)?;
        if !(0.0..=1.0).contains(&self.boss.enraged_below)
            || !(0.0..=1.0).contains(&self.boss.passive_above)
            || self.boss.enraged_below > self.boss.passive_above
        {
            return Err(ConfigError::Invalid {
                field: "boss.enraged_below",
                reason: format!(
                    "phase thresholds must satisfy 0 <= enraged_below ({}) <= passive_above ({}) <= 1",
                    self.boss.enraged_below, self.boss.passive_above
                ),
            });
        }
        non_negative("boss.chase_speed", self.boss.chase_speed)?;
        non_negative("boss.enraged_speed", self.boss.enraged_speed)?;
        non_negative("boss.contact_range", self.boss.contact_range)?;
        non_negative("boss.contact_dps", self.boss.contact_dps)?;

        non_negative("companion.cooldown", self.companion.cooldown)?;
        non_negative("companion.weaken_amount", self.companion.weaken_amount)?;

        positive("layout.door_width", self.layout.door_width)?;
        positive("layout.wall_thickness", self.layout.wall_thickness)?;

        non_negative("items.potion_heal", self.items.potion_heal)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
