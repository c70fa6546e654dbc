//! The closed command vocabulary external collaborators may use to change
//! live state.
//!
//! An advisory collaborator never runs code against the simulation. It
//! answers with an [`AdvisoryReply`]: either plain text for the player, or
//! one [`Command`] from a fixed set. Commands are validated in full before
//! anything changes, so a rejected command has no effect at all.
//!
//! # Wire format
//!
//! ```
//! use delve_engine::protocol::{AdvisoryReply, Command};
//!
//! let reply = AdvisoryReply::parse(
//!     r#"{ "type": "command", "command": { "kind": "heal_player", "amount": 20 } }"#,
//! ).unwrap();
//! assert_eq!(reply, AdvisoryReply::Command { command: Command::HealPlayer { amount: 20.0 } });
//!
//! // Unknown commands and extra fields are rejected.
//! assert!(AdvisoryReply::parse(r#"{ "type": "command", "command": { "kind": "teleport" } }"#).is_err());
//! ```

use delve_registry::prelude::{EntityId, RegistryError, RoomId, Vec3};
use serde::{Deserialize, Serialize};

use crate::events::StepEvent;
use crate::tick::Simulation;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an advisory payload or command was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// The payload is not a recognised reply or command.
    #[error("malformed advisory payload: {details}")]
    Malformed {
        /// Parser message.
        details: String,
    },

    /// `spawn` named an empty item type.
    #[error("spawn needs a non-empty item type")]
    EmptyItemType,

    /// `spawn` named an item type outside the vocabulary.
    #[error("unknown item type '{item_type}'")]
    UnknownItemType {
        /// The rejected type.
        item_type: String,
    },

    /// A position had a NaN or infinite coordinate.
    #[error("position has a non-finite coordinate")]
    NonFinitePosition,

    /// An amount was zero, negative or not finite.
    #[error("'{field}' must be positive and finite, got {amount}")]
    InvalidAmount {
        /// Which field.
        field: &'static str,
        /// The rejected value.
        amount: f64,
    },

    /// `unlock_door` named a room that does not exist.
    #[error("{room} does not exist")]
    UnknownRoom {
        /// The room.
        room: RoomId,
    },

    /// `unlock_door` named a room with no locked door.
    #[error("{room} has no locked door")]
    NoLockedDoor {
        /// The room.
        room: RoomId,
    },

    /// The episode has ended; nothing can change until reset.
    #[error("episode is over")]
    EpisodeOver,

    /// The advisory collaborator itself failed.
    #[error("advisor failed: {details}")]
    Advisor {
        /// Error message.
        details: String,
    },

    /// The registry refused an entity.
    #[error("registry rejected the change: {details}")]
    Registry {
        /// Registry error message.
        details: String,
    },
}

impl From<RegistryError> for ProtocolError {
    fn from(e: RegistryError) -> Self {
        Self::Registry {
            details: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A state change an advisory collaborator may request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Command {
    /// Drop an item, at the player if no position is given.
    Spawn {
        /// Item type from the configured vocabulary.
        item_type: String,
        /// World position.
        #[serde(default)]
        position: Option<Vec3>,
    },
    /// Unlock every locked door owned by or leading to a room.
    UnlockDoor {
        /// The room.
        room_id: RoomId,
    },
    /// Restore player health.
    HealPlayer {
        /// Health to restore.
        amount: f64,
    },
    /// Hurt every non-boss enemy.
    DamageEnemies {
        /// Damage per enemy.
        amount: f64,
    },
}

/// What an applied command changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "applied", rename_all = "snake_case")]
pub enum Applied {
    /// An item was created.
    Spawned {
        /// The new item.
        item: EntityId,
    },
    /// Doors were removed.
    Unlocked {
        /// The removed door entities.
        doors: Vec<EntityId>,
    },
    /// The player was healed.
    Healed {
        /// Health actually restored.
        amount: f64,
        /// Health afterwards.
        health: f64,
    },
    /// Enemies were hurt.
    Damaged {
        /// Enemies hit.
        affected: usize,
        /// Enemies that died.
        killed: Vec<EntityId>,
    },
}

fn positive(field: &'static str, amount: f64) -> Result<(), ProtocolError> {
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidAmount { field, amount })
    }
}

// ---------------------------------------------------------------------------
// AdvisoryReply
// ---------------------------------------------------------------------------

/// A parsed advisory answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AdvisoryReply {
    /// Text for the player. No state effect.
    Reply {
        /// The text.
        #[serde(alias = "response")]
        text: String,
    },
    /// A state change.
    Command {
        /// The command.
        command: Command,
    },
}

impl AdvisoryReply {
    /// Parse an advisory payload.
    ///
    /// Surrounding whitespace and a Markdown code fence around the JSON are
    /// tolerated; anything else that is not exactly one reply object is
    /// [`ProtocolError::Malformed`].
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(strip_fence(payload)).map_err(|e| ProtocolError::Malformed {
            details: e.to_string(),
        })
    }
}

fn strip_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Drop an info string such as `json` on the opening fence line.
    match body.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') => rest.trim(),
        _ => body.trim(),
    }
}

// ---------------------------------------------------------------------------
// Validation and application
// ---------------------------------------------------------------------------

impl Simulation {
    /// Check a command against the current state without changing anything.
    pub fn validate_command(&self, command: &Command) -> Result<(), ProtocolError> {
        if self.outcome.is_over() {
            return Err(ProtocolError::EpisodeOver);
        }
        match command {
            Command::Spawn {
                item_type,
                position,
            } => {
                if item_type.trim().is_empty() {
                    return Err(ProtocolError::EmptyItemType);
                }
                if !self.config.items.is_known(item_type) {
                    return Err(ProtocolError::UnknownItemType {
                        item_type: item_type.clone(),
                    });
                }
                if position.is_some_and(|p| !p.is_finite()) {
                    return Err(ProtocolError::NonFinitePosition);
                }
            }
            Command::UnlockDoor { room_id } => {
                if self.dungeon.room(*room_id).is_none() {
                    return Err(ProtocolError::UnknownRoom { room: *room_id });
                }
                if !self.dungeon.has_locked_door_touching(*room_id) {
                    return Err(ProtocolError::NoLockedDoor { room: *room_id });
                }
            }
            Command::HealPlayer { amount } => positive("amount", *amount)?,
            Command::DamageEnemies { amount } => positive("amount", *amount)?,
        }
        Ok(())
    }

    /// Validate and apply a command outside of a step.
    pub fn apply_command(&mut self, command: &Command) -> Result<Applied, ProtocolError> {
        let mut events = Vec::new();
        self.apply_command_logged(command, &mut events)
    }

    pub(crate) fn apply_command_logged(
        &mut self,
        command: &Command,
        events: &mut Vec<StepEvent>,
    ) -> Result<Applied, ProtocolError> {
        self.validate_command(command)?;

        let applied = match command {
            Command::Spawn {
                item_type,
                position,
            } => {
                let item = match position {
                    Some(p) => self.spawn_item(item_type, *p)?,
                    None => self.spawn_item_at_player(item_type)?,
                };
                Applied::Spawned { item }
            }
            Command::UnlockDoor { room_id } => {
                let touching: Vec<EntityId> = self
                    .registry
                    .doors()
                    .filter(|d| d.touches(*room_id))
                    .map(|d| d.id)
                    .collect();
                let mut doors = Vec::new();
                for id in touching {
                    // A paired door may already be gone with its partner.
                    doors.extend(self.unlock_door(id, events));
                }
                Applied::Unlocked { doors }
            }
            Command::HealPlayer { amount } => {
                let amount = self.heal_player(*amount, events);
                Applied::Healed {
                    amount,
                    health: self.player.health,
                }
            }
            Command::DamageEnemies { amount } => {
                let hit = self.weaken_enemies(*amount, events);
                Applied::Damaged {
                    affected: hit.affected,
                    killed: hit.killed,
                }
            }
        };
        tracing::info!(?command, "command applied");
        Ok(applied)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::templates::DungeonTemplates;
    use delve_registry::prelude::EntityKind;

    fn sim() -> Simulation {
        Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap()
    }

    // -- 1. parsing ----------------------------------------------------------

    #[test]
    fn parses_text_reply() {
        let reply = AdvisoryReply::parse(r#"{"type":"reply","text":"Try the north door."}"#).unwrap();
        assert_eq!(
            reply,
            AdvisoryReply::Reply {
                text: "Try the north door.".to_owned()
            }
        );
    }

    #[test]
    fn accepts_response_alias_and_code_fence() {
        let payload = "```json\n{\"type\":\"reply\",\"response\":\"hi\"}\n```";
        assert_eq!(
            AdvisoryReply::parse(payload).unwrap(),
            AdvisoryReply::Reply { text: "hi".to_owned() }
        );
    }

    #[test]
    fn spawn_position_is_optional() {
        let reply = AdvisoryReply::parse(
            r#"{"type":"command","command":{"kind":"spawn","item_type":"potion"}}"#,
        )
        .unwrap();
        assert_eq!(
            reply,
            AdvisoryReply::Command {
                command: Command::Spawn {
                    item_type: "potion".to_owned(),
                    position: None
                }
            }
        );
    }

    #[test]
    fn rejects_unknown_shapes() {
        for payload in [
            "",
            "not json",
            r#"{"type":"code","response":"player.health = 100"}"#,
            r#"{"type":"command","command":{"kind":"heal_player","amount":5,"target":"boss"}}"#,
            r#"{"type":"command","command":{"kind":"unlock_door"}}"#,
            r#"{"type":"reply","text":"a","extra":1}"#,
        ] {
            assert!(
                matches!(AdvisoryReply::parse(payload), Err(ProtocolError::Malformed { .. })),
                "accepted {payload:?}"
            );
        }
    }

    // -- 2. validation -------------------------------------------------------

    #[test]
    fn invalid_commands_change_nothing() {
        let mut sim = sim();
        let before = sim.state_hash();

        let cases = [
            (
                Command::Spawn {
                    item_type: " ".to_owned(),
                    position: None,
                },
                ProtocolError::EmptyItemType,
            ),
            (
                Command::Spawn {
                    item_type: "sword".to_owned(),
                    position: None,
                },
                ProtocolError::UnknownItemType {
                    item_type: "sword".to_owned(),
                },
            ),
            (
                Command::Spawn {
                    item_type: "key".to_owned(),
                    position: Some(Vec3::new(f64::NAN, 0.0, 0.0)),
                },
                ProtocolError::NonFinitePosition,
            ),
            (
                Command::HealPlayer { amount: -5.0 },
                ProtocolError::InvalidAmount {
                    field: "amount",
                    amount: -5.0,
                },
            ),
            (
                Command::UnlockDoor { room_id: RoomId(42) },
                ProtocolError::UnknownRoom { room: RoomId(42) },
            ),
            (
                Command::UnlockDoor { room_id: RoomId(0) },
                ProtocolError::NoLockedDoor { room: RoomId(0) },
            ),
        ];

        for (command, expected) in cases {
            assert_eq!(sim.apply_command(&command).unwrap_err(), expected);
        }
        assert_eq!(sim.state_hash(), before);
    }

    #[test]
    fn infinite_amount_is_rejected() {
        let sim = sim();
        assert!(sim
            .validate_command(&Command::DamageEnemies {
                amount: f64::INFINITY
            })
            .is_err());
    }

    // -- 3. application ------------------------------------------------------

    #[test]
    fn spawn_at_player_and_at_position() {
        let mut sim = sim();
        let Applied::Spawned { item } = sim
            .apply_command(&Command::Spawn {
                item_type: "key".to_owned(),
                position: Some(Vec3::new(3.0, 0.5, -1.0)),
            })
            .unwrap()
        else {
            panic!("expected a spawn");
        };
        assert_eq!(sim.registry().item(item).unwrap().position, Vec3::new(3.0, 0.5, -1.0));
        assert_eq!(sim.registry().count(EntityKind::Item), 2);
    }

    #[test]
    fn unlock_by_either_room() {
        let mut sim = sim();
        let door = sim.registry().doors().next().unwrap().id;
        let applied = sim
            .apply_command(&Command::UnlockDoor { room_id: RoomId(2) })
            .unwrap();
        assert_eq!(applied, Applied::Unlocked { doors: vec![door] });
        assert_eq!(sim.registry().count(EntityKind::Door), 0);
        assert!(!sim.dungeon().has_locked_door_touching(RoomId(1)));

        // Nothing left to unlock.
        assert_eq!(
            sim.apply_command(&Command::UnlockDoor { room_id: RoomId(1) })
                .unwrap_err(),
            ProtocolError::NoLockedDoor { room: RoomId(1) }
        );
    }

    #[test]
    fn heal_is_clamped() {
        let mut sim = sim();
        sim.player.health = 90.0;
        let applied = sim.apply_command(&Command::HealPlayer { amount: 50.0 }).unwrap();
        assert_eq!(
            applied,
            Applied::Healed {
                amount: 10.0,
                health: 100.0
            }
        );
    }

    #[test]
    fn damage_enemies_removes_dead_and_spares_boss() {
        let mut sim = sim();
        let applied = sim
            .apply_command(&Command::DamageEnemies { amount: 20.0 })
            .unwrap();
        let Applied::Damaged { affected, killed } = applied else {
            panic!("expected damage");
        };
        assert_eq!(affected, 4);
        assert_eq!(killed.len(), 4);
        assert_eq!(sim.registry().count(EntityKind::Enemy), 1);
        assert_eq!(
            sim.registry().enemies().next().map(|e| e.health),
            Some(100.0)
        );
    }
}
