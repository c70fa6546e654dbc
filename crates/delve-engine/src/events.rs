//! What happened during a step.
//!
//! The stepper never calls out to renderers or UI. Instead every step returns
//! a [`StepReport`] listing the [`StepEvent`]s it produced, in the order they
//! happened, so collaborators can play sounds, show damage numbers or print
//! companion messages.

use delve_registry::prelude::{EntityId, RoomId, Vec3};
use serde::{Deserialize, Serialize};

use crate::companion::AssistAction;
use crate::protocol::{Applied, Command};

/// Whether the episode is still being played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Still playing.
    #[default]
    Running,
    /// The boss died.
    Won,
    /// The player died.
    Lost,
}

impl Outcome {
    /// Whether stepping has stopped.
    pub fn is_over(self) -> bool {
        self != Self::Running
    }
}

/// Who hurt the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum DamageSource {
    /// A regular enemy's melee hit.
    Enemy(EntityId),
    /// Boss contact damage.
    Boss(EntityId),
}

/// One thing that happened during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    /// The player dashed.
    Dashed {
        /// Position before.
        from: Vec3,
        /// Position after (equal to `from` if the dash was blocked).
        to: Vec3,
    },
    /// A projectile was launched.
    ProjectileCast {
        /// New projectile.
        projectile: EntityId,
    },
    /// A projectile struck an enemy.
    ProjectileHit {
        /// The projectile, now removed.
        projectile: EntityId,
        /// The enemy struck.
        enemy: EntityId,
        /// Enemy health after the hit.
        remaining_health: f64,
    },
    /// A projectile ran out of time.
    ProjectileExpired {
        /// The projectile, now removed.
        projectile: EntityId,
    },
    /// An enemy reached zero health and was removed.
    EnemyKilled {
        /// The enemy.
        enemy: EntityId,
        /// Its kind.
        kind: String,
    },
    /// The player picked up an item.
    ItemPicked {
        /// The item, now removed.
        item: EntityId,
        /// Its type.
        item_type: String,
    },
    /// The player regained health.
    PlayerHealed {
        /// Health actually restored.
        amount: f64,
    },
    /// The player lost health.
    PlayerDamaged {
        /// Who did it.
        source: DamageSource,
        /// Health actually lost.
        amount: f64,
    },
    /// A locked door was opened.
    DoorUnlocked {
        /// The door entity, now removed.
        door: EntityId,
        /// Owning room.
        room: RoomId,
        /// Room on the other side.
        target: RoomId,
    },
    /// Interact was pressed next to a locked door without a key.
    DoorNeedsKey {
        /// The door.
        door: EntityId,
    },
    /// The companion intervened.
    CompanionAssisted {
        /// What it did.
        action: AssistAction,
        /// Interventions left.
        budget_left: u32,
    },
    /// A queued advisory command was applied.
    CommandApplied {
        /// The command.
        command: Command,
        /// What it changed.
        applied: Applied,
    },
    /// A queued advisory payload was rejected.
    CommandRejected {
        /// Why.
        reason: String,
    },
    /// The advisory collaborator answered with text only.
    AdvisoryReply {
        /// The text.
        text: String,
    },
    /// The episode ended this step.
    EpisodeEnded {
        /// How.
        outcome: Outcome,
    },
}

/// The result of one call to [`Simulation::step`](crate::tick::Simulation::step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Steps completed after this one.
    pub step: u64,
    /// Simulation time after this step.
    pub sim_time: f64,
    /// Room containing the player, if any.
    pub current_room: Option<RoomId>,
    /// Episode state after this step.
    pub outcome: Outcome,
    /// Events in the order they happened.
    pub events: Vec<StepEvent>,
}

impl StepReport {
    /// Whether any event matches `pred`.
    pub fn any(&self, pred: impl Fn(&StepEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }

    /// Number of events matching `pred`.
    pub fn count(&self, pred: impl Fn(&StepEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_over() {
        assert!(!Outcome::Running.is_over());
        assert!(Outcome::Won.is_over());
        assert!(Outcome::Lost.is_over());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = StepEvent::EnemyKilled {
            enemy: EntityId::from_raw(4),
            kind: "spider".to_owned(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "enemy_killed");
        assert_eq!(json["enemy"], 4);

        let damaged = StepEvent::PlayerDamaged {
            source: DamageSource::Boss(EntityId::from_raw(9)),
            amount: 0.5,
        };
        let json = serde_json::to_value(&damaged).unwrap();
        assert_eq!(json["source"]["source"], "boss");
    }
}
