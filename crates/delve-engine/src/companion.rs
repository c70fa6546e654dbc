//! The companion: a budget-limited, cooldown-gated helper.
//!
//! When asked, the companion looks at the situation and either drops a potion
//! at the player's feet or weakens every regular enemy. It has a fixed number
//! of interventions per episode, and the cooldown runs from the start of the
//! episode, so it cannot be used in the first few seconds.

use delve_registry::prelude::{EntityKind, POTION_ITEM};
use serde::{Deserialize, Serialize};

use crate::config::CompanionConfig;
use crate::events::StepEvent;
use crate::tick::Simulation;

/// What the companion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistAction {
    /// Dropped a potion at the player.
    SpawnPotion,
    /// Hurt every non-boss enemy.
    WeakenEnemies,
}

/// Why a request was ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refusal {
    /// No interventions left.
    NoBudget,
    /// Too soon after the last one.
    CoolingDown {
        /// Seconds until the next request can succeed.
        remaining: f64,
    },
}

/// Companion state for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    /// Interventions left.
    pub budget: u32,
    /// Sim time of the last intervention (episode start if none yet).
    pub last_used_at: f64,
}

impl Companion {
    /// A full-budget companion whose cooldown starts at `now`.
    pub fn new(config: &CompanionConfig, now: f64) -> Self {
        Self {
            budget: config.budget,
            last_used_at: now,
        }
    }

    /// Whether a request at `now` would be honoured.
    pub fn check(&self, now: f64, cooldown: f64) -> Result<(), Refusal> {
        if self.budget == 0 {
            return Err(Refusal::NoBudget);
        }
        let elapsed = now - self.last_used_at;
        if elapsed < cooldown {
            return Err(Refusal::CoolingDown {
                remaining: cooldown - elapsed,
            });
        }
        Ok(())
    }

    /// Spend one intervention at `now`.
    pub fn consume(&mut self, now: f64) {
        self.budget = self.budget.saturating_sub(1);
        self.last_used_at = now;
    }
}

/// Pick an action: heal when hurt, thin out crowds, heal otherwise.
pub fn choose_action(player_health: f64, enemy_count: usize, config: &CompanionConfig) -> AssistAction {
    if player_health < config.low_health {
        AssistAction::SpawnPotion
    } else if enemy_count > config.crowd_threshold {
        AssistAction::WeakenEnemies
    } else {
        AssistAction::SpawnPotion
    }
}

impl Simulation {
    pub(crate) fn companion_assist(&mut self, now: f64, events: &mut Vec<StepEvent>) {
        let cfg = &self.config.companion;
        if let Err(refusal) = self.companion.check(now, cfg.cooldown) {
            tracing::debug!(?refusal, "companion request ignored");
            return;
        }

        let action = choose_action(
            self.player.health,
            self.registry.count(EntityKind::Enemy),
            cfg,
        );
        match action {
            AssistAction::SpawnPotion => {
                if let Err(e) = self.spawn_item_at_player(POTION_ITEM) {
                    tracing::warn!(error = %e, "companion could not spawn potion");
                    return;
                }
            }
            AssistAction::WeakenEnemies => {
                let amount = self.config.companion.weaken_amount;
                self.weaken_enemies(amount, events);
            }
        }

        self.companion.consume(now);
        tracing::info!(?action, budget_left = self.companion.budget, "companion assisted");
        events.push(StepEvent::CompanionAssisted {
            action,
            budget_left: self.companion.budget,
        });
    }
}
