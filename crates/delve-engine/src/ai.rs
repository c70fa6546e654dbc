//! Enemy and boss behaviour.
//!
//! Regular enemies only act while the player is in their room: they walk
//! straight at the player and hit in melee range on a cooldown. The boss
//! reads its phase from its health fraction every step, so damage taken
//! earlier in the same step changes how it moves immediately.

use delve_registry::prelude::{EntityId, RoomId};
use serde::{Deserialize, Serialize};

use crate::config::BossConfig;
use crate::events::{DamageSource, StepEvent};
use crate::tick::Simulation;

/// Boss behaviour tier, derived purely from health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossPhase {
    /// Above `passive_above`: stands still.
    Passive,
    /// Between the thresholds: chases at `chase_speed`.
    Chasing,
    /// Below `enraged_below`: chases at `enraged_speed`.
    Enraged,
}

impl BossPhase {
    /// Phase for a health fraction in `[0, 1]`.
    pub fn from_fraction(fraction: f64, config: &BossConfig) -> Self {
        if fraction > config.passive_above {
            Self::Passive
        } else if fraction >= config.enraged_below {
            Self::Chasing
        } else {
            Self::Enraged
        }
    }

    /// Movement speed in this phase.
    pub fn speed(self, config: &BossConfig) -> f64 {
        match self {
            Self::Passive => 0.0,
            Self::Chasing => config.chase_speed,
            Self::Enraged => config.enraged_speed,
        }
    }
}

impl Simulation {
    /// Move regular enemies in `room` toward the player and resolve melee.
    pub(crate) fn run_enemy_ai(
        &mut self,
        room: Option<RoomId>,
        dt: f64,
        now: f64,
        events: &mut Vec<StepEvent>,
    ) {
        let Some(room) = room else {
            return;
        };
        let cfg = self.config.enemy.clone();
        let target = self.player.position;

        let mut hits: Vec<EntityId> = Vec::new();
        for enemy in self.registry.enemies_mut() {
            if enemy.is_boss() || enemy.health <= 0.0 || enemy.room != room {
                continue;
            }
            enemy.position = enemy.position.step_towards_planar(target, cfg.speed * dt);

            let in_range = enemy.position.planar_distance(target) <= cfg.melee_range;
            let rested = enemy
                .last_attack_at
                .map_or(true, |at| now - at >= cfg.attack_cooldown);
            if in_range && rested {
                enemy.last_attack_at = Some(now);
                hits.push(enemy.id);
            }
        }

        for id in hits {
            let amount = self.player.damage(cfg.melee_damage);
            events.push(StepEvent::PlayerDamaged {
                source: DamageSource::Enemy(id),
                amount,
            });
        }
    }

    /// Move the boss by phase and apply contact damage.
    pub(crate) fn run_boss_ai(&mut self, room: Option<RoomId>, dt: f64, events: &mut Vec<StepEvent>) {
        let Some(boss_id) = self.boss else {
            return;
        };
        let cfg = &self.config.boss;
        let target = self.player.position;
        let Some(boss) = self.registry.enemy_mut(boss_id) else {
            return;
        };
        if boss.health <= 0.0 || Some(boss.room) != room {
            return;
        }

        let phase = BossPhase::from_fraction(boss.health_fraction(), cfg);
        boss.position = boss.position.step_towards_planar(target, phase.speed(cfg) * dt);

        if boss.position.planar_distance(target) < cfg.contact_range {
            let amount = self.player.damage(cfg.contact_dps * dt);
            if amount > 0.0 {
                events.push(StepEvent::PlayerDamaged {
                    source: DamageSource::Boss(boss_id),
                    amount,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        let cfg = BossConfig::default();
        assert_eq!(BossPhase::from_fraction(1.0, &cfg), BossPhase::Passive);
        assert_eq!(BossPhase::from_fraction(0.75, &cfg), BossPhase::Passive);
        assert_eq!(BossPhase::from_fraction(0.7, &cfg), BossPhase::Chasing);
        assert_eq!(BossPhase::from_fraction(0.65, &cfg), BossPhase::Chasing);
        assert_eq!(BossPhase::from_fraction(0.3, &cfg), BossPhase::Chasing);
        assert_eq!(BossPhase::from_fraction(0.29, &cfg), BossPhase::Enraged);
        assert_eq!(BossPhase::from_fraction(0.0, &cfg), BossPhase::Enraged);
    }

    #[test]
    fn phase_speeds() {
        let cfg = BossConfig::default();
        assert_eq!(BossPhase::Passive.speed(&cfg), 0.0);
        assert_eq!(BossPhase::Chasing.speed(&cfg), 3.0);
        assert_eq!(BossPhase::Enraged.speed(&cfg), 5.0);
    }
}
