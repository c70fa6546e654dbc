//! Entity lifecycle operations shared by the stepper, the companion and the
//! command protocol.
//!
//! Anything that creates or destroys an entity during play goes through one
//! of these methods, so the registry, the dungeon's lock flags and the step
//! events never disagree.

use delve_registry::prelude::*;

use crate::events::StepEvent;
use crate::tick::Simulation;

/// Height at which dropped items float.
pub const ITEM_HEIGHT: f64 = 0.5;

/// Outcome of a flat hit on every regular enemy.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Weakened {
    pub affected: usize,
    pub killed: Vec<EntityId>,
}

impl Simulation {
    /// Place an item in the world.
    pub(crate) fn spawn_item(
        &mut self,
        item_type: &str,
        position: Vec3,
    ) -> Result<EntityId, RegistryError> {
        let id = self.registry.allocate_id();
        self.registry.add(Item {
            id,
            item_type: item_type.to_owned(),
            position,
        })
    }

    /// Place an item on the floor under the player.
    pub(crate) fn spawn_item_at_player(&mut self, item_type: &str) -> Result<EntityId, RegistryError> {
        let p = self.player.position;
        self.spawn_item(item_type, Vec3::new(p.x, ITEM_HEIGHT, p.z))
    }

    /// Launch a projectile from the player along its facing.
    pub(crate) fn spawn_projectile(&mut self, now: f64) -> Result<EntityId, RegistryError> {
        let id = self.registry.allocate_id();
        self.registry.add(Projectile {
            id,
            position: self.player.position,
            velocity: self.player.facing * self.config.combat.projectile_speed,
            created_at: now,
        })
    }

    /// Hurt one enemy. An enemy reaching zero is removed immediately.
    ///
    /// Returns the enemy's remaining health, or `None` if it does not exist.
    pub(crate) fn damage_enemy(
        &mut self,
        id: EntityId,
        amount: f64,
        events: &mut Vec<StepEvent>,
    ) -> Option<f64> {
        let enemy = self.registry.enemy_mut(id)?;
        enemy.apply_damage(amount);
        let remaining = enemy.health;
        if enemy.is_dead() {
            if let Some(Entity::Enemy(dead)) = self.registry.remove(id) {
                if Some(id) == self.boss {
                    self.boss_slain = true;
                }
                tracing::debug!(enemy = %id, kind = %dead.kind, "enemy killed");
                events.push(StepEvent::EnemyKilled {
                    enemy: id,
                    kind: dead.kind,
                });
            }
        }
        Some(remaining)
    }

    /// Apply flat damage to every non-boss enemy, removing those that die.
    pub(crate) fn weaken_enemies(&mut self, amount: f64, events: &mut Vec<StepEvent>) -> Weakened {
        let targets: Vec<EntityId> = self
            .registry
            .enemies()
            .filter(|e| !e.is_boss())
            .map(|e| e.id)
            .collect();

        let mut outcome = Weakened::default();
        for id in targets {
            if let Some(remaining) = self.damage_enemy(id, amount, events) {
                outcome.affected += 1;
                if remaining <= 0.0 {
                    outcome.killed.push(id);
                }
            }
        }
        outcome
    }

    /// Open a locked door. Every door entity joining the same pair of rooms
    /// is removed and the rooms' lock flags are cleared.
    ///
    /// Returns the removed door ids (empty if `door` is not a locked door).
    pub(crate) fn unlock_door(&mut self, door: EntityId, events: &mut Vec<StepEvent>) -> Vec<EntityId> {
        let Some((a, b)) = self.registry.door(door).map(|d| (d.room, d.target)) else {
            return Vec::new();
        };

        let pair: Vec<EntityId> = self
            .registry
            .doors()
            .filter(|d| (d.room == a && d.target == b) || (d.room == b && d.target == a))
            .map(|d| d.id)
            .collect();

        for &id in &pair {
            if let Some(Entity::Door(removed)) = self.registry.remove(id) {
                events.push(StepEvent::DoorUnlocked {
                    door: id,
                    room: removed.room,
                    target: removed.target,
                });
            }
        }
        self.dungeon.set_link_locked(a, b, false);
        tracing::info!(%door, from = %a, to = %b, "door unlocked");
        pair
    }

    /// Heal the player, clamped to the cap. Returns the amount healed.
    pub(crate) fn heal_player(&mut self, amount: f64, events: &mut Vec<StepEvent>) -> f64 {
        let healed = self.player.heal(amount);
        if healed > 0.0 {
            events.push(StepEvent::PlayerHealed { amount: healed });
        }
        healed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::templates::DungeonTemplates;

    fn sim() -> Simulation {
        Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap()
    }

    #[test]
    fn killing_the_boss_marks_it_slain() {
        let mut sim = sim();
        let boss = sim.boss_id().unwrap();
        let mut events = Vec::new();

        assert_eq!(sim.damage_enemy(boss, 40.0, &mut events), Some(60.0));
        assert!(!sim.boss_slain);
        assert_eq!(sim.damage_enemy(boss, 100.0, &mut events), Some(0.0));
        assert!(sim.boss_slain);
        assert!(sim.registry().enemy(boss).is_none());
        assert!(matches!(events.last(), Some(StepEvent::EnemyKilled { kind, .. }) if kind == "boss"));

        // Already gone.
        assert_eq!(sim.damage_enemy(boss, 1.0, &mut events), None);
    }

    #[test]
    fn weaken_spares_the_boss() {
        let mut sim = sim();
        let mut events = Vec::new();
        let hit = sim.weaken_enemies(25.0, &mut events);
        assert_eq!(hit.affected, 4);
        assert_eq!(hit.killed.len(), 4);
        assert_eq!(sim.registry().count(EntityKind::Enemy), 1);
        assert!(sim.registry().enemies().all(|e| e.is_boss()));
    }

    #[test]
    fn unlock_removes_door_and_flags() {
        let mut sim = sim();
        let door = sim.registry().doors().next().unwrap().id;
        let mut events = Vec::new();

        assert_eq!(sim.unlock_door(door, &mut events), vec![door]);
        assert_eq!(sim.registry().count(EntityKind::Door), 0);
        assert!(!sim.dungeon().has_locked_door_touching(RoomId(1)));
        assert!(sim.unlock_door(door, &mut events).is_empty());
    }

    #[test]
    fn spawned_items_float_at_item_height() {
        let mut sim = sim();
        let id = sim.spawn_item_at_player("potion").unwrap();
        let item = sim.registry().item(id).unwrap();
        assert_eq!(item.position, Vec3::new(0.0, ITEM_HEIGHT, 0.0));
    }
}
