//! The per-frame simulation stepper.
//!
//! A [`Simulation`] owns the placed dungeon, the entity registry, the player
//! and the companion. Each call to [`Simulation::step`] advances the world by
//! `dt` seconds in a fixed phase order:
//!
//! 0. Queued advisory answers are applied.
//! 1. Player movement and dash.
//! 2. Facing and casting.
//! 3. Current room lookup.
//! 4. Projectiles advance, hit or expire.
//! 5. Item pickup.
//! 6. Door interaction.
//! 7. Regular enemy AI.
//! 8. Boss AI.
//! 9. Companion assist.
//! 10. Termination check.
//!
//! Steps are strictly sequential (`&mut self`) and read no clock, so the same
//! templates, config and input sequence always produce the same state.
//!
//! # Example
//!
//! ```
//! use delve_engine::prelude::*;
//!
//! let mut sim = Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap();
//!
//! let walk_east = InputFrame { right: true, ..InputFrame::default() };
//! for _ in 0..30 {
//!     sim.step(&walk_east, 1.0 / 60.0);
//! }
//!
//! assert!(sim.player().position.x > 2.0);
//! assert_eq!(sim.step_count(), 30);
//! assert_eq!(sim.outcome(), Outcome::Running);
//! ```

use std::time::{Duration, Instant};

use delve_registry::prelude::*;

use crate::advisory::{advisory_channel, AdvisoryQueue, AdvisorySender};
use crate::collision::CollisionIndex;
use crate::companion::Companion;
use crate::config::SimConfig;
use crate::events::{Outcome, StepEvent, StepReport};
use crate::input::{InputFrame, InputLatch};
use crate::layout::{Dungeon, LayoutEngine, LayoutParams, WallSegment};
use crate::player::Player;
use crate::templates::DungeonTemplates;
use crate::EngineError;

// ---------------------------------------------------------------------------
// StepDiagnostics
// ---------------------------------------------------------------------------

/// Wall-clock timing of the last step, per phase.
#[derive(Debug, Clone, Default)]
pub struct StepDiagnostics {
    /// Time per phase, in execution order.
    pub phase_times: Vec<(&'static str, Duration)>,
    /// Total time for the step.
    pub total_time: Duration,
}

struct PhaseTimer {
    started: Instant,
    last: Instant,
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimer {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            phases: Vec::with_capacity(10),
        }
    }

    fn mark(&mut self, phase: &'static str) {
        let now = Instant::now();
        self.phases.push((phase, now - self.last));
        self.last = now;
    }

    fn finish(self) -> StepDiagnostics {
        StepDiagnostics {
            total_time: self.started.elapsed(),
            phase_times: self.phases,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The dungeon simulation.
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) templates: DungeonTemplates,
    pub(crate) dungeon: Dungeon,
    pub(crate) registry: EntityRegistry,
    pub(crate) player: Player,
    pub(crate) companion: Companion,
    /// Boss entity, if the templates have one.
    pub(crate) boss: Option<EntityId>,
    /// Set when the boss dies; drives the win check.
    pub(crate) boss_slain: bool,
    pub(crate) outcome: Outcome,
    latch: InputLatch,
    sim_time: f64,
    step_counter: u64,
    advisory_tx: AdvisorySender,
    pub(crate) advisory_rx: AdvisoryQueue,
    last_diagnostics: StepDiagnostics,
}

impl Simulation {
    /// Validate `config`, lay out `templates` and populate the dungeon.
    pub fn new(templates: DungeonTemplates, config: SimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let dungeon = LayoutEngine::new(LayoutParams::from_config(&config)).build(&templates)?;
        let mut registry = EntityRegistry::new();
        let boss = dungeon.populate(&templates, &mut registry, &config)?;
        let (advisory_tx, advisory_rx) = advisory_channel();

        tracing::info!(
            rooms = dungeon.rooms().len(),
            entities = registry.len(),
            "dungeon built"
        );

        Ok(Self {
            player: Player::spawn(&config.player),
            companion: Companion::new(&config.companion, 0.0),
            config,
            templates,
            dungeon,
            registry,
            boss,
            boss_slain: false,
            outcome: Outcome::Running,
            latch: InputLatch::default(),
            sim_time: 0.0,
            step_counter: 0,
            advisory_tx,
            advisory_rx,
            last_diagnostics: StepDiagnostics::default(),
        })
    }

    /// The built-in four-room dungeon with default tuning.
    pub fn with_default_dungeon() -> Result<Self, EngineError> {
        Self::new(DungeonTemplates::default_dungeon(), SimConfig::default())
    }

    /// Start the episode over from the templates.
    ///
    /// The player, companion, entities and door locks return to their
    /// initial state and stepping resumes. The id counter keeps counting, so
    /// ids from the previous episode never come back. Answers still queued
    /// from the previous episode are discarded.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.registry.clear();
        self.dungeon.restore_locks(&self.templates);
        self.boss = self
            .dungeon
            .populate(&self.templates, &mut self.registry, &self.config)?;
        self.boss_slain = false;
        self.player = Player::spawn(&self.config.player);
        self.companion = Companion::new(&self.config.companion, 0.0);
        self.latch.reset();
        self.outcome = Outcome::Running;
        self.sim_time = 0.0;
        self.step_counter = 0;

        let stale = self.advisory_rx.drain().len();
        if stale > 0 {
            tracing::debug!(stale, "discarded advice from the previous episode");
        }
        tracing::info!(entities = self.registry.len(), "episode reset");
        Ok(())
    }

    /// Advance the world by `dt` seconds.
    ///
    /// A negative or non-finite `dt` is treated as zero. Once the episode is
    /// over this does nothing until [`reset`](Self::reset).
    pub fn step(&mut self, input: &InputFrame, dt: f64) -> StepReport {
        if self.outcome.is_over() {
            return self.report(Vec::new());
        }

        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            tracing::warn!(dt, "invalid time step clamped to zero");
            0.0
        };
        let now = self.sim_time;
        let pressed = self.latch.update(input);
        let mut events = Vec::new();
        let mut timer = PhaseTimer::start();

        self.drain_advisory(&mut events);
        timer.mark("advisory");

        self.move_player(input, pressed.dash, now, dt, &mut events);
        timer.mark("movement");

        self.update_facing(input);
        if pressed.cast {
            self.cast(now, &mut events);
        }
        timer.mark("facing");

        let room = self.current_room();
        timer.mark("room");

        self.advance_projectiles(now, dt, &mut events);
        timer.mark("projectiles");

        self.pick_up_items(&mut events);
        timer.mark("pickup");

        if pressed.interact {
            self.interact_with_doors(&mut events);
        }
        timer.mark("doors");

        self.run_enemy_ai(room, dt, now, &mut events);
        timer.mark("enemies");

        self.run_boss_ai(room, dt, &mut events);
        timer.mark("boss");

        if pressed.assist {
            self.companion_assist(now, &mut events);
        }
        timer.mark("companion");

        self.sim_time += dt;
        self.step_counter += 1;
        self.check_termination(&mut events);
        timer.mark("termination");

        self.last_diagnostics = timer.finish();
        self.report(events)
    }

    /// Step `count` times with the configured fixed time step and the same
    /// input, stopping early if the episode ends. Returns the number of steps
    /// that ran.
    pub fn run_steps(&mut self, count: u64, input: &InputFrame) -> u64 {
        let dt = self.config.fixed_dt;
        let mut ran = 0;
        for _ in 0..count {
            if self.outcome.is_over() {
                break;
            }
            self.step(input, dt);
            ran += 1;
        }
        ran
    }

    // -- phases --------------------------------------------------------------

    fn move_player(
        &mut self,
        input: &InputFrame,
        dash_pressed: bool,
        now: f64,
        dt: f64,
        events: &mut Vec<StepEvent>,
    ) {
        let direction = input.move_axis().normalize_or_zero();
        self.player.move_direction = direction;

        if dash_pressed {
            if self.player.is_dashing(now) {
                tracing::debug!("dash ignored, window still open");
            } else {
                self.dash(direction, now, events);
            }
        }

        if self.player.is_dashing(now) || direction == Vec3::ZERO {
            return;
        }
        let from = self.player.position;
        let to = from + direction * (self.config.player.speed * dt);
        if self.path_clear(from, to) {
            self.player.position = to;
        }
    }

    fn dash(&mut self, direction: Vec3, now: f64, events: &mut Vec<StepEvent>) {
        let heading = if direction == Vec3::ZERO {
            self.player.facing
        } else {
            direction
        };
        let from = self.player.position;
        let to = from + heading * self.config.player.dash_distance;
        if self.path_clear(from, to) {
            self.player.position = to;
        }
        self.player.dash_until = Some(now + self.config.player.dash_window);
        events.push(StepEvent::Dashed {
            from,
            to: self.player.position,
        });
    }

    /// Whether the player disc can travel from `from` to `to` without
    /// touching anything, sampled at half-radius intervals.
    fn path_clear(&self, from: Vec3, to: Vec3) -> bool {
        let radius = self.config.player.radius;
        let index = self.collision();
        let distance = from.planar_distance(to);
        let samples = (distance / (radius * 0.5)).ceil().max(1.0) as usize;
        (1..=samples).all(|i| {
            let t = i as f64 / samples as f64;
            !index.blocked(from + (to - from) * t, radius)
        })
    }

    fn update_facing(&mut self, input: &InputFrame) {
        let Some(aim) = input.aim else {
            return;
        };
        let facing = (aim - self.player.position).planar().normalize_or_zero();
        if facing != Vec3::ZERO {
            self.player.facing = facing;
        }
    }

    fn cast(&mut self, now: f64, events: &mut Vec<StepEvent>) {
        if !self.player.can_cast(now, self.config.player.cast_cooldown) {
            tracing::debug!("cast ignored, cooling down");
            return;
        }
        match self.spawn_projectile(now) {
            Ok(projectile) => {
                self.player.last_cast_at = Some(now);
                events.push(StepEvent::ProjectileCast { projectile });
            }
            Err(e) => tracing::warn!(error = %e, "could not spawn projectile"),
        }
    }

    fn advance_projectiles(&mut self, now: f64, dt: f64, events: &mut Vec<StepEvent>) {
        let cfg = self.config.combat.clone();
        let end = now + dt;

        for id in self.registry.ids(EntityKind::Projectile) {
            let Some(projectile) = self.registry.projectile_mut(id) else {
                continue;
            };
            // Never travel past the end of the projectile's lifetime.
            let remaining = (cfg.projectile_ttl - projectile.age(now)).max(0.0);
            projectile.position += projectile.velocity * dt.min(remaining);
            let position = projectile.position;
            let expired = end - projectile.created_at >= cfg.projectile_ttl;

            let struck = self
                .registry
                .enemies()
                .find(|e| e.health > 0.0 && e.position.planar_distance(position) < cfg.projectile_hit_radius)
                .map(|e| (e.id, (e.health - cfg.projectile_damage).max(0.0)));

            if let Some((enemy, remaining_health)) = struck {
                self.registry.remove(id);
                events.push(StepEvent::ProjectileHit {
                    projectile: id,
                    enemy,
                    remaining_health,
                });
                self.damage_enemy(enemy, cfg.projectile_damage, events);
            } else if expired {
                self.registry.remove(id);
                events.push(StepEvent::ProjectileExpired { projectile: id });
            }
        }
    }

    fn pick_up_items(&mut self, events: &mut Vec<StepEvent>) {
        let reach = self.config.player.pickup_radius;
        let position = self.player.position;
        let in_reach: Vec<EntityId> = self
            .registry
            .items()
            .filter(|i| i.position.planar_distance(position) < reach)
            .map(|i| i.id)
            .collect();

        for id in in_reach {
            let Some(Entity::Item(item)) = self.registry.remove(id) else {
                continue;
            };
            events.push(StepEvent::ItemPicked {
                item: id,
                item_type: item.item_type.clone(),
            });
            if item.item_type == POTION_ITEM {
                self.heal_player(self.config.items.potion_heal, events);
            }
            self.player.inventory.push(item.item_type);
        }
    }

    fn interact_with_doors(&mut self, events: &mut Vec<StepEvent>) {
        let reach = self.config.player.interact_radius;
        let position = self.player.position;
        let in_reach: Vec<EntityId> = self
            .registry
            .doors()
            .filter(|d| d.locked && d.position.planar_distance(position) <= reach)
            .map(|d| d.id)
            .collect();

        for id in in_reach {
            // Opening a door also removes its partner on the other side.
            if !self.registry.contains(id) {
                continue;
            }
            if self.player.take_item(KEY_ITEM) {
                self.unlock_door(id, events);
            } else {
                tracing::debug!(door = %id, "locked door needs a key");
                events.push(StepEvent::DoorNeedsKey { door: id });
            }
        }
    }

    fn check_termination(&mut self, events: &mut Vec<StepEvent>) {
        let outcome = if self.player.is_dead() {
            Outcome::Lost
        } else if self.boss_slain {
            Outcome::Won
        } else {
            return;
        };
        self.outcome = outcome;
        tracing::info!(?outcome, step = self.step_counter, "episode ended");
        events.push(StepEvent::EpisodeEnded { outcome });
    }

    fn report(&self, events: Vec<StepEvent>) -> StepReport {
        StepReport {
            step: self.step_counter,
            sim_time: self.sim_time,
            current_room: self.current_room(),
            outcome: self.outcome,
            events,
        }
    }

    // -- accessors -----------------------------------------------------------

    /// The room containing the player, derived from the current position.
    pub fn current_room(&self) -> Option<RoomId> {
        self.dungeon.room_at(self.player.position).map(|r| r.id)
    }

    /// Collision queries against the current walls and locked doors.
    pub fn collision(&self) -> CollisionIndex<'_> {
        CollisionIndex::new(self.dungeon.walls(), &self.registry)
    }

    /// The player.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The companion.
    pub fn companion(&self) -> &Companion {
        &self.companion
    }

    /// Every live entity.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The placed dungeon.
    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    /// Solid wall segments.
    pub fn walls(&self) -> &[WallSegment] {
        self.dungeon.walls()
    }

    /// The templates the dungeon was built from.
    pub fn templates(&self) -> &DungeonTemplates {
        &self.templates
    }

    /// The active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The boss entity, while it lives.
    pub fn boss_id(&self) -> Option<EntityId> {
        self.boss.filter(|id| self.registry.contains(*id))
    }

    /// Episode state.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Seconds simulated since the episode started.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Steps taken since the episode started.
    pub fn step_count(&self) -> u64 {
        self.step_counter
    }

    /// A sender advisory threads can use to queue answers.
    pub fn advisory_sender(&self) -> AdvisorySender {
        self.advisory_tx.clone()
    }

    /// Timing of the last step.
    pub fn last_diagnostics(&self) -> &StepDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;

    const DT: f64 = 1.0 / 60.0;

    fn sim() -> Simulation {
        Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap()
    }

    fn press(f: impl FnOnce(&mut InputFrame)) -> InputFrame {
        let mut frame = InputFrame::default();
        f(&mut frame);
        frame
    }

    /// An empty start room with no enemies, for isolated movement tests.
    fn quiet_sim() -> Simulation {
        let mut templates = DungeonTemplates::default_dungeon();
        templates.rooms[0].enemies.clear();
        Simulation::new(templates, SimConfig::default()).unwrap()
    }

    // -- 1. construction -----------------------------------------------------

    #[test]
    fn new_simulation_starts_in_start_room() {
        let sim = sim();
        assert_eq!(sim.current_room(), Some(RoomId(0)));
        assert_eq!(sim.sim_time(), 0.0);
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.outcome(), Outcome::Running);
        assert!(sim.boss_id().is_some());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            fixed_dt: -1.0,
            ..SimConfig::default()
        };
        let err = Simulation::new(DungeonTemplates::default_dungeon(), config)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }

    // -- 2. movement ---------------------------------------------------------

    #[test]
    fn walking_moves_at_speed() {
        let mut sim = quiet_sim();
        sim.step(&press(|f| f.right = true), 0.1);
        let p = sim.player().position;
        assert!((p.x - 0.5).abs() < 1e-9);
        assert_eq!(p.y, 0.1);
    }

    #[test]
    fn diagonal_is_normalized() {
        let mut sim = quiet_sim();
        sim.step(
            &press(|f| {
                f.right = true;
                f.forward = true;
            }),
            0.1,
        );
        let p = sim.player().position;
        assert!((p.planar_distance(Vec3::new(0.0, 0.1, 0.0)) - 0.5).abs() < 1e-9);
        assert!(p.z < 0.0);
    }

    #[test]
    fn walls_stop_the_player() {
        let mut sim = quiet_sim();
        let north = press(|f| f.back = true);
        for _ in 0..200 {
            sim.step(&north, DT);
        }
        // North wall inner face is at z = 5 - 0.25; the disc stops short.
        assert!(sim.player().position.z <= 4.25 + 1e-9);
        assert!(sim.player().position.z > 4.0);
    }

    #[test]
    fn dash_is_a_burst_then_a_window() {
        let mut sim = quiet_sim();
        let dash = press(|f| {
            f.dash = true;
            f.left = true;
        });
        let report = sim.step(&dash, DT);
        assert!(report.any(|e| matches!(e, StepEvent::Dashed { .. })));
        assert!((sim.player().position.x + 3.0).abs() < 1e-9);

        // Still inside the window: held keys do not move the player.
        let x = sim.player().position.x;
        sim.step(&press(|f| f.left = true), DT);
        assert_eq!(sim.player().position.x, x);
    }

    #[test]
    fn dash_into_wall_is_blocked() {
        let mut sim = quiet_sim();
        sim.player.position = Vec3::new(-3.5, 0.1, 0.0);
        let dash = press(|f| {
            f.dash = true;
            f.left = true;
        });
        sim.step(&dash, DT);
        assert_eq!(sim.player().position.x, -3.5);
        assert!(sim.player().is_dashing(sim.sim_time()));
    }

    #[test]
    fn idle_dash_uses_facing() {
        let mut sim = quiet_sim();
        sim.step(&press(|f| f.dash = true), DT);
        // Spawn facing is +z.
        assert!((sim.player().position.z - 3.0).abs() < 1e-9);
    }

    // -- 3. facing and casting -----------------------------------------------

    #[test]
    fn aim_sets_planar_facing() {
        let mut sim = quiet_sim();
        sim.step(&press(|f| f.aim = Some(Vec3::new(3.0, 7.0, 0.0))), DT);
        assert_eq!(sim.player().facing, Vec3::new(1.0, 0.0, 0.0));

        // Aiming at the player's own position keeps the old facing.
        sim.step(&press(|f| f.aim = Some(Vec3::new(0.0, 0.0, 0.0))), DT);
        assert_eq!(sim.player().facing, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn holding_cast_fires_once() {
        let mut sim = quiet_sim();
        let cast = press(|f| f.cast = true);
        let first = sim.step(&cast, DT);
        assert_eq!(first.count(|e| matches!(e, StepEvent::ProjectileCast { .. })), 1);
        for _ in 0..30 {
            sim.step(&cast, DT);
        }
        assert_eq!(sim.registry().count(EntityKind::Projectile), 1);
    }

    #[test]
    fn cast_cooldown_gates_rapid_presses() {
        let mut sim = quiet_sim();
        let cast = press(|f| f.cast = true);
        sim.step(&cast, DT);
        sim.step(&InputFrame::idle(), DT);
        sim.step(&cast, DT);
        assert_eq!(sim.registry().count(EntityKind::Projectile), 1);
    }

    #[test]
    fn projectile_kills_spider_in_two_hits() {
        let mut templates = DungeonTemplates::default_dungeon();
        templates.rooms[0].enemies.truncate(1);
        let mut sim = Simulation::new(templates, SimConfig::default()).unwrap();
        // Spider at (2, 0.5, 2): aim straight at it.
        let aim = Some(Vec3::new(2.0, 0.0, 2.0));
        let cast = press(|f| {
            f.cast = true;
            f.aim = aim;
        });
        let idle = press(|f| f.aim = aim);

        let mut hits = 0;
        let mut killed = false;
        for i in 0..120 {
            let frame = if i % 30 == 0 { &cast } else { &idle };
            let report = sim.step(frame, DT);
            hits += report.count(|e| matches!(e, StepEvent::ProjectileHit { .. }));
            killed |= report.any(|e| matches!(e, StepEvent::EnemyKilled { kind, .. } if kind == "spider"));
        }
        assert_eq!(hits, 2);
        assert!(killed);
        assert_eq!(sim.registry().count(EntityKind::Enemy), 3);
    }

    // -- 4. pickups ----------------------------------------------------------

    #[test]
    fn potion_pickup_heals_and_goes_to_inventory() {
        let mut sim = quiet_sim();
        sim.player.health = 50.0;
        sim.apply_command(&Command::Spawn {
            item_type: "potion".to_owned(),
            position: None,
        })
        .unwrap();

        let report = sim.step(&InputFrame::idle(), DT);
        assert!(report.any(|e| matches!(e, StepEvent::ItemPicked { .. })));
        assert!(report.any(|e| matches!(e, StepEvent::PlayerHealed { amount } if *amount == 20.0)));
        assert_eq!(sim.player().health, 70.0);
        assert_eq!(sim.player().count_of("potion"), 1);
    }

    // -- 5. time step --------------------------------------------------------

    #[test]
    fn bad_dt_is_clamped_to_zero() {
        let mut sim = quiet_sim();
        sim.step(&press(|f| f.right = true), f64::NAN);
        sim.step(&press(|f| f.right = true), -1.0);
        assert_eq!(sim.sim_time(), 0.0);
        assert_eq!(sim.player().position.x, 0.0);
        assert_eq!(sim.step_count(), 2);
    }

    #[test]
    fn run_steps_uses_fixed_dt() {
        let mut sim = quiet_sim();
        assert_eq!(sim.run_steps(60, &InputFrame::idle()), 60);
        assert!((sim.sim_time() - 1.0).abs() < 1e-9);
        assert_eq!(sim.last_diagnostics().phase_times.len(), 11);
    }

    // -- 6. termination ------------------------------------------------------

    #[test]
    fn death_ends_the_episode_and_freezes_stepping() {
        let mut sim = sim();
        sim.player.health = 1.0;
        // Walk into the spider at (2, 0.5, 2).
        let walk = press(|f| {
            f.right = true;
            f.back = true;
        });
        let mut ended = None;
        for _ in 0..120 {
            let report = sim.step(&walk, DT);
            if report.outcome.is_over() {
                ended = Some(report);
                break;
            }
        }
        let report = ended.unwrap();
        assert_eq!(report.outcome, Outcome::Lost);
        assert!(report.any(|e| matches!(e, StepEvent::EpisodeEnded { outcome: Outcome::Lost })));

        let frozen = sim.step_count();
        let after = sim.step(&walk, DT);
        assert!(after.events.is_empty());
        assert_eq!(sim.step_count(), frozen);
        assert_eq!(sim.run_steps(10, &walk), 0);
    }

    #[test]
    fn reset_restores_everything() {
        let mut sim = sim();
        let issued_before = sim.registry().ids_issued();
        sim.player.health = 0.0;
        sim.step(&InputFrame::idle(), DT);
        assert_eq!(sim.outcome(), Outcome::Lost);

        sim.reset().unwrap();
        assert_eq!(sim.outcome(), Outcome::Running);
        assert_eq!(sim.player().health, 100.0);
        assert_eq!(sim.registry().count(EntityKind::Enemy), 5);
        assert_eq!(sim.registry().count(EntityKind::Door), 1);
        assert!(sim.registry().ids_issued() > issued_before);
        assert_eq!(sim.companion().budget, 3);
    }
}
