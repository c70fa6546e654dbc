//! Input recording and deterministic replay.
//!
//! A [`ReplayRecorder`] captures the templates and config a simulation was
//! built from, every input frame with its `dt`, and periodic state-hash
//! checkpoints. [`replay`] rebuilds a fresh simulation from the log, feeds
//! the inputs back, and reports the first checkpoint whose hash differs.
//!
//! ```
//! use delve_engine::prelude::*;
//!
//! let mut sim = Simulation::with_default_dungeon().unwrap();
//! let mut recorder = ReplayRecorder::new(&sim, 10);
//!
//! let input = InputFrame { right: true, cast: true, ..InputFrame::default() };
//! for _ in 0..50 {
//!     recorder.record_step(&sim, &input, 1.0 / 60.0);
//!     sim.step(&input, 1.0 / 60.0);
//! }
//!
//! let log = recorder.finish(&sim);
//! let result = replay(&log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```
//!
//! Advice arriving through the advisory queue is not recorded, so a run that
//! applied advisory commands will not replay cleanly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::input::InputFrame;
use crate::templates::DungeonTemplates;
use crate::tick::Simulation;
use crate::EngineError;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// Everything needed to re-run an episode from its first step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    pub templates: DungeonTemplates,
    pub config: SimConfig,
    /// Number of steps recorded.
    pub total_steps: u64,
    /// State hash after the final recorded step.
    pub final_hash: Option<String>,
    pub entries: Vec<ReplayEntry>,
}

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Input for a step. Idle steps with the fixed `dt` are not stored.
    Input { step: u64, input: InputFrame, dt: f64 },
    /// State hash taken before the step ran.
    Checkpoint { step: u64, state_hash: String },
}

/// The outcome of [`replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every step ran and every hash matched.
    pub completed: bool,
    pub steps_replayed: u64,
    /// First mismatch, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Where a replay stopped agreeing with the recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub step: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

/// Replay log validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("replay log has two {entry} entries for step {step}")]
    Duplicate { entry: &'static str, step: u64 },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a simulation run into a [`ReplayLog`].
///
/// Call [`record_step`](Self::record_step) before each
/// [`Simulation::step`]. A checkpoint is stored every `checkpoint_interval`
/// steps; an interval of 0 stores one before every step.
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
}

impl ReplayRecorder {
    /// Start recording `sim`, which should be at the start of an episode.
    pub fn new(sim: &Simulation, checkpoint_interval: u64) -> Self {
        if sim.step_count() != 0 {
            tracing::warn!(
                step = sim.step_count(),
                "recording started mid-episode; replay starts from step zero"
            );
        }
        Self {
            log: ReplayLog {
                templates: sim.templates().clone(),
                config: sim.config().clone(),
                total_steps: 0,
                final_hash: None,
                entries: Vec::new(),
            },
            checkpoint_interval,
        }
    }

    /// Record the step `sim` is about to take.
    pub fn record_step(&mut self, sim: &Simulation, input: &InputFrame, dt: f64) {
        let step = sim.step_count();
        let due = self.checkpoint_interval == 0 || step % self.checkpoint_interval == 0;
        if due {
            self.log.entries.push(ReplayEntry::Checkpoint {
                step,
                state_hash: sim.state_hash(),
            });
        }
        if !input.is_empty() || dt != self.log.config.fixed_dt {
            self.log.entries.push(ReplayEntry::Input {
                step,
                input: input.clone(),
                dt,
            });
        }
        self.log.total_steps += 1;
    }

    /// Finish recording, stamping the final hash from `sim`.
    pub fn finish(mut self, sim: &Simulation) -> ReplayLog {
        self.log.final_hash = Some(sim.state_hash());
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Rebuild the simulation from `log` and re-run it, checking every
/// checkpoint and the final hash.
pub fn replay(log: &ReplayLog) -> Result<ReplayResult, ReplayError> {
    let mut inputs: BTreeMap<u64, (&InputFrame, f64)> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { step, input, dt } => {
                if inputs.insert(*step, (input, *dt)).is_some() {
                    return Err(ReplayError::Duplicate { entry: "input", step: *step });
                }
            }
            ReplayEntry::Checkpoint { step, state_hash } => {
                if checkpoints.insert(*step, state_hash.as_str()).is_some() {
                    return Err(ReplayError::Duplicate {
                        entry: "checkpoint",
                        step: *step,
                    });
                }
            }
        }
    }

    let mut sim = Simulation::new(log.templates.clone(), log.config.clone())?;
    let idle = InputFrame::idle();
    let fixed_dt = log.config.fixed_dt;

    for step in 0..log.total_steps {
        if let Some(expected) = checkpoints.get(&step) {
            let actual = sim.state_hash();
            if actual != *expected {
                return Ok(diverged(step, expected, actual));
            }
        }
        let (input, dt) = inputs.get(&step).copied().unwrap_or((&idle, fixed_dt));
        sim.step(input, dt);
    }

    if let Some(expected) = &log.final_hash {
        let actual = sim.state_hash();
        if actual != *expected {
            return Ok(diverged(log.total_steps, expected, actual));
        }
    }

    tracing::debug!(steps = log.total_steps, "replay matched recording");
    Ok(ReplayResult {
        completed: true,
        steps_replayed: log.total_steps,
        first_divergence: None,
    })
}

fn diverged(step: u64, expected: &str, actual: String) -> ReplayResult {
    tracing::warn!(step, "replay diverged from recording");
    ReplayResult {
        completed: false,
        steps_replayed: step,
        first_divergence: Some(ReplayDivergence {
            step,
            expected_hash: expected.to_owned(),
            actual_hash: actual,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn record(steps: u64, interval: u64) -> ReplayLog {
        let mut sim = Simulation::with_default_dungeon().unwrap();
        let mut recorder = ReplayRecorder::new(&sim, interval);
        for i in 0..steps {
            let input = InputFrame {
                right: i % 3 != 0,
                back: i % 5 == 0,
                cast: i % 20 < 2,
                ..InputFrame::default()
            };
            recorder.record_step(&sim, &input, DT);
            sim.step(&input, DT);
        }
        recorder.finish(&sim)
    }

    #[test]
    fn recorded_run_replays_cleanly() {
        let log = record(120, 10);
        assert_eq!(log.total_steps, 120);
        let checkpoints = log
            .entries
            .iter()
            .filter(|e| matches!(e, ReplayEntry::Checkpoint { .. }))
            .count();
        assert_eq!(checkpoints, 12);

        let result = replay(&log).unwrap();
        assert!(result.completed);
        assert_eq!(result.steps_replayed, 120);
    }

    #[test]
    fn tampered_input_is_detected() {
        let mut log = record(60, 5);
        for entry in &mut log.entries {
            if let ReplayEntry::Input { step, input, .. } = entry {
                if *step == 13 {
                    input.left = true;
                    input.right = false;
                }
            }
        }
        let result = replay(&log).unwrap();
        assert!(!result.completed);
        assert_eq!(result.first_divergence.unwrap().step, 15);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let mut log = record(10, 0);
        let first = log.entries[0].clone();
        log.entries.push(first);
        assert!(matches!(replay(&log), Err(ReplayError::Duplicate { step: 0, .. })));
    }

    #[test]
    fn log_serializes_to_json() {
        let log = record(30, 10);
        let json = serde_json::to_string(&log).unwrap();
        let back: ReplayLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_steps, 30);
        assert_eq!(back.entries.len(), log.entries.len());
        assert_eq!(back.final_hash, log.final_hash);
    }
}
