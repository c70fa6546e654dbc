//! Headless runner: build a dungeon, drive it with a scripted input plan and
//! print a JSON summary of the episode.
//!
//! ```text
//! delve-headless [--level rooms.json] [--config sim.json] [--script plan.json]
//!                [--steps N] [--record replay.json]
//! ```
//!
//! `--help` lists the flags.
//!
//! A script is a JSON array of `{ "frames": n, "input": { ... } }` segments,
//! played in order. Without one the player stands still. Logging follows
//! `RUST_LOG` and defaults to `warn`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use delve_engine::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Segment {
    frames: u64,
    #[serde(default)]
    input: InputFrame,
}

/// Run a dungeon without a window and print a JSON summary.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room templates as JSON. Defaults to the built-in four-room dungeon.
    #[arg(long, value_name = "FILE")]
    level: Option<PathBuf>,
    /// Simulation config as JSON.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Input plan: a JSON array of `{ "frames": n, "input": { ... } }`.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
    /// Stop after this many steps. Without a script, idle this long (600).
    #[arg(long, value_name = "N")]
    steps: Option<u64>,
    /// Write a replay log here.
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Summary {
    outcome: Outcome,
    steps: u64,
    sim_time: f64,
    current_room: Option<RoomId>,
    player_health: f64,
    enemies_left: usize,
    events: usize,
    state_hash: String,
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let templates = match &args.level {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading level {}", path.display()))?;
            DungeonTemplates::from_json(&text).context("parsing level")?
        }
        None => DungeonTemplates::default_dungeon(),
    };
    let config = match &args.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig::default(),
    };
    let script: Vec<Segment> = match &args.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            serde_json::from_str(&text).context("parsing script")?
        }
        None => vec![Segment {
            frames: args.steps.unwrap_or(600),
            input: InputFrame::idle(),
        }],
    };

    let mut sim = Simulation::new(templates, config)?;
    let mut recorder = args.record.as_ref().map(|_| ReplayRecorder::new(&sim, 60));
    let dt = sim.config().fixed_dt;
    let limit = args.steps.unwrap_or(u64::MAX);
    let mut events = 0;

    'script: for segment in &script {
        for _ in 0..segment.frames {
            if sim.outcome().is_over() || sim.step_count() >= limit {
                break 'script;
            }
            if let Some(recorder) = recorder.as_mut() {
                recorder.record_step(&sim, &segment.input, dt);
            }
            events += sim.step(&segment.input, dt).events.len();
        }
    }

    tracing::info!(outcome = ?sim.outcome(), steps = sim.step_count(), "run finished");

    if let (Some(path), Some(recorder)) = (&args.record, recorder) {
        let log = recorder.finish(&sim);
        std::fs::write(path, serde_json::to_vec_pretty(&log)?)
            .with_context(|| format!("writing replay {}", path.display()))?;
    }

    let summary = Summary {
        outcome: sim.outcome(),
        steps: sim.step_count(),
        sim_time: sim.sim_time(),
        current_room: sim.current_room(),
        player_health: sim.player().health,
        enemies_left: sim.registry().count(EntityKind::Enemy),
        events,
        state_hash: sim.state_hash(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn all_flags_parse() {
        let args = Args::try_parse_from([
            "delve-headless",
            "--level",
            "rooms.json",
            "--config",
            "sim.json",
            "--script",
            "plan.json",
            "--steps",
            "120",
            "--record",
            "replay.json",
        ])
        .unwrap();
        assert_eq!(args.level, Some(PathBuf::from("rooms.json")));
        assert_eq!(args.config, Some(PathBuf::from("sim.json")));
        assert_eq!(args.script, Some(PathBuf::from("plan.json")));
        assert_eq!(args.steps, Some(120));
        assert_eq!(args.record, Some(PathBuf::from("replay.json")));
    }

    #[test]
    fn no_flags_means_defaults() {
        let args = Args::try_parse_from(["delve-headless"]).unwrap();
        assert!(args.level.is_none() && args.script.is_none() && args.steps.is_none());
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(Args::try_parse_from(["delve-headless", "--steps", "many"]).is_err());
        assert!(Args::try_parse_from(["delve-headless", "--steps"]).is_err());
        assert!(Args::try_parse_from(["delve-headless", "--turbo"]).is_err());
    }

    #[test]
    fn script_segments_default_to_idle_input() {
        let script: Vec<Segment> =
            serde_json::from_str(r#"[{ "frames": 3 }, { "frames": 2, "input": { "right": true } }]"#)
                .unwrap();
        assert_eq!(script[0].frames, 3);
        assert!(!script[0].input.right);
        assert!(script[1].input.right);
    }
}
