//! Delve Engine -- deterministic simulation core for a room-based dungeon
//! crawler.
//!
//! This crate builds on [`delve_registry`] to provide the game itself: room
//! templates are laid out into a connected dungeon, populated with enemies,
//! items and locked doors, and advanced one fixed-order step at a time by
//! [`Simulation`](tick::Simulation). An external advisor (a language model,
//! a script, a test) can read a JSON view of the world and answer with
//! validated commands through a thread-safe queue that the stepper drains at
//! the start of each step.
//!
//! # Quick Start
//!
//! ```
//! use delve_engine::prelude::*;
//!
//! let mut sim = Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap();
//!
//! // Walk east through the open door into the puzzle room.
//! let east = InputFrame { right: true, ..InputFrame::default() };
//! sim.run_steps(180, &east);
//! assert_eq!(sim.current_room(), Some(RoomId(1)));
//!
//! // Commands go through the same validation an advisor's would.
//! let applied = sim
//!     .apply_command(&Command::HealPlayer { amount: 5.0 })
//!     .unwrap();
//! assert!(matches!(applied, Applied::Healed { .. }));
//! ```

#![deny(unsafe_code)]

pub mod advisory;
pub mod ai;
pub mod collision;
pub mod companion;
pub mod config;
pub mod events;
pub mod input;
pub mod layout;
pub mod lifecycle;
pub mod player;
pub mod protocol;
pub mod replay;
pub mod snapshot;
pub mod templates;
pub mod tick;

/// Re-export the registry crate for convenience.
pub use delve_registry;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that stop a simulation from being built or reset.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The templates do not form a valid dungeon.
    #[error("invalid dungeon layout: {0}")]
    Layout(#[from] layout::LayoutError),

    /// Populating the registry failed.
    #[error("registry error: {0}")]
    Registry(#[from] delve_registry::RegistryError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use delve_registry::prelude::*;

    pub use crate::advisory::{
        advisory_channel, spawn_advisory, Advice, Advisor, AdvisoryQueue, AdvisoryRequest,
        AdvisorySender, AdvisorySnapshot,
    };
    pub use crate::ai::BossPhase;
    pub use crate::collision::{CollisionIndex, Obstacle};
    pub use crate::companion::{AssistAction, Companion};
    pub use crate::config::{ConfigError, SimConfig};
    pub use crate::events::{DamageSource, Outcome, StepEvent, StepReport};
    pub use crate::input::InputFrame;
    pub use crate::layout::{Dungeon, LayoutEngine, LayoutError, LayoutParams, Room, WallSegment};
    pub use crate::player::Player;
    pub use crate::protocol::{AdvisoryReply, Applied, Command, ProtocolError};
    pub use crate::replay::{replay, ReplayLog, ReplayRecorder, ReplayResult};
    pub use crate::snapshot::SimulationState;
    pub use crate::templates::{DoorLink, DungeonTemplates, RoomTemplate, RoomType};
    pub use crate::tick::{Simulation, StepDiagnostics};
    pub use crate::EngineError;
}
