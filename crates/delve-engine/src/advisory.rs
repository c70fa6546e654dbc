//! Bridge to the advisory collaborator.
//!
//! The collaborator (typically a language-model service) is slow and lives
//! off the simulation thread. The round trip is:
//!
//! 1. The stepper's owner builds an [`AdvisoryRequest`] from the current
//!    state plus the player's utterance.
//! 2. [`spawn_advisory`] runs an [`Advisor`] on a background thread and
//!    queues the parsed answer through an [`AdvisorySender`].
//! 3. At the start of the next [`Simulation::step`], every queued answer is
//!    drained without blocking and applied (commands) or surfaced in the
//!    step report (text replies, rejections).
//!
//! Each queued answer is delivered exactly once.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use delve_engine::prelude::*;
//!
//! let mut sim = Simulation::new(DungeonTemplates::default_dungeon(), SimConfig::default()).unwrap();
//! let advisor: Arc<dyn Advisor> = Arc::new(|_req: &AdvisoryRequest| -> anyhow::Result<String> {
//!     Ok(r#"{"type":"reply","text":"Look for a key."}"#.to_owned())
//! });
//!
//! let request = sim.advisory_request("where do I go?");
//! spawn_advisory(advisor, request, sim.advisory_sender()).join().unwrap();
//!
//! let report = sim.step(&InputFrame::idle(), 1.0 / 60.0);
//! assert!(report.any(|e| matches!(e, StepEvent::AdvisoryReply { .. })));
//! ```

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use delve_registry::prelude::{EntityId, RoomId, Vec3};
use serde::{Deserialize, Serialize};

use crate::events::StepEvent;
use crate::protocol::{AdvisoryReply, Command, ProtocolError};
use crate::tick::Simulation;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An enemy as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyView {
    /// Entity id.
    pub id: EntityId,
    /// Enemy kind.
    pub kind: String,
    /// World position.
    pub position: Vec3,
    /// Current health.
    pub health: f64,
    /// Health cap.
    pub max_health: f64,
}

/// An item as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    /// Entity id.
    pub id: EntityId,
    /// Item type.
    pub item_type: String,
    /// World position.
    pub position: Vec3,
}

/// A projectile as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Entity id.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
}

/// A locked door as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorView {
    /// Entity id.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Owning room.
    pub room: RoomId,
    /// Room behind the door.
    pub target: RoomId,
}

/// The player as the collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// World position.
    pub position: Vec3,
    /// Current health.
    pub health: f64,
    /// Held items.
    pub inventory: Vec<String>,
}

/// What the collaborator is allowed to know about the game.
///
/// Only entities in (or on the walls of) the player's current room are
/// listed. Outside every room, everything is listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorySnapshot {
    /// Room containing the player.
    pub current_room: Option<RoomId>,
    /// The player.
    pub player: PlayerView,
    /// Interventions the companion has left.
    pub companion_budget: u32,
    /// Visible enemies.
    pub enemies: Vec<EnemyView>,
    /// Visible items.
    pub items: Vec<ItemView>,
    /// Visible projectiles.
    pub projectiles: Vec<ProjectileView>,
    /// Visible locked doors.
    pub doors: Vec<DoorView>,
}

/// A question for the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    /// What the player said.
    pub utterance: String,
    /// State at the time of asking.
    pub snapshot: AdvisorySnapshot,
}

impl AdvisoryRequest {
    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Simulation {
    /// Build the collaborator's view of the current state.
    pub fn advisory_snapshot(&self) -> AdvisorySnapshot {
        let room = self.current_room().and_then(|id| self.dungeon.room(id));
        let margin = self.dungeon.params().wall_thickness;
        let visible = |p: Vec3| room.map_or(true, |r| r.contains_with_margin(p, margin));

        AdvisorySnapshot {
            current_room: room.map(|r| r.id),
            player: PlayerView {
                position: self.player.position,
                health: self.player.health,
                inventory: self.player.inventory.clone(),
            },
            companion_budget: self.companion.budget,
            enemies: self
                .registry
                .enemies()
                .filter(|e| visible(e.position))
                .map(|e| EnemyView {
                    id: e.id,
                    kind: e.kind.clone(),
                    position: e.position,
                    health: e.health,
                    max_health: e.max_health,
                })
                .collect(),
            items: self
                .registry
                .items()
                .filter(|i| visible(i.position))
                .map(|i| ItemView {
                    id: i.id,
                    item_type: i.item_type.clone(),
                    position: i.position,
                })
                .collect(),
            projectiles: self
                .registry
                .projectiles()
                .filter(|p| visible(p.position))
                .map(|p| ProjectileView {
                    id: p.id,
                    position: p.position,
                })
                .collect(),
            doors: self
                .registry
                .doors()
                .filter(|d| visible(d.position))
                .map(|d| DoorView {
                    id: d.id,
                    position: d.position,
                    room: d.room,
                    target: d.target,
                })
                .collect(),
        }
    }

    /// Package the current state with an utterance.
    pub fn advisory_request(&self, utterance: impl Into<String>) -> AdvisoryRequest {
        AdvisoryRequest {
            utterance: utterance.into(),
            snapshot: self.advisory_snapshot(),
        }
    }

    /// Apply everything queued since the last step.
    pub(crate) fn drain_advisory(&mut self, events: &mut Vec<StepEvent>) {
        for advice in self.advisory_rx.drain() {
            match advice {
                Ok(AdvisoryReply::Reply { text }) => {
                    events.push(StepEvent::AdvisoryReply { text });
                }
                Ok(AdvisoryReply::Command { command }) => {
                    match self.apply_command_logged(&command, events) {
                        Ok(applied) => events.push(StepEvent::CommandApplied { command, applied }),
                        Err(e) => {
                            tracing::warn!(error = %e, ?command, "advisory command rejected");
                            events.push(StepEvent::CommandRejected {
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) => events.push(StepEvent::CommandRejected {
                    reason: e.to_string(),
                }),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// One queued answer: a parsed reply, or why it could not be used.
pub type Advice = Result<AdvisoryReply, ProtocolError>;

/// Sending half of the advisory queue. Cheap to clone, safe to move to any
/// thread.
#[derive(Debug, Clone)]
pub struct AdvisorySender(Sender<Advice>);

/// Receiving half of the advisory queue, owned by the simulation.
#[derive(Debug)]
pub struct AdvisoryQueue(Receiver<Advice>);

/// Create a connected sender/queue pair. The channel is unbounded.
#[must_use]
pub fn advisory_channel() -> (AdvisorySender, AdvisoryQueue) {
    let (tx, rx) = mpsc::channel();
    (AdvisorySender(tx), AdvisoryQueue(rx))
}

impl AdvisorySender {
    /// Queue an answer. Returns `false` if the simulation is gone.
    pub fn send(&self, advice: Advice) -> bool {
        self.0.send(advice).is_ok()
    }

    /// Queue a command directly.
    pub fn send_command(&self, command: Command) -> bool {
        self.send(Ok(AdvisoryReply::Command { command }))
    }

    /// Parse a raw collaborator payload and queue the result. Malformed
    /// payloads are logged and queued as rejections.
    pub fn submit_payload(&self, payload: &str) -> bool {
        let advice = AdvisoryReply::parse(payload);
        if let Err(e) = &advice {
            tracing::warn!(error = %e, "advisory payload rejected");
        }
        self.send(advice)
    }
}

impl AdvisoryQueue {
    /// Non-blocking receive of one answer.
    #[must_use]
    pub fn try_recv(&self) -> Option<Advice> {
        self.0.try_recv().ok()
    }

    /// Take every answer queued so far.
    #[must_use]
    pub fn drain(&self) -> Vec<Advice> {
        let mut out = Vec::new();
        while let Some(advice) = self.try_recv() {
            out.push(advice);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

/// Something that answers advisory requests with a raw payload.
pub trait Advisor: Send + Sync {
    /// Produce a payload for [`AdvisoryReply::parse`].
    fn advise(&self, request: &AdvisoryRequest) -> anyhow::Result<String>;
}

impl<F> Advisor for F
where
    F: Fn(&AdvisoryRequest) -> anyhow::Result<String> + Send + Sync,
{
    fn advise(&self, request: &AdvisoryRequest) -> anyhow::Result<String> {
        self(request)
    }
}

/// Ask `advisor` on a background thread and queue its answer on `sender`.
pub fn spawn_advisory(
    advisor: Arc<dyn Advisor>,
    request: AdvisoryRequest,
    sender: AdvisorySender,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let delivered = match advisor.advise(&request) {
            Ok(payload) => sender.submit_payload(&payload),
            Err(e) => {
                tracing::warn!(error = %e, utterance = %request.utterance, "advisor failed");
                sender.send(Err(ProtocolError::Advisor {
                    details: format!("{e:#}"),
                }))
            }
        };
        if !delivered {
            tracing::debug!("simulation dropped before advice arrived");
        }
    })
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

    #[test]
    fn queue_drains_in_order() {
        let (tx, rx) = advisory_channel();
        assert!(tx.submit_payload(r#"{"type":"reply","text":"one"}"#));
        assert!(tx.submit_payload("garbage"));
        let drained = rx.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained[0].is_ok());
        assert!(matches!(drained[1], Err(ProtocolError::Malformed { .. })));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn send_fails_once_queue_is_dropped() {
        let (tx, rx) = advisory_channel();
        drop(rx);
        assert!(!tx.send_command(Command::HealPlayer { amount: 1.0 }));
    }

    #[test]
    fn snapshot_shows_only_current_room() {
        let sim = sim();
        let snap = sim.advisory_snapshot();
        assert_eq!(snap.current_room, Some(RoomId(0)));
        assert_eq!(snap.enemies.len(), 2);
        assert!(snap.enemies.iter().all(|e| e.kind == "spider"));
        assert!(snap.items.is_empty());
        assert!(snap.doors.is_empty());
        assert_eq!(snap.player.health, 100.0);
        assert_eq!(snap.companion_budget, 3);
    }

    #[test]
    fn request_round_trips_as_json() {
        let sim = sim();
        let request = sim.advisory_request("help");
        let json = request.to_json().unwrap();
        let back: AdvisoryRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn failing_advisor_queues_rejection() {
        let mut sim = sim();
        let advisor: Arc<dyn Advisor> = Arc::new(|_: &AdvisoryRequest| -> anyhow::Result<String> {
            Err(anyhow::anyhow!("service unavailable"))
        });
        spawn_advisory(advisor, sim.advisory_request("hi"), sim.advisory_sender())
            .join()
            .unwrap();

        let report = sim.step(&crate::input::InputFrame::idle(), 0.0);
        assert!(report.any(
            |e| matches!(e, StepEvent::CommandRejected { reason } if reason.contains("service unavailable"))
        ));
        assert_eq!(sim.registry().count(EntityKind::Enemy), 5);
    }
}
