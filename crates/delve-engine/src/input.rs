//! Per-step player input.
//!
//! An [`InputFrame`] is what the input collaborator hands the stepper each
//! step: which keys are held and where the cursor aims. Buttons that trigger
//! one-shot actions (dash, cast, interact, assist) only fire on the frame they
//! go down; the [`InputLatch`] turns held state into rising edges.

use delve_registry::prelude::Vec3;
use serde::{Deserialize, Serialize};

/// Input held during one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    /// Move toward -z.
    pub forward: bool,
    /// Move toward +z.
    pub back: bool,
    /// Move toward -x.
    pub left: bool,
    /// Move toward +x.
    pub right: bool,
    /// Dash button.
    pub dash: bool,
    /// Cast button.
    pub cast: bool,
    /// Interact button.
    pub interact: bool,
    /// Ask the companion for help.
    pub assist: bool,
    /// World-space aim point, if the cursor is over the floor.
    pub aim: Option<Vec3>,
}

impl InputFrame {
    /// A frame with nothing pressed.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Whether nothing is pressed and nothing is aimed at.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Unnormalized movement axis from the held direction keys.
    pub fn move_axis(&self) -> Vec3 {
        let mut axis = Vec3::ZERO;
        if self.forward {
            axis.z -= 1.0;
        }
        if self.back {
            axis.z += 1.0;
        }
        if self.left {
            axis.x -= 1.0;
        }
        if self.right {
            axis.x += 1.0;
        }
        axis
    }
}

/// Actions whose button went down this step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pressed {
    /// Dash requested.
    pub dash: bool,
    /// Cast requested.
    pub cast: bool,
    /// Interact requested.
    pub interact: bool,
    /// Assist requested.
    pub assist: bool,
}

/// Remembers last step's buttons to detect presses.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputLatch {
    previous: Pressed,
}

impl InputLatch {
    /// Record `frame` and return the buttons that went down since the last
    /// call.
    pub fn update(&mut self, frame: &InputFrame) -> Pressed {
        let held = Pressed {
            dash: frame.dash,
            cast: frame.cast,
            interact: frame.interact,
            assist: frame.assist,
        };
        let pressed = Pressed {
            dash: held.dash && !self.previous.dash,
            cast: held.cast && !self.previous.cast,
            interact: held.interact && !self.previous.interact,
            assist: held.assist && !self.previous.assist,
        };
        self.previous = held;
        pressed
    }

    /// Forget held buttons.
    pub fn reset(&mut self) {
        self.previous = Pressed::default();
    }
}
