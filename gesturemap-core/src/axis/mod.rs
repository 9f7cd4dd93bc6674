use std::time::Duration;

use gesturemap_types::{Button, GestureEvent, MotionDelta, Phase, Time};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::capability::CapabilityRegistry;

mod filtered;
mod throttled;

pub use filtered::{FilteredAxisMapping, MoveHandler};
pub use throttled::{StepOutput, ThrottledAxisMapping};

/**
 * Converts continuous motion into output
 *
 * Axis mappings are owned by a binding which forwards every gesture event, motion delta and tick to them
 */
pub trait AxisMapping: Send {
    fn name(&self) -> &str;

    /// Accumulate a raw motion delta
    fn add_delta(&mut self, delta: MotionDelta);

    /// Throttled work, at most once per configured interval
    fn update(&mut self, now: Time, registry: &CapabilityRegistry);

    fn handle(&mut self, event: &GestureEvent);

    /// Drop everything accumulated so far
    fn reset(&mut self);

    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivationMode {
    /// Active between press and release of the designated button
    Hold,
    /// Each press of the designated button flips the active flag
    Toggle,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, vector: &Vector3<f32>) -> f32 {
        match self {
            Axis::X => vector.x,
            Axis::Y => vector.y,
            Axis::Z => vector.z,
        }
    }
}

/// Per axis scaling applied to every raw delta before it is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensitivity {
    pub horizontal: f32,
    pub vertical: f32,
    pub global: f32,
    pub invert_x: bool,
    pub invert_y: bool,
    pub invert_z: bool,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            horizontal: 1.,
            vertical: 1.,
            global: 1.,
            invert_x: false,
            invert_y: false,
            invert_z: false,
        }
    }
}

impl Sensitivity {
    pub fn apply(&self, delta: MotionDelta) -> Vector3<f32> {
        let sign = |invert: bool| if invert { -1. } else { 1. };

        Vector3::new(
            delta.x * self.horizontal * self.global * sign(self.invert_x),
            delta.y * self.vertical * self.global * sign(self.invert_y),
            delta.z * self.global * sign(self.invert_z),
        )
    }
}

/// Active flag driven by press/release of a designated button
#[derive(Debug, Clone, Copy)]
pub struct Activation {
    pub button: Button,
    pub mode: ActivationMode,
    active: bool,
}

impl Activation {
    pub fn new(button: Button, mode: ActivationMode) -> Self {
        Self {
            button,
            mode,
            active: mode == ActivationMode::Always,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true if the active flag changed
    pub fn handle(&mut self, event: &GestureEvent) -> bool {
        if event.button() != self.button {
            return false;
        }

        let next = match (self.mode, event.phase()) {
            (ActivationMode::Hold, Phase::Press) => true,
            (ActivationMode::Hold, Phase::Release) => false,
            (ActivationMode::Toggle, Phase::Press) => !self.active,
            _ => return false,
        };

        let changed = next != self.active;
        self.active = next;
        changed
    }
}

/// Lets work through at most once per interval, the first request always passes
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    pub interval: Duration,
    last: Option<Time>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self, now: Time) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
