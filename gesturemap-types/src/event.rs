use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Button {
    #[default]
    None,
    Primary,
    Secondary,
    Tertiary,
    Select,
    Back,
    Home,
    Touchpad,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    None,
    Press,
    Release,
    SingleTap,
    DoubleTap,
    TripleTap,
    Hold,
    TapHold,
    DoubleTapHold,
}

impl Phase {
    /// Sustained gestures have a begin and an end edge
    pub fn is_sustained(self) -> bool {
        matches!(self, Phase::Hold | Phase::TapHold | Phase::DoubleTapHold)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    #[default]
    None,
    Up,
    Right,
    Down,
    Left,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GestureState {
    #[default]
    None,
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedGestureError {
    #[error("Sustained Phase `{0}` Without Gesture State")]
    MissingGestureState(Phase),
    #[error("Gesture State `{1}` On Instant Phase `{0}`")]
    UnexpectedGestureState(Phase, GestureState),
    #[error("Phase `{0}` Without Button")]
    MissingButton(Phase),
    #[error("Direction `{0}` Mixed With Button Or Phase")]
    MixedDirection(Direction),
}

/**
 * A classified input occurrence
 *
 * Gesture events are produced by an external classifier which has already turned raw press/release edges into
 * taps and holds. They are plain values: two events are equal iff all four fields match.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawGestureEvent")]
pub struct GestureEvent {
    button: Button,
    phase: Phase,
    direction: Direction,
    gesture_state: GestureState,
}

impl GestureEvent {
    /// Panics on an inconsistent combination, see [`GestureEvent::try_new`]
    #[track_caller]
    pub fn new(
        button: Button,
        phase: Phase,
        direction: Direction,
        gesture_state: GestureState,
    ) -> Self {
        match Self::try_new(button, phase, direction, gesture_state) {
            Ok(event) => event,
            Err(err) => panic!("Malformed gesture event: {err}"),
        }
    }

    pub fn try_new(
        button: Button,
        phase: Phase,
        direction: Direction,
        gesture_state: GestureState,
    ) -> Result<Self, MalformedGestureError> {
        if direction != Direction::None && (button != Button::None || phase != Phase::None) {
            return Err(MalformedGestureError::MixedDirection(direction));
        }

        if phase != Phase::None && button == Button::None {
            return Err(MalformedGestureError::MissingButton(phase));
        }

        match (phase.is_sustained(), gesture_state) {
            (true, GestureState::None) => {
                return Err(MalformedGestureError::MissingGestureState(phase))
            }
            (false, GestureState::Begin | GestureState::End) => {
                return Err(MalformedGestureError::UnexpectedGestureState(
                    phase,
                    gesture_state,
                ))
            }
            _ => {}
        }

        Ok(Self {
            button,
            phase,
            direction,
            gesture_state,
        })
    }

    #[track_caller]
    pub fn on_button(button: Button, phase: Phase) -> Self {
        Self::new(button, phase, Direction::None, GestureState::None)
    }

    #[track_caller]
    pub fn sustained(button: Button, phase: Phase, gesture_state: GestureState) -> Self {
        Self::new(button, phase, Direction::None, gesture_state)
    }

    #[track_caller]
    pub fn on_direction(direction: Direction) -> Self {
        Self::new(Button::None, Phase::None, direction, GestureState::None)
    }

    pub fn button(&self) -> Button {
        self.button
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture_state
    }

    pub fn is_press(&self) -> bool {
        self.phase == Phase::Press
    }

    pub fn is_release(&self) -> bool {
        self.phase == Phase::Release
    }

    pub fn is_single_tap(&self) -> bool {
        self.phase == Phase::SingleTap
    }

    pub fn is_double_tap(&self) -> bool {
        self.phase == Phase::DoubleTap
    }

    pub fn is_triple_tap(&self) -> bool {
        self.phase == Phase::TripleTap
    }

    pub fn is_hold_begin(&self) -> bool {
        self.is_sustained_edge(Phase::Hold, GestureState::Begin)
    }

    pub fn is_hold_end(&self) -> bool {
        self.is_sustained_edge(Phase::Hold, GestureState::End)
    }

    pub fn is_tap_hold_begin(&self) -> bool {
        self.is_sustained_edge(Phase::TapHold, GestureState::Begin)
    }

    pub fn is_tap_hold_end(&self) -> bool {
        self.is_sustained_edge(Phase::TapHold, GestureState::End)
    }

    pub fn is_double_tap_hold_begin(&self) -> bool {
        self.is_sustained_edge(Phase::DoubleTapHold, GestureState::Begin)
    }

    pub fn is_double_tap_hold_end(&self) -> bool {
        self.is_sustained_edge(Phase::DoubleTapHold, GestureState::End)
    }

    pub fn is_direction(&self) -> bool {
        self.direction != Direction::None
    }

    fn is_sustained_edge(&self, phase: Phase, gesture_state: GestureState) -> bool {
        self.phase == phase && self.gesture_state == gesture_state
    }
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_direction() {
            return write!(f, "direction:{}", self.direction);
        }

        write!(f, "{}:{}", self.button, self.phase)?;
        if self.gesture_state != GestureState::None {
            write!(f, ":{}", self.gesture_state)?;
        }
        Ok(())
    }
}

/// Unvalidated wire form, deserializing always goes through [`GestureEvent::try_new`]
#[derive(Deserialize)]
struct RawGestureEvent {
    #[serde(default)]
    button: Button,
    #[serde(default)]
    phase: Phase,
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    gesture_state: GestureState,
}

impl TryFrom<RawGestureEvent> for GestureEvent {
    type Error = MalformedGestureError;

    fn try_from(raw: RawGestureEvent) -> Result<Self, Self::Error> {
        GestureEvent::try_new(raw.button, raw.phase, raw.direction, raw.gesture_state)
    }
}
