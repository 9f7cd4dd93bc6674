use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/**
 * Semantic, target agnostic actions
 *
 * Every output target answers to the same identifiers, a single identifier can be answered by many targets
 */
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionId {
    Select,
    Back,
    Home,
    Up,
    Down,
    Left,
    Right,
    PlayPause,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    Mute,
    PrimaryPress,
    PrimaryRelease,
    SecondaryPress,
    SecondaryRelease,
    TertiaryPress,
    TertiaryRelease,
    /// Fired when a binding becomes the active one
    Chirp,
}

impl ActionId {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Errors a target may report back from an action handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Target Unavailable `{0}`")]
    Unavailable(String),
    #[error("Transport Failure `{0}`")]
    Transport(String),
    #[error("Action Rejected `{0}`")]
    Rejected(String),
}
