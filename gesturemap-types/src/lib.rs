use std::{
    ops::{Add, Sub},
    time::Duration,
};

pub mod action;
pub mod event;
pub mod source;

pub use action::{ActionError, ActionId};
pub use event::{Button, Direction, GestureEvent, GestureState, MalformedGestureError, Phase};
pub use source::{InputSource, SinkError, SourceSink, SourceSinkTrait};

/**
 * A raw motion delta as produced by a source
 *
 * x is horizontal, y is vertical and z is whatever third axis the source reports (scroll, twist, ...)
 */
pub type MotionDelta = mint::Vector3<f32>;

/// Monotonic timestamp in microseconds, supplied by whoever drives the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1000))
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration.as_micros().min(u64::MAX as u128) as u64)
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }

    pub fn as_secs_f32(self) -> f32 {
        self.as_duration().as_secs_f32()
    }

    /// Zero if `earlier` is actually later than `self`
    pub fn saturating_duration_since(self, earlier: Time) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Self::Output {
        Time(self.0.saturating_add(Time::from_duration(rhs).0))
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}
