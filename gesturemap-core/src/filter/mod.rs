use std::fmt::Debug;

use gesturemap_types::Time;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

mod exponential;
mod kalman;
mod one_euro;
mod predictive;
mod simple;

pub use exponential::{DoubleExponentialFilter, ExponentialFilter};
pub use kalman::KalmanFilter;
pub use one_euro::OneEuroFilter;
pub use predictive::PredictiveFilter;
pub use simple::{MuteFilter, PassthroughFilter};

/// Used when two samples share a timestamp
pub(crate) const FALLBACK_DT: f32 = 1. / 60.;

/**
 * Turns a stream of noisy absolute positions into a smoothed stream
 *
 * Every implementation passes the first sample after construction or [`Filter::reset`] through unchanged
 */
pub trait Filter: Debug + Send {
    fn reset(&mut self);

    fn filter(&mut self, sample: Vector3<f32>, time: Time) -> Vector3<f32>;

    fn kind(&self) -> FilterKind;
}

/// Serializable description of a filter and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    OneEuro {
        min_cutoff: f32,
        beta: f32,
        derivative_cutoff: f32,
    },
    Kalman {
        process_noise: f32,
        measurement_noise: f32,
    },
    Exponential {
        alpha: f32,
    },
    DoubleExponential {
        alpha: f32,
        beta: f32,
    },
    Predictive {
        lookahead: f32,
    },
    Mute,
    Passthrough,
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::OneEuro {
            min_cutoff: 1.,
            beta: 0.007,
            derivative_cutoff: 1.,
        }
    }
}

impl FilterKind {
    pub fn build(self) -> Box<dyn Filter> {
        match self {
            FilterKind::OneEuro {
                min_cutoff,
                beta,
                derivative_cutoff,
            } => Box::new(OneEuroFilter::new(min_cutoff, beta, derivative_cutoff)),
            FilterKind::Kalman {
                process_noise,
                measurement_noise,
            } => Box::new(KalmanFilter::new(process_noise, measurement_noise)),
            FilterKind::Exponential { alpha } => Box::new(ExponentialFilter::new(alpha)),
            FilterKind::DoubleExponential { alpha, beta } => {
                Box::new(DoubleExponentialFilter::new(alpha, beta))
            }
            FilterKind::Predictive { lookahead } => Box::new(PredictiveFilter::new(lookahead)),
            FilterKind::Mute => Box::new(MuteFilter::default()),
            FilterKind::Passthrough => Box::new(PassthroughFilter),
        }
    }
}

/// Seconds between two samples, never zero
pub(crate) fn sample_dt(previous: Time, current: Time) -> f32 {
    let dt = current.saturating_duration_since(previous).as_secs_f32();
    if dt > 0. {
        dt
    } else {
        FALLBACK_DT
    }
}
