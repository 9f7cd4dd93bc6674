use gesturemap_types::Time;
use nalgebra::Vector3;

use super::{sample_dt, Filter, FilterKind};

/// Weight of the newest velocity estimate
const VELOCITY_SMOOTHING: f32 = 0.5;

/// Extrapolates the input `lookahead` seconds ahead along its smoothed velocity to hide transport latency
#[derive(Debug, Clone)]
pub struct PredictiveFilter {
    pub lookahead: f32,

    last: Option<(Vector3<f32>, Time)>,
    velocity: Vector3<f32>,
}

impl PredictiveFilter {
    pub fn new(lookahead: f32) -> Self {
        Self {
            lookahead: lookahead.max(0.),
            last: None,
            velocity: Vector3::zeros(),
        }
    }
}

impl Filter for PredictiveFilter {
    fn reset(&mut self) {
        self.last = None;
        self.velocity = Vector3::zeros();
    }

    fn filter(&mut self, sample: Vector3<f32>, time: Time) -> Vector3<f32> {
        let (previous, previous_time) = match self.last.replace((sample, time)) {
            Some(last) => last,
            None => return sample,
        };

        let dt = sample_dt(previous_time, time);
        let instant_velocity = (sample - previous) / dt;
        self.velocity += (instant_velocity - self.velocity) * VELOCITY_SMOOTHING;

        sample + self.velocity * self.lookahead
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Predictive {
            lookahead: self.lookahead,
        }
    }
}
