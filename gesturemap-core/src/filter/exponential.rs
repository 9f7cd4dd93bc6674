use gesturemap_types::Time;
use nalgebra::Vector3;

use super::{Filter, FilterKind};

/// Exponential moving average, `alpha` is the weight of the newest sample
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    pub alpha: f32,

    average: Option<Vector3<f32>>,
}

impl ExponentialFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0., 1.),
            average: None,
        }
    }
}

impl Filter for ExponentialFilter {
    fn reset(&mut self) {
        self.average = None;
    }

    fn filter(&mut self, sample: Vector3<f32>, _time: Time) -> Vector3<f32> {
        let average = match self.average {
            Some(average) => average + (sample - average) * self.alpha,
            None => sample,
        };
        self.average = Some(average);
        average
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Exponential { alpha: self.alpha }
    }
}

/// Holt's double exponential smoothing: tracks a level and a trend so steady motion is not lagged behind
#[derive(Debug, Clone)]
pub struct DoubleExponentialFilter {
    pub alpha: f32,
    pub beta: f32,

    state: Option<(Vector3<f32>, Vector3<f32>)>,
}

impl DoubleExponentialFilter {
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self {
            alpha: alpha.clamp(0., 1.),
            beta: beta.clamp(0., 1.),
            state: None,
        }
    }
}

impl Filter for DoubleExponentialFilter {
    fn reset(&mut self) {
        self.state = None;
    }

    fn filter(&mut self, sample: Vector3<f32>, _time: Time) -> Vector3<f32> {
        let (level, trend) = match self.state {
            Some(state) => state,
            None => {
                self.state = Some((sample, Vector3::zeros()));
                return sample;
            }
        };

        let new_level = sample * self.alpha + (level + trend) * (1. - self.alpha);
        let new_trend = (new_level - level) * self.beta + trend * (1. - self.beta);

        self.state = Some((new_level, new_trend));
        new_level
    }

    fn kind(&self) -> FilterKind {
        FilterKind::DoubleExponential {
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}
