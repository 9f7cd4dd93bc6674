use std::f32::consts::PI;

use gesturemap_types::Time;
use nalgebra::Vector3;

use super::{sample_dt, Filter, FilterKind};

/**
 * Adaptive low-pass filter (Casiez et al. 2012)
 *
 * Slow motion gets a low cutoff to kill jitter, fast motion raises the cutoff to keep latency down
 */
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    pub min_cutoff: f32,
    pub beta: f32,
    pub derivative_cutoff: f32,

    last: Option<(Vector3<f32>, Time)>,
    derivative: Vector3<f32>,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, derivative_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            derivative_cutoff,
            last: None,
            derivative: Vector3::zeros(),
        }
    }

    fn smoothing_factor(cutoff: f32, dt: f32) -> f32 {
        let tau = 1. / (2. * PI * cutoff.max(f32::EPSILON));
        1. / (1. + tau / dt)
    }
}

impl Filter for OneEuroFilter {
    fn reset(&mut self) {
        self.last = None;
        self.derivative = Vector3::zeros();
    }

    fn filter(&mut self, sample: Vector3<f32>, time: Time) -> Vector3<f32> {
        let (previous, previous_time) = match self.last {
            Some(last) => last,
            None => {
                self.last = Some((sample, time));
                return sample;
            }
        };

        let dt = sample_dt(previous_time, time);

        let raw_derivative = (sample - previous) / dt;
        let derivative_alpha = Self::smoothing_factor(self.derivative_cutoff, dt);
        self.derivative += (raw_derivative - self.derivative) * derivative_alpha;

        let cutoff = self.min_cutoff + self.beta * self.derivative.norm();
        let alpha = Self::smoothing_factor(cutoff, dt);
        let filtered = previous + (sample - previous) * alpha;

        self.last = Some((filtered, time));
        filtered
    }

    fn kind(&self) -> FilterKind {
        FilterKind::OneEuro {
            min_cutoff: self.min_cutoff,
            beta: self.beta,
            derivative_cutoff: self.derivative_cutoff,
        }
    }
}
