use gesturemap_types::Time;
use nalgebra::Vector3;

use super::{Filter, FilterKind};

/// Constant position Kalman estimate, one independent scalar filter per axis sharing the same noise model
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    pub process_noise: f32,
    pub measurement_noise: f32,

    estimate: Option<Vector3<f32>>,
    error_covariance: f32,
}

impl KalmanFilter {
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: None,
            error_covariance: measurement_noise,
        }
    }
}

impl Filter for KalmanFilter {
    fn reset(&mut self) {
        self.estimate = None;
        self.error_covariance = self.measurement_noise;
    }

    fn filter(&mut self, sample: Vector3<f32>, _time: Time) -> Vector3<f32> {
        let estimate = match self.estimate {
            Some(estimate) => estimate,
            None => {
                self.estimate = Some(sample);
                return sample;
            }
        };

        //Predict
        let predicted_covariance = self.error_covariance + self.process_noise;

        //Correct
        let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);
        let corrected = estimate + (sample - estimate) * gain;
        self.error_covariance = (1. - gain) * predicted_covariance;

        self.estimate = Some(corrected);
        corrected
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Kalman {
            process_noise: self.process_noise,
            measurement_noise: self.measurement_noise,
        }
    }
}
