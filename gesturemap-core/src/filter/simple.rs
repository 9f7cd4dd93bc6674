use gesturemap_types::Time;
use nalgebra::Vector3;

use super::{Filter, FilterKind};

/// Freezes output at the first sample it sees until reset
#[derive(Debug, Clone, Default)]
pub struct MuteFilter {
    frozen: Option<Vector3<f32>>,
}

impl Filter for MuteFilter {
    fn reset(&mut self) {
        self.frozen = None;
    }

    fn filter(&mut self, sample: Vector3<f32>, _time: Time) -> Vector3<f32> {
        *self.frozen.get_or_insert(sample)
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Mute
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

impl Filter for PassthroughFilter {
    fn reset(&mut self) {}

    fn filter(&mut self, sample: Vector3<f32>, _time: Time) -> Vector3<f32> {
        sample
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Passthrough
    }
}
