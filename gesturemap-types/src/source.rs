use std::{fmt::Debug, ops::Deref, sync::Arc};

use thiserror::Error;

use crate::{event::GestureEvent, MotionDelta};

/**
 * The connection from an input source to the router
 *
 * Cloneable and usable from any thread; sending only enqueues, it never runs handler logic
 */
#[derive(Debug, Clone)]
pub struct SourceSink(pub Arc<dyn SourceSinkTrait>);

impl Deref for SourceSink {
    type Target = dyn SourceSinkTrait;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("Source Detached")]
    Detached,
    #[error("Event Queue Full")]
    QueueFull,
}

pub trait SourceSinkTrait: Debug + Send + Sync {
    fn send_gesture_event(&self, event: GestureEvent) -> Result<(), SinkError>;
    fn send_motion_delta(&self, delta: MotionDelta) -> Result<(), SinkError>;
}

/**
 * A named producer of gesture events and motion deltas
 *
 * `enabled` hands over the sink to publish through, `disabled` is called once the source stops being the active
 * one, after which anything sent through the old sink is discarded
 */
pub trait InputSource: Send {
    fn name(&self) -> &str;
    fn enabled(&mut self, sink: SourceSink);
    fn disabled(&mut self);
}
