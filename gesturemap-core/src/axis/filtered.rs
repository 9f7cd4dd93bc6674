use std::{fmt, time::Duration};

use gesturemap_types::{GestureEvent, MotionDelta, Time};
use log::{debug, warn};
use nalgebra::Vector3;

use crate::{capability::CapabilityRegistry, filter::Filter};

use super::{Activation, AxisMapping, Sensitivity, Throttle};

/// Receives the smoothed delta of a continuous mapping, e.g. a pointer move on the output target
pub type MoveHandler = Box<dyn FnMut(MotionDelta) + Send>;

/**
 * Smoothed continuous output
 *
 * Raw deltas are summed into an absolute position which is run through the filter on every throttled update,
 * the difference between two consecutive smoothed positions is what gets emitted.
 */
pub struct FilteredAxisMapping {
    name: String,
    activation: Activation,
    pub sensitivity: Sensitivity,
    throttle: Throttle,
    filter: Box<dyn Filter>,
    on_move: MoveHandler,

    accumulated: Vector3<f32>,
    last_position: Option<Vector3<f32>>,
    asleep: bool,
}

impl FilteredAxisMapping {
    pub fn new(
        name: impl Into<String>,
        activation: Activation,
        interval: Duration,
        mut filter: Box<dyn Filter>,
        on_move: MoveHandler,
    ) -> Self {
        filter.reset();

        Self {
            name: name.into(),
            activation,
            sensitivity: Sensitivity::default(),
            throttle: Throttle::new(interval),
            filter,
            on_move,
            accumulated: Vector3::zeros(),
            last_position: None,
            asleep: false,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// The incoming filter starts without history and the output re-anchors on its first sample
    pub fn set_filter(&mut self, mut filter: Box<dyn Filter>) {
        filter.reset();
        self.filter = filter;
        self.last_position = None;
    }

    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn accumulated(&self) -> Vector3<f32> {
        self.accumulated
    }

    /// Last smoothed absolute position, `None` until the first update after a reset
    pub fn last_position(&self) -> Option<Vector3<f32>> {
        self.last_position
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }
}

impl AxisMapping for FilteredAxisMapping {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_delta(&mut self, delta: MotionDelta) {
        if !self.activation.is_active() {
            return;
        }

        let scaled = self.sensitivity.apply(delta);
        if !scaled.iter().all(|component| component.is_finite()) {
            warn!("{}: ignoring non-finite delta {delta:?}", self.name);
            return;
        }
        self.accumulated += scaled;
    }

    fn update(&mut self, now: Time, _registry: &CapabilityRegistry) {
        if !self.activation.is_active() || self.asleep || !self.throttle.ready(now) {
            return;
        }

        let position = self.filter.filter(self.accumulated, now);

        if let Some(last) = self.last_position.replace(position) {
            let delta = position - last;
            if delta != Vector3::zeros() {
                (self.on_move)(delta.into());
            }
        }
    }

    fn handle(&mut self, event: &GestureEvent) {
        if self.activation.handle(event) {
            debug!(
                "{}: active = {}, resetting",
                self.name,
                self.activation.is_active()
            );
            self.reset();
            return;
        }

        if event.button() == self.activation.button && event.is_double_tap() {
            self.asleep = !self.asleep;
            if !self.asleep {
                //Motion while asleep must neither jump nor drift out of the filter history
                self.last_position = None;
                self.filter.reset();
                self.throttle.reset();
            }
            debug!("{}: asleep = {}", self.name, self.asleep);
        }
    }

    fn reset(&mut self) {
        self.accumulated = Vector3::zeros();
        self.last_position = None;
        self.filter.reset();
        self.throttle.reset();
    }

    fn is_active(&self) -> bool {
        self.activation.is_active()
    }
}

impl fmt::Debug for FilteredAxisMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredAxisMapping")
            .field("name", &self.name)
            .field("activation", &self.activation)
            .field("sensitivity", &self.sensitivity)
            .field("throttle", &self.throttle)
            .field("filter", &self.filter)
            .field("accumulated", &self.accumulated)
            .field("last_position", &self.last_position)
            .field("asleep", &self.asleep)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gesturemap_types::{Button, Phase};
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        axis::ActivationMode,
        filter::{ExponentialFilter, PassthroughFilter},
    };

    fn delta(x: f32, y: f32) -> MotionDelta {
        mint::Vector3 { x, y, z: 0. }
    }

    fn recorded_mapping(
        filter: Box<dyn Filter>,
    ) -> (FilteredAxisMapping, Arc<Mutex<Vec<MotionDelta>>>) {
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = moves.clone();
        let mapping = FilteredAxisMapping::new(
            "pointer",
            Activation::new(Button::Touchpad, ActivationMode::Hold),
            Duration::ZERO,
            filter,
            Box::new(move |delta| sink.lock().push(delta)),
        );
        (mapping, moves)
    }

    fn press() -> GestureEvent {
        GestureEvent::on_button(Button::Touchpad, Phase::Press)
    }

    fn release() -> GestureEvent {
        GestureEvent::on_button(Button::Touchpad, Phase::Release)
    }

    #[test]
    fn emits_smoothed_deltas_while_active() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, moves) = recorded_mapping(Box::new(ExponentialFilter::new(0.5)));

        mapping.add_delta(delta(10., 0.));
        mapping.update(Time::from_millis(0), &registry);
        assert_eq!(mapping.last_position(), None, "inactive mappings ignore input");

        mapping.handle(&press());
        mapping.add_delta(delta(10., 0.));
        mapping.update(Time::from_millis(10), &registry);
        assert_eq!(mapping.last_position(), Some(Vector3::new(10., 0., 0.)));
        assert!(moves.lock().is_empty(), "first update only anchors");

        mapping.add_delta(delta(10., 0.));
        mapping.update(Time::from_millis(20), &registry);
        assert_eq!(*moves.lock(), vec![delta(5., 0.)]);
    }

    #[test]
    fn reactivation_anchors_at_the_first_new_delta() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, moves) = recorded_mapping(Box::new(ExponentialFilter::new(0.5)));

        mapping.handle(&press());
        for step in 0..5u64 {
            mapping.add_delta(delta(10., 4.));
            mapping.update(Time::from_millis(step * 10), &registry);
        }
        let emitted_before = moves.lock().len();
        assert!(emitted_before > 0);

        mapping.handle(&release());
        assert_eq!(mapping.accumulated(), Vector3::zeros());
        mapping.handle(&press());

        mapping.add_delta(delta(2., 1.));
        mapping.update(Time::from_millis(100), &registry);
        assert_eq!(mapping.last_position(), Some(Vector3::new(2., 1., 0.)));
        assert_eq!(moves.lock().len(), emitted_before);

        mapping.add_delta(delta(2., 1.));
        mapping.update(Time::from_millis(110), &registry);
        assert_eq!(moves.lock().last(), Some(&delta(1., 0.5)));
    }

    #[test]
    fn double_tap_sleeps_without_losing_state() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, moves) = recorded_mapping(Box::new(PassthroughFilter));
        let double_tap = GestureEvent::on_button(Button::Touchpad, Phase::DoubleTap);

        mapping.handle(&press());
        mapping.add_delta(delta(1., 1.));
        mapping.update(Time::from_millis(0), &registry);

        mapping.handle(&double_tap);
        assert!(mapping.is_asleep());
        mapping.add_delta(delta(50., 50.));
        mapping.update(Time::from_millis(10), &registry);
        assert!(moves.lock().is_empty());
        assert_eq!(mapping.accumulated(), Vector3::new(51., 51., 0.));

        mapping.handle(&double_tap);
        mapping.update(Time::from_millis(20), &registry);
        mapping.add_delta(delta(1., 0.));
        mapping.update(Time::from_millis(30), &registry);
        assert_eq!(*moves.lock(), vec![delta(1., 0.)]);
    }

    #[test]
    fn waking_does_not_drift_out_motion_gathered_asleep() {
        let registry = CapabilityRegistry::empty();
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = moves.clone();
        let mut mapping = FilteredAxisMapping::new(
            "pointer",
            Activation::new(Button::Touchpad, ActivationMode::Always),
            Duration::ZERO,
            Box::new(ExponentialFilter::new(0.5)),
            Box::new(move |delta| sink.lock().push(delta)),
        );
        let double_tap = GestureEvent::on_button(Button::Touchpad, Phase::DoubleTap);

        mapping.add_delta(delta(1., 0.));
        mapping.update(Time::from_millis(0), &registry);

        mapping.handle(&double_tap);
        mapping.add_delta(delta(100., 0.));
        mapping.update(Time::from_millis(10), &registry);

        mapping.handle(&double_tap);
        assert!(!mapping.is_asleep());
        for step in 2..8u64 {
            mapping.update(Time::from_millis(step * 10), &registry);
        }

        let moves = moves.lock();
        assert!(moves.is_empty(), "drifted after waking: {moves:?}");
        assert_eq!(mapping.last_position(), Some(Vector3::new(101., 0., 0.)));
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, moves) = recorded_mapping(Box::new(PassthroughFilter));

        mapping.handle(&press());
        mapping.add_delta(delta(1., 0.));
        mapping.update(Time::from_millis(0), &registry);

        mapping.add_delta(delta(f32::NAN, 0.));
        mapping.add_delta(delta(0., f32::INFINITY));
        mapping.add_delta(delta(2., 1.));
        mapping.update(Time::from_millis(10), &registry);

        assert_eq!(mapping.accumulated(), Vector3::new(3., 1., 0.));
        assert_eq!(*moves.lock(), vec![delta(2., 1.)]);
    }

    #[test]
    fn throttle_limits_emission_rate() {
        let registry = CapabilityRegistry::empty();
        let moves = Arc::new(Mutex::new(Vec::new()));
        let sink = moves.clone();
        let mut mapping = FilteredAxisMapping::new(
            "pointer",
            Activation::new(Button::Touchpad, ActivationMode::Always),
            Duration::from_millis(50),
            Box::new(PassthroughFilter),
            Box::new(move |delta| sink.lock().push(delta)),
        );

        for step in 0..10u64 {
            mapping.add_delta(delta(1., 0.));
            mapping.update(Time::from_millis(step * 10), &registry);
        }

        // Updates at 0 and 50 pass, the second one emits everything gathered in between
        assert_eq!(*moves.lock(), vec![delta(5., 0.)]);
    }

    #[test]
    fn set_filter_starts_fresh() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, moves) = recorded_mapping(Box::new(PassthroughFilter));

        mapping.handle(&press());
        mapping.add_delta(delta(3., 0.));
        mapping.update(Time::from_millis(0), &registry);

        // History left in the incoming filter must not leak into the mapping
        let mut stale = ExponentialFilter::new(0.1);
        stale.filter(Vector3::new(100., 100., 100.), Time::ZERO);
        mapping.set_filter(Box::new(stale));
        assert_eq!(mapping.last_position(), None);
        mapping.update(Time::from_millis(10), &registry);
        assert_eq!(mapping.last_position(), Some(Vector3::new(3., 0., 0.)));
        assert!(moves.lock().is_empty());
    }
}
