use std::{fmt, time::Duration};

use gesturemap_types::{ActionId, GestureEvent, MotionDelta, Time};
use log::{debug, trace, warn};

use crate::capability::CapabilityRegistry;

use super::{Activation, Axis, AxisMapping, Sensitivity, Throttle};

/// Where the whole steps of a [`ThrottledAxisMapping`] go
pub enum StepOutput {
    /// Invoke `increment` or `decrement` once per step
    Actions {
        increment: ActionId,
        decrement: ActionId,
    },
    /// Called once per throttled update with the signed step count
    SetDelta(Box<dyn FnMut(i32) + Send>),
}

impl fmt::Debug for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutput::Actions {
                increment,
                decrement,
            } => f
                .debug_struct("Actions")
                .field("increment", increment)
                .field("decrement", decrement)
                .finish(),
            StepOutput::SetDelta(_) => f.write_str("SetDelta"),
        }
    }
}

/**
 * Discrete output from a single axis, e.g. a volume knob driven by vertical swipes
 *
 * The fractional remainder is kept across updates: only the whole part of the running total is ever emitted, so
 * slow motion eventually adds up to a step instead of being truncated away.
 */
#[derive(Debug)]
pub struct ThrottledAxisMapping {
    name: String,
    activation: Activation,
    pub sensitivity: Sensitivity,
    pub axis: Axis,
    pub factor: f32,
    throttle: Throttle,
    output: StepOutput,

    accumulated: f64,
    emitted: i64,
}

impl ThrottledAxisMapping {
    pub fn new(
        name: impl Into<String>,
        activation: Activation,
        axis: Axis,
        factor: f32,
        interval: Duration,
        output: StepOutput,
    ) -> Self {
        Self {
            name: name.into(),
            activation,
            sensitivity: Sensitivity::default(),
            axis,
            factor,
            throttle: Throttle::new(interval),
            output,
            accumulated: 0.,
            emitted: 0,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Net steps emitted since the last reset
    pub fn emitted(&self) -> i64 {
        self.emitted
    }

    fn emit(&mut self, steps: i64, registry: &CapabilityRegistry) {
        match &mut self.output {
            StepOutput::Actions {
                increment,
                decrement,
            } => {
                let action = if steps > 0 { *increment } else { *decrement };
                for _ in 0..steps.unsigned_abs() {
                    registry.invoke(action);
                }
            }
            StepOutput::SetDelta(set_delta) => {
                set_delta(steps.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            }
        }
    }
}

impl AxisMapping for ThrottledAxisMapping {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_delta(&mut self, delta: MotionDelta) {
        if !self.activation.is_active() {
            return;
        }

        let scaled = self.sensitivity.apply(delta);
        let step = self.axis.component(&scaled) * self.factor;
        if !step.is_finite() {
            warn!("{}: ignoring non-finite delta {delta:?}", self.name);
            return;
        }
        self.accumulated += step as f64;
    }

    fn update(&mut self, now: Time, registry: &CapabilityRegistry) {
        if !self.activation.is_active() || !self.throttle.ready(now) {
            return;
        }

        let whole = self.accumulated.trunc() as i64;
        let steps = whole - self.emitted;
        if steps == 0 {
            return;
        }

        trace!("{}: {steps} steps", self.name);
        self.emitted = whole;
        self.emit(steps, registry);
    }

    fn handle(&mut self, event: &GestureEvent) {
        if self.activation.handle(event) {
            debug!(
                "{}: active = {}, resetting",
                self.name,
                self.activation.is_active()
            );
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.accumulated = 0.;
        self.emitted = 0;
        self.throttle.reset();
    }

    fn is_active(&self) -> bool {
        self.activation.is_active()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gesturemap_types::{ActionError, Button, Phase};
    use parking_lot::Mutex;

    use super::*;
    use crate::{axis::ActivationMode, capability::CapabilityEntry};

    fn vertical(y: f32) -> MotionDelta {
        mint::Vector3 { x: 0., y, z: 0. }
    }

    fn recorded_mapping(
        mode: ActivationMode,
        factor: f32,
    ) -> (ThrottledAxisMapping, Arc<Mutex<Vec<i32>>>) {
        let steps = Arc::new(Mutex::new(Vec::new()));
        let sink = steps.clone();
        let mapping = ThrottledAxisMapping::new(
            "volume",
            Activation::new(Button::Secondary, mode),
            Axis::Y,
            factor,
            Duration::from_millis(50),
            StepOutput::SetDelta(Box::new(move |delta| sink.lock().push(delta))),
        );
        (mapping, steps)
    }

    #[test]
    fn fractional_remainder_carries_over() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Always, 1.);

        let mut expected_total = 0f64;
        let mut emitted_total = 0i64;
        for tick in 0..5u64 {
            mapping.add_delta(vertical(1.4));
            mapping.update(Time::from_millis(tick * 100), &registry);

            expected_total += 1.4f32 as f64;
            emitted_total = steps.lock().iter().map(|step| *step as i64).sum();
            assert_eq!(emitted_total, expected_total.floor() as i64);
        }

        assert!((7. - emitted_total as f64).abs() <= 1.);
        assert!(steps.lock().iter().all(|step| *step == 1 || *step == 2));
    }

    #[test]
    fn slow_motion_eventually_steps() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Always, 0.1);

        for tick in 0..30u64 {
            mapping.add_delta(vertical(1.));
            mapping.update(Time::from_millis(tick * 100), &registry);
        }

        // 30 * 0.1 = 3, give or take float error on the last step
        let total: i32 = steps.lock().iter().sum();
        assert!(total == 2 || total == 3, "{total}");
    }

    #[test]
    fn negative_motion_steps_down() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Always, 1.);

        mapping.add_delta(vertical(-2.5));
        mapping.update(Time::from_millis(0), &registry);
        mapping.add_delta(vertical(-0.5));
        mapping.update(Time::from_millis(100), &registry);

        assert_eq!(*steps.lock(), vec![-2, -1]);
    }

    #[test]
    fn throttle_batches_steps() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Always, 1.);

        mapping.update(Time::from_millis(0), &registry);
        for tick in 1..5u64 {
            mapping.add_delta(vertical(1.));
            mapping.update(Time::from_millis(tick * 10), &registry);
        }
        mapping.update(Time::from_millis(50), &registry);

        assert_eq!(*steps.lock(), vec![4]);
    }

    #[test]
    fn deactivation_drops_remainder() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Hold, 1.);
        let press = GestureEvent::on_button(Button::Secondary, Phase::Press);
        let release = GestureEvent::on_button(Button::Secondary, Phase::Release);

        mapping.add_delta(vertical(5.));
        mapping.update(Time::from_millis(0), &registry);
        assert!(steps.lock().is_empty());

        mapping.handle(&press);
        mapping.add_delta(vertical(0.9));
        mapping.handle(&release);
        mapping.handle(&press);
        mapping.add_delta(vertical(0.9));
        mapping.update(Time::from_millis(100), &registry);

        assert_eq!(mapping.accumulated(), 0.9f32 as f64);
        assert!(steps.lock().is_empty());
    }

    #[test]
    fn non_finite_deltas_are_ignored() {
        let registry = CapabilityRegistry::empty();
        let (mut mapping, steps) = recorded_mapping(ActivationMode::Always, 1.);

        mapping.add_delta(vertical(f32::NAN));
        mapping.add_delta(vertical(f32::NEG_INFINITY));
        mapping.add_delta(vertical(2.));
        mapping.update(Time::from_millis(0), &registry);

        assert_eq!(mapping.accumulated(), 2.);
        assert_eq!(*steps.lock(), vec![2]);
    }

    #[test]
    fn action_output_invokes_per_step() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CapabilityRegistry::empty();
        for action in [ActionId::VolumeUp, ActionId::VolumeDown] {
            let calls = calls.clone();
            registry.register(CapabilityEntry::new(
                action,
                action.as_str(),
                "records the call",
                move || -> Result<(), ActionError> {
                    calls.lock().push(action);
                    Ok(())
                },
            ));
        }

        let mut mapping = ThrottledAxisMapping::new(
            "volume",
            Activation::new(Button::Secondary, ActivationMode::Always),
            Axis::Y,
            1.,
            Duration::ZERO,
            StepOutput::Actions {
                increment: ActionId::VolumeUp,
                decrement: ActionId::VolumeDown,
            },
        );

        mapping.add_delta(vertical(3.));
        mapping.update(Time::from_millis(0), &registry);
        mapping.add_delta(vertical(-1.));
        mapping.update(Time::from_millis(10), &registry);

        assert_eq!(
            *calls.lock(),
            vec![
                ActionId::VolumeUp,
                ActionId::VolumeUp,
                ActionId::VolumeUp,
                ActionId::VolumeDown
            ]
        );
    }
}
