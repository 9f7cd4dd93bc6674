use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use flume::{Receiver, Sender, TrySendError};
use gesturemap_types::{
    GestureEvent, InputSource, MotionDelta, SinkError, SourceSink, SourceSinkTrait, Time,
};
use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::{
    binding::Binding,
    binding_set::BindingSet,
    capability::InvocationReport,
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("No binding named `{0}`")]
    UnknownBinding(String),
    #[error("Binding set is empty")]
    NoBindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    SourceOnly,
    BindingOnly,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    SourceChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    BindingChanged {
        previous: Option<String>,
        current: Option<String>,
    },
}

pub trait RouterListener: Send + Sync {
    fn handle_event(&self, event: &RouterEvent);
}

/// Outcome of [`Router::set_source`]
pub enum SourceChange {
    /// The source is now active, carrying the disabled previous source if there was one
    Installed(Option<Box<dyn InputSource>>),
    /// A source with the same name is already active, the passed source is handed back untouched
    AlreadyActive(Box<dyn InputSource>),
}

impl SourceChange {
    pub fn is_installed(&self) -> bool {
        matches!(self, SourceChange::Installed(_))
    }
}

impl fmt::Debug for SourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceChange::Installed(previous) => f
                .debug_tuple("Installed")
                .field(&previous.as_ref().map(|source| source.name()))
                .finish(),
            SourceChange::AlreadyActive(source) => {
                f.debug_tuple("AlreadyActive").field(&source.name()).finish()
            }
        }
    }
}

/// What a single [`Router::tick`] did with the queue
#[derive(Debug, Default)]
pub struct TickReport {
    /// Gesture events handed to the active binding
    pub dispatched: usize,
    /// Motion deltas handed to the active binding
    pub motion: usize,
    /// Events drained while no binding was active
    pub dropped: usize,
    /// Events sent by a source that has since been replaced
    pub stale: usize,
    pub invocations: Vec<InvocationReport>,
}

#[derive(Debug)]
enum PendingEvent {
    Gesture(GestureEvent),
    Motion(MotionDelta),
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    event: PendingEvent,
}

/**
 * SourceSink implementation handed to sources by the router
 *
 * Tagged with the source generation current at the time it was created, once the router moves on every send is
 * rejected as detached
 */
#[derive(Debug)]
struct QueueSink {
    generation: u64,
    current: Arc<AtomicU64>,
    sender: Sender<Pending>,
}

impl QueueSink {
    fn enqueue(&self, event: PendingEvent) -> Result<(), SinkError> {
        if self.current.load(Ordering::Acquire) != self.generation {
            return Err(SinkError::Detached);
        }

        enqueue(&self.sender, self.generation, event)
    }
}

impl SourceSinkTrait for QueueSink {
    fn send_gesture_event(&self, event: GestureEvent) -> Result<(), SinkError> {
        self.enqueue(PendingEvent::Gesture(event))
    }

    fn send_motion_delta(&self, delta: MotionDelta) -> Result<(), SinkError> {
        self.enqueue(PendingEvent::Motion(delta))
    }
}

fn enqueue(sender: &Sender<Pending>, generation: u64, event: PendingEvent) -> Result<(), SinkError> {
    match sender.try_send(Pending { generation, event }) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(pending)) => {
            warn!("Event queue full, dropping {:?}", pending.event);
            Err(SinkError::QueueFull)
        }
        Err(TrySendError::Disconnected(_)) => Err(SinkError::Detached),
    }
}

/**
 * Routes events from the active source to the active binding
 *
 * Ingestion only ever enqueues. Everything else, dispatch, filtering and action fan-out, happens inside
 * [`Router::tick`] on whichever thread drives it.
 */
pub struct Router {
    bindings: BindingSet,
    active: Option<usize>,
    source: Option<Box<dyn InputSource>>,

    generation: Arc<AtomicU64>,
    sender: Sender<Pending>,
    receiver: Receiver<Pending>,

    listeners: Vec<(u64, Box<dyn RouterListener>)>,
    next_listener: u64,
}

impl Router {
    pub fn new(bindings: BindingSet) -> Self {
        Self::with_capacity(bindings, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(bindings: BindingSet, capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);

        Self {
            bindings,
            active: None,
            source: None,
            generation: Arc::new(AtomicU64::new(0)),
            sender,
            receiver,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Returns the id to pass to [`Router::unregister_listener`]
    pub fn register_listener(&mut self, listener: Box<dyn RouterListener>) -> u64 {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister_listener(&mut self, id: u64) -> Option<Box<dyn RouterListener>> {
        let idx = self
            .listeners
            .iter()
            .position(|(listener_id, _)| *listener_id == id)?;
        Some(self.listeners.remove(idx).1)
    }

    pub fn state(&self) -> RouterState {
        match (self.source.is_some(), self.active.is_some()) {
            (false, false) => RouterState::Idle,
            (true, false) => RouterState::SourceOnly,
            (false, true) => RouterState::BindingOnly,
            (true, true) => RouterState::Active,
        }
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingSet {
        &mut self.bindings
    }

    pub fn active_binding(&self) -> Option<&Binding> {
        self.active.and_then(|idx| self.bindings.get_index(idx))
    }

    pub fn active_binding_mut(&mut self) -> Option<&mut Binding> {
        self.active.and_then(|idx| self.bindings.get_index_mut(idx))
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|source| source.name())
    }

    /// A sink for the current source generation, for producers that are not an [`InputSource`]
    pub fn sink(&self) -> SourceSink {
        SourceSink(Arc::new(QueueSink {
            generation: self.generation.load(Ordering::Acquire),
            current: self.generation.clone(),
            sender: self.sender.clone(),
        }))
    }

    /**
     * Makes `source` the active source
     *
     * The previous source is disabled and handed back in [`SourceChange::Installed`]. If a source with the same
     * name is already active nothing changes and `source` comes back untouched in [`SourceChange::AlreadyActive`].
     */
    pub fn set_source(&mut self, mut source: Box<dyn InputSource>) -> SourceChange {
        if self.source_name() == Some(source.name()) {
            debug!("Source {} already active", source.name());
            return SourceChange::AlreadyActive(source);
        }

        let previous = self.detach_source();
        let current = source.name().to_owned();

        source.enabled(self.sink());
        self.source = Some(source);
        info!("Source {current} enabled");

        self.emit(RouterEvent::SourceChanged {
            previous: previous.as_ref().map(|source| source.name().to_owned()),
            current: Some(current),
        });

        SourceChange::Installed(previous)
    }

    pub fn clear_source(&mut self) -> Option<Box<dyn InputSource>> {
        let previous = self.detach_source()?;

        self.emit(RouterEvent::SourceChanged {
            previous: Some(previous.name().to_owned()),
            current: None,
        });

        Some(previous)
    }

    fn detach_source(&mut self) -> Option<Box<dyn InputSource>> {
        let mut previous = self.source.take()?;

        self.generation.fetch_add(1, Ordering::AcqRel);
        previous.disabled();
        info!("Source {} disabled", previous.name());

        Some(previous)
    }

    /// Adds `binding` unless one with that name exists, then selects it by name
    pub fn set_binding(&mut self, binding: Binding) {
        let idx = self.bindings.add_if_absent(binding);
        self.activate(idx);
    }

    pub fn select_binding(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self
            .bindings
            .position(name)
            .ok_or_else(|| RouterError::UnknownBinding(name.to_owned()))?;
        self.activate(idx);
        Ok(())
    }

    pub fn select_default(&mut self) -> Result<(), RouterError> {
        let idx = self
            .bindings
            .default_position()
            .ok_or(RouterError::NoBindings)?;
        self.activate(idx);
        Ok(())
    }

    /// Cycles to the binding after the active one, or the first if none is active
    pub fn select_next(&mut self) -> Result<(), RouterError> {
        let idx = self
            .bindings
            .next_position(self.active)
            .ok_or(RouterError::NoBindings)?;
        self.activate(idx);
        Ok(())
    }

    pub fn clear_binding(&mut self) {
        let Some(previous) = self.active.take() else {
            return;
        };

        let previous = self
            .bindings
            .get_index(previous)
            .map(|binding| binding.name().to_owned());
        info!("Binding {previous:?} deactivated");

        self.emit(RouterEvent::BindingChanged {
            previous,
            current: None,
        });
    }

    fn activate(&mut self, idx: usize) {
        if self.active == Some(idx) {
            trace!("Binding {idx} already active");
            return;
        }

        let previous = self
            .active_binding()
            .map(|binding| binding.name().to_owned());
        self.active = Some(idx);

        let Some(binding) = self.bindings.get_index(idx) else {
            return;
        };
        let current = binding.name().to_owned();
        info!("Binding {current} active");
        binding.chirp();

        self.emit(RouterEvent::BindingChanged {
            previous,
            current: Some(current),
        });
    }

    fn emit(&self, event: RouterEvent) {
        for (_, listener) in self.listeners.iter() {
            listener.handle_event(&event);
        }
    }

    pub fn on_gesture_event(&self, event: GestureEvent) -> Result<(), SinkError> {
        enqueue(
            &self.sender,
            self.generation.load(Ordering::Acquire),
            PendingEvent::Gesture(event),
        )
    }

    pub fn on_motion_delta(&self, delta: MotionDelta) -> Result<(), SinkError> {
        enqueue(
            &self.sender,
            self.generation.load(Ordering::Acquire),
            PendingEvent::Motion(delta),
        )
    }

    /**
     * Drains whatever was queued before the call, in FIFO order, then ticks the active binding
     *
     * Events queued by producers while the drain is running are left for the next tick.
     */
    pub fn tick(&mut self, now: Time) -> TickReport {
        let generation = self.generation.load(Ordering::Acquire);
        let mut report = TickReport::default();

        for _ in 0..self.receiver.len() {
            let Ok(pending) = self.receiver.try_recv() else {
                break;
            };

            if pending.generation != generation {
                report.stale += 1;
                continue;
            }

            let Some(binding) = self.active.and_then(|idx| self.bindings.get_index_mut(idx)) else {
                trace!("No active binding, dropping {:?}", pending.event);
                report.dropped += 1;
                continue;
            };

            match pending.event {
                PendingEvent::Gesture(event) => {
                    report.dispatched += 1;
                    report.invocations.extend(binding.dispatch(&event));
                }
                PendingEvent::Motion(delta) => {
                    report.motion += 1;
                    binding.add_motion_delta(delta);
                }
            }
        }

        if report.stale > 0 {
            debug!("Discarded {} events from a replaced source", report.stale);
        }

        if let Some(binding) = self.active_binding_mut() {
            binding.tick(now);
        }

        report
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("bindings", &self.bindings)
            .field("active", &self.active)
            .field("source", &self.source_name())
            .field("generation", &self.generation)
            .field("pending", &self.receiver.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gesturemap_types::{ActionId, Button, Direction, Phase};
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        axis::{Activation, ActivationMode, Axis, StepOutput, ThrottledAxisMapping},
        capability::{CapabilityEntry, CapabilityRegistry},
    };

    type CallLog = Arc<Mutex<Vec<ActionId>>>;

    fn recording_binding(name: &str, calls: &CallLog) -> Binding {
        let mut registry = CapabilityRegistry::empty();
        for action in [
            ActionId::Chirp,
            ActionId::Up,
            ActionId::Down,
            ActionId::Select,
        ] {
            let calls = calls.clone();
            registry.register(CapabilityEntry::new(
                action,
                action.as_str(),
                "records the call",
                move || {
                    calls.lock().push(action);
                    Ok(())
                },
            ));
        }

        Binding::new(name, registry)
            .with_mapping(GestureEvent::on_direction(Direction::Up), ActionId::Up)
            .with_mapping(GestureEvent::on_direction(Direction::Down), ActionId::Down)
            .with_mapping(
                GestureEvent::on_button(Button::Select, Phase::SingleTap),
                ActionId::Select,
            )
    }

    #[derive(Default)]
    struct Lifecycle {
        enabled: usize,
        disabled: usize,
        sink: Option<SourceSink>,
    }

    struct TestSource {
        name: &'static str,
        lifecycle: Arc<Mutex<Lifecycle>>,
    }

    impl TestSource {
        fn new(name: &'static str) -> (Box<dyn InputSource>, Arc<Mutex<Lifecycle>>) {
            let lifecycle = Arc::new(Mutex::new(Lifecycle::default()));
            (
                Box::new(Self {
                    name,
                    lifecycle: lifecycle.clone(),
                }),
                lifecycle,
            )
        }
    }

    impl InputSource for TestSource {
        fn name(&self) -> &str {
            self.name
        }

        fn enabled(&mut self, sink: SourceSink) {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.enabled += 1;
            lifecycle.sink = Some(sink);
        }

        fn disabled(&mut self) {
            self.lifecycle.lock().disabled += 1;
        }
    }

    struct RecordingListener(Arc<Mutex<Vec<RouterEvent>>>);

    impl RouterListener for RecordingListener {
        fn handle_event(&self, event: &RouterEvent) {
            self.0.lock().push(event.clone());
        }
    }

    fn up() -> GestureEvent {
        GestureEvent::on_direction(Direction::Up)
    }

    fn down() -> GestureEvent {
        GestureEvent::on_direction(Direction::Down)
    }

    fn select() -> GestureEvent {
        GestureEvent::on_button(Button::Select, Phase::SingleTap)
    }

    fn horizontal(x: f32) -> MotionDelta {
        mint::Vector3 { x, y: 0., z: 0. }
    }

    #[test]
    fn set_binding_twice_chirps_once() {
        let calls = CallLog::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new(BindingSet::new());
        router.register_listener(Box::new(RecordingListener(events.clone())));

        router.set_binding(recording_binding("media", &calls));
        router.set_binding(recording_binding("media", &calls));

        assert_eq!(*calls.lock(), vec![ActionId::Chirp]);
        assert_eq!(router.bindings().len(), 1);
        assert_eq!(
            *events.lock(),
            vec![RouterEvent::BindingChanged {
                previous: None,
                current: Some("media".into())
            }]
        );
    }

    #[test]
    fn tick_dispatches_in_fifo_order() {
        let calls = CallLog::default();
        let mut router = Router::new(BindingSet::new());
        router.set_binding(recording_binding("media", &calls));
        calls.lock().clear();

        router.on_gesture_event(up()).unwrap();
        router.on_gesture_event(down()).unwrap();
        router.on_gesture_event(select()).unwrap();
        assert!(calls.lock().is_empty(), "ingestion must not dispatch");

        let report = router.tick(Time::from_millis(1));
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.invocations.len(), 3);
        assert_eq!(
            *calls.lock(),
            vec![ActionId::Up, ActionId::Down, ActionId::Select]
        );
    }

    #[test]
    fn source_swap_discards_stale_events() {
        let calls = CallLog::default();
        let mut router = Router::new(BindingSet::new());
        router.set_binding(recording_binding("media", &calls));
        calls.lock().clear();

        let (first, first_lifecycle) = TestSource::new("remote");
        let (second, second_lifecycle) = TestSource::new("touchpad");

        assert!(matches!(router.set_source(first), SourceChange::Installed(None)));
        let old_sink = first_lifecycle.lock().sink.clone().unwrap();
        old_sink.send_gesture_event(up()).unwrap();

        let SourceChange::Installed(Some(previous)) = router.set_source(second) else {
            panic!("second source was not installed over the first");
        };
        assert_eq!(previous.name(), "remote");
        assert_eq!(first_lifecycle.lock().enabled, 1);
        assert_eq!(first_lifecycle.lock().disabled, 1);
        assert_eq!(second_lifecycle.lock().enabled, 1);
        assert_eq!(second_lifecycle.lock().disabled, 0);

        assert_eq!(
            old_sink.send_gesture_event(down()),
            Err(SinkError::Detached)
        );

        let new_sink = second_lifecycle.lock().sink.clone().unwrap();
        new_sink.send_gesture_event(select()).unwrap();

        let report = router.tick(Time::from_millis(1));
        assert_eq!(report.stale, 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(*calls.lock(), vec![ActionId::Select]);
    }

    #[test]
    fn same_source_name_is_a_no_op() {
        let mut router = Router::new(BindingSet::new());
        let (first, first_lifecycle) = TestSource::new("remote");
        let (again, again_lifecycle) = TestSource::new("remote");

        assert!(router.set_source(first).is_installed());
        let SourceChange::AlreadyActive(returned) = router.set_source(again) else {
            panic!("same-name source replaced the active one");
        };
        assert_eq!(returned.name(), "remote");

        assert_eq!(first_lifecycle.lock().disabled, 0);
        assert_eq!(again_lifecycle.lock().enabled, 0);
        assert_eq!(router.state(), RouterState::SourceOnly);

        let cleared = router.clear_source().unwrap();
        assert_eq!(cleared.name(), "remote");
        assert_eq!(first_lifecycle.lock().disabled, 1);
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn no_binding_is_a_safe_no_op() {
        let mut router = Router::new(BindingSet::new());
        let (source, lifecycle) = TestSource::new("remote");
        assert!(router.set_source(source).is_installed());

        let sink = lifecycle.lock().sink.clone().unwrap();
        sink.send_gesture_event(up()).unwrap();
        sink.send_motion_delta(mint::Vector3 {
            x: 1.,
            y: 0.,
            z: 0.,
        })
        .unwrap();

        let report = router.tick(Time::from_millis(1));
        assert_eq!(report.dropped, 2);
        assert_eq!(report.dispatched, 0);
        assert!(router.tick(Time::from_millis(2)).invocations.is_empty());
    }

    #[test]
    fn motion_reaches_axis_mappings_in_queue_order() {
        let steps = Arc::new(Mutex::new(Vec::new()));
        let recorded = steps.clone();
        let volume = ThrottledAxisMapping::new(
            "volume",
            Activation::new(Button::Secondary, ActivationMode::Hold),
            Axis::X,
            1.,
            Duration::ZERO,
            StepOutput::SetDelta(Box::new(move |delta| recorded.lock().push(delta))),
        );
        let binding = Binding::new("media", CapabilityRegistry::empty())
            .with_axis_mapping(Box::new(volume));

        let mut router = Router::new(BindingSet::new());
        router.set_binding(binding);
        let (source, lifecycle) = TestSource::new("touchpad");
        assert!(router.set_source(source).is_installed());
        let sink = lifecycle.lock().sink.clone().unwrap();

        let press = GestureEvent::on_button(Button::Secondary, Phase::Press);
        let release = GestureEvent::on_button(Button::Secondary, Phase::Release);

        // Only the motion after the press counts
        sink.send_motion_delta(horizontal(9.)).unwrap();
        sink.send_gesture_event(press).unwrap();
        sink.send_motion_delta(horizontal(3.)).unwrap();

        let report = router.tick(Time::from_millis(1));
        assert_eq!(report.motion, 2);
        assert_eq!(report.dispatched, 1);
        assert_eq!(*steps.lock(), vec![3]);

        // The release resets the mapping before the tick could emit what came before it
        sink.send_motion_delta(horizontal(2.)).unwrap();
        sink.send_gesture_event(release).unwrap();
        sink.send_motion_delta(horizontal(5.)).unwrap();

        let report = router.tick(Time::from_millis(2));
        assert_eq!(report.motion, 2);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.dropped, 0);
        assert_eq!(*steps.lock(), vec![3]);
        assert!(!router.active_binding().unwrap().axis_mappings()[0].is_active());
    }

    #[test]
    fn unregistered_listeners_hear_nothing() {
        let calls = CallLog::default();
        let kept = Arc::new(Mutex::new(Vec::new()));
        let removed = Arc::new(Mutex::new(Vec::new()));
        let set: BindingSet = ["media", "presenter"]
            .into_iter()
            .map(|name| recording_binding(name, &calls))
            .collect();
        let mut router = Router::new(set);

        router.register_listener(Box::new(RecordingListener(kept.clone())));
        let id = router.register_listener(Box::new(RecordingListener(removed.clone())));

        router.select_binding("media").unwrap();
        assert!(router.unregister_listener(id).is_some());
        assert!(router.unregister_listener(id).is_none());
        router.select_binding("presenter").unwrap();

        assert_eq!(kept.lock().len(), 2);
        assert_eq!(
            *removed.lock(),
            vec![RouterEvent::BindingChanged {
                previous: None,
                current: Some("media".into())
            }]
        );
    }

    #[test]
    fn full_queue_drops_new_events() {
        let calls = CallLog::default();
        let mut router = Router::with_capacity(BindingSet::new(), 2);
        router.set_binding(recording_binding("media", &calls));
        calls.lock().clear();

        router.on_gesture_event(up()).unwrap();
        router.on_gesture_event(down()).unwrap();
        assert_eq!(router.on_gesture_event(select()), Err(SinkError::QueueFull));

        let report = router.tick(Time::from_millis(1));
        assert_eq!(report.dispatched, 2);
        assert_eq!(*calls.lock(), vec![ActionId::Up, ActionId::Down]);
    }

    #[test]
    fn profile_selection() {
        let calls = CallLog::default();
        let mut set: BindingSet = ["media", "presenter", "pointer"]
            .into_iter()
            .map(|name| recording_binding(name, &calls))
            .collect();
        set.set_default("presenter");
        let mut router = Router::new(set);
        assert_eq!(router.state(), RouterState::Idle);

        router.select_default().unwrap();
        assert_eq!(router.active_binding().unwrap().name(), "presenter");
        assert_eq!(router.state(), RouterState::BindingOnly);

        router.select_next().unwrap();
        assert_eq!(router.active_binding().unwrap().name(), "pointer");
        router.select_next().unwrap();
        assert_eq!(router.active_binding().unwrap().name(), "media");

        assert_eq!(
            router.select_binding("kiosk"),
            Err(RouterError::UnknownBinding("kiosk".into()))
        );
        assert_eq!(router.active_binding().unwrap().name(), "media");

        router.select_binding("media").unwrap();
        assert_eq!(calls.lock().len(), 3, "one chirp per actual switch");

        router.clear_binding();
        assert!(router.active_binding().is_none());
        assert_eq!(
            Router::new(BindingSet::new()).select_next(),
            Err(RouterError::NoBindings)
        );
    }
}
