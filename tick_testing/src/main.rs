use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use gesturemap::{
    ActionId, Button, CapabilityEntry, ConfigError, Direction, GestureEvent, InputSource,
    MappingStore, MotionDelta, Phase, SourceChange, SourceSink, Target, Time,
};
use log::{info, warn};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(16);
const TICKS_PER_PROFILE: usize = 120;

/// Prints every action it answers and keeps a volume level
struct ConsoleTarget {
    name: &'static str,
    volume: Mutex<i32>,
}

impl ConsoleTarget {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            volume: Mutex::new(50),
        }
    }
}

impl Target for ConsoleTarget {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(self: Arc<Self>) -> Vec<CapabilityEntry> {
        let mut entries: Vec<_> = [
            ActionId::Select,
            ActionId::Back,
            ActionId::Home,
            ActionId::Up,
            ActionId::Down,
            ActionId::Left,
            ActionId::Right,
            ActionId::PlayPause,
            ActionId::NextTrack,
            ActionId::PreviousTrack,
            ActionId::Mute,
            ActionId::PrimaryPress,
            ActionId::PrimaryRelease,
            ActionId::SecondaryPress,
            ActionId::SecondaryRelease,
            ActionId::TertiaryPress,
            ActionId::TertiaryRelease,
            ActionId::Chirp,
        ]
        .into_iter()
        .map(|action| {
            let target = self.clone();
            CapabilityEntry::new(action, action.as_str(), "prints the action", move || {
                info!("[{}] {action}", target.name);
                Ok(())
            })
        })
        .collect();

        for (action, step) in [(ActionId::VolumeUp, 1), (ActionId::VolumeDown, -1)] {
            let target = self.clone();
            entries.push(CapabilityEntry::new(
                action,
                action.as_str(),
                "adjusts the volume level",
                move || {
                    let mut volume = target.volume.lock();
                    *volume = (*volume + step).clamp(0, 100);
                    info!("[{}] volume {}", target.name, *volume);
                    Ok(())
                },
            ));
        }

        entries
    }
}

#[derive(Debug, Clone, Copy)]
enum Scripted {
    Gesture(GestureEvent),
    Motion(f32, f32),
    Pause(Duration),
}

/// Replays a fixed script on its own thread, as a real device source would
struct ScriptedSource {
    name: &'static str,
    script: Arc<Vec<Scripted>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ScriptedSource {
    fn new(name: &'static str, script: Vec<Scripted>) -> Self {
        Self {
            name,
            script: Arc::new(script),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl InputSource for ScriptedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn enabled(&mut self, sink: SourceSink) {
        let script = self.script.clone();
        let stop = self.stop.clone();
        stop.store(false, Ordering::Relaxed);

        self.worker = Some(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                for step in script.iter() {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }

                    let result = match *step {
                        Scripted::Gesture(event) => sink.send_gesture_event(event),
                        Scripted::Motion(x, y) => {
                            sink.send_motion_delta(MotionDelta { x, y, z: 0. })
                        }
                        Scripted::Pause(pause) => {
                            thread::sleep(pause);
                            Ok(())
                        }
                    };

                    if let Err(err) = result {
                        info!("Scripted source stopped: {err}");
                        return;
                    }
                }
            }
        }));
    }

    fn disabled(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Scripted source thread panicked");
            }
        }
    }
}

fn script() -> Vec<Scripted> {
    let pause = Scripted::Pause(Duration::from_millis(120));
    let mut script = vec![
        Scripted::Gesture(GestureEvent::on_button(Button::Primary, Phase::SingleTap)),
        pause,
        Scripted::Gesture(GestureEvent::on_direction(Direction::Up)),
        pause,
        Scripted::Gesture(GestureEvent::on_button(Button::Secondary, Phase::Press)),
        Scripted::Gesture(GestureEvent::on_button(Button::Touchpad, Phase::Press)),
    ];

    for _ in 0..20 {
        script.push(Scripted::Motion(2.5, 3.));
        script.push(Scripted::Pause(Duration::from_millis(10)));
    }

    script.extend([
        Scripted::Gesture(GestureEvent::on_button(Button::Touchpad, Phase::Release)),
        Scripted::Gesture(GestureEvent::on_button(Button::Secondary, Phase::Release)),
        pause,
        Scripted::Gesture(GestureEvent::on_button(Button::Primary, Phase::DoubleTap)),
        pause,
    ]);
    script
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let profiles = match std::env::args().nth(1) {
        Some(path) => (path.clone(), std::fs::read_to_string(path)?),
        None => (
            "profiles.kdl".to_owned(),
            gesturemap::DEFAULT_PROFILES.to_owned(),
        ),
    };

    let speaker = Arc::new(ConsoleTarget::new("speaker"));
    let loaded = gesturemap::load_router(
        &profiles.0,
        &profiles.1,
        vec![speaker as Arc<dyn Target>],
        |profile, mapping| {
            let label = format!("{profile}/{mapping}");
            Some(Box::new(move |delta: MotionDelta| {
                info!("[{label}] move {:.2} {:.2}", delta.x, delta.y)
            }))
        },
    );

    let mut router = match loaded {
        Ok(router) => router,
        Err(ConfigError::Parse(err)) => {
            eprintln!("{:?}", miette::Report::new(err));
            anyhow::bail!("Could not parse {}", profiles.0);
        }
        Err(err) => return Err(err.into()),
    };

    if let SourceChange::AlreadyActive(source) =
        router.set_source(Box::new(ScriptedSource::new("script", script())))
    {
        warn!("Source {} was already running", source.name());
    }

    let start = Instant::now();
    for profile in 0..router.bindings().len() {
        if profile > 0 {
            router.select_next()?;
        }

        for _ in 0..TICKS_PER_PROFILE {
            let report = router.tick(Time::from_duration(start.elapsed()));
            for failure in report.invocations.iter().flat_map(|report| report.failures()) {
                warn!("{} failed: {:?}", failure.name, failure.result);
            }
            thread::sleep(TICK);
        }
    }

    router.clear_source();

    let mut store = MappingStore::new();
    gesturemap::save_to_store(&router, &mut store);
    println!("{}", store.to_json_string()?);

    Ok(())
}
