use std::{
    any::Any,
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use gesturemap_types::{ActionError, ActionId};
use itertools::Itertools;
use log::{error, trace};

pub type Handler = Arc<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

/// One handler answering to an action, bound to a specific target instance
#[derive(Clone)]
pub struct CapabilityEntry {
    action: ActionId,
    name: String,
    description: String,
    handler: Handler,
}

impl CapabilityEntry {
    pub fn new<F>(
        action: ActionId,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            action,
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn invoke(&self) -> Result<(), ActionError> {
        (self.handler)()
    }
}

impl fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("action", &self.action)
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/**
 * Anything that can perform actions: a wireless peripheral, a local device surface, a message bus...
 *
 * Targets list their capabilities explicitly. Entries usually capture a clone of the `Arc` so targets that keep
 * state need interior mutability.
 */
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(self: Arc<Self>) -> Vec<CapabilityEntry>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    Invoked,
    Failed(ActionError),
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub name: String,
    pub result: InvocationResult,
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        self.result == InvocationResult::Invoked
    }
}

/// Per entry results of one fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReport {
    pub action: ActionId,
    pub outcomes: Vec<InvocationOutcome>,
}

impl InvocationReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InvocationOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }
}

/// Fan-out table from action to every entry answering it, in registration order
#[derive(Default)]
pub struct CapabilityRegistry {
    targets: Vec<Arc<dyn Target>>,
    entries: HashMap<ActionId, Vec<CapabilityEntry>>,
}

impl CapabilityRegistry {
    pub fn new(targets: Vec<Arc<dyn Target>>) -> Self {
        let mut registry = Self::empty();
        for target in targets {
            registry.register_target(target);
        }
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register_target(&mut self, target: Arc<dyn Target>) {
        for entry in target.clone().capabilities() {
            self.register(entry);
        }
        self.targets.push(target);
    }

    pub fn register(&mut self, entry: CapabilityEntry) {
        self.entries.entry(entry.action).or_default().push(entry);
    }

    /**
     * Calls every entry registered for `action`
     *
     * A failing entry, whether it returns an error or panics, is logged and recorded in the report; the remaining
     * entries still run.
     */
    pub fn invoke(&self, action: ActionId) -> InvocationReport {
        let entries = self.lookup(action);
        if entries.is_empty() {
            trace!("No capability for {action}");
        }

        let outcomes = entries
            .iter()
            .map(|entry| {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| entry.invoke())) {
                    Ok(Ok(())) => InvocationResult::Invoked,
                    Ok(Err(err)) => {
                        error!(
                            "{action}: `{}` ({}) failed with {err}",
                            entry.name, entry.description
                        );
                        InvocationResult::Failed(err)
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(
                            "{action}: `{}` ({}) panicked with {message}",
                            entry.name, entry.description
                        );
                        InvocationResult::Panicked(message)
                    }
                };

                InvocationOutcome {
                    name: entry.name.clone(),
                    result,
                }
            })
            .collect();

        InvocationReport { action, outcomes }
    }

    pub fn lookup(&self, action: ActionId) -> &[CapabilityEntry] {
        self.entries.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, action: ActionId) -> bool {
        !self.lookup(action).is_empty()
    }

    /// Every action with at least one entry, sorted
    pub fn actions(&self) -> Vec<ActionId> {
        self.entries
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(action, _)| *action)
            .sorted()
            .collect()
    }

    pub fn targets(&self) -> &[Arc<dyn Target>] {
        &self.targets
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field(
                "targets",
                &self.targets.iter().map(|target| target.name()).collect_vec(),
            )
            .field("entries", &self.entries)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}
