use std::{collections::HashMap, fmt};

use gesturemap_types::{ActionId, GestureEvent, MotionDelta, Time};
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    axis::AxisMapping,
    capability::{CapabilityRegistry, InvocationReport},
};

/// A single gesture to action pair, the unit the mapping store persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ButtonMapEntry {
    pub event: GestureEvent,
    pub action: ActionId,
}

/**
 * A named device profile
 *
 * Owns the registry its actions are invoked through, the gesture to action table and the axis mappings fed with
 * motion and ticks while the binding is active.
 */
pub struct Binding {
    name: String,
    registry: CapabilityRegistry,
    button_map: HashMap<GestureEvent, Vec<ActionId>>,
    axis_mappings: Vec<Box<dyn AxisMapping>>,
}

impl Binding {
    pub fn new(name: impl Into<String>, registry: CapabilityRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            button_map: HashMap::new(),
            axis_mappings: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, event: GestureEvent, action: ActionId) -> Self {
        self.add_mapping(event, action);
        self
    }

    pub fn with_axis_mapping(mut self, mapping: Box<dyn AxisMapping>) -> Self {
        self.add_axis_mapping(mapping);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Invokes every action mapped to `event`, then lets every axis mapping see it
    pub fn dispatch(&mut self, event: &GestureEvent) -> Vec<InvocationReport> {
        let reports = match self.button_map.get(event) {
            Some(actions) => actions
                .iter()
                .map(|action| self.registry.invoke(*action))
                .collect(),
            None => {
                trace!("{}: nothing mapped to {event}", self.name);
                Vec::new()
            }
        };

        for mapping in self.axis_mappings.iter_mut() {
            mapping.handle(event);
        }

        reports
    }

    pub fn tick(&mut self, now: Time) {
        for mapping in self.axis_mappings.iter_mut() {
            mapping.update(now, &self.registry);
        }
    }

    pub fn add_motion_delta(&mut self, delta: MotionDelta) {
        for mapping in self.axis_mappings.iter_mut() {
            mapping.add_delta(delta);
        }
    }

    /// Signals "you are now live" to every target that cares
    pub fn chirp(&self) -> InvocationReport {
        self.registry.invoke(ActionId::Chirp)
    }

    /// Returns false if the pair was already mapped
    pub fn add_mapping(&mut self, event: GestureEvent, action: ActionId) -> bool {
        let actions = self.button_map.entry(event).or_default();
        if actions.contains(&action) {
            return false;
        }

        debug!("{}: mapped {event} to {action}", self.name);
        actions.push(action);
        true
    }

    pub fn remove_mapping(&mut self, event: &GestureEvent, action: ActionId) -> bool {
        let Some(actions) = self.button_map.get_mut(event) else {
            return false;
        };

        let before = actions.len();
        actions.retain(|mapped| *mapped != action);
        let removed = actions.len() != before;

        if actions.is_empty() {
            self.button_map.remove(event);
        }
        removed
    }

    pub fn clear_mappings(&mut self, event: &GestureEvent) -> Vec<ActionId> {
        self.button_map.remove(event).unwrap_or_default()
    }

    pub fn replace_mappings(&mut self, entries: impl IntoIterator<Item = ButtonMapEntry>) {
        self.button_map.clear();
        for entry in entries {
            self.add_mapping(entry.event, entry.action);
        }
    }

    pub fn actions_for(&self, event: &GestureEvent) -> &[ActionId] {
        self.button_map
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every mapped pair, sorted by event
    pub fn mappings(&self) -> Vec<ButtonMapEntry> {
        self.button_map
            .iter()
            .flat_map(|(event, actions)| {
                actions.iter().map(|action| ButtonMapEntry {
                    event: *event,
                    action: *action,
                })
            })
            .sorted()
            .collect()
    }

    pub fn add_axis_mapping(&mut self, mapping: Box<dyn AxisMapping>) {
        self.axis_mappings.push(mapping);
    }

    pub fn remove_axis_mapping(&mut self, name: &str) -> Option<Box<dyn AxisMapping>> {
        let idx = self
            .axis_mappings
            .iter()
            .position(|mapping| mapping.name() == name)?;
        Some(self.axis_mappings.remove(idx))
    }

    pub fn axis_mappings(&self) -> &[Box<dyn AxisMapping>] {
        &self.axis_mappings
    }

    pub fn axis_mapping_mut(&mut self, name: &str) -> Option<&mut Box<dyn AxisMapping>> {
        self.axis_mappings
            .iter_mut()
            .find(|mapping| mapping.name() == name)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("button_map", &self.button_map)
            .field(
                "axis_mappings",
                &self
                    .axis_mappings
                    .iter()
                    .map(|mapping| mapping.name())
                    .collect_vec(),
            )
            .finish()
    }
}
