use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::{Binding, ButtonMapEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No stored mappings for binding `{0}`")]
    UnknownBinding(String),
}

/**
 * User button mappings per binding name, plus the last selected profile
 *
 * Owned by whoever persists it. The store only reads and writes through the streams it is handed.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingStore {
    selected_profile: Option<String>,
    bindings: BTreeMap<String, Vec<ButtonMapEntry>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the button map of `binding`, replacing any earlier snapshot under the same name
    pub fn capture(&mut self, binding: &Binding) {
        let entries = binding.mappings();
        debug!("Captured {} mappings for {}", entries.len(), binding.name());
        self.bindings.insert(binding.name().to_owned(), entries);
    }

    /// Replaces the button map of `binding` with the stored one. Returns false, leaving it untouched, if there is none
    pub fn apply(&self, binding: &mut Binding) -> bool {
        match self.bindings.get(binding.name()) {
            Some(entries) => {
                binding.replace_mappings(entries.iter().copied());
                true
            }
            None => false,
        }
    }

    pub fn entries(&self, name: &str) -> Result<&[ButtonMapEntry], StoreError> {
        self.bindings
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownBinding(name.to_owned()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<ButtonMapEntry>> {
        self.bindings.remove(name)
    }

    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn set_selected_profile(&mut self, name: Option<String>) {
        self.selected_profile = name;
    }

    pub fn selected_profile(&self) -> Option<&str> {
        self.selected_profile.as_deref()
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StoreError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_string(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}
