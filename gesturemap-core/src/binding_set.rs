use log::debug;

use crate::binding::Binding;

/// Ordered, name-unique collection of bindings with an optional default
#[derive(Debug, Default)]
pub struct BindingSet {
    bindings: Vec<Binding>,
    default: Option<String>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the binding with that name, the existing one is kept if there already is one
    pub fn add_if_absent(&mut self, binding: Binding) -> usize {
        if let Some(idx) = self.position(binding.name()) {
            debug!("Binding {} already present, keeping it", binding.name());
            return idx;
        }

        self.bindings.push(binding);
        self.bindings.len() - 1
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.bindings
            .iter()
            .position(|binding| binding.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings
            .iter_mut()
            .find(|binding| binding.name() == name)
    }

    pub fn get_index(&self, idx: usize) -> Option<&Binding> {
        self.bindings.get(idx)
    }

    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut Binding> {
        self.bindings.get_mut(idx)
    }

    /// The named binding, falling back to the default one
    pub fn get_or_default(&self, name: &str) -> Option<&Binding> {
        self.get(name).or_else(|| self.default_binding())
    }

    /// The binding named as default, or the first one if that name is unset or unknown
    pub fn default_binding(&self) -> Option<&Binding> {
        self.default_position()
            .and_then(|idx| self.bindings.get(idx))
    }

    pub(crate) fn default_position(&self) -> Option<usize> {
        self.default
            .as_deref()
            .and_then(|name| self.position(name))
            .or_else(|| (!self.bindings.is_empty()).then_some(0))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default = Some(name.into());
    }

    /// The binding after `name`, wrapping around. Unknown names start over from the first binding
    pub fn next_after(&self, name: &str) -> Option<&Binding> {
        self.next_position(self.position(name))
            .and_then(|idx| self.bindings.get(idx))
    }

    pub(crate) fn next_position(&self, current: Option<usize>) -> Option<usize> {
        if self.bindings.is_empty() {
            return None;
        }

        Some(match current {
            Some(idx) => (idx + 1) % self.bindings.len(),
            None => 0,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.bindings.iter().map(Binding::name).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Binding> {
        self.bindings.iter_mut()
    }
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        let mut set = Self::new();
        for binding in iter {
            set.add_if_absent(binding);
        }
        set
    }
}
