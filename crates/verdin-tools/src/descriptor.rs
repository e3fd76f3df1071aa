use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A registry entry pairing a stable tool identifier with its raw
/// machine-readable API description.
///
/// Disabled descriptors stay registered but are excluded from the callable
/// set offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    /// The raw definition document (OpenAPI-style YAML).
    pub definition: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolDescriptor {
    pub fn new(id: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            definition: definition.into(),
            enabled: true,
        }
    }
}

/// The set of known tool descriptors, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    tools: HashMap<String, ToolDescriptor>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: Vec<ToolDescriptor>) -> Self {
        let tools = descriptors.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self { tools }
    }

    /// Insert or replace a descriptor.
    pub fn insert(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.id.clone(), descriptor);
    }

    /// Remove a descriptor by id.
    pub fn remove(&mut self, id: &str) -> bool {
        self.tools.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.get(id)
    }

    /// Flip a tool's enabled flag. Returns false for unknown ids.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.tools.get_mut(id) {
            Some(tool) => {
                tool.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All descriptor ids, sorted for deterministic iteration.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Enabled descriptors in id order.
    pub fn enabled(&self) -> Vec<ToolDescriptor> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.tools.get(id))
            .filter(|d| d.enabled)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_toggle() {
        let mut set = DescriptorSet::new();
        set.insert(ToolDescriptor::new("t1", "doc"));
        assert!(set.get("t1").unwrap().enabled);

        assert!(set.set_enabled("t1", false));
        assert!(!set.get("t1").unwrap().enabled);
        assert!(!set.set_enabled("missing", true));
    }

    #[test]
    fn test_enabled_excludes_disabled_only() {
        let mut set = DescriptorSet::from_descriptors(vec![
            ToolDescriptor::new("b", "doc-b"),
            ToolDescriptor::new("a", "doc-a"),
            ToolDescriptor::new("c", "doc-c"),
        ]);
        set.set_enabled("b", false);

        let enabled: Vec<String> = set.enabled().into_iter().map(|d| d.id).collect();
        assert_eq!(enabled, vec!["a", "c"]);
        // Disabled tools remain registered
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut set = DescriptorSet::new();
        set.insert(ToolDescriptor::new("t1", "doc"));
        assert!(set.remove("t1"));
        assert!(!set.remove("t1"));
        assert!(set.is_empty());
    }
}
