//! Pass-scoped component registry.
//!
//! Purely bookkeeping: a table keyed by (class, absolute target) that
//! hands out existing entries or creates placeholders, remembering
//! first-registration order. That order is what makes name-conflict
//! tie-breaking deterministic, so it must never be perturbed. No
//! directive resolution logic lives here.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::locator::Target;
use crate::naming::NameTable;

/// One deduplicated unit of shared content.
#[derive(Debug, Clone)]
pub struct Component {
    /// Output grouping discriminator, e.g. "schemas" or "parameters".
    pub class: String,
    /// Normalized target this component was registered for.
    pub target: Target,
    /// Dedup key: the target's absolute form including fragment.
    pub key: String,
    /// Resolved content; `None` until the recursion that created the
    /// component completes.
    pub content: Option<Value>,
}

#[derive(Debug, Default)]
pub struct Registry {
    components: Vec<Component>,
    index: HashMap<(String, String), usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a component for this (class, target) was already created
    /// in the current pass.
    pub fn exists(&self, class: &str, key: &str) -> bool {
        self.index
            .contains_key(&(class.to_string(), key.to_string()))
    }

    /// Return the component slot for (class, target), creating an empty
    /// placeholder on first registration. The `created` flag is the
    /// cycle guard: callers only recurse into content when it is true.
    pub fn get_or_create(&mut self, class: &str, target: &Target) -> (usize, bool) {
        let key = target.key();
        if let Some(&slot) = self.index.get(&(class.to_string(), key.clone())) {
            return (slot, false);
        }
        let slot = self.components.len();
        self.components.push(Component {
            class: class.to_string(),
            target: target.clone(),
            key: key.clone(),
            content: None,
        });
        self.index.insert((class.to_string(), key), slot);
        (slot, true)
    }

    pub fn set_content(&mut self, slot: usize, content: Value) {
        self.components[slot].content = Some(content);
    }

    /// All components in first-registration order. The naming pass runs
    /// over this.
    pub fn snapshot(&self) -> &[Component] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Assemble the shared-components section: class -> name -> content,
    /// classes and names in registration order. Only meaningful on the
    /// second pass, once every component has a name.
    pub fn build_output_section(&self, names: &NameTable) -> Value {
        let mut section = Map::new();
        for component in &self.components {
            let name = match names.get(&component.class, &component.key) {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!(
                        class = component.class,
                        target = component.key,
                        "component missing an assigned name, skipping"
                    );
                    continue;
                }
            };
            let content = component
                .content
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new()));

            let class_entry = section
                .entry(component.class.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(by_name) = class_entry {
                by_name.insert(name, content);
            }
        }
        Value::Object(section)
    }
}
