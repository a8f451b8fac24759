//! Post-processing for classed include directives.
//!
//! An include key carrying a `.<class>` suffix has its mapping content
//! run through the per-class rules from the configuration: filter the
//! top-level keys, then prepend the prefix, then append the suffix.
//! Content for a class with no configured rules passes through unchanged
//! with a warning. Non-mapping content is never touched.

use serde_json::{Map, Value};

use crate::config::MergeConfig;

/// Apply the configured rules for `class` to include content.
pub fn apply(content: Value, class: &str, config: &MergeConfig) -> Value {
    let Some(rules) = config.rules_for(class) else {
        tracing::warn!(class, "no rules configured for include class, passing content through");
        return content;
    };

    let Value::Object(map) = content else {
        return content;
    };

    let mut out = Map::new();
    for (key, value) in map {
        if let Some(filter) = &rules.filter {
            if !filter.keeps(&key) {
                continue;
            }
        }
        let mut name = key;
        if let Some(prefix) = &rules.prefix {
            name = format!("{prefix}{name}");
        }
        if let Some(suffix) = &rules.suffix {
            name = format!("{name}{suffix}");
        }
        out.insert(name, value);
    }
    Value::Object(out)
}
