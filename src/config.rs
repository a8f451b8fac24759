//! Merge configuration: per-class include rules and reference policy.
//!
//! Supplied externally, typically loaded from a small YAML or JSON
//! settings file next to the root document:
//!
//! ```yaml
//! default_class: schemas
//! inline_refs:
//!   - variants
//! classes:
//!   parameters:
//!     prefix: "x_"
//!     filter:
//!       deny: ["internal*"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::directive::path_has_suffix;
use crate::error::MergeError;
use crate::source;

/// Class used when a reference target's fragment does not name one.
pub const DEFAULT_CLASS: &str = "schemas";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Overrides [`DEFAULT_CLASS`] for reference targets whose fragment
    /// does not point into a `components/<class>` section.
    pub default_class: Option<String>,

    /// Node-path suffixes under which an in-document `$ref` is spliced
    /// inline instead of being left as a pointer. Empty by default:
    /// inlining is an explicit opt-in, never inferred from path shape.
    pub inline_refs: Vec<String>,

    /// Per-class post-processing rules for classed include directives.
    pub classes: HashMap<String, ClassRules>,
}

impl MergeConfig {
    /// Load configuration from a YAML or JSON settings file.
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let document = source::read_text(path)?;
        serde_yaml::from_str(&document).map_err(|e| MergeError::InvalidDocument {
            location: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn default_class(&self) -> &str {
        self.default_class.as_deref().unwrap_or(DEFAULT_CLASS)
    }

    /// True if an in-document reference at this node path should be
    /// spliced inline rather than left as a pointer.
    pub fn is_inline_path(&self, node_path: &str) -> bool {
        self.inline_refs
            .iter()
            .any(|suffix| path_has_suffix(node_path, suffix))
    }

    pub fn rules_for(&self, class: &str) -> Option<&ClassRules> {
        self.classes.get(class)
    }
}

/// Post-processing rules for one include class: filter, then prefix,
/// then suffix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRules {
    pub filter: Option<KeyFilter>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

/// Allow/deny key patterns in glob syntax. An empty allow list admits
/// every key; deny patterns are checked afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFilter {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl KeyFilter {
    /// True if a top-level key survives the filter.
    pub fn keeps(&self, key: &str) -> bool {
        if !self.allow.is_empty() && !self.allow.iter().any(|p| Self::matches(p, key)) {
            return false;
        }
        !self.deny.iter().any(|p| Self::matches(p, key))
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match glob::Pattern::new(pattern) {
            Ok(pattern) => pattern.matches(key),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid key filter pattern, ignoring");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.default_class(), "schemas");
        assert!(config.inline_refs.is_empty());
        assert!(config.rules_for("parameters").is_none());
    }

    #[test]
    fn inline_path_matches_suffix() {
        let config = MergeConfig {
            inline_refs: vec!["variants".into()],
            ..Default::default()
        };
        assert!(config.is_inline_path("/box/variants"));
        assert!(config.is_inline_path("variants"));
        assert!(!config.is_inline_path("/box/invariants"));
    }

    #[test]
    fn filter_allow_and_deny() {
        let filter = KeyFilter {
            allow: vec!["pet*".into()],
            deny: vec!["*_internal".into()],
        };
        assert!(filter.keeps("petFood"));
        assert!(!filter.keeps("order"));
        assert!(!filter.keeps("pet_internal"));
    }

    #[test]
    fn empty_allow_admits_everything() {
        let filter = KeyFilter {
            allow: vec![],
            deny: vec!["secret".into()],
        };
        assert!(filter.keeps("anything"));
        assert!(!filter.keeps("secret"));
    }

    #[test]
    fn load_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_class: parameters\nclasses:\n  headers:\n    prefix: \"h_\""
        )
        .unwrap();

        let config = MergeConfig::load(file.path()).unwrap();
        assert_eq!(config.default_class(), "parameters");
        assert_eq!(
            config.rules_for("headers").unwrap().prefix.as_deref(),
            Some("h_")
        );
    }

    #[test]
    fn load_missing_file_errors() {
        let result = MergeConfig::load(Path::new("/nonexistent/settings.yaml"));
        assert!(matches!(result, Err(MergeError::FileNotFound { .. })));
    }
}
