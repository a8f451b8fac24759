//! Component naming.
//!
//! Names are assigned in a separate pass over the complete registry
//! snapshot, the way a linker resolves duplicate symbols across
//! translation units: no name is final until every reachable target has
//! been registered, which is why this cannot be folded into the
//! discovery walk. Within each class the first-registered target keeps
//! its plain candidate name; later targets that derive the same
//! candidate get a numeric `_2`, `_3`, ... suffix until unique.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::locator::Target;
use crate::registry::Component;

/// Final names keyed by (class, absolute target), carried from the
/// discovery pass into the rewrite pass. This is the only state shared
/// between the two passes.
#[derive(Debug, Default)]
pub struct NameTable {
    names: HashMap<(String, String), String>,
}

impl NameTable {
    pub fn get(&self, class: &str, key: &str) -> Option<&str> {
        self.names
            .get(&(class.to_string(), key.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Assign each component a name unique within its class.
///
/// Deterministic for a given registration order; collisions across
/// different classes are allowed and not checked.
pub fn assign_names(components: &[Component]) -> NameTable {
    let mut taken: HashMap<&str, HashSet<String>> = HashMap::new();
    let mut table = NameTable::default();

    for component in components {
        let candidate = candidate_name(&component.target);
        let class_taken = taken.entry(component.class.as_str()).or_default();

        let mut name = candidate.clone();
        let mut counter = 2;
        while class_taken.contains(&name) {
            name = format!("{candidate}_{counter}");
            counter += 1;
        }

        class_taken.insert(name.clone());
        table
            .names
            .insert((component.class.clone(), component.key.clone()), name);
    }

    table
}

/// Derive the candidate name for a target: the last fragment segment
/// when a fragment is present, the file stem otherwise.
pub fn candidate_name(target: &Target) -> String {
    let fragment = target.fragment();
    if !fragment.is_empty() {
        let last = fragment
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .replace("~1", "/")
            .replace("~0", "~");
        return sanitize(&last);
    }

    let stem = match target {
        Target::Local { path, .. } => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        Target::Remote { url, .. } => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|segment| {
                Path::new(segment)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| segment.to_string())
            })
            .unwrap_or_default(),
        Target::InDocument { .. } => String::new(),
    };
    sanitize(&stem)
}

/// Component names must be usable as mapping keys in a local pointer:
/// keep `[A-Za-z0-9._-]`, replace everything else with `_`.
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "component".to_string()
    } else {
        cleaned
    }
}
