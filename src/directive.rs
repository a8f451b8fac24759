//! Directive classification.
//!
//! Every mapping key is run through [`classify`] before the engine
//! branches, so the whole directive grammar lives in one exhaustively
//! matchable place instead of being pattern-matched ad hoc at each call
//! site.

/// Reserved marker for pointer-style references.
pub const REF_MARKER: &str = "$ref";

/// Reserved marker for inclusion directives.
pub const INCLUDE_MARKER: &str = "$include";

/// Node-path suffix whose child keys discriminate polymorphic variants.
/// Their values are reference targets even though the keys are free-form.
pub const DISCRIMINATOR_SUFFIX: &str = "discriminator/mapping";

/// What a mapping key means to the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `$ref`, or any key inside a `discriminator/mapping` node. The
    /// value is a target string to be rewritten to a local pointer.
    Reference,
    /// `$include`, optionally suffixed with `#<fragment>` and/or
    /// `.<class>` (in that order). The fragment slices the fetched
    /// content after any fragment carried by the target value itself;
    /// it also keeps multiple includes in one mapping distinct.
    Include {
        fragment: String,
        class: Option<String>,
    },
    /// Not a directive; recurse into the value.
    Plain,
}

/// Classify a mapping key given the path of the mapping that holds it.
pub fn classify(key: &str, node_path: &str) -> Directive {
    if key == REF_MARKER {
        return Directive::Reference;
    }
    if path_has_suffix(node_path, DISCRIMINATOR_SUFFIX) {
        return Directive::Reference;
    }
    if let Some(rest) = key.strip_prefix(INCLUDE_MARKER) {
        if let Some((fragment, class)) = parse_include_suffix(rest) {
            return Directive::Include { fragment, class };
        }
    }
    Directive::Plain
}

/// Parse the portion of an include key after the marker.
///
/// Accepted shapes: ``, `#<fragment>`, `.<class>`, `#<fragment>.<class>`.
/// Returns `None` for anything else (the key is then a plain key, e.g.
/// `$includes`).
fn parse_include_suffix(rest: &str) -> Option<(String, Option<String>)> {
    if rest.is_empty() {
        return Some((String::new(), None));
    }
    if let Some(class) = rest.strip_prefix('.') {
        if class.is_empty() {
            return None;
        }
        return Some((String::new(), Some(class.to_string())));
    }
    let fragment = rest.strip_prefix('#')?;
    match fragment.find('.') {
        Some(idx) => {
            let class = &fragment[idx + 1..];
            if class.is_empty() {
                return None;
            }
            Some((fragment[..idx].to_string(), Some(class.to_string())))
        }
        None => Some((fragment.to_string(), None)),
    }
}

/// Segment-aware suffix test: `a/b/c` has suffix `b/c` but not `/b/c`
/// spelled into the middle of a segment.
pub(crate) fn path_has_suffix(path: &str, suffix: &str) -> bool {
    path == suffix || path.ends_with(&format!("/{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_marker() {
        assert_eq!(classify("$ref", "/paths//x"), Directive::Reference);
    }

    #[test]
    fn discriminator_mapping_entries_are_references() {
        assert_eq!(
            classify("dog", "/components/schemas/Pet/discriminator/mapping"),
            Directive::Reference
        );
        // A key that merely looks like one outside the suffix is plain.
        assert_eq!(classify("dog", "/components/schemas/Pet"), Directive::Plain);
    }

    #[test]
    fn bare_include() {
        assert_eq!(
            classify("$include", ""),
            Directive::Include {
                fragment: String::new(),
                class: None
            }
        );
    }

    #[test]
    fn include_with_fragment() {
        assert_eq!(
            classify("$include#/definitions", ""),
            Directive::Include {
                fragment: "/definitions".into(),
                class: None
            }
        );
    }

    #[test]
    fn include_with_class() {
        assert_eq!(
            classify("$include.parameters", ""),
            Directive::Include {
                fragment: String::new(),
                class: Some("parameters".into())
            }
        );
    }

    #[test]
    fn include_with_fragment_and_class() {
        assert_eq!(
            classify("$include#/shared/headers.headers", ""),
            Directive::Include {
                fragment: "/shared/headers".into(),
                class: Some("headers".into())
            }
        );
    }

    #[test]
    fn include_lookalikes_are_plain() {
        assert_eq!(classify("$includes", ""), Directive::Plain);
        assert_eq!(classify("$include.", ""), Directive::Plain);
        assert_eq!(classify("include", ""), Directive::Plain);
    }

    #[test]
    fn path_suffix_is_segment_aware() {
        assert!(path_has_suffix("a/discriminator/mapping", "discriminator/mapping"));
        assert!(path_has_suffix("discriminator/mapping", "discriminator/mapping"));
        assert!(!path_has_suffix("a/xdiscriminator/mapping", "discriminator/mapping"));
        assert!(!path_has_suffix("a/discriminator/mapping/dog", "discriminator/mapping"));
    }
}
