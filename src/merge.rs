//! Reference and include resolution over a document tree.
//!
//! The engine walks every mapping and sequence of the root document,
//! classifies each key, and rewrites or splices directives. It runs
//! twice per merge: a discovery pass that only registers reachable
//! components, and a rewrite pass that substitutes final local pointers
//! and collects the shared-components section. Between the passes the
//! naming module assigns each component a unique name from the complete
//! registry snapshot; that name table is the only state carried across.
//!
//! The walk is a pure recursive function returning new nodes; the input
//! document is never mutated.

use std::path::Path;

use serde_json::{Map, Value};

use crate::config::MergeConfig;
use crate::directive::{classify, Directive};
use crate::error::MergeError;
use crate::locator::{self, resolve_target, Location, Target};
use crate::naming::{assign_names, NameTable};
use crate::registry::Registry;
use crate::source::{self, Sources};

/// The document currently being walked plus where it came from. The root
/// snapshot is what in-document include targets are re-read from.
#[derive(Debug, Clone)]
pub struct Context {
    pub location: Location,
    pub root: Value,
}

/// A component discovered by the first pass, with its final name.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiscoveredComponent {
    pub class: String,
    pub name: String,
    pub target: String,
}

/// Resolve every directive in `root` and return the flattened document.
///
/// `root_path` is the file the document was read from; relative targets
/// resolve against its directory. The output carries every deduplicated,
/// uniquely named component under its `components` key.
///
/// # Errors
///
/// Returns `MergeError` on missing or unparseable local files and on
/// structural splice conflicts. Network failures are substituted with
/// empty content and logged, not raised.
pub fn merge(root: &Value, root_path: &Path, config: &MergeConfig) -> Result<Value, MergeError> {
    let ctx = Context {
        location: Location::Local(locator::absolutize(root_path)),
        root: root.clone(),
    };

    // The fetch cache spans both passes so the rewrite pass observes the
    // same remote bytes the discovery pass registered.
    let mut sources = Sources::new();

    // Discovery: register every reachable component, no names yet.
    let mut discovery = Walker::new(config, &mut sources, None);
    discovery.resolve(root, &ctx, "")?;
    let names = assign_names(discovery.registry.snapshot());

    // Rewrite: substitute final pointers, collect shared content.
    let mut rewrite = Walker::new(config, &mut sources, Some(&names));
    let mut merged = rewrite.resolve(root, &ctx, "")?;
    let section = rewrite.registry.build_output_section(&names);
    if section.as_object().is_some_and(|s| !s.is_empty()) {
        attach_components(&mut merged, section);
    }
    Ok(merged)
}

/// Load a document from disk and merge it.
pub fn merge_file(path: &Path, config: &MergeConfig) -> Result<Value, MergeError> {
    let root = source::load_document(path)?;
    merge(&root, path, config)
}

/// Run the discovery pass and naming only: every component reachable
/// from the root, in registration order, with its final name.
pub fn discover(
    root: &Value,
    root_path: &Path,
    config: &MergeConfig,
) -> Result<Vec<DiscoveredComponent>, MergeError> {
    let ctx = Context {
        location: Location::Local(locator::absolutize(root_path)),
        root: root.clone(),
    };
    let mut sources = Sources::new();
    let mut discovery = Walker::new(config, &mut sources, None);
    discovery.resolve(root, &ctx, "")?;

    let names = assign_names(discovery.registry.snapshot());
    Ok(discovery
        .registry
        .snapshot()
        .iter()
        .map(|component| DiscoveredComponent {
            class: component.class.clone(),
            name: names
                .get(&component.class, &component.key)
                .unwrap_or_default()
                .to_string(),
            target: component.key.clone(),
        })
        .collect())
}

/// Merge `overlay` onto `base`: mappings merge recursively key by key,
/// anything else is overwritten by the overlay.
pub fn merge_or_overwrite(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => {
                        let prev = existing.take();
                        *existing = merge_or_overwrite(prev, value);
                    }
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge the assembled shared section under the output's `components`
/// key. Registered content wins over pre-existing keys so that rewritten
/// pointers always resolve.
fn attach_components(merged: &mut Value, section: Value) {
    let Value::Object(map) = merged else {
        tracing::warn!("root document is not a mapping, dropping components section");
        return;
    };
    match map.get_mut("components") {
        Some(existing) => {
            let prev = existing.take();
            *existing = merge_or_overwrite(prev, section);
        }
        None => {
            map.insert("components".to_string(), section);
        }
    }
}

/// What became of one reference directive.
enum RefOutcome {
    /// Value rewritten to a local component pointer.
    Rewritten(Value),
    /// Locator failure or already-local pointer: value kept as-is.
    Unresolved(Value),
    /// Inline policy hit: content to splice in place of the directive.
    Inlined(Value),
}

/// One pass of the resolution engine. Registry is owned per pass; the
/// fetch cache and name table are borrowed from the driver.
struct Walker<'a> {
    config: &'a MergeConfig,
    sources: &'a mut Sources,
    names: Option<&'a NameTable>,
    registry: Registry,
}

impl<'a> Walker<'a> {
    fn new(config: &'a MergeConfig, sources: &'a mut Sources, names: Option<&'a NameTable>) -> Self {
        Self {
            config,
            sources,
            names,
            registry: Registry::new(),
        }
    }

    fn resolve(&mut self, node: &Value, ctx: &Context, path: &str) -> Result<Value, MergeError> {
        match node {
            Value::Object(map) => self.resolve_mapping(map, ctx, path),
            Value::Array(items) => self.resolve_sequence(items, ctx, path),
            other => Ok(other.clone()),
        }
    }

    fn resolve_sequence(
        &mut self,
        items: &[Value],
        ctx: &Context,
        path: &str,
    ) -> Result<Value, MergeError> {
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}/{i}");
            let resolved = self.resolve(item, ctx, &item_path)?;
            match resolved {
                // A mapping only resolves to a sequence when its sole key
                // was an include of sequence content: splice it here.
                Value::Array(nested) if item.is_object() => out.extend(nested),
                other => out.push(other),
            }
        }
        Ok(Value::Array(out))
    }

    fn resolve_mapping(
        &mut self,
        map: &Map<String, Value>,
        ctx: &Context,
        path: &str,
    ) -> Result<Value, MergeError> {
        let mut out = Value::Object(Map::new());
        let sole_key = map.len() == 1;

        for (key, value) in map {
            let child_path = format!("{path}/{key}");
            match classify(key, path) {
                Directive::Reference => {
                    match self.resolve_reference(value, ctx, path, &child_path)? {
                        RefOutcome::Rewritten(rewritten) => {
                            insert_resolved(&mut out, key.clone(), rewritten, &child_path)?;
                        }
                        RefOutcome::Unresolved(kept) => {
                            insert_resolved(&mut out, key.clone(), kept, &child_path)?;
                        }
                        RefOutcome::Inlined(content) => {
                            out = splice(out, content, sole_key, &child_path)?;
                        }
                    }
                }
                Directive::Include { fragment, class } => {
                    match self.include_content(
                        value,
                        &fragment,
                        class.as_deref(),
                        ctx,
                        &child_path,
                    )? {
                        Some(content) => {
                            out = splice(out, content, sole_key, &child_path)?;
                        }
                        // Unresolvable locator: leave the directive as it
                        // was and continue.
                        None => {
                            insert_resolved(&mut out, key.clone(), value.clone(), &child_path)?;
                        }
                    }
                }
                Directive::Plain => {
                    let resolved = self.resolve(value, ctx, &child_path)?;
                    insert_resolved(&mut out, key.clone(), resolved, &child_path)?;
                }
            }
        }
        Ok(out)
    }

    fn resolve_reference(
        &mut self,
        value: &Value,
        ctx: &Context,
        node_path: &str,
        child_path: &str,
    ) -> Result<RefOutcome, MergeError> {
        let Some(raw) = value.as_str() else {
            tracing::warn!(path = child_path, "reference target is not a string, leaving unresolved");
            return Ok(RefOutcome::Unresolved(value.clone()));
        };

        let target = match resolve_target(raw, &ctx.location) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(path = child_path, target = raw, error = %e, "cannot resolve reference target");
                return Ok(RefOutcome::Unresolved(value.clone()));
            }
        };

        match target {
            Target::InDocument { fragment } => {
                if self.config.is_inline_path(node_path) {
                    let content = source::navigate_fragment(&ctx.root, &fragment).ok_or_else(
                        || MergeError::FragmentNotFound {
                            fragment: fragment.clone(),
                            location: ctx.location.to_string(),
                        },
                    )?;
                    let resolved = self.resolve(&content, ctx, child_path)?;
                    Ok(RefOutcome::Inlined(resolved))
                } else {
                    // Already a local pointer; nothing to rewrite.
                    Ok(RefOutcome::Unresolved(value.clone()))
                }
            }
            target => {
                let class = self.class_of(&target);
                let (slot, created) = self.registry.get_or_create(&class, &target);
                if created {
                    let (content, child_ctx) = self.target_content(&target)?;
                    let resolved = self.resolve(&content, &child_ctx, "")?;
                    self.registry.set_content(slot, resolved);
                }
                // Re-encountering a registered target skips the recursion
                // above; that is the cycle guard, not an error.

                let pointer = match self.names.and_then(|n| n.get(&class, &target.key())) {
                    Some(name) => format!("#/components/{class}/{name}"),
                    // Discovery pass: output is discarded, only the
                    // registry matters.
                    None => format!("#/components/{class}"),
                };
                Ok(RefOutcome::Rewritten(Value::String(pointer)))
            }
        }
    }

    /// Fetch or load a reference target's document and slice out the
    /// fragment, producing the content plus its containing context.
    fn target_content(&mut self, target: &Target) -> Result<(Value, Context), MergeError> {
        let location = match target {
            Target::Local { path, .. } => Location::Local(path.clone()),
            Target::Remote { url, .. } => Location::Remote(url.clone()),
            // In-document targets are sliced from the caller's root and
            // never routed here.
            Target::InDocument { fragment } => {
                return Err(MergeError::FragmentNotFound {
                    fragment: fragment.clone(),
                    location: "#".to_string(),
                });
            }
        };

        let document = self.sources.obtain(target)?;
        let fragment = target.fragment();

        let content = match source::navigate_fragment(&document, fragment) {
            Some(content) => content,
            None => match target {
                // The empty substitute for a failed fetch has no
                // fragments either; stay on the soft-fail path.
                Target::Remote { url, .. } => {
                    tracing::warn!(url = %url, fragment, "fragment not found in remote document, substituting empty content");
                    Value::Object(Map::new())
                }
                _ => {
                    return Err(MergeError::FragmentNotFound {
                        fragment: fragment.to_string(),
                        location: target.key(),
                    });
                }
            },
        };

        Ok((
            content,
            Context {
                location,
                root: document,
            },
        ))
    }

    /// Resolve an include directive's content: located, sliced by the
    /// value fragment then the key fragment, recursively resolved in its
    /// own context, post-processed when classed. `None` means the
    /// locator failed and the directive should be left untouched.
    fn include_content(
        &mut self,
        value: &Value,
        key_fragment: &str,
        class: Option<&str>,
        ctx: &Context,
        child_path: &str,
    ) -> Result<Option<Value>, MergeError> {
        let Some(raw) = value.as_str() else {
            tracing::warn!(path = child_path, "include target is not a string, leaving directive in place");
            return Ok(None);
        };

        if source::is_glob(raw) {
            return self.include_glob(raw, class, ctx, child_path);
        }

        let target = match resolve_target(raw, &ctx.location) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(path = child_path, target = raw, error = %e, "cannot resolve include target");
                return Ok(None);
            }
        };

        let (content, child_ctx) = match &target {
            Target::InDocument { fragment } => {
                let content = source::navigate_fragment(&ctx.root, fragment).ok_or_else(|| {
                    MergeError::FragmentNotFound {
                        fragment: fragment.clone(),
                        location: ctx.location.to_string(),
                    }
                })?;
                (content, ctx.clone())
            }
            _ => self.target_content(&target)?,
        };

        let sliced = if key_fragment.is_empty() {
            content
        } else {
            source::navigate_fragment(&content, key_fragment).ok_or_else(|| {
                MergeError::FragmentNotFound {
                    fragment: key_fragment.to_string(),
                    location: target.key(),
                }
            })?
        };

        let mut resolved = self.resolve(&sliced, &child_ctx, "")?;
        if let Some(class) = class {
            resolved = crate::postprocess::apply(resolved, class, self.config);
        }
        Ok(Some(resolved))
    }

    /// Expand a glob include into one mapping keyed by each matched
    /// file's base name with the extension stripped.
    fn include_glob(
        &mut self,
        pattern: &str,
        class: Option<&str>,
        ctx: &Context,
        child_path: &str,
    ) -> Result<Option<Value>, MergeError> {
        let Location::Local(containing) = &ctx.location else {
            tracing::warn!(path = child_path, pattern, "glob include inside a remote document, leaving directive in place");
            return Ok(None);
        };
        let base = containing.parent().unwrap_or_else(|| Path::new("."));

        let mut assembled = Map::new();
        for matched in self.sources.expand_glob(pattern, base) {
            let document = self.sources.load(&matched)?;
            let child_ctx = Context {
                location: Location::Local(matched.clone()),
                root: document.clone(),
            };
            let resolved = self.resolve(&document, &child_ctx, "")?;
            let stem = matched
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            assembled.insert(stem, resolved);
        }

        let mut content = Value::Object(assembled);
        if let Some(class) = class {
            content = crate::postprocess::apply(content, class, self.config);
        }
        Ok(Some(content))
    }

    /// Output class for a reference target: taken from a
    /// `#/components/<class>/...` fragment, the configured default
    /// otherwise.
    fn class_of(&self, target: &Target) -> String {
        let segments: Vec<&str> = target
            .fragment()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() >= 2 && segments[0] == "components" {
            return segments[1].to_string();
        }
        self.config.default_class().to_string()
    }
}

/// Write a resolved plain value under its key, merging with anything an
/// earlier include already introduced there. Sibling content wins over
/// introduced content.
fn insert_resolved(
    out: &mut Value,
    key: String,
    resolved: Value,
    child_path: &str,
) -> Result<(), MergeError> {
    let Value::Object(map) = out else {
        // The destination was replaced by spliced sequence content; a
        // sibling key can no longer land anywhere.
        return Err(MergeError::SequenceConflict {
            path: child_path.to_string(),
        });
    };
    match map.get_mut(&key) {
        Some(existing) => {
            let prev = existing.take();
            *existing = merge_or_overwrite(prev, resolved);
        }
        None => {
            map.insert(key, resolved);
        }
    }
    Ok(())
}

/// Merge spliced content (from an include or an inlined reference) into
/// the mapping under construction.
fn splice(out: Value, content: Value, sole_key: bool, path: &str) -> Result<Value, MergeError> {
    match content {
        Value::Array(items) => match out {
            Value::Array(mut existing) => {
                existing.extend(items);
                Ok(Value::Array(existing))
            }
            Value::Object(map) if map.is_empty() && sole_key => Ok(Value::Array(items)),
            _ => Err(MergeError::SequenceConflict {
                path: path.to_string(),
            }),
        },
        Value::Object(introduced) => match out {
            Value::Object(mut map) => {
                for (key, value) in introduced {
                    match map.get_mut(&key) {
                        // Existing sibling content wins over what the
                        // include introduces.
                        Some(existing) => {
                            let prev = existing.take();
                            *existing = merge_or_overwrite(value, prev);
                        }
                        None => {
                            map.insert(key, value);
                        }
                    }
                }
                Ok(Value::Object(map))
            }
            _ => Err(MergeError::SequenceConflict {
                path: path.to_string(),
            }),
        },
        scalar => match out {
            Value::Object(map) if map.is_empty() && sole_key => Ok(scalar),
            _ => Err(MergeError::ScalarConflict {
                path: path.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_or_overwrite_recurses_into_mappings() {
        let base = json!({"info": {"title": "T", "version": "1"}});
        let overlay = json!({"info": {"version": "2"}, "extra": true});
        let merged = merge_or_overwrite(base, overlay);
        assert_eq!(
            merged,
            json!({"info": {"title": "T", "version": "2"}, "extra": true})
        );
    }

    #[test]
    fn merge_or_overwrite_scalar_takes_overlay() {
        assert_eq!(merge_or_overwrite(json!(1), json!(2)), json!(2));
        assert_eq!(merge_or_overwrite(json!({"a": 1}), json!("x")), json!("x"));
    }

    #[test]
    fn merge_or_overwrite_keeps_base_key_order() {
        let base = json!({"b": 1, "a": 1});
        let overlay = json!({"a": 2, "c": 3});
        let merged = merge_or_overwrite(base, overlay);
        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn document_without_directives_is_unchanged() {
        let root = json!({
            "openapi": "3.0.0",
            "paths": {"/pets": {"get": {"summary": "List"}}},
            "servers": [{"url": "https://api.example.com"}]
        });
        let merged = merge(&root, Path::new("openapi.yaml"), &MergeConfig::default()).unwrap();
        assert_eq!(merged, root);
    }

    #[test]
    fn in_document_include_reads_current_root() {
        let root = json!({
            "shared": {"X": {"a": 1}},
            "thing": {"$include": "#/shared/X"}
        });
        let merged = merge(&root, Path::new("openapi.yaml"), &MergeConfig::default()).unwrap();
        assert_eq!(merged["thing"], json!({"a": 1}));
        assert!(merged["thing"].get("$include").is_none());
    }

    #[test]
    fn in_document_ref_passes_through_by_default() {
        let root = json!({
            "components": {"schemas": {"Pet": {"type": "object"}}},
            "paths": {"/pets": {"schema": {"$ref": "#/components/schemas/Pet"}}}
        });
        let merged = merge(&root, Path::new("openapi.yaml"), &MergeConfig::default()).unwrap();
        assert_eq!(
            merged["paths"]["/pets"]["schema"]["$ref"],
            json!("#/components/schemas/Pet")
        );
    }

    #[test]
    fn inline_ref_policy_splices_content() {
        let config = MergeConfig {
            inline_refs: vec!["variants".into()],
            ..Default::default()
        };
        let root = json!({
            "shared": {"X": {"a": 1}},
            "box": {"variants": {"$ref": "#/shared/X"}}
        });
        let merged = merge(&root, Path::new("openapi.yaml"), &config).unwrap();
        assert_eq!(merged["box"]["variants"], json!({"a": 1}));
    }

    #[test]
    fn malformed_ref_target_left_unresolved() {
        let root = json!({"thing": {"$ref": "http://[bad/x.yaml"}});
        let merged = merge(&root, Path::new("openapi.yaml"), &MergeConfig::default()).unwrap();
        assert_eq!(merged["thing"]["$ref"], json!("http://[bad/x.yaml"));
    }

    #[test]
    fn splice_sequence_alongside_siblings_conflicts() {
        let out = json!({"existing": 1});
        let result = splice(out, json!([1, 2]), false, "/tags");
        assert!(matches!(result, Err(MergeError::SequenceConflict { .. })));
    }

    #[test]
    fn splice_scalar_needs_sole_key() {
        assert_eq!(
            splice(json!({}), json!("s"), true, "/x").unwrap(),
            json!("s")
        );
        let result = splice(json!({"k": 1}), json!("s"), false, "/x");
        assert!(matches!(result, Err(MergeError::ScalarConflict { .. })));
    }
}
