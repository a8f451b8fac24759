//! oas-merge
//!
//! Resolve and flatten a multi-file API description into one
//! self-contained document.
//!
//! Source documents reference each other through two directive kinds.
//! A *reference directive* (`$ref`, plus discriminator-mapping entries)
//! is rewritten to point into a shared `components` section of the
//! output; identical targets are deduplicated and given names unique
//! within their class. An *include directive* (`$include`, optionally
//! suffixed `#<fragment>` and/or `.<class>`) splices the referenced
//! content directly into the including node, optionally filtered and
//! renamed by per-class rules. Targets may live in the same document
//! (`#/...`), in sibling files on disk, or behind an HTTP(S) URL.
//!
//! Resolution runs in two passes: a discovery walk that registers every
//! reachable component, then a naming pass over the complete registry
//! (first-registered target keeps its candidate name, later collisions
//! get numeric suffixes), then a rewrite walk that substitutes final
//! local pointers and assembles the shared section. Re-encountering a
//! registered target terminates that branch, so cyclic definitions
//! flatten to a finite document.
//!
//! # Example
//!
//! ```
//! use oas_merge::{merge, MergeConfig};
//! use serde_json::json;
//!
//! let root = json!({
//!     "openapi": "3.0.0",
//!     "paths": {"/pets": {"get": {"summary": "List pets"}}}
//! });
//!
//! // No directives: the document comes back unchanged.
//! let merged = merge(&root, std::path::Path::new("openapi.yaml"), &MergeConfig::default()).unwrap();
//! assert_eq!(merged, root);
//! ```
//!
//! With a sibling file `ops.yaml` containing `get: {summary: s}`, a root
//! of `{paths: {/x: {$ref: "./ops.yaml#/get"}}}` merges to
//!
//! ```yaml
//! paths:
//!   /x:
//!     $ref: "#/components/schemas/get"
//! components:
//!   schemas:
//!     get:
//!       summary: s
//! ```

mod config;
mod directive;
mod error;
mod locator;
mod merge;
mod naming;
mod postprocess;
mod registry;
mod source;

pub use config::{ClassRules, KeyFilter, MergeConfig, DEFAULT_CLASS};
pub use directive::{classify, Directive, DISCRIMINATOR_SUFFIX, INCLUDE_MARKER, REF_MARKER};
pub use error::{LocatorError, MergeError};
pub use locator::{is_url, resolve_target, split_fragment, Location, Target};
pub use merge::{discover, merge, merge_file, merge_or_overwrite, Context, DiscoveredComponent};
pub use naming::{assign_names, candidate_name, NameTable};
pub use postprocess::apply as postprocess_include;
pub use registry::{Component, Registry};
pub use source::{load_document, navigate_fragment, parse_document, Sources};
