//! Document I/O: local files, remote fetches, glob expansion.
//!
//! Everything here treats a document as a generic order-preserving tree
//! ([`serde_json::Value`] with `preserve_order`); YAML sources are
//! deserialized into the same representation so the engine never cares
//! which syntax a file was written in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::locator::Target;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read a file to a string with the usual fatal-error mapping.
pub fn read_text(path: &Path) -> Result<String, MergeError> {
    if !path.exists() {
        return Err(MergeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| MergeError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a document from text, preserving mapping key order.
///
/// Tries JSON first so JSON-specific parse errors stay precise, then
/// falls back to YAML (which accepts a superset of the JSON we care
/// about). `location` is only used for error reporting.
///
/// # Errors
///
/// Returns `MergeError::InvalidDocument` if neither parser accepts the
/// text.
pub fn parse_document(text: &str, location: &str) -> Result<Value, MergeError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    serde_yaml::from_str(text).map_err(|e| MergeError::InvalidDocument {
        location: location.to_string(),
        message: e.to_string(),
    })
}

/// Load a document from a local file.
///
/// # Errors
///
/// Returns `MergeError::FileNotFound` if the file doesn't exist,
/// `MergeError::ReadError` if it can't be read, or
/// `MergeError::InvalidDocument` if it isn't valid YAML or JSON. All are
/// fatal: a missing or broken local file aborts the merge.
pub fn load_document(path: &Path) -> Result<Value, MergeError> {
    let text = read_text(path)?;
    parse_document(&text, &path.display().to_string())
}

/// Navigate a JSON-Pointer-style fragment (e.g. `/components/schemas/Pet`).
///
/// An empty pointer returns the whole document. Returns `None` when any
/// segment is missing; the caller decides whether that is fatal.
pub fn navigate_fragment(document: &Value, pointer: &str) -> Option<Value> {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(document.clone());
    }

    let mut current = document;
    for segment in trimmed.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = segment.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// Check if a target string contains glob wildcards.
/// Targets without wildcards are treated as literal paths.
pub fn is_glob(target: &str) -> bool {
    target.contains('*') || target.contains('?')
}

/// Fetch/load/glob collaborators plus the fetch cache for one merge
/// invocation.
///
/// The cache is keyed by absolute URL and shared by both passes of a
/// merge so the rewrite pass observes exactly the bytes the discovery
/// pass registered. It is not safe to reuse across unrelated merges.
#[derive(Debug, Default)]
pub struct Sources {
    cache: HashMap<String, Value>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a local document. No caching: the registry already prevents
    /// repeated recursion into the same reference target.
    pub fn load(&self, path: &Path) -> Result<Value, MergeError> {
        load_document(path)
    }

    /// Fetch a remote document, caching by absolute URL.
    ///
    /// Transport errors and non-success statuses substitute an empty
    /// mapping and log a warning; the walk continues. An unparseable
    /// body is fatal.
    pub fn fetch(&mut self, url: &url::Url) -> Result<Value, MergeError> {
        if let Some(cached) = self.cache.get(url.as_str()) {
            return Ok(cached.clone());
        }

        let value = match self.transport(url) {
            Ok(text) => parse_document(&text, url.as_str())?,
            Err(message) => {
                tracing::warn!(url = %url, %message, "fetch failed, substituting empty document");
                Value::Object(Map::new())
            }
        };

        self.cache.insert(url.as_str().to_string(), value.clone());
        Ok(value)
    }

    #[cfg(feature = "remote")]
    fn transport(&self, url: &url::Url) -> Result<String, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        let response = client.get(url.as_str()).send().map_err(|e| e.to_string())?;
        let response = response.error_for_status().map_err(|e| e.to_string())?;
        response.text().map_err(|e| e.to_string())
    }

    #[cfg(not(feature = "remote"))]
    fn transport(&self, _url: &url::Url) -> Result<String, String> {
        Err("remote fetch support is disabled".to_string())
    }

    /// Expand a glob-bearing include target into concrete files under
    /// `base`. Matches are sorted so downstream assembly is
    /// deterministic; an invalid pattern warns and yields nothing.
    pub fn expand_glob(&self, pattern: &str, base: &Path) -> Vec<PathBuf> {
        let full = base.join(pattern);
        match glob::glob(&full.to_string_lossy()) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> =
                    entries.flatten().filter(|p| p.is_file()).collect();
                paths.sort();
                paths
            }
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid glob pattern, no files included");
                Vec::new()
            }
        }
    }

    /// Obtain a target's whole document plus the location it came from.
    /// In-document targets are the caller's job (they re-read the current
    /// root, which this module never sees).
    pub fn obtain(&mut self, target: &Target) -> Result<Value, MergeError> {
        match target {
            Target::Local { path, .. } => self.load(path),
            Target::Remote { url, .. } => self.fetch(url),
            Target::InDocument { .. } => Ok(Value::Object(Map::new())),
        }
    }
}
