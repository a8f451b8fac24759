//! Target normalization for reference and include directives.
//!
//! A directive's value is a target string: an in-document pointer
//! (`#/...`), an absolute URL, or a path relative to the file that
//! contains the directive. The locator turns that string plus the
//! containing location into an absolute, scheme-aware [`Target`] with the
//! fragment separated out. It has no side effects and fails only on
//! malformed syntax.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::LocatorError;

/// Where the document currently being resolved came from.
///
/// Relative targets resolve against this: local paths against the
/// containing file's directory, remote paths against the containing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(Url),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// A directive target normalized against its containing document.
///
/// The fragment is a JSON-Pointer-style path into the fetched content
/// without the leading `#`; empty means the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    InDocument { fragment: String },
    Local { path: PathBuf, fragment: String },
    Remote { url: Url, fragment: String },
}

impl Target {
    pub fn fragment(&self) -> &str {
        match self {
            Target::InDocument { fragment }
            | Target::Local { fragment, .. }
            | Target::Remote { fragment, .. } => fragment,
        }
    }

    /// Stable deduplication key: absolute location plus fragment.
    ///
    /// Two directives with the same key resolve to the same component.
    pub fn key(&self) -> String {
        match self {
            Target::InDocument { fragment } => format!("#{fragment}"),
            Target::Local { path, fragment } => format!("{}#{fragment}", path.display()),
            Target::Remote { url, fragment } => format!("{url}#{fragment}"),
        }
    }

    /// The location a document loaded from this target lives at, used as
    /// the containing context for its own directives.
    pub fn location(&self) -> Option<Location> {
        match self {
            Target::InDocument { .. } => None,
            Target::Local { path, .. } => Some(Location::Local(path.clone())),
            Target::Remote { url, .. } => Some(Location::Remote(url.clone())),
        }
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Split a raw target into its base and fragment (without the `#`).
pub fn split_fragment(raw: &str) -> (&str, &str) {
    match raw.find('#') {
        Some(idx) => (&raw[..idx], &raw[idx + 1..]),
        None => (raw, ""),
    }
}

/// Normalize a target string against the location of the file that
/// contains it.
pub fn resolve_target(raw: &str, containing: &Location) -> Result<Target, LocatorError> {
    if raw.is_empty() {
        return Err(LocatorError::EmptyTarget);
    }

    let (base, fragment) = split_fragment(raw);
    let fragment = fragment.to_string();

    if base.is_empty() {
        return Ok(Target::InDocument { fragment });
    }

    if is_url(base) {
        let url = Url::parse(base).map_err(|e| LocatorError::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        return Ok(Target::Remote { url, fragment });
    }

    match containing {
        Location::Local(containing_path) => {
            let path = Path::new(base);
            let joined = if path.is_absolute() {
                path.to_path_buf()
            } else {
                containing_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(path)
            };
            Ok(Target::Local {
                path: normalize_path(&joined),
                fragment,
            })
        }
        Location::Remote(containing_url) => {
            // A relative path inside a remote document stays remote,
            // resolved against the containing URL's directory.
            let url = containing_url
                .join(base)
                .map_err(|e| LocatorError::InvalidUrl {
                    url: base.to_string(),
                    message: e.to_string(),
                })?;
            Ok(Target::Remote { url, fragment })
        }
    }
}

/// Make a path absolute against the process working directory without
/// touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        match std::env::current_dir() {
            Ok(cwd) => normalize_path(&cwd.join(path)),
            Err(_) => normalize_path(path),
        }
    }
}

/// Lexically fold `.` and `..` components so that equivalent spellings of
/// the same file produce the same dedup key.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
