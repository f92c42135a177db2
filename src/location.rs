//! Source Locator - best-effort installation-site capture
//!
//! Resolves "where in the source tree was this wrapping installed" once, at
//! installation time. The resolved path is shared by every event the wrapping
//! emits. Resolution never fails: unusable input degrades to the sentinel
//! [`SourceLocation::UNKNOWN`].
//!
//! Every public installer in this crate carries `#[track_caller]`, so the
//! frame observed here is the user's call site, not crate internals. Callers
//! with better knowledge (codegen, macros) can bypass capture entirely with
//! [`SourceLocation::from_path`].

use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Project-root-relative source path of an installation site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocation {
    path: Arc<str>,
}

impl SourceLocation {
    /// Sentinel used when no usable location could be resolved.
    pub const UNKNOWN: &'static str = "unknown";

    /// Capture the caller's file, relativized against the current working
    /// directory when possible.
    #[track_caller]
    pub fn capture() -> Self {
        Self::from_caller(Location::caller())
    }

    /// Explicit override: trust the caller's path verbatim (empty input
    /// still degrades to the sentinel).
    pub fn from_path(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        if path.is_empty() {
            return Self::unknown();
        }
        Self {
            path: Arc::from(path),
        }
    }

    /// The sentinel location.
    pub fn unknown() -> Self {
        Self {
            path: Arc::from(Self::UNKNOWN),
        }
    }

    pub fn is_unknown(&self) -> bool {
        &*self.path == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Shared handle to the path, for contexts that store it long-term.
    pub(crate) fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.path)
    }

    fn from_caller(loc: &'static Location<'static>) -> Self {
        Self::from_path(relativize(loc.file()))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Strip the working-directory prefix from absolute paths. Paths already
/// relative (the common case for workspace-local code) pass through.
fn relativize(file: &str) -> String {
    let path = Path::new(file);
    if path.is_absolute() {
        if let Ok(cwd) = std::env::current_dir() {
            if let Ok(stripped) = path.strip_prefix(&cwd) {
                if let Some(s) = stripped.to_str() {
                    return s.to_string();
                }
            }
        }
    }
    file.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_lands_on_this_file() {
        let loc = SourceLocation::capture();
        assert!(
            loc.as_str().ends_with("location.rs"),
            "expected this test file, got: {loc}"
        );
        assert!(!loc.is_unknown());
    }

    #[test]
    fn test_capture_through_a_helper_reports_the_helper_caller() {
        #[track_caller]
        fn installer() -> SourceLocation {
            SourceLocation::capture()
        }
        // The helper forwards the caller attribute, so the location is still
        // this file, not some frame inside `installer`.
        let loc = installer();
        assert!(loc.as_str().ends_with("location.rs"));
    }

    #[test]
    fn test_from_path_verbatim() {
        let loc = SourceLocation::from_path("src/generated/api.rs");
        assert_eq!(loc.as_str(), "src/generated/api.rs");
    }

    #[test]
    fn test_empty_path_degrades_to_unknown() {
        let loc = SourceLocation::from_path("");
        assert!(loc.is_unknown());
        assert_eq!(loc.as_str(), "unknown");
    }

    #[test]
    fn test_default_is_unknown() {
        assert!(SourceLocation::default().is_unknown());
    }

    #[test]
    fn test_relativize_strips_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let abs = cwd.join("src").join("lib.rs");
        let rel = relativize(abs.to_str().unwrap());
        assert_eq!(rel, format!("src{}lib.rs", std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn test_relativize_passes_foreign_absolute_paths_through() {
        let foreign = if cfg!(windows) {
            r"Z:\somewhere\else\dep.rs"
        } else {
            "/somewhere/else/dep.rs"
        };
        assert_eq!(relativize(foreign), foreign);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let loc = SourceLocation::from_path("demo/calc.rs");
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"demo/calc.rs\"");
    }
}
