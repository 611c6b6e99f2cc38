//! Artifact paths as seen by the build-graph engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A path to a file in the build graph (a source file or another action's output).
///
/// Paths are kept as forward-slash strings exactly as they appear on command
/// lines and in ninja files. They are never canonicalized or checked for
/// existence here; missing files are reported by the build-graph engine.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Creates an artifact path from a string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends one or more `/`-separated segments to this path.
    ///
    /// Empty and `.` segments are skipped, so joining an empty namespace does
    /// not produce a `//` and `./a.flags` names the same file as `a.flags`.
    pub fn join(&self, segment: &str) -> ArtifactPath {
        let mut out = self.0.trim_end_matches('/').to_string();
        if out.is_empty() && self.0.starts_with('/') {
            out.push('/');
        }
        for part in segment.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if !out.is_empty() && !out.ends_with('/') {
                out.push('/');
            }
            out.push_str(part);
        }
        ArtifactPath(out)
    }

    /// Returns the path with `suffix` appended to its final component.
    pub fn with_suffix(&self, suffix: &str) -> ArtifactPath {
        ArtifactPath(format!("{}{suffix}", self.0))
    }

    /// Returns the final path component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactPath({:?})", self.0)
    }
}

impl From<&str> for ArtifactPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArtifactPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
