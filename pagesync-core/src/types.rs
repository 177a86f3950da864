//! Domain types for publish configuration.
//!
//! [`ConfigFile`] is the on-disk shape (every field optional so defaults can
//! be applied later); [`PublishConfig`] is the resolved, immutable form the
//! pipeline consumes. All path fields use `PathBuf`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::preserve::PreserveSet;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed git branch name (short form, e.g. `gh-pages`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchName(pub String);

impl BranchName {
    /// `refs/heads/<branch>`
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// `refs/remotes/<remote>/<branch>`
    pub fn remote_tracking_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{remote}/{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// One entry of the content source: copy `from` (file or directory) into
/// `into`, relative to the mirror root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMapping {
    pub from: PathBuf,
    #[serde(default)]
    pub into: PathBuf,
    /// Globs relative to `from`; matching files are not copied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Root of `pagesync.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preserve: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default)]
    pub contents: Vec<ContentMapping>,
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo_uri: Option<String>,
    pub branch: Option<String>,
    pub repo_dir: Option<PathBuf>,
    pub commit_message: Option<String>,
}

/// Fully resolved configuration. Immutable for the duration of a pipeline run.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub repo_uri: String,
    pub branch: BranchName,
    /// Absolute path of the local mirror.
    pub repo_dir: PathBuf,
    pub preserve: PreserveSet,
    /// Commit message template (rendered by the caller before commit).
    pub commit_message: String,
    pub network_timeout: Duration,
    pub author: Option<Author>,
    /// Content mappings with `from` made absolute.
    pub contents: Vec<ContentMapping>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
