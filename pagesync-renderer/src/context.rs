//! Message context: serializable rendering payload for the commit message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pagesync_core::PublishConfig;

use crate::error::RenderError;

/// Variables available to the commit message template.
///
/// ```text
/// {{ branch }}             target branch
/// {{ repo_uri }}           remote repository URI
/// {{ timestamp }}          RFC 3339 UTC time of the run
/// {{ date }}               YYYY-MM-DD of the run
/// {{ pagesync_version }}
/// {{ source.commit }}      source repository HEAD, when known
/// {{ source.short_commit }}
/// {{ source.branch }}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    pub branch: String,
    pub repo_uri: String,
    pub timestamp: DateTime<Utc>,
    pub date: String,
    pub pagesync_version: String,
    pub source: Option<SourceCtx>,
}

/// The revision of the project that produced the generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCtx {
    pub commit: String,
    pub short_commit: String,
    pub branch: Option<String>,
}

impl SourceCtx {
    pub fn new(commit: impl Into<String>, branch: Option<String>) -> Self {
        let commit = commit.into();
        let short_commit = commit.chars().take(7).collect();
        Self {
            commit,
            short_commit,
            branch,
        }
    }
}

impl MessageContext {
    /// Build a [`MessageContext`] for `config`, stamped with the current time.
    pub fn from_config(config: &PublishConfig) -> Self {
        Self::at(config, Utc::now())
    }

    /// Build a [`MessageContext`] for `config` at a fixed instant.
    pub fn at(config: &PublishConfig, timestamp: DateTime<Utc>) -> Self {
        Self {
            branch: config.branch.0.clone(),
            repo_uri: config.repo_uri.clone(),
            timestamp,
            date: timestamp.format("%Y-%m-%d").to_string(),
            pagesync_version: env!("CARGO_PKG_VERSION").to_string(),
            source: None,
        }
    }

    /// Attach the source revision.
    pub fn with_source(mut self, source: Option<SourceCtx>) -> Self {
        self.source = source;
        self
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
