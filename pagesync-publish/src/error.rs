//! Error types for pagesync-publish.

use std::path::PathBuf;

use thiserror::Error;

use pagesync_core::ConfigError;

/// All errors that can abort a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Invalid configuration, or the mirror directory could not be prepared.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A git operation failed. `op` names the primitive that failed.
    #[error("git {op} failed: {source}")]
    Git {
        op: &'static str,
        #[source]
        source: git2::Error,
    },

    /// The remote refused the pushed reference (non-fast-forward, hook, ...).
    #[error("push of '{branch}' to {remote} was rejected: {message}")]
    PushRejected {
        remote: String,
        branch: String,
        message: String,
    },

    /// A stage that needs the repository ran before reset attached one.
    #[error("no mirror repository is open; the reset stage must run first")]
    MirrorNotReady,

    /// A content source path does not exist.
    #[error("content source {path} does not exist")]
    MissingSource { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience adapter for `map_err` on git2 results.
pub(crate) fn git_err(op: &'static str) -> impl FnOnce(git2::Error) -> PublishError {
    move |source| PublishError::Git { op, source }
}
