//! Error types for pagesync-renderer.

use thiserror::Error;

/// All errors that can arise from rendering a commit message.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error (syntax error, unknown variable, ...).
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// The template rendered to nothing but whitespace.
    #[error("commit message template rendered to an empty message")]
    EmptyMessage,
}
