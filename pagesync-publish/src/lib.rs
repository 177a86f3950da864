//! # pagesync-publish
//!
//! Publishes generated content to a git branch.
//!
//! Call [`publish`] with a resolved [`pagesync_core::PublishConfig`] and a
//! rendered commit message, or [`pipeline::run`] to supply your own backend
//! and content source.

pub mod backend;
pub mod commit;
pub mod context;
pub mod copy;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod push;
pub mod reset;
pub mod status;

#[cfg(test)]
mod fake;

pub use backend::{Mirror, VcsBackend};
pub use commit::CommitOutcome;
pub use context::PipelineContext;
pub use copy::{ContentSource, CopyEntry, CopyReport, WriteResult};
pub use error::PublishError;
pub use git::{discover_origin, source_revision, Git2Backend, GitMirror, SourceRevision};
pub use pipeline::{publish, PipelineReport};
pub use push::PushOutcome;
pub use reset::{ResetOutcome, REMOTE_NAME};
pub use status::{inspect, MirrorStatus};
