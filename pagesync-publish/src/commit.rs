//! Commit stage: record the working tree if, and only if, it changed.

use pagesync_core::PublishConfig;

use crate::backend::{Mirror, VcsBackend};
use crate::context::PipelineContext;
use crate::error::PublishError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// A commit was created. This flag alone decides whether Push runs.
    pub did_work: bool,
    pub commit_id: Option<String>,
}

impl CommitOutcome {
    pub fn nothing_to_commit() -> Self {
        Self {
            did_work: false,
            commit_id: None,
        }
    }
}

/// Stage everything and commit with the already rendered `message`.
pub fn commit<B: VcsBackend>(
    ctx: &mut PipelineContext<B>,
    config: &PublishConfig,
    message: &str,
) -> Result<CommitOutcome, PublishError> {
    let mirror = ctx.mirror_mut()?;
    mirror.stage_all()?;

    if mirror.is_clean()? {
        tracing::info!(branch = %config.branch, "nothing to commit");
        return Ok(CommitOutcome::nothing_to_commit());
    }

    let id = mirror.commit(message, config.author.as_ref())?;
    tracing::info!(branch = %config.branch, commit = %id, "committed");
    Ok(CommitOutcome {
        did_work: true,
        commit_id: Some(id),
    })
}
