//! Push stage. Gated on the Commit outcome: with nothing committed it never
//! touches the mirror or the network.

use pagesync_core::PublishConfig;

use crate::backend::{Mirror, VcsBackend};
use crate::commit::CommitOutcome;
use crate::context::PipelineContext;
use crate::error::PublishError;
use crate::reset::REMOTE_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed {
        branch: String,
        commit_id: Option<String>,
    },
    /// Commit did no work.
    Skipped,
}

impl PushOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed { .. })
    }
}

pub fn push<B: VcsBackend>(
    ctx: &mut PipelineContext<B>,
    config: &PublishConfig,
    committed: &CommitOutcome,
) -> Result<PushOutcome, PublishError> {
    if !committed.did_work {
        tracing::info!(branch = %config.branch, "push skipped, nothing committed");
        return Ok(PushOutcome::Skipped);
    }

    ctx.mirror_mut()?.push(REMOTE_NAME, &config.branch)?;
    tracing::info!(branch = %config.branch, remote = REMOTE_NAME, "pushed");
    Ok(PushOutcome::Pushed {
        branch: config.branch.to_string(),
        commit_id: committed.commit_id.clone(),
    })
}
