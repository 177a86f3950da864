//! Pipeline entrypoint used by the CLI.
//!
//! Stages run strictly in order: Reset, Copy, Commit, Push. The first error
//! aborts the run. Whatever happens, the mirror is closed before returning.

use pagesync_core::PublishConfig;

use crate::backend::VcsBackend;
use crate::commit::{commit, CommitOutcome};
use crate::context::PipelineContext;
use crate::copy::{copy, ContentSource, CopyReport};
use crate::error::PublishError;
use crate::git::Git2Backend;
use crate::push::{push, PushOutcome};
use crate::reset::{reset, ResetOutcome};

/// Outcome of every stage of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub reset: ResetOutcome,
    pub copy: CopyReport,
    pub commit: CommitOutcome,
    pub push: PushOutcome,
}

/// Run the pipeline over `backend`. `message` is the rendered commit message.
pub fn run<B, S>(
    backend: B,
    config: &PublishConfig,
    message: &str,
    source: &S,
) -> Result<PipelineReport, PublishError>
where
    B: VcsBackend,
    S: ContentSource + ?Sized,
{
    let mut ctx = PipelineContext::new(backend);
    let result = run_stages(&mut ctx, config, message, source);
    ctx.close();
    if let Err(e) = &result {
        tracing::debug!("publish aborted: {e}");
    }
    result
}

fn run_stages<B, S>(
    ctx: &mut PipelineContext<B>,
    config: &PublishConfig,
    message: &str,
    source: &S,
) -> Result<PipelineReport, PublishError>
where
    B: VcsBackend,
    S: ContentSource + ?Sized,
{
    let reset = reset(ctx, config)?;
    let copy = copy(ctx, source)?;
    let commit = commit(ctx, config, message)?;
    let push = push(ctx, config, &commit)?;
    Ok(PipelineReport {
        reset,
        copy,
        commit,
        push,
    })
}

/// Publish the configured content with libgit2.
pub fn publish(config: &PublishConfig, message: &str) -> Result<PipelineReport, PublishError> {
    run(
        Git2Backend::new(config.network_timeout),
        config,
        message,
        config.contents.as_slice(),
    )
}
