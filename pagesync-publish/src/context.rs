//! Pipeline-scoped state shared by the stages.
//!
//! Reset attaches the mirror; Copy, Commit and Push borrow it. The mirror is
//! closed exactly once: by [`PipelineContext::close`] when the runner finishes,
//! or by `Drop` if the context is abandoned.

use crate::backend::{Mirror, VcsBackend};
use crate::error::PublishError;

pub struct PipelineContext<B: VcsBackend> {
    backend: B,
    mirror: Option<B::Mirror>,
}

impl<B: VcsBackend> PipelineContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            mirror: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Attach the mirror opened by Reset. A previously attached mirror is
    /// closed first.
    pub fn attach(&mut self, mirror: B::Mirror) {
        self.close();
        self.mirror = Some(mirror);
    }

    pub fn is_open(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn mirror(&self) -> Result<&B::Mirror, PublishError> {
        self.mirror.as_ref().ok_or(PublishError::MirrorNotReady)
    }

    pub fn mirror_mut(&mut self) -> Result<&mut B::Mirror, PublishError> {
        self.mirror.as_mut().ok_or(PublishError::MirrorNotReady)
    }

    /// Release the mirror. Closing an empty context is a no-op.
    pub fn close(&mut self) {
        if let Some(mirror) = self.mirror.take() {
            tracing::debug!("releasing mirror {}", mirror.workdir().display());
            mirror.close();
        }
    }
}

impl<B: VcsBackend> Drop for PipelineContext<B> {
    fn drop(&mut self) {
        self.close();
    }
}
