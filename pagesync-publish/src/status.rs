//! Offline inspection of the local mirror, for `pagesync status`.

use std::path::PathBuf;

use serde::Serialize;

use pagesync_core::{same_remote, PublishConfig};

use crate::backend::{Mirror, VcsBackend};
use crate::error::PublishError;
use crate::reset::REMOTE_NAME;

/// What Reset would find at `repo_dir`. Gathered without network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorStatus {
    pub repo_dir: PathBuf,
    /// A non-bare repository could be opened.
    pub exists: bool,
    pub remote_url: Option<String>,
    pub remote_matches: bool,
    pub branch: Option<String>,
    pub branch_matches: bool,
    pub head: Option<String>,
    pub dirty: bool,
}

impl MirrorStatus {
    fn absent(config: &PublishConfig) -> Self {
        Self {
            repo_dir: config.repo_dir.clone(),
            exists: false,
            remote_url: None,
            remote_matches: false,
            branch: None,
            branch_matches: false,
            head: None,
            dirty: false,
        }
    }

    /// Whether the next publish would reuse this mirror.
    pub fn is_reusable(&self) -> bool {
        self.exists && self.remote_matches && self.branch_matches
    }
}

pub fn inspect<B: VcsBackend>(
    backend: &B,
    config: &PublishConfig,
) -> Result<MirrorStatus, PublishError> {
    let mirror = match backend.open(&config.repo_dir) {
        Ok(mirror) => mirror,
        Err(e) => {
            tracing::debug!("no mirror at {}: {e}", config.repo_dir.display());
            return Ok(MirrorStatus::absent(config));
        }
    };

    let status = describe(&mirror, config);
    mirror.close();
    status
}

fn describe<M: Mirror>(mirror: &M, config: &PublishConfig) -> Result<MirrorStatus, PublishError> {
    let remote_url = mirror.remote_url(REMOTE_NAME)?;
    let branch = mirror.current_branch()?;
    Ok(MirrorStatus {
        repo_dir: config.repo_dir.clone(),
        exists: true,
        remote_matches: remote_url
            .as_deref()
            .is_some_and(|url| same_remote(url, &config.repo_uri)),
        branch_matches: branch.as_deref() == Some(config.branch.as_str()),
        remote_url,
        branch,
        head: mirror.head_id()?,
        dirty: !mirror.is_clean()?,
    })
}
