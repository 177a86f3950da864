//! Reset stage: bring the mirror to the remote tip of the target branch.
//!
//! 1. Reuse the existing mirror if its `origin` and current branch match the
//!    config; otherwise delete the directory and init a fresh repository.
//! 2. List the remote heads. If the branch exists remotely, fetch it and
//!    hard-reset onto it; if not, start an orphan branch.
//! 3. Delete every file outside the preserve set and stage the deletions.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use pagesync_core::{same_remote, ConfigError, PreserveSet, PublishConfig};

use crate::backend::{Mirror, VcsBackend};
use crate::context::PipelineContext;
use crate::error::{io_err, PublishError};

/// Name of the only remote the mirror ever has.
pub const REMOTE_NAME: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    /// The existing mirror passed validation and was reused.
    pub reused: bool,
    /// The target branch was advertised by the remote.
    pub remote_branch_existed: bool,
    /// Mirror-relative paths deleted by the cleanup walk.
    pub purged: Vec<PathBuf>,
}

/// Run the Reset stage. On success the context holds a mirror checked out on
/// `config.branch`.
pub fn reset<B: VcsBackend>(
    ctx: &mut PipelineContext<B>,
    config: &PublishConfig,
) -> Result<ResetOutcome, PublishError> {
    let reused = match open_existing(ctx.backend(), config) {
        Some(mirror) => {
            ctx.attach(mirror);
            true
        }
        None => {
            let mirror = fresh_mirror(ctx.backend(), &config.repo_dir)?;
            ctx.attach(mirror);
            ctx.mirror_mut()?.add_remote(REMOTE_NAME, &config.repo_uri)?;
            false
        }
    };

    let mirror = ctx.mirror_mut()?;
    let branch = &config.branch;
    let heads = mirror.remote_heads(REMOTE_NAME)?;
    let remote_branch_existed = heads.iter().any(|h| h == branch.as_str());

    if remote_branch_existed {
        mirror.fetch_branch(REMOTE_NAME, branch)?;
        mirror.ensure_tracking_branch(branch, REMOTE_NAME)?;
        mirror.clean()?;
        mirror.checkout(branch)?;
        mirror.reset_hard(&branch.remote_tracking_ref(REMOTE_NAME))?;
    } else {
        mirror.checkout_orphan(branch)?;
    }

    let purged = purge(mirror.workdir(), &config.preserve)?;
    mirror.stage_tracked()?;

    tracing::info!(
        branch = %branch,
        reused,
        remote_branch_existed,
        purged = purged.len(),
        "reset mirror"
    );
    Ok(ResetOutcome {
        reused,
        remote_branch_existed,
        purged,
    })
}

// ---------------------------------------------------------------------------
// Mirror acquisition
// ---------------------------------------------------------------------------

/// Open the mirror at `config.repo_dir` if it is usable. Every failure here
/// is recovered: the candidate is closed and `None` returned.
fn open_existing<B: VcsBackend>(backend: &B, config: &PublishConfig) -> Option<B::Mirror> {
    let mirror = match backend.open(&config.repo_dir) {
        Ok(mirror) => mirror,
        Err(e) => {
            tracing::debug!("no usable mirror at {}: {e}", config.repo_dir.display());
            return None;
        }
    };
    match validate(&mirror, config) {
        Ok(()) => Some(mirror),
        Err(reason) => {
            tracing::debug!(
                "discarding mirror at {}: {reason}",
                config.repo_dir.display()
            );
            mirror.close();
            None
        }
    }
}

fn validate<M: Mirror>(mirror: &M, config: &PublishConfig) -> Result<(), String> {
    let url = mirror
        .remote_url(REMOTE_NAME)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no '{REMOTE_NAME}' remote"))?;
    if !same_remote(&url, &config.repo_uri) {
        return Err(format!("'{REMOTE_NAME}' points at {url}"));
    }
    match mirror.current_branch().map_err(|e| e.to_string())? {
        Some(current) if current == config.branch.as_str() => Ok(()),
        Some(current) => Err(format!("checked out on '{current}'")),
        None => Err("HEAD is detached".to_string()),
    }
}

/// Delete and recreate `dir`, then init an empty repository in it.
fn fresh_mirror<B: VcsBackend>(backend: &B, dir: &Path) -> Result<B::Mirror, PublishError> {
    let mirror_dir_err = |source| ConfigError::MirrorDir {
        path: dir.to_path_buf(),
        source,
    };
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!("removed previous mirror at {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(mirror_dir_err(e).into()),
    }
    std::fs::create_dir_all(dir).map_err(mirror_dir_err)?;
    backend.init(dir)
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Delete every file (and symlink) under `root` that the preserve set does not
/// match. Directories and the top-level `.git` are left alone.
///
/// Returns the deleted paths relative to `root`.
pub fn purge(root: &Path, preserve: &PreserveSet) -> Result<Vec<PathBuf>, PublishError> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == ".git"));

    let mut purged = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if preserve.matches(relative) {
            tracing::debug!("preserved: {}", relative.display());
            continue;
        }
        std::fs::remove_file(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        purged.push(relative.to_path_buf());
    }
    Ok(purged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
