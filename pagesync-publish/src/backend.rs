//! VCS backend seam.
//!
//! The stages only speak in terms of these primitives; [`crate::git`]
//! implements them over libgit2. Methods documented as *network* are the only
//! ones allowed to block on remote I/O.

use std::path::Path;

use pagesync_core::{Author, BranchName};

use crate::error::PublishError;

/// Opens or creates mirrors.
pub trait VcsBackend {
    type Mirror: Mirror;

    /// Open an existing working copy at `dir`. Fails for missing, bare, or
    /// corrupt repositories.
    fn open(&self, dir: &Path) -> Result<Self::Mirror, PublishError>;

    /// Initialize a new, empty working copy at `dir`.
    fn init(&self, dir: &Path) -> Result<Self::Mirror, PublishError>;
}

/// An open working copy.
pub trait Mirror {
    /// Root of the working tree.
    fn workdir(&self) -> &Path;

    /// URL of the named remote, `None` if no such remote is configured.
    fn remote_url(&self, remote: &str) -> Result<Option<String>, PublishError>;

    fn add_remote(&mut self, remote: &str, url: &str) -> Result<(), PublishError>;

    /// Short name of the branch HEAD points at, including an unborn branch.
    /// `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>, PublishError>;

    /// *Network.* Short names of the branches the remote advertises.
    fn remote_heads(&mut self, remote: &str) -> Result<Vec<String>, PublishError>;

    /// *Network.* Fetch `refs/heads/<branch>` into
    /// `refs/remotes/<remote>/<branch>`, without tags.
    fn fetch_branch(&mut self, remote: &str, branch: &BranchName) -> Result<(), PublishError>;

    /// Create local `branch` at the remote-tracking ref if missing, and point
    /// its upstream at `<remote>/<branch>`.
    fn ensure_tracking_branch(
        &mut self,
        branch: &BranchName,
        remote: &str,
    ) -> Result<(), PublishError>;

    /// Remove untracked files. Ignored files are kept.
    fn clean(&mut self) -> Result<(), PublishError>;

    /// Switch to an existing local branch, discarding working tree changes.
    fn checkout(&mut self, branch: &BranchName) -> Result<(), PublishError>;

    /// Switch to `branch` as a new branch with no history.
    fn checkout_orphan(&mut self, branch: &BranchName) -> Result<(), PublishError>;

    /// Move the current branch, index, and working tree to `target_ref`.
    fn reset_hard(&mut self, target_ref: &str) -> Result<(), PublishError>;

    /// Stage new, modified, and deleted files.
    fn stage_all(&mut self) -> Result<(), PublishError>;

    /// Stage modifications and deletions of tracked files only.
    fn stage_tracked(&mut self) -> Result<(), PublishError>;

    /// Whether index and working tree both match HEAD.
    fn is_clean(&self) -> Result<bool, PublishError>;

    /// Commit the index on the current branch and return the new commit id.
    fn commit(&mut self, message: &str, author: Option<&Author>) -> Result<String, PublishError>;

    /// *Network.* Push the local `branch` to the same name on `remote`.
    fn push(&mut self, remote: &str, branch: &BranchName) -> Result<(), PublishError>;

    /// Commit id HEAD resolves to, `None` on an unborn branch.
    fn head_id(&self) -> Result<Option<String>, PublishError>;

    /// Release the handle.
    fn close(self)
    where
        Self: Sized,
    {
    }
}
