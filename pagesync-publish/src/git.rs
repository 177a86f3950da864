//! libgit2 implementation of the backend seam.
//!
//! Credentials come from ssh-agent or the user's git credential helpers; this
//! crate never stores any. Remote operations are bounded by libgit2's server
//! connect/read timeouts, set process-wide when the backend is created.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use git2::{
    build::CheckoutBuilder, AutotagOption, BranchType, Cred, CredentialType, Direction, ErrorCode,
    FetchOptions, IndexAddOption, ObjectType, PushOptions, RemoteCallbacks, Repository, ResetType,
    Signature, StatusOptions,
};

use pagesync_core::{Author, BranchName};

use crate::backend::{Mirror, VcsBackend};
use crate::error::{git_err, io_err, PublishError};

const FALLBACK_AUTHOR_NAME: &str = "pagesync";
const FALLBACK_AUTHOR_EMAIL: &str = "pagesync@localhost";

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Opens and creates [`GitMirror`]s.
#[derive(Debug, Clone)]
pub struct Git2Backend {
    _private: (),
}

impl Git2Backend {
    /// Create a backend whose remote operations time out after `timeout`.
    ///
    /// libgit2 keeps the timeout in process-wide state, so only the first
    /// backend created in a process sets it.
    pub fn new(timeout: Duration) -> Self {
        static NETWORK_TIMEOUT: Once = Once::new();
        NETWORK_TIMEOUT.call_once(|| apply_network_timeout(timeout));
        Self { _private: () }
    }
}

fn apply_network_timeout(timeout: Duration) {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    // SAFETY: these write libgit2 global options that transports read when
    // they connect. `Once` limits the write to the first backend in the
    // process; the CLI creates it before any git work. A process that is
    // already using git2 on other threads (a parallel test harness) may race
    // with this single write.
    let result = unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)
            .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(millis))
    };
    if let Err(e) = result {
        tracing::warn!("could not set git network timeout: {e}");
    }
}

impl VcsBackend for Git2Backend {
    type Mirror = GitMirror;

    fn open(&self, dir: &Path) -> Result<GitMirror, PublishError> {
        let repo = Repository::open(dir).map_err(git_err("open"))?;
        if repo.is_bare() {
            return Err(PublishError::Git {
                op: "open",
                source: git2::Error::from_str("mirror must not be a bare repository"),
            });
        }
        Ok(GitMirror {
            repo,
            workdir: dir.to_path_buf(),
        })
    }

    fn init(&self, dir: &Path) -> Result<GitMirror, PublishError> {
        let repo = Repository::init(dir).map_err(git_err("init"))?;
        Ok(GitMirror {
            repo,
            workdir: dir.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// An open libgit2 working copy.
pub struct GitMirror {
    repo: Repository,
    workdir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialKind {
    SshAgent,
    Helper,
    Default,
}

/// Which credential sources have been offered to the remote. libgit2 calls
/// the credentials callback again after each rejection, so every source is
/// offered at most once and the callback then gives up.
#[derive(Debug, Default)]
struct CredentialAttempts {
    ssh_agent: bool,
    helper: bool,
    default: bool,
}

impl CredentialAttempts {
    /// Next untried source libgit2 will accept, in order ssh-agent, git
    /// credential helpers, default.
    fn next(&mut self, username: Option<&str>, allowed: CredentialType) -> Option<CredentialKind> {
        if allowed.is_ssh_key() && username.is_some() && !self.ssh_agent {
            self.ssh_agent = true;
            return Some(CredentialKind::SshAgent);
        }
        if allowed.is_user_pass_plaintext() && !self.helper {
            self.helper = true;
            return Some(CredentialKind::Helper);
        }
        if allowed.is_default() && !self.default {
            self.default = true;
            return Some(CredentialKind::Default);
        }
        None
    }
}

fn remote_callbacks<'a>(repo: &Repository) -> RemoteCallbacks<'a> {
    let cfg = repo.config().ok();
    let mut attempts = CredentialAttempts::default();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        while let Some(kind) = attempts.next(username_from_url, allowed) {
            let cred = match (kind, username_from_url, cfg.as_ref()) {
                (CredentialKind::SshAgent, Some(user), _) => Cred::ssh_key_from_agent(user),
                (CredentialKind::Helper, _, Some(cfg)) => {
                    Cred::credential_helper(cfg, url, username_from_url)
                }
                (CredentialKind::Default, _, _) => Cred::default(),
                _ => continue,
            };
            match cred {
                Ok(cred) => return Ok(cred),
                Err(e) => tracing::debug!("{kind:?} credentials unavailable for {url}: {e}"),
            }
        }
        Err(git2::Error::from_str(&format!(
            "authentication failed for {url}: no more credentials to try"
        )))
    });
    callbacks
}

fn is_rejection(err: &git2::Error) -> bool {
    if err.code() == ErrorCode::NotFastForward {
        return true;
    }
    let msg = err.message();
    msg.contains("non-fast-forward")
        || msg.contains("non-fastforwardable")
        || msg.contains("fetch first")
        || msg.contains("not present locally")
}

impl Mirror for GitMirror {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>, PublishError> {
        match self.repo.find_remote(remote) {
            Ok(r) => Ok(r.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(PublishError::Git {
                op: "remote lookup",
                source: e,
            }),
        }
    }

    fn add_remote(&mut self, remote: &str, url: &str) -> Result<(), PublishError> {
        self.repo
            .remote(remote, url)
            .map(|_| ())
            .map_err(git_err("remote add"))
    }

    fn current_branch(&self) -> Result<Option<String>, PublishError> {
        let head = self
            .repo
            .find_reference("HEAD")
            .map_err(git_err("head lookup"))?;
        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string))
    }

    fn remote_heads(&mut self, remote: &str) -> Result<Vec<String>, PublishError> {
        let mut remote = self
            .repo
            .find_remote(remote)
            .map_err(git_err("ls-remote"))?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(remote_callbacks(&self.repo)), None)
            .map_err(git_err("ls-remote"))?;
        let heads = connection
            .list()
            .map_err(git_err("ls-remote"))?
            .iter()
            .filter_map(|head| head.name().strip_prefix("refs/heads/"))
            .map(str::to_string)
            .collect();
        Ok(heads)
    }

    fn fetch_branch(&mut self, remote: &str, branch: &BranchName) -> Result<(), PublishError> {
        let refspec = format!("+{}:{}", branch.local_ref(), branch.remote_tracking_ref(remote));
        let mut remote = self.repo.find_remote(remote).map_err(git_err("fetch"))?;

        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks(&self.repo));
        options.download_tags(AutotagOption::None);

        remote
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(git_err("fetch"))
    }

    fn ensure_tracking_branch(
        &mut self,
        branch: &BranchName,
        remote: &str,
    ) -> Result<(), PublishError> {
        let tracking = self
            .repo
            .find_reference(&branch.remote_tracking_ref(remote))
            .and_then(|r| r.peel_to_commit())
            .map_err(git_err("branch"))?;

        let mut local = match self.repo.find_branch(branch.as_str(), BranchType::Local) {
            Ok(local) => local,
            Err(e) if e.code() == ErrorCode::NotFound => self
                .repo
                .branch(branch.as_str(), &tracking, false)
                .map_err(git_err("branch add"))?,
            Err(e) => {
                return Err(PublishError::Git {
                    op: "branch list",
                    source: e,
                })
            }
        };
        local
            .set_upstream(Some(format!("{remote}/{branch}").as_str()))
            .map_err(git_err("branch change upstream"))
    }

    fn clean(&mut self) -> Result<(), PublishError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(git_err("clean"))?;

        for entry in statuses.iter() {
            if !entry.status().is_wt_new() {
                continue;
            }
            let Some(relative) = entry.path() else {
                continue;
            };
            let path = self.workdir.join(relative);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("cleaned untracked {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&path, e)),
            }
        }
        Ok(())
    }

    fn checkout(&mut self, branch: &BranchName) -> Result<(), PublishError> {
        self.repo
            .set_head(&branch.local_ref())
            .map_err(git_err("checkout"))?;
        let mut builder = CheckoutBuilder::new();
        builder.force();
        self.repo
            .checkout_head(Some(&mut builder))
            .map_err(git_err("checkout"))
    }

    fn checkout_orphan(&mut self, branch: &BranchName) -> Result<(), PublishError> {
        let local = branch.local_ref();
        self.repo
            .set_head(&local)
            .map_err(git_err("checkout orphan"))?;
        // HEAD now names the branch; drop a stale ref so it becomes unborn.
        match self.repo.find_reference(&local) {
            Ok(mut existing) => existing.delete().map_err(git_err("checkout orphan")),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(PublishError::Git {
                op: "checkout orphan",
                source: e,
            }),
        }
    }

    fn reset_hard(&mut self, target_ref: &str) -> Result<(), PublishError> {
        let target = self
            .repo
            .find_reference(target_ref)
            .and_then(|r| r.peel(ObjectType::Commit))
            .map_err(git_err("reset"))?;
        let mut builder = CheckoutBuilder::new();
        builder.force();
        self.repo
            .reset(&target, ResetType::Hard, Some(&mut builder))
            .map_err(git_err("reset"))
    }

    fn stage_all(&mut self) -> Result<(), PublishError> {
        let mut index = self.repo.index().map_err(git_err("add"))?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .and_then(|()| index.update_all(["*"].iter(), None))
            .and_then(|()| index.write())
            .map_err(git_err("add"))
    }

    fn stage_tracked(&mut self) -> Result<(), PublishError> {
        let mut index = self.repo.index().map_err(git_err("add --update"))?;
        index
            .update_all(["*"].iter(), None)
            .and_then(|()| index.write())
            .map_err(git_err("add --update"))
    }

    fn is_clean(&self) -> Result<bool, PublishError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(git_err("status"))?;
        Ok(statuses.is_empty())
    }

    fn commit(&mut self, message: &str, author: Option<&Author>) -> Result<String, PublishError> {
        let mut index = self.repo.index().map_err(git_err("commit"))?;
        let tree_id = index.write_tree().map_err(git_err("commit"))?;
        let tree = self.repo.find_tree(tree_id).map_err(git_err("commit"))?;

        let signature = match author {
            Some(author) => Signature::now(&author.name, &author.email),
            None => self
                .repo
                .signature()
                .or_else(|_| Signature::now(FALLBACK_AUTHOR_NAME, FALLBACK_AUTHOR_EMAIL)),
        }
        .map_err(git_err("commit"))?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(git_err("commit"))?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => {
                return Err(PublishError::Git {
                    op: "commit",
                    source: e,
                })
            }
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(git_err("commit"))?;
        Ok(oid.to_string())
    }

    fn push(&mut self, remote_name: &str, branch: &BranchName) -> Result<(), PublishError> {
        let refspec = format!("{0}:{0}", branch.local_ref());
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(git_err("push"))?;

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let result = {
            let mut callbacks = remote_callbacks(&self.repo);
            callbacks.push_update_reference(|_refname, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut options))
        };

        let rejected = |message: String| PublishError::PushRejected {
            remote: remote_name.to_string(),
            branch: branch.to_string(),
            message,
        };
        match result {
            Err(e) if is_rejection(&e) => Err(rejected(e.message().to_string())),
            Err(e) => Err(PublishError::Git {
                op: "push",
                source: e,
            }),
            Ok(()) => match rejection.into_inner() {
                Some(message) => Err(rejected(message)),
                None => Ok(()),
            },
        }
    }

    fn head_id(&self) -> Result<Option<String>, PublishError> {
        match self.repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(PublishError::Git {
                op: "head lookup",
                source: e,
            }),
        }
    }

    fn close(self) {
        tracing::debug!("closing mirror at {}", self.workdir.display());
    }
}

// ---------------------------------------------------------------------------
// Source revision
// ---------------------------------------------------------------------------

/// HEAD of the repository containing the generated content's project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRevision {
    pub commit: String,
    pub branch: Option<String>,
}

/// Discover the repository enclosing `dir` and read its HEAD. `None` when
/// `dir` is not inside a repository or HEAD is unborn.
pub fn source_revision(dir: &Path) -> Option<SourceRevision> {
    let repo = Repository::discover(dir).ok()?;
    let head = repo.head().ok()?;
    let commit = head.target()?.to_string();
    let branch = head
        .is_branch()
        .then(|| head.shorthand().map(str::to_string))
        .flatten();
    Some(SourceRevision { commit, branch })
}

/// URL of `origin` in the repository enclosing `dir`, used to prefill
/// `pagesync init`.
pub fn discover_origin(dir: &Path) -> Option<String> {
    let repo = Repository::discover(dir).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(str::to_string)
}
