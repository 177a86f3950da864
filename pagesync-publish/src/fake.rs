//! Recording in-memory backend for stage tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pagesync_core::{Author, BranchName};

use crate::backend::{Mirror, VcsBackend};
use crate::error::PublishError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Init,
    AddRemote(String),
    RemoteHeads,
    Fetch(String),
    EnsureTracking(String),
    Clean,
    Checkout(String),
    CheckoutOrphan(String),
    ResetHard(String),
    StageAll,
    StageTracked,
    Commit(String),
    Push(String),
    Close,
}

impl Call {
    fn is_network(&self) -> bool {
        matches!(self, Call::RemoteHeads | Call::Fetch(_) | Call::Push(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    fn record(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn network_calls(&self) -> usize {
        self.0.borrow().iter().filter(|c| c.is_network()).count()
    }
}

/// An on-disk mirror the fake pretends already exists.
#[derive(Debug, Clone)]
pub struct Existing {
    pub remote_url: String,
    pub branch: String,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    pub(crate) log: CallLog,
    /// `None` makes `open` fail like a missing repository.
    pub existing: Option<Existing>,
    pub remote_heads: Vec<String>,
    /// Whether the working tree differs from HEAD once staged.
    pub dirty: bool,
    /// Primitive that should fail with an injected error.
    pub fail_on: Option<&'static str>,
}

impl FakeBackend {
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn mirror(&self, dir: &Path, existing: Option<&Existing>) -> FakeMirror {
        FakeMirror {
            workdir: dir.to_path_buf(),
            log: self.log.clone(),
            remote_url: existing.map(|e| e.remote_url.clone()),
            branch: existing.map(|e| e.branch.clone()),
            remote_heads: self.remote_heads.clone(),
            dirty: self.dirty,
            fail_on: self.fail_on,
            commits: 0,
        }
    }
}

fn injected(op: &'static str) -> PublishError {
    PublishError::Git {
        op,
        source: git2::Error::from_str("injected failure"),
    }
}

impl VcsBackend for FakeBackend {
    type Mirror = FakeMirror;

    fn open(&self, dir: &Path) -> Result<FakeMirror, PublishError> {
        self.log.record(Call::Open);
        match &self.existing {
            Some(existing) => Ok(self.mirror(dir, Some(existing))),
            None => Err(injected("open")),
        }
    }

    fn init(&self, dir: &Path) -> Result<FakeMirror, PublishError> {
        self.log.record(Call::Init);
        if self.fail_on == Some("init") {
            return Err(injected("init"));
        }
        Ok(self.mirror(dir, None))
    }
}

#[derive(Debug)]
pub struct FakeMirror {
    workdir: PathBuf,
    log: CallLog,
    remote_url: Option<String>,
    branch: Option<String>,
    remote_heads: Vec<String>,
    dirty: bool,
    fail_on: Option<&'static str>,
    commits: usize,
}

impl FakeMirror {
    fn step(&self, op: &'static str, call: Call) -> Result<(), PublishError> {
        self.log.record(call);
        if self.fail_on == Some(op) {
            return Err(injected(op));
        }
        Ok(())
    }
}

impl Mirror for FakeMirror {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn remote_url(&self, _remote: &str) -> Result<Option<String>, PublishError> {
        Ok(self.remote_url.clone())
    }

    fn add_remote(&mut self, _remote: &str, url: &str) -> Result<(), PublishError> {
        self.step("remote add", Call::AddRemote(url.to_string()))?;
        self.remote_url = Some(url.to_string());
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>, PublishError> {
        Ok(self.branch.clone())
    }

    fn remote_heads(&mut self, _remote: &str) -> Result<Vec<String>, PublishError> {
        self.step("ls-remote", Call::RemoteHeads)?;
        Ok(self.remote_heads.clone())
    }

    fn fetch_branch(&mut self, _remote: &str, branch: &BranchName) -> Result<(), PublishError> {
        self.step("fetch", Call::Fetch(branch.to_string()))
    }

    fn ensure_tracking_branch(
        &mut self,
        branch: &BranchName,
        _remote: &str,
    ) -> Result<(), PublishError> {
        self.step("branch", Call::EnsureTracking(branch.to_string()))
    }

    fn clean(&mut self) -> Result<(), PublishError> {
        self.step("clean", Call::Clean)
    }

    fn checkout(&mut self, branch: &BranchName) -> Result<(), PublishError> {
        self.step("checkout", Call::Checkout(branch.to_string()))?;
        self.branch = Some(branch.to_string());
        Ok(())
    }

    fn checkout_orphan(&mut self, branch: &BranchName) -> Result<(), PublishError> {
        self.step("checkout orphan", Call::CheckoutOrphan(branch.to_string()))?;
        self.branch = Some(branch.to_string());
        Ok(())
    }

    fn reset_hard(&mut self, target_ref: &str) -> Result<(), PublishError> {
        self.step("reset", Call::ResetHard(target_ref.to_string()))
    }

    fn stage_all(&mut self) -> Result<(), PublishError> {
        self.step("add", Call::StageAll)
    }

    fn stage_tracked(&mut self) -> Result<(), PublishError> {
        self.step("add --update", Call::StageTracked)
    }

    fn is_clean(&self) -> Result<bool, PublishError> {
        Ok(!self.dirty)
    }

    fn commit(&mut self, message: &str, _author: Option<&Author>) -> Result<String, PublishError> {
        self.step("commit", Call::Commit(message.to_string()))?;
        self.commits += 1;
        self.dirty = false;
        Ok(format!("{:040x}", self.commits))
    }

    fn push(&mut self, _remote: &str, branch: &BranchName) -> Result<(), PublishError> {
        self.log.record(Call::Push(branch.to_string()));
        if self.fail_on == Some("push") {
            return Err(PublishError::PushRejected {
                remote: "origin".into(),
                branch: branch.to_string(),
                message: "non-fast-forward".into(),
            });
        }
        Ok(())
    }

    fn head_id(&self) -> Result<Option<String>, PublishError> {
        Ok((self.commits > 0).then(|| format!("{:040x}", self.commits)))
    }

    fn close(self) {
        self.log.record(Call::Close);
    }
}

/// A resolved config rooted in a fresh temp dir. Keep the dir alive for the
/// duration of the test.
pub fn sample_config() -> (tempfile::TempDir, pagesync_core::PublishConfig) {
    use pagesync_core::{config, ConfigFile, ConfigOverrides, ContentMapping};

    let base = tempfile::TempDir::new().unwrap();
    let file = ConfigFile {
        repo_uri: Some("https://example.com/owner/site.git".into()),
        contents: vec![ContentMapping {
            from: PathBuf::from("site"),
            into: PathBuf::new(),
            exclude: vec![],
        }],
        ..ConfigFile::default()
    };
    let config = config::resolve(file, base.path(), &ConfigOverrides::default()).unwrap();
    (base, config)
}
