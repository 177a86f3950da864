//! Shared fixtures: a bare `origin` on disk and a config pointing at it.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

use pagesync_core::{config, Author, ConfigFile, ConfigOverrides, ContentMapping, PublishConfig};

pub struct Fixture {
    pub root: TempDir,
    pub origin: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let origin = root.path().join("origin.git");
        Repository::init_bare(&origin).expect("init bare origin");
        Self { root, origin }
    }

    pub fn site(&self) -> PathBuf {
        self.root.path().join("project").join("site")
    }

    /// Replace the generated site with `files`.
    pub fn generate(&self, files: &[(&str, &str)]) {
        let site = self.site();
        let _ = fs::remove_dir_all(&site);
        fs::create_dir_all(&site).expect("site dir");
        write_files(&site, files);
    }

    pub fn config(&self, preserve: &[&str]) -> PublishConfig {
        let file = ConfigFile {
            repo_uri: Some(self.origin.display().to_string()),
            preserve: preserve.iter().map(|p| p.to_string()).collect(),
            author: Some(Author {
                name: "Publisher".into(),
                email: "publisher@example.com".into(),
            }),
            contents: vec![ContentMapping {
                from: PathBuf::from("site"),
                into: PathBuf::new(),
                exclude: vec![],
            }],
            ..ConfigFile::default()
        };
        config::resolve(
            file,
            &self.root.path().join("project"),
            &ConfigOverrides::default(),
        )
        .expect("resolve config")
    }

    /// Force `branch` on origin to a fresh root commit holding `files`.
    pub fn seed(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let scratch = TempDir::new().expect("scratch");
        let repo = Repository::init(scratch.path()).expect("init scratch");
        write_files(scratch.path(), files);

        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Seeder", "seed@example.com").unwrap();
        let refname = format!("refs/heads/{branch}");
        let oid = repo
            .commit(Some(&refname), &sig, &sig, "seed", &tree, &[])
            .unwrap();

        let mut remote = repo
            .remote("origin", &self.origin.display().to_string())
            .unwrap();
        remote
            .push(&[format!("+{refname}:{refname}")], None)
            .expect("seed push");
        oid
    }

    pub fn origin_repo(&self) -> Repository {
        Repository::open_bare(&self.origin).expect("open origin")
    }

    pub fn origin_tip(&self, branch: &str) -> Option<Oid> {
        self.origin_repo()
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()
            .and_then(|r| r.target())
    }

    /// Sorted file paths in the tree of origin's `branch`.
    pub fn origin_files(&self, branch: &str) -> Vec<String> {
        let repo = self.origin_repo();
        let tip = self.origin_tip(branch).expect("branch exists");
        let tree = repo.find_commit(tip).unwrap().tree().unwrap();
        let mut files = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                files.push(format!("{dir}{}", entry.name().unwrap_or_default()));
            }
            git2::TreeWalkResult::Ok
        })
        .unwrap();
        files.sort();
        files
    }

    pub fn origin_blob(&self, branch: &str, path: &str) -> String {
        let repo = self.origin_repo();
        let tip = self.origin_tip(branch).expect("branch exists");
        let tree = repo.find_commit(tip).unwrap().tree().unwrap();
        let entry = tree.get_path(Path::new(path)).unwrap();
        let blob = repo.find_blob(entry.id()).unwrap();
        String::from_utf8(blob.content().to_vec()).unwrap()
    }
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

/// Files in a working tree, `.git` excluded, sorted.
pub fn worktree_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
