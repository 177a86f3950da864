//! `pagesync.yaml` loading, default resolution, and validation.
//!
//! # API pattern
//!
//! - [`load_file_at`]: parse the raw [`ConfigFile`] from disk.
//! - [`resolve`]: apply overrides and defaults, validate, and produce the
//!   immutable [`PublishConfig`]. Pure apart from path canonicalization.
//! - [`load_at`]: both of the above.
//! - [`save_file_at`]: atomic write used by `pagesync init`.
//!
//! Relative paths in the file are resolved against the directory containing
//! it, never against the process working directory.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{invalid, io_err, ConfigError};
use crate::preserve::{self, PreserveSet};
use crate::types::{BranchName, ConfigFile, ConfigOverrides, ContentMapping, PublishConfig};

pub const CONFIG_FILE_NAME: &str = "pagesync.yaml";
pub const DEFAULT_BRANCH: &str = "gh-pages";
pub const DEFAULT_REPO_DIR: &str = "build/pagesync";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Generated by pagesync.";
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Parse `path` into a [`ConfigFile`].
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// + line context) if malformed YAML.
pub fn load_file_at(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and resolve the config at `path`.
pub fn load_at(path: &Path, overrides: &ConfigOverrides) -> Result<PublishConfig, ConfigError> {
    let file = load_file_at(path)?;
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    resolve(file, &base_dir, overrides)
}

// ---------------------------------------------------------------------------
// 2. Resolve
// ---------------------------------------------------------------------------

/// Merge `overrides` over `file`, apply defaults, and validate.
pub fn resolve(
    file: ConfigFile,
    base_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<PublishConfig, ConfigError> {
    let base_dir = normalize_lexically(&absolute(base_dir)?);

    let repo_uri = overrides
        .repo_uri
        .clone()
        .or(file.repo_uri)
        .map(|uri| uri.trim().to_string())
        .unwrap_or_default();
    if repo_uri.is_empty() {
        return Err(invalid("repo_uri", "a remote repository URI is required"));
    }

    let branch = overrides
        .branch
        .clone()
        .or(file.branch)
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    validate_branch(&branch)?;

    let repo_dir = overrides
        .repo_dir
        .clone()
        .or(file.repo_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_DIR));
    let repo_dir = normalize_lexically(&base_dir.join(repo_dir));
    if repo_dir == base_dir || base_dir.starts_with(&repo_dir) {
        return Err(invalid(
            "repo_dir",
            format!(
                "{} would delete the project directory when the mirror is rebuilt",
                repo_dir.display()
            ),
        ));
    }

    let preserve = PreserveSet::new(&file.preserve)?;

    let commit_message = overrides
        .commit_message
        .clone()
        .or(file.commit_message)
        .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string());
    if commit_message.trim().is_empty() {
        return Err(invalid("commit_message", "must not be empty"));
    }

    let timeout_secs = file
        .network_timeout_secs
        .unwrap_or(DEFAULT_NETWORK_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(invalid("network_timeout_secs", "must be greater than zero"));
    }

    if file.contents.is_empty() {
        return Err(invalid("contents", "at least one content mapping is required"));
    }
    let contents = file
        .contents
        .into_iter()
        .map(|mapping| resolve_mapping(mapping, &base_dir))
        .collect::<Result<Vec<_>, _>>()?;

    let config = PublishConfig {
        repo_uri,
        branch: BranchName::from(branch),
        repo_dir,
        preserve,
        commit_message,
        network_timeout: Duration::from_secs(timeout_secs),
        author: file.author,
        contents,
    };
    tracing::debug!(
        branch = %config.branch,
        repo_dir = %config.repo_dir.display(),
        "resolved publish config"
    );
    Ok(config)
}

fn resolve_mapping(mapping: ContentMapping, base_dir: &Path) -> Result<ContentMapping, ConfigError> {
    if !is_contained_relative(&mapping.into) {
        return Err(invalid(
            "contents.into",
            format!(
                "'{}' must be relative to the mirror root",
                mapping.into.display()
            ),
        ));
    }
    for pattern in &mapping.exclude {
        preserve::compile(pattern)?;
    }
    Ok(ContentMapping {
        from: base_dir.join(&mapping.from),
        into: mapping.into,
        exclude: mapping.exclude,
    })
}

/// Git ref-name rules that matter for a branch given on the command line.
fn validate_branch(branch: &str) -> Result<(), ConfigError> {
    let reject = |why: &str| Err(invalid("branch", format!("'{branch}' {why}")));
    if branch.trim().is_empty() {
        return reject("is empty");
    }
    if branch.starts_with('-') || branch.starts_with('/') || branch.ends_with('/') {
        return reject("has a leading '-' or a leading/trailing '/'");
    }
    if branch.ends_with(".lock") || branch.ends_with('.') {
        return reject("ends with '.lock' or '.'");
    }
    if branch.contains("..") || branch.contains("//") || branch.contains("@{") {
        return reject("contains '..', '//' or '@{'");
    }
    if branch
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
    {
        return reject("contains characters git does not allow in ref names");
    }
    Ok(())
}

fn is_contained_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Fold `.` and `..` components without touching the filesystem. `..` at the
/// root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| io_err(path, e))?;
    Ok(cwd.join(path))
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `file` to `path`.
///
/// Write flow: serialize → `<name>.tmp` sibling → `rename`.
pub fn save_file_at(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let yaml = serde_yaml::to_string(file)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Starter config written by `pagesync init`.
pub fn starter(repo_uri: Option<String>, branch: Option<String>) -> ConfigFile {
    ConfigFile {
        repo_uri: Some(repo_uri.unwrap_or_else(|| "git@github.com:owner/repo.git".to_string())),
        branch: Some(branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string())),
        repo_dir: Some(PathBuf::from(DEFAULT_REPO_DIR)),
        preserve: vec!["CNAME".to_string()],
        commit_message: Some(DEFAULT_COMMIT_MESSAGE.to_string()),
        network_timeout_secs: Some(DEFAULT_NETWORK_TIMEOUT_SECS),
        author: None,
        contents: vec![ContentMapping {
            from: PathBuf::from("build/site"),
            into: PathBuf::new(),
            exclude: vec![],
        }],
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
