//! Preserve set: the allow-list of mirror paths that survive the pre-publish
//! purge.
//!
//! Matching is a pure predicate over mirror-relative paths, so it can be
//! exercised without touching the filesystem. Paths are compared with `/`
//! separators regardless of platform.
//!
//! Pattern rules:
//! - `*` and `?` never cross a `/`; `**` spans any number of directories.
//! - A pattern ending in `/` preserves everything beneath that directory
//!   (`keep/` is shorthand for `keep/**`).

use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};

use crate::error::ConfigError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled set of preserve globs.
#[derive(Debug, Clone, Default)]
pub struct PreserveSet {
    patterns: Vec<Pattern>,
}

impl PreserveSet {
    /// Compile `patterns`. Fails on the first invalid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|raw| compile(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A set that preserves nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of each compiled pattern.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }

    /// Whether `relative` (a path relative to the mirror root) is preserved.
    pub fn matches(&self, relative: &Path) -> bool {
        let Some(normalized) = to_slash_path(relative) else {
            return false;
        };
        self.patterns
            .iter()
            .any(|p| p.matches_with(&normalized, MATCH_OPTIONS))
    }
}

/// Compile a single glob, expanding a trailing `/` to `/**`.
pub fn compile(raw: &str) -> Result<Pattern, ConfigError> {
    let trimmed = raw.trim().trim_start_matches("./");
    let expanded = if trimmed.ends_with('/') {
        format!("{trimmed}**")
    } else {
        trimmed.to_string()
    };
    Pattern::new(&expanded).map_err(|source| ConfigError::Pattern {
        pattern: raw.to_string(),
        source,
    })
}

/// Whether `relative` matches any of the compiled `patterns`, using the same
/// separator rules as [`PreserveSet`].
pub fn matches_any(patterns: &[Pattern], relative: &Path) -> bool {
    let Some(normalized) = to_slash_path(relative) else {
        return false;
    };
    patterns
        .iter()
        .any(|p| p.matches_with(&normalized, MATCH_OPTIONS))
}

/// Render a relative path with `/` separators. Returns `None` for paths that
/// are absolute, escape upwards, or are not valid UTF-8.
fn to_slash_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
