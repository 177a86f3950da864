//! Remote URI normalization.
//!
//! An existing mirror is only reused when its `origin` points at the
//! configured repository. Users write the same endpoint in many ways, so the
//! comparison runs on a canonical form:
//!
//! | Input                                   | Canonical form               |
//! |-----------------------------------------|------------------------------|
//! | `git@github.com:owner/repo.git`         | `github.com/owner/repo`      |
//! | `https://github.com/owner/repo/`        | `github.com/owner/repo`      |
//! | `ssh://git@GitHub.com:22/owner/repo`    | `github.com/owner/repo`      |
//! | `file:///srv/git/site.git`              | `file:/srv/git/site.git`     |
//! | `/srv/git/site.git/`                    | `file:/srv/git/site.git`     |
//!
//! Remote hosts are lowercased and lose their port, user info, and `.git`
//! suffix. Local paths keep their `.git` suffix (it names a real directory)
//! and are canonicalized when they exist on disk.

use std::path::{Path, PathBuf};

/// Canonical form of a remote URI; see the module docs.
pub fn normalize_remote_uri(raw: &str) -> String {
    let raw = raw.trim();

    if let Some(path) = raw.strip_prefix("file://") {
        return normalize_local(path);
    }

    if let Some(normalized) = try_parse_url_style(raw) {
        return normalized;
    }

    if let Some(normalized) = try_parse_scp_style(raw) {
        return normalized;
    }

    normalize_local(raw)
}

/// Whether two remote URIs refer to the same endpoint.
pub fn same_remote(a: &str, b: &str) -> bool {
    let (left, right) = (normalize_remote_uri(a), normalize_remote_uri(b));
    tracing::trace!(%left, %right, "comparing remotes");
    left == right
}

fn try_parse_scp_style(raw: &str) -> Option<String> {
    if !raw.contains(':') || raw.contains("://") {
        return None;
    }

    let (user_host, path) = raw.split_once(':')?;
    // `C:\sites` or `C:/sites` is a drive letter, not a host.
    if user_host.len() == 1 && user_host.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if user_host.contains('/') || user_host.contains('\\') {
        return None;
    }
    let host = user_host.rsplit('@').next()?;

    if host.is_empty() || path.is_empty() {
        return None;
    }

    Some(join_host_path(host, path))
}

fn try_parse_url_style(raw: &str) -> Option<String> {
    let (scheme, without_scheme) = raw.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
        return None;
    }

    let (authority, path) = without_scheme.split_once('/')?;
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = strip_port(host);

    if host.is_empty() || path.is_empty() {
        return None;
    }

    Some(join_host_path(host, path))
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal: `[::1]:22`
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

fn join_host_path(host: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let path = path.trim_end_matches('/');
    format!("{}/{}", host.to_lowercase(), path)
}

fn normalize_local(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(['/', '\\']);
    let trimmed = if trimmed.is_empty() { raw } else { trimmed };
    let path = Path::new(trimmed);
    let resolved: PathBuf = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file:{}", resolved.to_string_lossy().replace('\\', "/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
