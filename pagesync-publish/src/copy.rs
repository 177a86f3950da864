//! Copy stage: materialize the content source into the mirror.
//!
//! ## `atomic_copy`
//!
//! 1. Read the source bytes and SHA-256 them.
//! 2. Hash the current destination, if any; skip when identical.
//! 3. Write to a uniquely named temp file beside `dest` and apply the source
//!    permissions.
//! 4. Rename over the destination (atomic on POSIX).
//!
//! No git interaction happens here; Commit picks the changes up.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use pagesync_core::{preserve, ContentMapping};

use crate::backend::{Mirror, VcsBackend};
use crate::context::PipelineContext;
use crate::error::{io_err, PublishError};

// ---------------------------------------------------------------------------
// Content source
// ---------------------------------------------------------------------------

/// One file to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyEntry {
    /// File to read.
    pub source: PathBuf,
    /// Destination relative to the mirror root.
    pub dest: PathBuf,
}

impl CopyEntry {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }
}

/// Supplies the files to publish. Entries are copied in order, so a later
/// entry for the same destination wins.
pub trait ContentSource {
    fn entries(&self) -> Result<Vec<CopyEntry>, PublishError>;
}

impl ContentSource for [CopyEntry] {
    fn entries(&self) -> Result<Vec<CopyEntry>, PublishError> {
        Ok(self.to_vec())
    }
}

impl ContentSource for Vec<CopyEntry> {
    fn entries(&self) -> Result<Vec<CopyEntry>, PublishError> {
        Ok(self.clone())
    }
}

/// Config-driven source: each mapping's `from` is a file or a directory
/// walked recursively.
impl ContentSource for [ContentMapping] {
    fn entries(&self) -> Result<Vec<CopyEntry>, PublishError> {
        let mut entries = Vec::new();
        for mapping in self {
            mapping_entries(mapping, &mut entries)?;
        }
        Ok(entries)
    }
}

fn mapping_entries(mapping: &ContentMapping, out: &mut Vec<CopyEntry>) -> Result<(), PublishError> {
    let from = &mapping.from;
    let meta = std::fs::metadata(from).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PublishError::MissingSource { path: from.clone() },
        _ => io_err(from, e),
    })?;

    if meta.is_file() {
        if let Some(name) = from.file_name() {
            out.push(CopyEntry::new(from, mapping.into.join(name)));
        }
        return Ok(());
    }

    let exclude = mapping
        .exclude
        .iter()
        .map(|p| preserve::compile(p))
        .collect::<Result<Vec<_>, _>>()?;

    let walker = WalkDir::new(from)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        if preserve::matches_any(&exclude, relative) {
            tracing::debug!("excluded: {}", entry.path().display());
            continue;
        }
        out.push(CopyEntry::new(entry.path(), mapping.into.join(relative)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Destination was created or its content changed.
    Written { path: PathBuf },
    /// Destination already held identical bytes and was left untouched.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path } | WriteResult::Unchanged { path } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub writes: Vec<WriteResult>,
}

impl CopyReport {
    pub fn written(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, WriteResult::Written { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.writes.len() - self.written()
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Run the Copy stage against the mirror attached by Reset.
pub fn copy<B, S>(ctx: &PipelineContext<B>, source: &S) -> Result<CopyReport, PublishError>
where
    B: VcsBackend,
    S: ContentSource + ?Sized,
{
    let root = ctx.mirror()?.workdir().to_path_buf();
    let report = copy_into(&root, source)?;
    tracing::info!(
        written = report.written(),
        unchanged = report.unchanged(),
        "copied content"
    );
    Ok(report)
}

/// Copy every entry of `source` under `root`.
pub fn copy_into<S: ContentSource + ?Sized>(
    root: &Path,
    source: &S,
) -> Result<CopyReport, PublishError> {
    let mut report = CopyReport::default();
    for entry in source.entries()? {
        if !is_publishable(&entry.dest) {
            tracing::warn!("skipping {}: outside the mirror tree", entry.dest.display());
            continue;
        }
        let dest = root.join(&entry.dest);
        report.writes.push(atomic_copy(&entry.source, &dest)?);
    }
    Ok(report)
}

/// Relative, non-escaping, and not inside the top-level `.git`.
fn is_publishable(dest: &Path) -> bool {
    let mut components = dest.components().filter(|c| *c != Component::CurDir);
    match components.next() {
        Some(Component::Normal(first)) if first != ".git" => {}
        _ => return false,
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Copy `source` to `dest` unless `dest` already holds the same bytes.
pub(crate) fn atomic_copy(source: &Path, dest: &Path) -> Result<WriteResult, PublishError> {
    let content = std::fs::read(source).map_err(|e| io_err(source, e))?;
    let digest = sha256_hex(&content);

    if dest.is_file() {
        let existing = std::fs::read(dest).map_err(|e| io_err(dest, e))?;
        if sha256_hex(&existing) == digest {
            tracing::debug!("unchanged: {}", dest.display());
            return Ok(WriteResult::Unchanged {
                path: dest.to_path_buf(),
            });
        }
    }

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;

    // Dropping `tmp` on any error below removes it.
    let mut tmp = tempfile::Builder::new()
        .prefix(".pagesync-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| io_err(parent, e))?;
    tmp.write_all(&content).map_err(|e| io_err(tmp.path(), e))?;

    let permissions = std::fs::metadata(source)
        .map_err(|e| io_err(source, e))?
        .permissions();
    std::fs::set_permissions(tmp.path(), permissions).map_err(|e| io_err(tmp.path(), e))?;

    tmp.persist(dest).map_err(|e| io_err(dest, e.error))?;

    tracing::debug!("wrote: {}", dest.display());
    Ok(WriteResult::Written {
        path: dest.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBackend;
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    fn mapping(from: &Path, into: &str, exclude: &[&str]) -> ContentMapping {
        ContentMapping {
            from: from.to_path_buf(),
            into: PathBuf::from(into),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn first_copy_returns_written() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("index.html");
        write(&src, "<h1>hi</h1>");
        let dest = tmp.path().join("out").join("index.html");

        let result = atomic_copy(&src, &dest).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "<h1>hi</h1>");
    }

    #[test]
    fn identical_destination_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dest = tmp.path().join("b.txt");
        write(&src, "same");
        write(&dest, "same");
        let old = FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&dest, old).unwrap();

        let result = atomic_copy(&src, &dest).unwrap();

        assert!(matches!(result, WriteResult::Unchanged { .. }));
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(mtime, old, "unchanged file must not be rewritten");
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dest = tmp.path().join("b.txt");
        write(&src, "v2");
        write(&dest, "v1");
        let result = atomic_copy(&src, &dest).unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "v2");
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn no_temp_file_left_after_copy() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src").join("a.txt");
        write(&src, "data");
        let out = tmp.path().join("out");
        atomic_copy(&src, &out.join("clean.txt")).unwrap();
        assert_eq!(dir_entries(&out), vec!["clean.txt"]);
    }

    #[test]
    fn sibling_named_like_a_temp_file_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src").join("index.html");
        write(&src, "new index");
        let out = tmp.path().join("out");
        write(&out.join("index.html.pagesync.tmp"), "generated content");

        atomic_copy(&src, &out.join("index.html")).unwrap();

        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "new index");
        assert_eq!(
            fs::read_to_string(out.join("index.html.pagesync.tmp")).unwrap(),
            "generated content"
        );
        assert_eq!(dir_entries(&out), vec!["index.html", "index.html.pagesync.tmp"]);
    }

    #[test]
    #[cfg(unix)]
    fn executable_bit_is_carried_over() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("run.sh");
        write(&src, "#!/bin/sh\n");
        fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();
        let dest = tmp.path().join("out/run.sh");

        atomic_copy(&src, &dest).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    #[cfg(unix)]
    fn unwritable_directory_leaves_original_and_no_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let src = root.path().join("src.txt");
        write(&src, "new content");
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        let dest = readonly_dir.join("file.txt");
        fs::write(&dest, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let result = atomic_copy(&src, &dest);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Root can write into read-only directories; only check the failure path.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
            assert_eq!(dir_entries(&readonly_dir), vec!["file.txt"]);
        }
    }

    #[test]
    fn directory_mapping_walks_and_excludes() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        write(&site.join("index.html"), "i");
        write(&site.join("css/app.css"), "c");
        write(&site.join("css/app.css.map"), "m");
        write(&site.join(".git/HEAD"), "nested repo");

        let mappings = vec![mapping(&site, "docs", &["**/*.map"])];
        let entries = mappings.as_slice().entries().unwrap();

        let dests: Vec<_> = entries.iter().map(|e| e.dest.clone()).collect();
        assert_eq!(
            dests,
            vec![
                PathBuf::from("docs/css/app.css"),
                PathBuf::from("docs/index.html"),
            ]
        );
    }

    #[test]
    fn file_mapping_lands_in_into_directory() {
        let tmp = TempDir::new().unwrap();
        let cname = tmp.path().join("CNAME");
        write(&cname, "example.com");

        let mappings = vec![mapping(&cname, "", &[])];
        let entries = mappings.as_slice().entries().unwrap();

        assert_eq!(entries, vec![CopyEntry::new(&cname, "CNAME")]);
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mappings = vec![mapping(&tmp.path().join("nope"), "", &[])];
        let err = mappings.as_slice().entries().unwrap_err();
        assert!(matches!(err, PublishError::MissingSource { .. }));
    }

    #[test]
    fn later_entries_overwrite_earlier_ones() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first.txt");
        let second = tmp.path().join("second.txt");
        write(&first, "1");
        write(&second, "2");
        let mirror = tmp.path().join("mirror");

        let source = vec![
            CopyEntry::new(&first, "out.txt"),
            CopyEntry::new(&second, "out.txt"),
        ];
        copy_into(&mirror, &source).unwrap();

        assert_eq!(fs::read_to_string(mirror.join("out.txt")).unwrap(), "2");
    }

    #[test]
    fn destinations_inside_git_dir_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("evil");
        write(&src, "x");
        let mirror = tmp.path().join("mirror");

        let source = vec![
            CopyEntry::new(&src, ".git/config"),
            CopyEntry::new(&src, "../escape"),
        ];
        let report = copy_into(&mirror, &source).unwrap();

        assert!(report.writes.is_empty());
        assert!(!mirror.join(".git/config").exists());
        assert!(!tmp.path().join("escape").exists());
    }

    #[test]
    fn second_copy_reports_everything_unchanged() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        write(&site.join("a.html"), "a");
        write(&site.join("b/c.html"), "c");
        let mirror = tmp.path().join("mirror");
        let mappings = vec![mapping(&site, "", &[])];

        let first = copy_into(&mirror, mappings.as_slice()).unwrap();
        let second = copy_into(&mirror, mappings.as_slice()).unwrap();

        assert_eq!(first.written(), 2);
        assert_eq!(second.written(), 0);
        assert_eq!(second.unchanged(), 2);
    }

    #[test]
    fn copy_stage_requires_a_mirror() {
        let ctx = PipelineContext::new(FakeBackend::default());
        let source: Vec<CopyEntry> = Vec::new();
        let err = copy(&ctx, &source).unwrap_err();
        assert!(matches!(err, PublishError::MirrorNotReady));
    }
}
