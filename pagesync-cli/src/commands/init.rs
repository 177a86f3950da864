//! `pagesync init [--dir <dir>] [--repo-uri <uri>] [--branch <branch>] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use pagesync_core::config::{self, CONFIG_FILE_NAME};
use pagesync_publish::discover_origin;

/// Write a starter `pagesync.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write the config into.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Repository to publish to. Defaults to the enclosing repository's
    /// `origin`.
    #[arg(long)]
    pub repo_uri: Option<String>,

    /// Target branch (default: gh-pages).
    #[arg(long)]
    pub branch: Option<String>,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE_NAME);
        if path.exists() && !self.force {
            bail!(
                "{} already exists; pass --force to overwrite",
                path.display()
            );
        }

        let repo_uri = self.repo_uri.or_else(|| discover_origin(&self.dir));
        let detected = repo_uri.is_some();
        let file = config::starter(repo_uri, self.branch);
        config::save_file_at(&path, &file)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("✓ Wrote {}", path.display());
        if !detected {
            println!("  Set `repo_uri` before running `pagesync publish`.");
        }
        Ok(())
    }
}
