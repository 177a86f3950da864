//! `pagesync publish`: run the Reset, Copy, Commit, Push pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pagesync_core::{config, ConfigOverrides, PublishConfig};
use pagesync_publish::{publish, source_revision, PipelineReport, PushOutcome, WriteResult};
use pagesync_renderer::{MessageContext, MessageRenderer, SourceCtx};

use super::{config_dir, config_path};

/// Arguments for `pagesync publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Path to the config file (default: ./pagesync.yaml).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Override the target branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Override the repository URI.
    #[arg(long)]
    pub repo_uri: Option<String>,

    /// Override the local mirror directory.
    #[arg(long)]
    pub repo_dir: Option<PathBuf>,

    /// Override the commit message template.
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

impl PublishArgs {
    pub fn run(self) -> Result<()> {
        let path = config_path(self.config);
        let overrides = ConfigOverrides {
            repo_uri: self.repo_uri,
            branch: self.branch,
            repo_dir: self.repo_dir,
            commit_message: self.message,
        };
        let config = config::load_at(&path, &overrides)
            .with_context(|| format!("failed to load {}", path.display()))?;

        let source = source_revision(&config_dir(&path))
            .map(|rev| SourceCtx::new(rev.commit, rev.branch));
        let ctx = MessageContext::from_config(&config).with_source(source);
        let message = MessageRenderer::new()
            .and_then(|renderer| renderer.render(&config.commit_message, &ctx))
            .context("failed to render commit message")?;

        let report = publish(&config, &message).with_context(|| {
            format!("publish to '{}' of {} failed", config.branch, config.repo_uri)
        })?;

        print_report(&config, &report);
        Ok(())
    }
}

fn print_report(config: &PublishConfig, report: &PipelineReport) {
    let copy = &report.copy;
    match &report.push {
        PushOutcome::Pushed { branch, commit_id } => {
            let short = commit_id
                .as_deref()
                .map(|id| id.chars().take(7).collect::<String>())
                .unwrap_or_default();
            println!(
                "{} Published '{}' to {} ({})",
                "✓".green().bold(),
                branch,
                config.repo_uri,
                short
            );
        }
        PushOutcome::Skipped => {
            println!(
                "{} '{}' is up to date, nothing to commit",
                "✓".green().bold(),
                config.branch
            );
        }
    }
    println!(
        "  {} written, {} unchanged, {} removed",
        copy.written(),
        copy.unchanged(),
        report.reset.purged.len()
    );

    for write in &copy.writes {
        let shown = write
            .path()
            .strip_prefix(&config.repo_dir)
            .unwrap_or(write.path());
        match write {
            WriteResult::Written { .. } => println!("  ✎  {}", shown.display()),
            WriteResult::Unchanged { .. } => println!("  ·  {}", shown.display()),
        }
    }
}
