//! `pagesync status`: offline view of the local mirror.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pagesync_core::{config, ConfigOverrides, PublishConfig};
use pagesync_publish::{inspect, Git2Backend, MirrorStatus};

use super::config_path;

/// Arguments for `pagesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the config file (default: ./pagesync.yaml).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let path = config_path(self.config);
        let config = config::load_at(&path, &ConfigOverrides::default())
            .with_context(|| format!("failed to load {}", path.display()))?;

        let status = inspect(&Git2Backend::new(config.network_timeout), &config)
            .context("failed to inspect mirror")?;

        if self.json {
            print_json(&config, status)?;
            return Ok(());
        }
        print_table(&config, &status);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson {
    repo_uri: String,
    branch: String,
    reusable: bool,
    mirror: MirrorStatus,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_json(config: &PublishConfig, status: MirrorStatus) -> Result<()> {
    let payload = StatusJson {
        repo_uri: config.repo_uri.clone(),
        branch: config.branch.to_string(),
        reusable: status.is_reusable(),
        mirror: status,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(config: &PublishConfig, status: &MirrorStatus) {
    println!(
        "pagesync v{} | {} -> {}",
        env!("CARGO_PKG_VERSION"),
        config.branch,
        config.repo_uri
    );

    if !status.exists {
        println!(
            "{} No mirror at {}; the next publish will create it.",
            "■".bright_black().bold(),
            status.repo_dir.display()
        );
        return;
    }

    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let rows = vec![
        StatusRow {
            field: "mirror",
            value: status.repo_dir.display().to_string(),
        },
        StatusRow {
            field: "origin",
            value: or_dash(&status.remote_url),
        },
        StatusRow {
            field: "branch",
            value: or_dash(&status.branch),
        },
        StatusRow {
            field: "head",
            value: status
                .head
                .clone()
                .unwrap_or_else(|| "(no commits)".to_string()),
        },
        StatusRow {
            field: "working tree",
            value: (if status.dirty { "dirty" } else { "clean" }).to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if status.is_reusable() {
        println!("{} Mirror is valid and will be reused.", "■".green().bold());
    } else {
        let why = if !status.remote_matches {
            "origin does not match repo_uri"
        } else {
            "checked out on another branch"
        };
        println!(
            "{} Mirror will be rebuilt on next publish ({why}).",
            "■".yellow().bold()
        );
    }
}
