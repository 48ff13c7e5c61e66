///
/// This module implements the CLI interface for notion-jekyll: command parsing, client
/// construction and the printed run report.
///
/// All rendering and reconciliation logic lives in the [`notion-jekyll-core`] crate.
/// This module is CLI glue only.
///
/// ## How To Use
/// - For command-line users: use the installed `notion-jekyll` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`notion-jekyll-core`]: ../../notion-jekyll-core/
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use notion_jekyll_core::notion::NotionClient;
use notion_jekyll_core::synchronise::{synchronise, RunMode};

use crate::github::GitHubClient;
use crate::load_config::load_config;

/// CLI for notion-jekyll: publish a Notion database as Jekyll posts.
#[derive(Parser)]
#[clap(
    name = "notion-jekyll",
    version,
    about = "Synchronise a Notion database of posts into a Jekyll site on GitHub"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring the repository's posts directory in line with the Notion database
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Print the planned operations without writing to the repository
        #[clap(long)]
        dry_run: bool,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, dry_run } => {
            let config = load_config(config)?;
            let sync_config = config.synchronise_config();
            sync_config.trace_loaded();

            let source = NotionClient::new(config.secrets.notion_token.as_str());
            let repository =
                GitHubClient::new(&config.destination, &config.secrets.github_token)?;
            let mode = if dry_run {
                RunMode::DryRun
            } else {
                RunMode::Apply
            };

            tracing::info!(command = "sync", ?mode, "Starting synchronisation process");
            let report = match synchronise(&sync_config, &source, &repository, mode).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, retryable = e.is_retryable(), "Synchronisation failed");
                    return Err(e.into());
                }
            };

            if mode == RunMode::DryRun {
                println!("Dry run, {} planned operation(s):", report.planned.len());
                for op in &report.planned {
                    println!("  {}  {}", op.path(), op.commit_message());
                }
            }
            print!("{report}");

            if !report.is_success() {
                tracing::error!(
                    command = "sync",
                    failures = report.failures.len(),
                    "Synchronisation finished with failed operations"
                );
                anyhow::bail!(
                    "{} operation(s) failed; re-run the sync to retry",
                    report.failures.len()
                );
            }
            tracing::info!(command = "sync", "Synchronisation complete");
            Ok(())
        }
    }
}
