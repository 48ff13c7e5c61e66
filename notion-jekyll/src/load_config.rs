/// `load_config` module: Loads a static YAML config, injects secrets from the environment, and
/// adapts the result into the core's [`SynchroniseConfig`].
///
/// This module is the only place where user-supplied YAML is parsed.
///
/// # Responsibilities
/// - Parse the YAML configuration file into typed sections (`source`, `destination`, `sync`)
/// - Fill defaults for optional keys (database title, fetch concurrency, request timeout)
/// - Read secrets (`NOTION_INTEGRATION_TOKEN`, `GITHUB_PAT`) from the environment, never from YAML
///
/// # Errors
/// All errors use `anyhow::Error` with context and are surfaced at the CLI boundary.
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use notion_jekyll_core::config::{
    SynchroniseConfig, DEFAULT_DATABASE_TITLE, DEFAULT_FETCH_CONCURRENCY, DEFAULT_POSTS_DIR,
    DEFAULT_REQUEST_TIMEOUT,
};
use serde::Deserialize;
use tracing::{error, info};

pub const NOTION_TOKEN_ENV: &str = "NOTION_INTEGRATION_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_PAT";

#[derive(Debug)]
pub struct CliConfig {
    pub source: SourceSection,
    pub destination: DestinationSection,
    pub sync: SyncSection,
    pub secrets: Secrets,
}

impl CliConfig {
    pub fn synchronise_config(&self) -> SynchroniseConfig {
        SynchroniseConfig {
            database_title: self.source.database_title.clone(),
            posts_dir: self.destination.posts_dir.clone(),
            fetch_concurrency: self.sync.fetch_concurrency,
            request_timeout: Duration::from_secs(self.sync.request_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_database_title")]
    pub database_title: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            database_title: default_database_title(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DestinationSection {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// API credentials. `Debug` never prints the values.
pub struct Secrets {
    pub notion_token: String,
    pub github_token: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("notion_token", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

fn default_database_title() -> String {
    DEFAULT_DATABASE_TITLE.to_string()
}

fn default_posts_dir() -> String {
    DEFAULT_POSTS_DIR.to_string()
}

fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    source: SourceSection,
    destination: DestinationSection,
    #[serde(default)]
    sync: SyncSection,
}

/// Loads a static YAML config file (no secrets) and injects the required secrets from env.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .inspect_err(|e| error!(error = ?e, config_path = ?path_ref, "Failed to read config file"))
        .with_context(|| format!("Failed to read config file {path_ref:?}"))?;

    let raw: RawConfig = serde_yaml::from_str(&config_content)
        .inspect_err(|e| error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML"))
        .context("Failed to parse config YAML")?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    if raw.sync.fetch_concurrency == 0 {
        anyhow::bail!("sync.fetch_concurrency must be at least 1");
    }
    if raw.sync.request_timeout_secs == 0 {
        anyhow::bail!("sync.request_timeout_secs must be at least 1");
    }

    let secrets = Secrets {
        notion_token: required_env(NOTION_TOKEN_ENV)?,
        github_token: required_env(GITHUB_TOKEN_ENV)?,
    };

    Ok(CliConfig {
        source: raw.source,
        destination: raw.destination,
        sync: raw.sync,
        secrets,
    })
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(variable = name, "Secret is set but empty");
            anyhow::bail!("Environment variable {name} is empty")
        }
        Err(e) => {
            error!(error = ?e, variable = name, "Secret missing in environment");
            Err(e).with_context(|| format!("Environment variable {name} must be set"))
        }
    }
}
