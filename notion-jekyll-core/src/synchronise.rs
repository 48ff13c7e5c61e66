//! High-level pipeline: index the repository, render the Notion database, reconcile, write.
//!
//! This module provides the top-level orchestration for one synchronisation run. It:
//!   - Lists the posts directory and fetches every file (bounded concurrency) to build the
//!     destination index from their front matter
//!   - Resolves the configured database by title and queries all of its pages
//!   - Renders each page to a complete post file; a page that cannot be read or rendered is
//!     skipped but still counts as present, so its file is kept
//!   - Plans the writes with [`Reconciler`] and executes them one at a time
//!   - Returns a [`SynchroniseReport`] with what was written, skipped and what failed
//!
//! # Error Handling
//! Anything that goes wrong before the first write (listing, fetching, database resolution,
//! querying) aborts the run with a [`SyncError`]. The exception is a repository file whose
//! content is not text (an image, a file too large for the API): it is left unmanaged.
//! Once writes start, a failing operation is
//! recorded in the report and the remaining operations still run.
//!
//! Every collaborator call is bounded by [`SynchroniseConfig::request_timeout`].
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`RunMode`], [`SynchroniseReport`], [`OperationFailure`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use crate::config::SynchroniseConfig;
use crate::contract::{ContentRepository, PageSource, SourcePage};
use crate::error::{CollaboratorError, SyncError};
use crate::page::{page_metadata, render_post};
use crate::reconcile::{
    DestinationFile, Operation, Reconciler, RenderedPage, SkippedPage, SourceEntry,
};

/// Whether planned operations are written to the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Apply,
    /// Plan only; the repository is read but never written.
    DryRun,
}

/// A write that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub path: String,
    pub error: String,
    pub retryable: bool,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchroniseReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    /// Published pages whose file was already up to date.
    pub unchanged: usize,
    pub skipped: Vec<SkippedPage>,
    pub failures: Vec<OperationFailure>,
    /// Every operation the run decided on, executed or not.
    pub planned: Vec<Operation>,
}

impl SynchroniseReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SynchroniseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "created: {}, updated: {}, deleted: {}, unchanged: {}, skipped: {}, failed: {}",
            self.created.len(),
            self.updated.len(),
            self.deleted.len(),
            self.unchanged,
            self.skipped.len(),
            self.failures.len()
        )?;
        for path in &self.created {
            writeln!(f, "  created  {path}")?;
        }
        for path in &self.updated {
            writeln!(f, "  updated  {path}")?;
        }
        for path in &self.deleted {
            writeln!(f, "  deleted  {path}")?;
        }
        for skipped in &self.skipped {
            writeln!(f, "  skipped  {} ({})", skipped.stable_id, skipped.reason)?;
        }
        for failure in &self.failures {
            let hint = if failure.retryable { ", retryable" } else { "" };
            writeln!(f, "  FAILED   {} ({}{hint})", failure.path, failure.error)?;
        }
        Ok(())
    }
}

pub async fn synchronise<S, R>(
    config: &SynchroniseConfig,
    source: &S,
    repository: &R,
    mode: RunMode,
) -> Result<SynchroniseReport, SyncError>
where
    S: PageSource + ?Sized,
    R: ContentRepository + ?Sized,
{
    info!(mode = ?mode, "[SYNC] Starting synchronisation");
    let timeout = config.request_timeout;

    // --- Step 1: Index the repository ---
    let destination = fetch_destination(config, repository).await?;
    info!(
        files = destination.len(),
        "[SYNC][FETCH] Indexed destination directory"
    );

    // --- Step 2: Resolve and read the database ---
    let database_id = resolve_database(config, source).await?;
    let pages = with_deadline(timeout, "query_pages", source.query_pages(&database_id)).await?;
    info!(pages = pages.len(), "[SYNC][FETCH] Queried database pages");

    // --- Step 3: Render ---
    let mut entries = Vec::with_capacity(pages.len());
    for page in &pages {
        entries.push(render_page(page, source, timeout).await?);
    }
    let skipped: Vec<SkippedPage> = entries
        .iter()
        .filter_map(|entry| match entry {
            SourceEntry::Skipped(skipped) => Some(skipped.clone()),
            SourceEntry::Ready(_) => None,
        })
        .collect();

    // --- Step 4: Plan ---
    let plan = Reconciler::new(config.posts_dir.as_str()).plan(&entries, &destination);
    info!(
        operations = plan.operations.len(),
        unchanged = plan.unchanged,
        skipped = skipped.len(),
        "[SYNC] Planned operations"
    );

    let mut report = SynchroniseReport {
        unchanged: plan.unchanged,
        skipped,
        ..SynchroniseReport::default()
    };

    if mode == RunMode::DryRun {
        for op in &plan.operations {
            info!(path = %op.path(), message = %op.commit_message(), "[SYNC][DRY-RUN] Would apply");
        }
        report.planned = plan.operations;
        return Ok(report);
    }

    // --- Step 5: Apply, one at a time ---
    for op in &plan.operations {
        match apply(repository, op, timeout).await {
            Ok(()) => {
                info!(path = %op.path(), message = %op.commit_message(), "[SYNC][APPLY] Operation succeeded");
                let path = op.path().to_string();
                match op {
                    Operation::Create { .. } => report.created.push(path),
                    Operation::Update { .. } => report.updated.push(path),
                    Operation::Delete { .. } => report.deleted.push(path),
                }
            }
            Err(e) => {
                error!(path = %op.path(), error = ?e, "[SYNC][APPLY][ERROR] Operation failed");
                report.failures.push(OperationFailure {
                    path: op.path().to_string(),
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                });
            }
        }
    }
    report.planned = plan.operations;

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "[SYNC] Synchronisation finished"
    );
    Ok(report)
}

/// Lists the posts directory and reads every file, keeping listing order. A file whose
/// content cannot be decoded as text is kept as unmanaged; other failures abort.
async fn fetch_destination<R>(
    config: &SynchroniseConfig,
    repository: &R,
) -> Result<Vec<DestinationFile>, SyncError>
where
    R: ContentRepository + ?Sized,
{
    let timeout = config.request_timeout;
    let entries = with_deadline(
        timeout,
        "list_directory_contents",
        repository.list_directory_contents(&config.posts_dir),
    )
    .await?;
    debug!(
        dir = %config.posts_dir,
        entries = entries.len(),
        "[SYNC][FETCH] Listed destination directory"
    );

    stream::iter(entries)
        .map(|entry| async move {
            match with_deadline(timeout, "get_file", repository.get_file(&entry.path)).await {
                Ok(file) => Ok(DestinationFile::from_content(
                    entry.path,
                    file.revision,
                    &file.content,
                )),
                // Binary or oversized content cannot carry a header: leave it unmanaged.
                Err(SyncError::Collaborator(CollaboratorError::Decode(reason))) => {
                    warn!(path = %entry.path, reason = %reason, "[SYNC][FETCH] Unreadable file, leaving it unmanaged");
                    Ok(DestinationFile {
                        path: entry.path,
                        revision: entry.revision,
                        front_matter: None,
                    })
                }
                Err(e) => Err(e),
            }
        })
        .buffered(config.fetch_concurrency.max(1))
        .try_collect()
        .await
}

/// Finds the one database whose title matches exactly.
async fn resolve_database<S>(config: &SynchroniseConfig, source: &S) -> Result<String, SyncError>
where
    S: PageSource + ?Sized,
{
    let databases =
        with_deadline(config.request_timeout, "list_databases", source.list_databases()).await?;
    let mut matching: Vec<_> = databases
        .into_iter()
        .filter(|db| db.title == config.database_title)
        .collect();
    match matching.len() {
        1 => {
            let database = matching.remove(0);
            info!(database_id = %database.id, title = %database.title, "[SYNC] Resolved database");
            Ok(database.id)
        }
        matches => {
            error!(title = %config.database_title, matches, "[SYNC][ERROR] Database could not be resolved");
            Err(SyncError::DatabaseNotFound {
                title: config.database_title.clone(),
                matches,
            })
        }
    }
}

/// Fetches a page's blocks and renders the post. Page-level problems become a skipped
/// entry; collaborator failures abort the run.
async fn render_page<S>(
    page: &SourcePage,
    source: &S,
    timeout: Duration,
) -> Result<SourceEntry, SyncError>
where
    S: PageSource + ?Sized,
{
    let skip = |reason: String| {
        warn!(page_id = %page.id, reason = %reason, "[SYNC] Skipping page");
        SourceEntry::Skipped(SkippedPage {
            stable_id: page.id.clone(),
            reason,
        })
    };

    let metadata = match page_metadata(page) {
        Ok(metadata) => metadata,
        Err(e) => return Ok(skip(e.to_string())),
    };
    if !metadata.published {
        // Unpublished pages only ever lead to a deletion; their body is irrelevant.
        return Ok(SourceEntry::Ready(RenderedPage {
            metadata,
            content: String::new(),
        }));
    }

    let blocks = with_deadline(timeout, "get_block_children", source.get_block_children(&page.id))
        .await?;
    match render_post(&metadata, &blocks) {
        Ok(content) => {
            debug!(page_id = %page.id, bytes = content.len(), "[SYNC] Rendered page");
            Ok(SourceEntry::Ready(RenderedPage { metadata, content }))
        }
        Err(e) => Ok(skip(e.to_string())),
    }
}

async fn apply<R>(repository: &R, op: &Operation, timeout: Duration) -> Result<(), SyncError>
where
    R: ContentRepository + ?Sized,
{
    let message = op.commit_message();
    match op {
        Operation::Create { path, content, .. } => {
            with_deadline(timeout, "create_file", repository.create_file(path, content, &message))
                .await
        }
        Operation::Update {
            path,
            content,
            revision,
            ..
        } => {
            with_deadline(
                timeout,
                "update_file",
                repository.update_file(path, content, &message, revision),
            )
            .await
        }
        Operation::Delete { path, revision, .. } => {
            with_deadline(
                timeout,
                "delete_file",
                repository.delete_file(path, &message, revision),
            )
            .await
        }
    }
}

async fn with_deadline<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(SyncError::from),
        Err(_) => {
            warn!(operation, timeout_secs = timeout.as_secs_f64(), "[SYNC] Call timed out");
            Err(SyncError::Timeout {
                operation: operation.to_string(),
            })
        }
    }
}
