//! Reconciliation: decide which repository writes bring the posts directory in line
//! with the Notion database.
//!
//! Everything here is pure. The synchronise pipeline gathers the inputs, calls
//! [`Reconciler::plan`], and executes the resulting [`Operation`]s.
//!
//! # Rules
//! - Page not in the repository and published: create it.
//! - Page in the repository, published, edited after the file's `last_modified_at`: update.
//! - Page in the repository but unpublished: delete the file.
//! - File whose `notion_id` matches no page at all: delete it.
//! - Everything else is left alone.
//!
//! Creates, updates and unpublish deletions come first in page order; deletions of
//! removed pages follow in repository order.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::front_matter::{decode, FrontMatter};
use crate::model::PageMetadata;

/// A file currently in the posts directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationFile {
    pub path: String,
    /// Opaque revision token (the blob sha on GitHub).
    pub revision: String,
    /// `None` when the file has no readable header.
    pub front_matter: Option<FrontMatter>,
}

impl DestinationFile {
    pub fn from_content(
        path: impl Into<String>,
        revision: impl Into<String>,
        content: &str,
    ) -> Self {
        Self {
            path: path.into(),
            revision: revision.into(),
            front_matter: decode(content),
        }
    }
}

/// A page whose full file content has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub metadata: PageMetadata,
    pub content: String,
}

/// A page that could not be processed this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    pub stable_id: String,
    pub reason: String,
}

/// One entry of the current source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    Ready(RenderedPage),
    /// Still counts as present, so its file is not deleted.
    Skipped(SkippedPage),
}

impl SourceEntry {
    pub fn stable_id(&self) -> &str {
        match self {
            SourceEntry::Ready(page) => &page.metadata.stable_id,
            SourceEntry::Skipped(skipped) => &skipped.stable_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    Unpublished,
    RemovedFromSource,
}

/// A repository write. Computing these has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create {
        path: String,
        content: String,
        title: String,
    },
    Update {
        path: String,
        content: String,
        revision: String,
        title: String,
    },
    Delete {
        path: String,
        revision: String,
        title: String,
        reason: DeleteReason,
    },
}

impl Operation {
    pub fn path(&self) -> &str {
        match self {
            Operation::Create { path, .. }
            | Operation::Update { path, .. }
            | Operation::Delete { path, .. } => path,
        }
    }

    pub fn commit_message(&self) -> String {
        match self {
            Operation::Create { title, .. } => format!("Added post '{title}'"),
            Operation::Update { title, .. } => format!("Updated post '{title}'"),
            Operation::Delete { title, .. } => format!("Deleted post '{title}'"),
        }
    }
}

/// Operations plus the number of pages that were already up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub unchanged: usize,
}

#[derive(Debug)]
struct IndexedFile<'a> {
    file: &'a DestinationFile,
    front_matter: &'a FrontMatter,
}

/// Managed files keyed by `notion_id`, remembering the order ids were first seen.
#[derive(Debug, Default)]
struct DestinationIndex<'a> {
    by_id: HashMap<&'a str, IndexedFile<'a>>,
    order: Vec<&'a str>,
}

impl<'a> DestinationIndex<'a> {
    /// Files without a stable id are unmanaged and skipped. On duplicate ids the file
    /// seen last wins; listing order is whatever the repository returned.
    fn build(files: &'a [DestinationFile]) -> Self {
        let mut index = DestinationIndex::default();
        for file in files {
            let Some(front_matter) = file.front_matter.as_ref() else {
                debug!(path = %file.path, "No front matter, leaving file unmanaged");
                continue;
            };
            let Some(id) = front_matter.stable_id() else {
                debug!(path = %file.path, "Front matter without notion_id, leaving file unmanaged");
                continue;
            };
            let entry = IndexedFile { file, front_matter };
            match index.by_id.insert(id, entry) {
                Some(previous) => warn!(
                    notion_id = id,
                    kept = %file.path,
                    dropped = %previous.file.path,
                    "Two files share a notion_id, keeping the one listed last"
                ),
                None => index.order.push(id),
            }
        }
        index
    }
}

/// Computes operations for one posts directory.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    posts_dir: String,
}

impl Reconciler {
    /// `posts_dir` is prefixed to the path of created files; an empty string means
    /// the repository root.
    pub fn new(posts_dir: impl Into<String>) -> Self {
        Self {
            posts_dir: posts_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn target_path(&self, filename: &str) -> String {
        if self.posts_dir.is_empty() {
            format!("{filename}.markdown")
        } else {
            format!("{}/{filename}.markdown", self.posts_dir)
        }
    }

    pub fn reconcile(
        &self,
        source: &[SourceEntry],
        destination: &[DestinationFile],
    ) -> Vec<Operation> {
        self.plan(source, destination).operations
    }

    pub fn plan(&self, source: &[SourceEntry], destination: &[DestinationFile]) -> Plan {
        let index = DestinationIndex::build(destination);
        let mut plan = Plan::default();

        for entry in source {
            let SourceEntry::Ready(page) = entry else {
                continue;
            };
            let meta = &page.metadata;
            match (index.by_id.get(meta.stable_id.as_str()), meta.published) {
                (None, true) => plan.operations.push(Operation::Create {
                    path: self.target_path(&meta.target_filename),
                    content: page.content.clone(),
                    title: meta.title.clone(),
                }),
                (None, false) => {
                    debug!(notion_id = %meta.stable_id, "Unpublished page has no file, nothing to do");
                }
                (Some(existing), true) => {
                    let newer = existing
                        .front_matter
                        .last_modified_at
                        .map_or(true, |written| meta.modified_at > written);
                    if newer {
                        plan.operations.push(Operation::Update {
                            path: existing.file.path.clone(),
                            content: page.content.clone(),
                            revision: existing.file.revision.clone(),
                            title: meta.title.clone(),
                        });
                    } else {
                        plan.unchanged += 1;
                    }
                }
                (Some(existing), false) => plan.operations.push(Operation::Delete {
                    path: existing.file.path.clone(),
                    revision: existing.file.revision.clone(),
                    title: meta.title.clone(),
                    reason: DeleteReason::Unpublished,
                }),
            }
        }

        let present: HashSet<&str> = source.iter().map(SourceEntry::stable_id).collect();
        for id in &index.order {
            if present.contains(id) {
                continue;
            }
            let existing = &index.by_id[id];
            plan.operations.push(Operation::Delete {
                path: existing.file.path.clone(),
                revision: existing.file.revision.clone(),
                title: existing.front_matter.title.clone(),
                reason: DeleteReason::RemovedFromSource,
            });
        }

        plan
    }
}
