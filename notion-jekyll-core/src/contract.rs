//! # contract: interfaces to the page source and the content repository
//!
//! The synchronise pipeline talks to the outside world only through the two traits in
//! this module:
//!
//! - [`PageSource`]: the document database pages come from (Notion in production, see
//!   [`crate::notion::NotionClient`]).
//! - [`ContentRepository`]: the repository posts are written to (GitHub in production,
//!   implemented by the CLI crate).
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so tests get `MockPageSource` and
//!   `MockContentRepository`. The mocks are exported under the default
//!   `test-export-mocks` feature for use from integration tests.
//!
//! ## Errors
//! - Every method returns [`CollaboratorError`]. Implementations map a stale revision
//!   token to [`CollaboratorError::RevisionConflict`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::CollaboratorError;
use crate::model::{Block, TextRun};

/// A database visible to the integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub id: String,
    pub title: String,
}

/// A typed page property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Title(Vec<TextRun>),
    RichText(Vec<TextRun>),
    Checkbox(bool),
    CreatedTime(DateTime<Utc>),
    LastEditedTime(DateTime<Utc>),
    MultiSelect(Vec<String>),
    /// Property types the sync does not read, named by their Notion type.
    Other(String),
}

/// A database row as returned by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    pub properties: HashMap<String, PropertyValue>,
}

/// A file entry from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub path: String,
    pub revision: String,
}

/// A file with its decoded text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    pub content: String,
    pub revision: String,
}

/// Read access to the document database.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    /// All databases shared with the integration.
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>, CollaboratorError>;

    /// Every page of a database, across all result pages.
    async fn query_pages(&self, database_id: &str) -> Result<Vec<SourcePage>, CollaboratorError>;

    /// Top-level blocks of a page in document order, across all result pages.
    async fn get_block_children(&self, page_id: &str) -> Result<Vec<Block>, CollaboratorError>;
}

/// Read/write access to the site repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Files (not directories) directly inside `path`.
    async fn list_directory_contents(&self, path: &str)
        -> Result<Vec<RepoEntry>, CollaboratorError>;

    async fn get_file(&self, path: &str) -> Result<RepoFile, CollaboratorError>;

    async fn create_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), CollaboratorError>;

    /// Fails with [`CollaboratorError::RevisionConflict`] if `revision` is stale.
    async fn update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        revision: &str,
    ) -> Result<(), CollaboratorError>;

    /// Fails with [`CollaboratorError::RevisionConflict`] if `revision` is stale.
    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        revision: &str,
    ) -> Result<(), CollaboratorError>;
}
