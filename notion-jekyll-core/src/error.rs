//! Error types shared across the core crate.

use thiserror::Error;

/// Failure while turning rich text or blocks into markdown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Mentions, equations and any other non-text run cannot be rendered.
    #[error("Unsupported rich text run of type '{kind}'")]
    UnsupportedRunKind { kind: String },
}

/// Failure that disqualifies a single page from this run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Page {page_id} is missing required property '{property}'")]
    MissingProperty { page_id: String, property: String },

    #[error("Page {page_id} could not be rendered: {source}")]
    Render {
        page_id: String,
        #[source]
        source: RenderError,
    },

    #[error("Page {page_id} front matter could not be written: {message}")]
    FrontMatter { page_id: String, message: String },
}

/// Errors reported by the Notion or GitHub collaborators.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode API response: {0}")]
    Decode(String),

    /// The revision token is stale; re-fetch the file before writing again.
    #[error("Revision conflict on '{path}'")]
    RevisionConflict { path: String },

    #[error("Not found: {path}")]
    NotFound { path: String },
}

impl CollaboratorError {
    /// Whether running the sync again has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::RevisionConflict { .. } => true,
            CollaboratorError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            CollaboratorError::Http(e) => e.is_timeout() || e.is_connect(),
            CollaboratorError::Decode(_) | CollaboratorError::NotFound { .. } => false,
        }
    }
}

/// Errors that abort a synchronisation run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Zero or several databases carry the configured title.
    #[error("Expected exactly one database titled '{title}', found {matches}")]
    DatabaseNotFound { title: String, matches: usize },

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::DatabaseNotFound { .. } => false,
            SyncError::Collaborator(e) => e.is_retryable(),
            SyncError::Timeout { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SyncError::DatabaseNotFound {
            title: "Posts".to_string(),
            matches: 2,
        };
        assert_eq!(
            error.to_string(),
            "Expected exactly one database titled 'Posts', found 2"
        );

        let error = PageError::MissingProperty {
            page_id: "abc".to_string(),
            property: "File name".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Page abc is missing required property 'File name'"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(CollaboratorError::RevisionConflict {
            path: "_posts/a.markdown".into()
        }
        .is_retryable());
        assert!(CollaboratorError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!CollaboratorError::Api {
            status: 401,
            message: "bad credentials".into()
        }
        .is_retryable());
        assert!(SyncError::Timeout {
            operation: "get_file".into()
        }
        .is_retryable());
        assert!(!SyncError::DatabaseNotFound {
            title: "Posts".into(),
            matches: 0
        }
        .is_retryable());
    }
}
