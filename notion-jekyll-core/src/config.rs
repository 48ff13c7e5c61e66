use std::time::Duration;

use tracing::{debug, info};

pub const DEFAULT_DATABASE_TITLE: &str = "Posts";
pub const DEFAULT_POSTS_DIR: &str = "_posts";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs for one synchronisation run. Credentials live with the clients, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchroniseConfig {
    /// Exact title of the Notion database holding the posts.
    pub database_title: String,
    /// Repository directory that is listed and that new posts are created in.
    pub posts_dir: String,
    /// Upper bound on concurrent file fetches while indexing the repository.
    pub fetch_concurrency: usize,
    /// Deadline applied to every collaborator call.
    pub request_timeout: Duration,
}

impl Default for SynchroniseConfig {
    fn default() -> Self {
        Self {
            database_title: DEFAULT_DATABASE_TITLE.to_string(),
            posts_dir: DEFAULT_POSTS_DIR.to_string(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SynchroniseConfig {
    pub fn trace_loaded(&self) {
        info!(
            database_title = %self.database_title,
            posts_dir = %self.posts_dir,
            fetch_concurrency = self.fetch_concurrency,
            request_timeout_secs = self.request_timeout.as_secs(),
            "Loaded SynchroniseConfig"
        );
        debug!(?self, "SynchroniseConfig loaded (full debug)");
    }
}
