#![doc = "GitHub contents API client: the repository side of the sync."]
//
//! # GitHub Integration (CLI <-> Core)
//!
//! Implements [`ContentRepository`] against `/repos/{owner}/{repo}/contents/{path}`.
//!
//! - Construct [`GitHubClient`] from the `destination` config section and a personal access token.
//! - File bodies travel base64 encoded; the client decodes them to UTF-8 text.
//! - The blob `sha` is the revision token. A stale `sha` on update or delete (HTTP 409/422)
//!   surfaces as [`CollaboratorError::RevisionConflict`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use notion_jekyll_core::contract::{ContentRepository, RepoEntry, RepoFile};
use notion_jekyll_core::error::CollaboratorError;

use crate::load_config::DestinationSection;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "notion-jekyll";
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    token: String,
}

impl GitHubClient {
    pub fn new(destination: &DestinationSection, token: &str) -> Result<Self, CollaboratorError> {
        Self::with_base_url(destination, token, GITHUB_API_BASE)
    }

    pub fn with_base_url(
        destination: &DestinationSection,
        token: &str,
        base_url: &str,
    ) -> Result<Self, CollaboratorError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        tracing::info!(
            owner = %destination.owner,
            repo = %destination.repo,
            branch = ?destination.branch,
            "Initialized GitHubClient"
        );
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: destination.owner.clone(),
            repo: destination.repo.clone(),
            branch: destination.branch.clone(),
            token: token.to_string(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            self.owner,
            self.repo,
            path.trim_matches('/')
        )
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn read(&self, path: &str) -> RequestBuilder {
        let request = self.http.get(self.contents_url(path));
        let request = match &self.branch {
            Some(branch) => request.query(&[("ref", branch)]),
            None => request,
        };
        self.authorised(request)
    }

    /// Request body for writes, with the branch when one is configured.
    fn write_body(&self, message: &str, content: Option<&str>, revision: Option<&str>) -> Value {
        let mut body = json!({ "message": message });
        if let Some(content) = content {
            body["content"] = json!(STANDARD.encode(content));
        }
        if let Some(revision) = revision {
            body["sha"] = json!(revision);
        }
        if let Some(branch) = &self.branch {
            body["branch"] = json!(branch);
        }
        body
    }

    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
        with_revision: bool,
    ) -> Result<Response, CollaboratorError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        tracing::error!(status = %status, path, "GitHub API returned error. Response body: {message}");
        Err(status_error(status, path, with_revision, message))
    }
}

/// Maps a failed response onto the error the pipeline understands.
fn status_error(
    status: StatusCode,
    path: &str,
    with_revision: bool,
    message: String,
) -> CollaboratorError {
    match status {
        StatusCode::NOT_FOUND => CollaboratorError::NotFound {
            path: path.to_string(),
        },
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY if with_revision => {
            CollaboratorError::RevisionConflict {
                path: path.to_string(),
            }
        }
        _ => CollaboratorError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

impl WireFile {
    fn decode(self) -> Result<RepoFile, CollaboratorError> {
        if self.encoding != "base64" {
            return Err(CollaboratorError::Decode(format!(
                "{}: unexpected content encoding '{}'",
                self.path, self.encoding
            )));
        }
        // The API wraps base64 content at 60 columns.
        let compact: String = self.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| CollaboratorError::Decode(format!("{}: {e}", self.path)))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| CollaboratorError::Decode(format!("{}: {e}", self.path)))?;
        Ok(RepoFile {
            path: self.path,
            content,
            revision: self.sha,
        })
    }
}

/// A directory that does not exist yet (first run) lists as empty.
fn missing_as_empty(
    path: &str,
    listed: Result<Vec<WireEntry>, CollaboratorError>,
) -> Result<Vec<WireEntry>, CollaboratorError> {
    match listed {
        Err(CollaboratorError::NotFound { .. }) => {
            tracing::warn!(path, "Directory does not exist yet, treating it as empty");
            Ok(Vec::new())
        }
        other => other,
    }
}

fn files_only(entries: Vec<WireEntry>) -> Vec<RepoEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == "file")
        .map(|entry| RepoEntry {
            path: entry.path,
            revision: entry.sha,
        })
        .collect()
}

#[async_trait]
impl ContentRepository for GitHubClient {
    async fn list_directory_contents(
        &self,
        path: &str,
    ) -> Result<Vec<RepoEntry>, CollaboratorError> {
        tracing::info!(path, "Listing repository directory");
        let listed = async {
            let resp = self.send(self.read(path), path, false).await?;
            resp.json::<Vec<WireEntry>>()
                .await
                .map_err(|e| CollaboratorError::Decode(e.to_string()))
        }
        .await;
        missing_as_empty(path, listed).map(files_only)
    }

    async fn get_file(&self, path: &str) -> Result<RepoFile, CollaboratorError> {
        tracing::debug!(path, "Fetching repository file");
        let resp = self.send(self.read(path), path, false).await?;
        let file: WireFile = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;
        file.decode()
    }

    async fn create_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(path, message, "Creating repository file");
        let body = self.write_body(message, Some(content), None);
        let request = self.authorised(self.http.put(self.contents_url(path)).json(&body));
        self.send(request, path, false).await?;
        Ok(())
    }

    async fn update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        revision: &str,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(path, message, revision, "Updating repository file");
        let body = self.write_body(message, Some(content), Some(revision));
        let request = self.authorised(self.http.put(self.contents_url(path)).json(&body));
        self.send(request, path, true).await?;
        Ok(())
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        revision: &str,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(path, message, revision, "Deleting repository file");
        let body = self.write_body(message, None, Some(revision));
        let request = self.authorised(self.http.delete(self.contents_url(path)).json(&body));
        self.send(request, path, true).await?;
        Ok(())
    }
}
