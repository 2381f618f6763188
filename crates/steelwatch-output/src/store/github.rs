//! Snapshot store over the GitHub contents API.

use super::{PublishError, Revision, SnapshotStore};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default GitHub API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default commit message for snapshot updates.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update dashboard data";

/// Location and credential of the remote store.
#[derive(Clone)]
pub struct StoreConfig {
    /// Repository as `owner/name`.
    pub repo: String,
    /// Branch holding the snapshot.
    pub branch: String,
    /// Bearer token with write access to the repository.
    pub token: String,
    /// API root, without trailing slash.
    pub api_base: String,
    /// Commit message used for every write.
    pub commit_message: String,
}

impl StoreConfig {
    /// Config for `repo` on `branch` with the default API root and message.
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    /// Check the config before any request is made.
    pub fn validate(&self) -> Result<(), PublishError> {
        let mut parts = self.repo.split('/');
        let valid_repo = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.trim().is_empty() && !name.trim().is_empty()
        );
        if !valid_repo {
            return Err(PublishError::InvalidConfig(format!(
                "repository must be 'owner/name', got '{}'",
                self.repo
            )));
        }
        if self.branch.trim().is_empty() {
            return Err(PublishError::InvalidConfig("branch is empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(PublishError::InvalidConfig("token is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("commit_message", &self.commit_message)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: ContentEntry,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// [`SnapshotStore`] backed by a file in a GitHub repository.
///
/// The revision marker is the blob `sha` of the file.
#[derive(Debug)]
pub struct GitHubStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl GitHubStore {
    /// Create a store, validating the config first.
    pub fn new(config: StoreConfig) -> Result<Self, PublishError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| PublishError::InvalidConfig("token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("steelwatch/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// The store config.
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.repo,
            path.trim_start_matches('/')
        )
    }
}

impl SnapshotStore for GitHubStore {
    async fn current_revision(&self, path: &str) -> Result<Option<Revision>, PublishError> {
        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(path, "Snapshot does not exist yet");
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body, path));
        }

        let revision = parse_revision(&body)?;
        tracing::debug!(path, revision = %revision, "Read snapshot revision");
        Ok(Some(revision))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        precondition: Option<&Revision>,
    ) -> Result<Revision, PublishError> {
        let request = PutContentRequest {
            message: &self.config.commit_message,
            content: STANDARD.encode(content),
            branch: &self.config.branch,
            sha: precondition.map(Revision::as_str),
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body, path));
        }

        parse_put_response(&body)
    }
}

/// Extract the blob `sha` from a contents API entry.
pub(crate) fn parse_revision(body: &str) -> Result<Revision, PublishError> {
    let entry: ContentEntry =
        serde_json::from_str(body).map_err(|e| PublishError::Decode(e.to_string()))?;
    Ok(Revision::new(entry.sha))
}

fn parse_put_response(body: &str) -> Result<Revision, PublishError> {
    let response: PutContentResponse =
        serde_json::from_str(body).map_err(|e| PublishError::Decode(e.to_string()))?;
    Ok(Revision::new(response.content.sha))
}

/// Map a non-success response to a [`PublishError`].
pub(crate) fn classify_error(status: u16, body: &str, path: &str) -> PublishError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        409 | 422 => PublishError::Conflict {
            path: path.to_string(),
            message,
        },
        401 | 403 => PublishError::Unauthorized { status, message },
        _ => PublishError::Rejected { status, message },
    }
}
