//! GitHub Contents API store implementation.
//!
//! Each logical file maps to one blob in the configured repository; the
//! change note of every write becomes the commit message. The current blob
//! SHA is fetched immediately before each update, so a concurrent writer
//! between fetch and put surfaces as a 409 conflict instead of being
//! silently overwritten. Across sessions the model is still last writer
//! wins.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::store::{RemoteStore, StoreError};

/// Request timeout for store round-trips.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote store backed by the GitHub Contents API.
#[derive(Clone)]
pub struct GithubStore {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

/// Response body of `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    encoding: String,
    sha: String,
}

impl GithubStore {
    /// Create a new store client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if the access token cannot be used as
    /// an HTTP header value, or a transport error if the client fails to
    /// build.
    pub fn new(config: &GithubConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| StoreError::Malformed(format!("invalid access token: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);
        headers.insert("Accept", HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        // The GitHub API rejects requests without a User-Agent.
        headers.insert("User-Agent", HeaderValue::from_static("mycontacts"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Fetch the current contents entry for `path`, or `None` if absent.
    async fn fetch(&self, path: &str) -> Result<Option<ContentsResponse>, StoreError> {
        let response = self.client.get(self.contents_url(path)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Malformed(format!(
                "GET '{path}' returned {status}: {}",
                excerpt(&body)
            )));
        }

        let entry: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(Some(entry))
    }
}

impl RemoteStore for GithubStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.fetch(path).await?.is_some())
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        let entry = self
            .fetch(path)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        if entry.encoding != "base64" {
            return Err(StoreError::Malformed(format!(
                "unexpected content encoding '{}' for '{path}'",
                entry.encoding
            )));
        }

        // The API wraps base64 content in newlines.
        let compact: String = entry.content.split_whitespace().collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| StoreError::Malformed(format!("invalid base64 at '{path}': {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| StoreError::Malformed(format!("non-UTF-8 content at '{path}': {e}")))
    }

    async fn write(&self, path: &str, content: &str, change_note: &str) -> Result<(), StoreError> {
        // Updates require the current blob SHA; creations must omit it.
        let sha = self.fetch(path).await?.map(|entry| entry.sha);

        let mut body = serde_json::json!({
            "message": change_note,
            "content": BASE64.encode(content.as_bytes()),
        });
        if let (Some(sha), Some(map)) = (sha, body.as_object_mut()) {
            map.insert("sha".to_string(), serde_json::Value::String(sha));
        }

        let response = self
            .client
            .put(self.contents_url(path))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::CONFLICT {
            return Err(StoreError::WriteRejected {
                path: path.to_string(),
                reason: "file changed since it was read (concurrent writer)".to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::WriteRejected {
                path: path.to_string(),
                reason: format!("{status}: {}", excerpt(&message)),
            });
        }
        Ok(())
    }
}

/// First part of a response body, for error messages.
fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}
