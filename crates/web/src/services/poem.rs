//! Poem generation via the Hugging Face Inference API.
//!
//! Generates a short poem for the most recently added contact. The poem is
//! decoration: every failure is handled gracefully by rendering the page
//! without one.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::HuggingFaceConfig;

/// Inference API base URL.
const BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Poems are slow to generate; allow more than the store timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during poem generation.
#[derive(Debug, Error)]
pub enum PoemError {
    /// HTTP request failed (connection, timeout).
    #[error("poem request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The inference API returned an error response.
    #[error("poem service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("malformed poem response: {0}")]
    Parse(String),
}

/// Client for text generation on the Hugging Face Inference API.
#[derive(Clone)]
pub struct PoemClient {
    client: reqwest::Client,
    model_url: String,
}

/// One generation result.
#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

impl PoemClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &HuggingFaceConfig) -> Result<Self, PoemError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PoemError::Parse(format!("invalid API token: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            model_url: format!("{BASE_URL}/{}", config.model),
        })
    }

    /// Generate a short poem about a person.
    ///
    /// # Errors
    ///
    /// Returns `PoemError` if the request fails or the response is not a
    /// generation result.
    pub async fn generate(&self, name: &str) -> Result<String, PoemError> {
        let body = serde_json::json!({
            "inputs": prompt(name),
            "parameters": {
                "max_new_tokens": 120,
                "return_full_text": false,
            },
        });

        let response = self.client.post(&self.model_url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PoemError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let generations: Vec<Generation> = response
            .json()
            .await
            .map_err(|e| PoemError::Parse(e.to_string()))?;

        generations
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .ok_or_else(|| PoemError::Parse("empty generation result".to_string()))
    }
}

fn prompt(name: &str) -> String {
    format!("Write a short, friendly four-line poem about a person called {name}.")
}
