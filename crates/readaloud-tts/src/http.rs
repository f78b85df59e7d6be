//! HTTP backend abstraction for the TTS server.
//!
//! A small trait over the two request shapes the client needs, so client
//! logic can be tested against canned responses without a socket.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{TtsError, TtsResult};

/// Longest server error body carried into an error message.
const MAX_REASON_CHARS: usize = 200;

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends used by [`TtsClient`](crate::TtsClient).
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// POST a JSON body and return the raw response bytes.
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> TtsResult<Vec<u8>>;

    /// GET a URL and deserialize its JSON body.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> TtsResult<T>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest. No retries.
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Duration, user_agent: &str) -> TtsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Turn a non-success response into [`TtsError::ApiRequestFailed`].
    async fn check(url: &Url, response: reqwest::Response) -> TtsResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let reason = reason_from_body(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string());

        Err(TtsError::ApiRequestFailed {
            status: status.as_u16(),
            reason,
            url: url.to_string(),
        })
    }
}

/// Short, single-line reason extracted from an error body.
///
/// JSON bodies with a `detail`/`error`/`message` string use that field.
fn reason_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let text = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "error", "message"]
                .iter()
                .find_map(|k| v.get(k).and_then(|f| f.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string());

    let line = text.lines().next().unwrap_or_default().trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(MAX_REASON_CHARS).collect())
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> TtsResult<Vec<u8>> {
        let response = self.client.post(url.as_str()).json(body).send().await?;
        let response = Self::check(url, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> TtsResult<T> {
        let response = self.client.get(url.as_str()).send().await?;
        let response = Self::check(url, response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================
