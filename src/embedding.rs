//! Embedding provider client.
//!
//! Talks to an OpenAI-compatible `POST /embeddings` endpoint. The defaults
//! target NVIDIA-hosted models, whose embedding API distinguishes between
//! query-mode and passage-mode embeddings via an `input_type` field:
//! questions are embedded as `"query"`, stored chunks as `"passage"`.
//!
//! The client is constructed explicitly from [`ProviderConfig`] and passed
//! into the pipeline; nothing reads ambient global state except the API
//! key, which is resolved from the configured environment variable at
//! request time.
//!
//! # Retry Strategy
//!
//! Transient failures are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::ProviderConfig;

/// Which side of the retrieval the text is embedded for.
///
/// The embedding model places questions and passages in the same space but
/// encodes them differently; mixing the modes degrades retrieval quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// A question being asked against the index.
    Query,
    /// A document chunk being stored.
    Passage,
}

impl InputType {
    fn as_str(self) -> &'static str {
        match self {
            InputType::Query => "query",
            InputType::Passage => "passage",
        }
    }
}

/// Client for the embeddings endpoint.
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    model: String,
    max_retries: u32,
}

impl EmbeddingClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            model: config.embedding_model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Embed a single text in the given mode.
    ///
    /// Returns the embedding vector, whose length is fixed by the model
    /// for the lifetime of a deployment.
    pub async fn embed(&self, text: &str, input_type: InputType) -> Result<Vec<f32>> {
        // Embedding models tokenize newlines poorly; flatten them first.
        let text = text.replace('\n', " ");

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "input_type": input_type.as_str(),
        });

        let url = format!("{}/embeddings", self.base_url);
        let json = post_with_retry(
            &self.http,
            &url,
            &self.api_key_env,
            &body,
            self.max_retries,
        )
        .await?;

        parse_embedding_response(&json)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data[0].embedding"))?;

    let vec: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vec.is_empty() {
        bail!("Invalid embeddings response: empty embedding");
    }

    Ok(vec)
}

/// POST a JSON body with bearer auth and retry/backoff. Shared by the
/// embedding and generation clients.
///
/// The API key is read from `api_key_env` on every call so a missing key
/// fails the request rather than process startup.
pub(crate) async fn post_with_retry(
    http: &reqwest::Client,
    url: &str,
    api_key_env: &str,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let api_key = std::env::var(api_key_env)
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", api_key_env))?;

    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = http
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("provider error {}: {}", status, body_text));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("provider error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("provider request failed after retries")))
}
