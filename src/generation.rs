//! Chat-completion client used to turn retrieved context into an answer.
//!
//! Calls an OpenAI-compatible `POST /chat/completions` endpoint with a
//! system instruction and a single user message. Temperature and output
//! length come from configuration and default to low, bounded values so
//! answers stay grounded in the supplied context.
//!
//! Retries follow the same backoff policy as the embedding client
//! (see [`crate::embedding::post_with_retry`]).

use anyhow::Result;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::embedding::post_with_retry;

/// Client for the chat-completions endpoint.
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_retries: u32,
}

impl GenerationClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
        })
    }

    /// Generate a completion for `user_message` under `system_instruction`.
    pub async fn generate(&self, system_instruction: &str, user_message: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_instruction},
                {"role": "user", "content": user_message},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let json = post_with_retry(
            &self.http,
            &url,
            &self.api_key_env,
            &body,
            self.max_retries,
        )
        .await?;

        parse_completion_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid completions response: missing choices[0].message.content")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_response() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "Paris.");
    }

    #[test]
    fn test_parse_missing_choices_fails() {
        let json = serde_json::json!({"id": "cmpl-1"});
        assert!(parse_completion_response(&json).is_err());
    }
}
