use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Outcome of a moderation check. `denial_message` is only set when the
/// collaborator supplies its own user-facing text; the orchestrator owns
/// the default otherwise.
#[derive(Debug, Clone)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub denial_message: Option<String>,
}

/// Content-moderation collaborator.
#[async_trait]
pub trait ModerationCheck: Send + Sync {
    async fn check(&self, text: &str) -> Result<ModerationVerdict>;
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
}

/// OpenAI-compatible moderation endpoint client.
pub struct OpenAiModeration {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiModeration {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ModerationCheck for OpenAiModeration {
    async fn check(&self, text: &str) -> Result<ModerationVerdict> {
        let url = format!("{}/v1/moderations", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let req = ModerationRequest {
            model: &self.config.moderation_model,
            input: text,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .context("Failed to call moderation API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Moderation API returned {status}: {body}");
        }

        let body: ModerationResponse = resp
            .json()
            .await
            .context("Failed to parse moderation response")?;

        let flagged = body.results.first().map(|r| r.flagged).unwrap_or(false);
        Ok(ModerationVerdict {
            flagged,
            denial_message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_response_parses() {
        let body: ModerationResponse =
            serde_json::from_str(r#"{"results":[{"flagged":true,"categories":{"hate":true}}]}"#)
                .unwrap();
        assert!(body.results[0].flagged);
    }

    #[test]
    fn test_moderation_response_empty_results() {
        let body: ModerationResponse = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert!(!body.results.first().map(|r| r.flagged).unwrap_or(false));
    }
}
