use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::llm::embeddings::embed_query;

/// Vendor search collaborator. Returns the provider's raw JSON response;
/// shape handling belongs to the normalizer, not the client.
#[async_trait]
pub trait VendorSearch: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Value>;
}

const QUERY_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct VectorQueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

/// HTTP client for the external vendor vector index. Embeds the query
/// first, then runs a nearest-neighbour lookup with metadata included.
pub struct VectorDbClient {
    client: reqwest::Client,
    llm: LlmConfig,
    base_url: String,
    api_key: Option<String>,
}

impl VectorDbClient {
    pub fn new(
        client: reqwest::Client,
        llm: LlmConfig,
        base_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            llm,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl VendorSearch for VectorDbClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Value> {
        let embedding = embed_query(&self.client, &self.llm, query).await?;

        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let req = VectorQueryRequest {
            vector: &embedding,
            top_k,
            include_metadata: true,
        };

        let mut request = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .json(&req);
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }

        let resp = request
            .send()
            .await
            .context("Failed to call the vector database")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector database returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse vector database response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_wire_names() {
        let req = VectorQueryRequest {
            vector: &[0.1, 0.2],
            top_k: 8,
            include_metadata: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["topK"], 8);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["vector"].as_array().unwrap().len(), 2);
    }
}
