//! Web search tool offered to the model in general-chat mode.
//!
//! Backed by DuckDuckGo's instant-answer API. Results come back as a
//! compact JSON string of `{title, url, snippet}` entries that goes
//! straight into a tool message.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_QUERY_CHARS: usize = 500;
const MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_num_results")]
    num_results: usize,
}

fn default_num_results() -> usize {
    5
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DuckDuckGoResponse {
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: Option<String>,
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: Option<String>,
}

#[derive(Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Function-tool definition advertised to the model.
    pub fn definition() -> Value {
        json!({
            "type": "function",
            "function": {
                "name": Self::NAME,
                "description": "Search the web for information. Returns relevant results \
                                with titles, URLs, and snippets. Best for current facts, \
                                local details, and anything outside the vendor database.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        },
                        "num_results": {
                            "type": "integer",
                            "description": "Number of results to return (default: 5, max: 10)",
                            "default": 5
                        }
                    },
                    "required": ["query"]
                }
            }
        })
    }

    /// Execute a tool call with the model-supplied JSON arguments.
    pub async fn execute(&self, arguments: &str) -> Result<String> {
        let args: SearchArgs =
            serde_json::from_str(arguments).context("Invalid web_search arguments")?;
        self.search(&args.query, args.num_results).await
    }

    async fn search(&self, query: &str, num_results: usize) -> Result<String> {
        if query.is_empty() {
            anyhow::bail!("Query cannot be empty");
        }
        if query.len() > MAX_QUERY_CHARS {
            anyhow::bail!("Query too long (max {MAX_QUERY_CHARS} characters)");
        }

        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let url = format!("https://api.duckduckgo.com/?q={encoded}&format=json&no_html=1");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch search results")?;

        if !response.status().is_success() {
            anyhow::bail!("Search request failed with status: {}", response.status());
        }

        let data: DuckDuckGoResponse = response
            .json()
            .await
            .context("Failed to parse search results")?;

        Ok(shape_results(query, data, num_results.min(MAX_RESULTS)))
    }
}

fn shape_results(query: &str, data: DuckDuckGoResponse, num_results: usize) -> String {
    let mut results = Vec::new();

    if !data.abstract_text.is_empty() {
        results.push(json!({
            "title": data.heading.unwrap_or_else(|| "Answer".to_string()),
            "url": data.abstract_url.unwrap_or_default(),
            "snippet": data.abstract_text,
        }));
    }

    for topic in data
        .related_topics
        .iter()
        .take(num_results.saturating_sub(results.len()))
    {
        if let Some(url) = &topic.first_url {
            results.push(json!({
                "title": topic.text.split(" - ").next().unwrap_or(&topic.text),
                "url": url,
                "snippet": topic.text,
            }));
        }
    }

    if results.is_empty() {
        return json!({
            "query": query,
            "results": [],
            "message": "No instant answers found for this query.",
        })
        .to_string();
    }

    json!({ "query": query, "results": results }).to_string()
}
