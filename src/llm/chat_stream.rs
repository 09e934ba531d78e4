use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::LlmConfig;
use crate::llm::web_search::WebSearchTool;
use crate::models::ModelMessage;

pub type ChatTokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Streaming chat collaborator. Implementations yield content delta
/// strings (one per token/chunk); tool use, if any, happens behind this
/// seam and only the resulting text reaches the caller.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_chat(&self, messages: Vec<ModelMessage>) -> Result<ChatTokenStream>;
}

const REQUEST_TIMEOUT_SECS: u64 = 300;
const DELTA_CHANNEL_CAPACITY: usize = 32;

/// OpenAI-compatible streaming chat client with one advertised tool
/// (web search) and a bounded tool-call loop.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: LlmConfig,
    web_search: Option<WebSearchTool>,
}

impl OpenAiChatModel {
    pub fn new(client: reqwest::Client, config: LlmConfig, web_search: Option<WebSearchTool>) -> Self {
        Self {
            client,
            config,
            web_search,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn stream_chat(&self, messages: Vec<ModelMessage>) -> Result<ChatTokenStream> {
        let wire: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        // Open the first upstream stream before returning so a synchronous
        // failure surfaces to the caller as an error, not a broken stream.
        let first = open_stream(&self.client, &self.config, &wire, self.web_search.is_some()).await?;

        let (tx, rx) = mpsc::channel(DELTA_CHANNEL_CAPACITY);
        let client = self.client.clone();
        let config = self.config.clone();
        let web_search = self.web_search.clone();
        tokio::spawn(async move {
            run_tool_loop(client, config, web_search, wire, first, tx).await;
        });

        Ok(Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

// ─── Request plumbing ────────────────────────────────────

#[derive(Serialize)]
struct StreamRequest<'a> {
    model: &'a str,
    messages: &'a [Value],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

async fn open_stream(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[Value],
    with_tools: bool,
) -> Result<reqwest::Response> {
    let url = format!("{}/v1/chat/completions", config.base_url);

    let req = StreamRequest {
        model: &config.chat_model,
        messages,
        stream: true,
        tools: with_tools.then(|| vec![WebSearchTool::definition()]),
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .header(
            "Authorization",
            format!("Bearer {}", config.api_key.as_deref().unwrap_or("")),
        )
        .json(&req)
        .send()
        .await
        .context("Failed to connect to the chat completions API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Chat completions API returned {status}: {body}");
    }

    Ok(resp)
}

// ─── Tool loop ───────────────────────────────────────────

/// Drive the model stream, forwarding content deltas into `tx`. When the
/// model finishes a round asking for tool calls, execute them, append the
/// assistant/tool messages, and open a fresh stream; the step bound keeps
/// a confused model from looping forever.
async fn run_tool_loop(
    client: reqwest::Client,
    config: LlmConfig,
    web_search: Option<WebSearchTool>,
    mut messages: Vec<Value>,
    first: reqwest::Response,
    tx: mpsc::Sender<Result<String>>,
) {
    let mut response = Some(first);

    for step in 0..config.max_tool_steps.max(1) {
        let resp = match response.take() {
            Some(r) => r,
            None => match open_stream(&client, &config, &messages, web_search.is_some()).await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            },
        };

        let mut pending: Vec<PendingToolCall> = Vec::new();
        let mut finish_reason: Option<String> = None;
        let mut lines = Box::pin(stream_lines(resp.bytes_stream()));

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            match parse_stream_line(&line) {
                None => continue,
                Some(Err(e)) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
                Some(Ok(chunk)) => {
                    if let Some(content) = chunk.content {
                        if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                            // Caller went away; stop pulling from upstream
                            return;
                        }
                    }
                    for delta in chunk.tool_calls {
                        fold_tool_call(&mut pending, delta);
                    }
                    if chunk.finish_reason.is_some() {
                        finish_reason = chunk.finish_reason;
                    }
                }
            }
        }

        let wants_tools = finish_reason.as_deref() == Some("tool_calls") && !pending.is_empty();
        let Some(tool) = web_search.as_ref().filter(|_| wants_tools) else {
            return;
        };

        tracing::info!("model requested {} tool call(s) at step {step}", pending.len());
        messages.push(assistant_tool_call_message(&pending));
        for call in &pending {
            let output = run_tool(tool, call).await;
            messages.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "content": output,
            }));
        }
    }

    tracing::warn!("tool loop stopped after {} steps", config.max_tool_steps);
}

async fn run_tool(tool: &WebSearchTool, call: &PendingToolCall) -> String {
    if call.name != WebSearchTool::NAME {
        return json!({ "error": format!("unknown tool: {}", call.name) }).to_string();
    }
    match tool.execute(&call.arguments).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("web search tool failed: {e:#}");
            json!({ "error": e.to_string() }).to_string()
        }
    }
}

fn assistant_tool_call_message(calls: &[PendingToolCall]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "type": "function",
                "function": { "name": c.name, "arguments": c.arguments },
            })
        })
        .collect();
    json!({ "role": "assistant", "content": null, "tool_calls": calls })
}

// ─── Chunk parsing ───────────────────────────────────────

/// A tool call assembled from streamed fragments. `arguments` grows as
/// fragments arrive; it is only valid JSON once the round finishes.
#[derive(Debug, Clone, Default, PartialEq)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug)]
struct ParsedChunk {
    content: Option<String>,
    tool_calls: Vec<ToolCallDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Parse a single SSE line from the completions stream. Returns:
/// - Some(Ok(chunk)) for data chunks
/// - Some(Err(e)) for parse errors
/// - None to skip (empty lines, non-data lines, [DONE], empty choices)
fn parse_stream_line(line: &str) -> Option<Result<ParsedChunk>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            let choice = chunk.choices.into_iter().next()?;
            Some(Ok(ParsedChunk {
                content: choice.delta.content,
                tool_calls: choice.delta.tool_calls.unwrap_or_default(),
                finish_reason: choice.finish_reason,
            }))
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse chat stream chunk: {e}"))),
    }
}

fn fold_tool_call(pending: &mut Vec<PendingToolCall>, delta: ToolCallDelta) {
    if pending.len() <= delta.index {
        pending.resize_with(delta.index + 1, PendingToolCall::default);
    }
    let slot = &mut pending[delta.index];
    if let Some(id) = delta.id {
        slot.id = id;
    }
    if let Some(function) = delta.function {
        if let Some(name) = function.name {
            slot.name = name;
        }
        if let Some(arguments) = function.arguments {
            slot.arguments.push_str(&arguments);
        }
    }
}

// ─── Line buffering ──────────────────────────────────────

/// Convert a byte stream into a stream of complete lines.
fn stream_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), String::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                // First, try to extract a complete line from the buffer
                if let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].to_string();
                    buffer = buffer[newline_pos + 1..].to_string();
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                // Buffer has no complete line; read more bytes
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        // Stream ended; emit remaining buffer if non-empty
                        if !buffer.trim().is_empty() {
                            let remaining = std::mem::take(&mut buffer);
                            return Some((Ok(remaining), (stream, buffer)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}
