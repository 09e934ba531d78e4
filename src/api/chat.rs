use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::OwnedSemaphorePermit;

use crate::error::ApiError;
use crate::intent::is_vendor_query;
use crate::models::{ChatRequest, MessagePart, ModelMessage, Role, UiMessage};
use crate::state::AppState;
use crate::vendors::format::format_vendor_list;
use crate::vendors::normalize::normalize;

const MAX_LOGGED_QUERY_CHARS: usize = 300;
const IDLE_TIMEOUT_SECS: u64 = 30;

const DEFAULT_DENIAL: &str = "Your message violates our guidelines. I can't answer that.";
const MODEL_FALLBACK: &str =
    "Sorry — I'm having trouble generating a reply right now. Please try again in a few seconds.";
const VENDOR_FAILURE: &str = "Something went wrong while fetching vendors. Please try again in a \
                              moment, or ask me to search the web for vendor options.";

const SYSTEM_PROMPT: &str = "You are a warm, practical wedding-planning assistant for couples \
                             planning a wedding in Mumbai.\n\
                             Help with vendors, budgets, timelines, and etiquette.\n\
                             When you need current or local facts you don't have, use the \
                             web_search tool and say what you found.\n\
                             Keep answers concise and concrete.";

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// POST /api/chat - Chat orchestrator with SSE streaming.
///
/// Sequence: normalize body, extract latest user text, moderate, classify
/// intent, then either stream a vendor listing straight from the search
/// index or stream the model's reply. Every path closes the stream with a
/// `finish` event, errors included.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<SseStream>, ApiError> {
    // ── Step 1: Normalize the body ────────────────────────
    let req = body
        .map_err(|e| ApiError::ClientInput(format!("invalid JSON body: {e}")))?
        .0;

    let messages: Vec<UiMessage> = match (req.messages, req.message) {
        (Some(messages), _) => messages,
        (None, Some(text)) => vec![UiMessage {
            id: "m1".to_string(),
            role: Role::User,
            parts: vec![MessagePart::text(text)],
        }],
        (None, None) => {
            return Err(ApiError::ClientInput("no messages provided".to_string()));
        }
    };

    let latest_user_text = latest_user_text(&messages);
    tracing::info!(
        "chat request, latest user text: {:?}",
        truncate_for_log(&latest_user_text, MAX_LOGGED_QUERY_CHARS)
    );

    // ── Step 2: Acquire semaphore ─────────────────────────
    let permit = state
        .chat_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("chat semaphore closed")))?;

    // ── Step 3: Moderation ────────────────────────────────
    // Skipped on empty text. A failing check is non-fatal: availability
    // wins over stricter safety when the collaborator itself is down.
    if !latest_user_text.is_empty() {
        if let Some(moderation) = &state.moderation {
            match moderation.check(&latest_user_text).await {
                Ok(verdict) if verdict.flagged => {
                    tracing::info!("chat message flagged by moderation");
                    let denial = verdict
                        .denial_message
                        .unwrap_or_else(|| DEFAULT_DENIAL.to_string());
                    return Ok(Sse::new(single_text_stream("moderation-denial-text", denial)));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("moderation check failed, continuing anyway: {e:#}");
                }
            }
        }
    }

    // ── Step 4: Vendor mode ───────────────────────────────
    if is_vendor_query(&latest_user_text) {
        tracing::info!("entering vendor mode");
        let text = vendor_mode_text(&state, &latest_user_text).await;
        return Ok(Sse::new(single_text_stream("vendor-response", text)));
    }

    // ── Step 5: Model mode ────────────────────────────────
    model_mode(&state, &messages, permit).await
}

// ─── Vendor mode ─────────────────────────────────────────

/// Search, normalize, and format; any failure along the way degrades to
/// the apology text so the stream still completes cleanly.
async fn vendor_mode_text(state: &AppState, query: &str) -> String {
    let query = query.trim();

    let Some(search) = &state.search else {
        tracing::error!("vendor mode requested but no vector search collaborator is configured");
        return VENDOR_FAILURE.to_string();
    };

    match search.search(query, state.config.vendor_top_k).await {
        Ok(raw) => {
            let vendors = normalize(&raw);
            format_vendor_list(&vendors, query, state.config.vendor_list_limit)
        }
        Err(e) => {
            tracing::error!(
                "vendor search failed for {:?}: {e:#}",
                truncate_for_log(query, MAX_LOGGED_QUERY_CHARS)
            );
            VENDOR_FAILURE.to_string()
        }
    }
}

// ─── Model mode ──────────────────────────────────────────

async fn model_mode(
    state: &AppState,
    messages: &[UiMessage],
    permit: OwnedSemaphorePermit,
) -> Result<Sse<SseStream>, ApiError> {
    let text_id = "model-response";
    let model_messages = to_model_messages(messages);

    let llm_stream = match state.model.stream_chat(model_messages).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("model streaming failed to start: {e:#}");
            return Ok(Sse::new(single_text_stream(
                "fallback-response",
                MODEL_FALLBACK.to_string(),
            )));
        }
    };

    // Pump deltas with an idle timeout so a stalled upstream can never
    // hold the connection open; the framing tail still follows.
    let idle_timeout = Duration::from_secs(IDLE_TIMEOUT_SECS);
    let delta_stream = stream::unfold(
        (llm_stream, idle_timeout),
        move |(mut llm_stream, timeout)| async move {
            match tokio::time::timeout(timeout, llm_stream.next()).await {
                Ok(Some(Ok(content))) => {
                    let event: Result<Event, Infallible> =
                        Ok(text_delta_event(text_id, &content));
                    Some((event, (llm_stream, timeout)))
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("model stream error: {e:#}");
                    None
                }
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!("model stream idle timeout");
                    None
                }
            }
        },
    );

    let head = stream::iter::<Vec<Result<Event, Infallible>>>(vec![
        Ok(start_event()),
        Ok(text_start_event(text_id)),
    ]);
    let tail = stream::iter::<Vec<Result<Event, Infallible>>>(vec![
        Ok(text_end_event(text_id)),
        Ok(finish_event()),
    ]);

    // Hold the semaphore permit for the lifetime of the stream
    let event_stream = head.chain(delta_stream).chain(tail).map(move |event| {
        let _permit = &permit;
        event
    });

    Ok(Sse::new(Box::pin(event_stream)))
}

// ─── Stream framing ──────────────────────────────────────

fn start_event() -> Event {
    Event::default()
        .event("start")
        .json_data(serde_json::json!({}))
        .unwrap()
}

fn text_start_event(id: &str) -> Event {
    Event::default()
        .event("text-start")
        .json_data(serde_json::json!({ "id": id }))
        .unwrap()
}

fn text_delta_event(id: &str, delta: &str) -> Event {
    Event::default()
        .event("text-delta")
        .json_data(serde_json::json!({ "id": id, "delta": delta }))
        .unwrap()
}

fn text_end_event(id: &str) -> Event {
    Event::default()
        .event("text-end")
        .json_data(serde_json::json!({ "id": id }))
        .unwrap()
}

fn finish_event() -> Event {
    Event::default()
        .event("finish")
        .json_data(serde_json::json!({}))
        .unwrap()
}

/// A complete framed response carrying one text block.
fn single_text_stream(text_id: &'static str, text: String) -> SseStream {
    let events: Vec<Result<Event, Infallible>> = vec![
        Ok(start_event()),
        Ok(text_start_event(text_id)),
        Ok(text_delta_event(text_id, &text)),
        Ok(text_end_event(text_id)),
        Ok(finish_event()),
    ];
    Box::pin(stream::iter(events))
}

// ─── Helper functions ────────────────────────────────────

/// Concatenated text parts of the latest user-authored message. No user
/// message reads as empty text, not an error.
fn latest_user_text(messages: &[UiMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| {
            m.parts
                .iter()
                .filter(|p| p.kind == "text")
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// The system prompt followed by the user/assistant history. Messages
/// with no text content contribute nothing; client-supplied system
/// messages are dropped rather than forwarded.
fn to_model_messages(messages: &[UiMessage]) -> Vec<ModelMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(ModelMessage {
        role: "system".to_string(),
        content: SYSTEM_PROMPT.to_string(),
    });
    for m in messages {
        let role = match m.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => continue,
        };
        let content: String = m
            .parts
            .iter()
            .filter(|p| p.kind == "text")
            .filter_map(|p| p.text.as_deref())
            .collect();
        if content.is_empty() {
            continue;
        }
        out.push(ModelMessage {
            role: role.to_string(),
            content,
        });
    }
    out
}

fn truncate_for_log(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
