use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One part of a UI chat message. Only `text` parts carry content this
/// service reads; other kinds (files, reasoning traces) pass through
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// A chat message as sent by the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// Chat request. Accepts either a full message history or a single-string
/// convenience shape; a body with neither is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<UiMessage>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A flat role/content message in the shape the model API expects.
#[derive(Debug, Clone, Serialize)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

// ─── Vendor store rows ───────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VendorRow {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub price_range: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub phone: Option<String>,
    pub avg_rating: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VendorImage {
    pub id: String,
    pub vendor_id: String,
    pub url: String,
    pub caption: Option<String>,
    pub is_main: bool,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VendorOffer {
    pub id: String,
    pub vendor_id: String,
    pub title: String,
    pub details: Option<String>,
    pub price: Option<i64>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VendorReview {
    pub id: String,
    pub vendor_id: String,
    pub reviewer_name: Option<String>,
    pub rating: f64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub review_ts: String,
    pub source: Option<String>,
}

/// Derived review statistics for a vendor profile.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStats {
    pub review_count: usize,
    pub avg_rating: f64,
}

/// Full vendor profile aggregate, recomputed on every request.
#[derive(Debug, Clone, Serialize)]
pub struct VendorProfile {
    pub vendor: VendorRow,
    pub images: Vec<VendorImage>,
    pub offers: Vec<VendorOffer>,
    pub reviews: Vec<VendorReview>,
    pub stats: ReviewStats,
}

// ─── Sessions ────────────────────────────────────────────

/// A persisted conversation session keyed by an opaque session key.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_key: String,
    pub state: Value,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionCreateRequest {
    #[serde(rename = "sessionKey", default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionKey", default)]
    pub session_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "user");
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    }

    #[test]
    fn test_chat_request_accepts_message_history() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"id":"m1","role":"user","parts":[{"type":"text","text":"hi"}]}]}"#,
        )
        .unwrap();
        let messages = req.messages.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].parts[0].text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_chat_request_accepts_single_string() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert!(req.messages.is_none());
        assert_eq!(req.message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_chat_request_accepts_empty_object() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.messages.is_none());
        assert!(req.message.is_none());
    }

    #[test]
    fn test_message_part_tolerates_unknown_kind() {
        let part: MessagePart = serde_json::from_str(r#"{"type":"file","url":"x"}"#).unwrap();
        assert_eq!(part.kind, "file");
        assert!(part.text.is_none());
    }
}
