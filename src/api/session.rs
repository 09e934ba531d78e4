use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::db;
use crate::error::ApiError;
use crate::models::{SessionCreateRequest, SessionQuery};
use crate::state::AppState;

/// POST /api/session/test - Create a session. A missing or malformed body
/// is tolerated: the key defaults to a timestamped test key and the state
/// to a fresh conversation blob.
pub async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<SessionCreateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let pool = state
        .db
        .as_ref()
        .ok_or(ApiError::Configuration("session database", "DATABASE_URL"))?;

    let session_key = req
        .session_key
        .unwrap_or_else(|| format!("test-{}", Utc::now().timestamp_millis()));
    let initial_state = req
        .state
        .unwrap_or_else(|| json!({ "stage": "ask_category", "slots": {} }));

    let created = db::session::create_session(pool, &session_key, &initial_state).await?;
    Ok(Json(json!({ "created": created })))
}

/// GET /api/session/test?sessionKey=... - Read a session. A missing
/// session reads as `{"session": null}`, not an error.
pub async fn read_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let session_key = query.session_key.unwrap_or_default();
    if session_key.is_empty() {
        return Err(ApiError::ClientInput(
            "sessionKey query param required".to_string(),
        ));
    }

    let pool = state
        .db
        .as_ref()
        .ok_or(ApiError::Configuration("session database", "DATABASE_URL"))?;

    let session = db::session::get_session(pool, &session_key).await;
    Ok(Json(json!({ "session": session })))
}
