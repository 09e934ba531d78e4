//! Conversation-session store over the `convo_sessions` table.
//!
//! Reads degrade gracefully (missing key or query error both read as no
//! session); writes fail loudly so a caller can tell persistence broke.
//! An empty session key on a write is a caller bug, rejected up front.

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{DbPool, StoreError};
use crate::models::SessionRecord;

fn row_to_session(row: &SqliteRow) -> Result<SessionRecord, StoreError> {
    let session_key: String = row
        .try_get("session_key")
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    let state_raw: String = row
        .try_get("state")
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    let last_updated: String = row
        .try_get("last_updated")
        .map_err(|e| StoreError::Decode(e.to_string()))?;

    let state = serde_json::from_str(&state_raw).map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(SessionRecord {
        session_key,
        state,
        last_updated,
    })
}

/// Fetch a session. Returns None for a missing key, an empty key, or any
/// underlying query error.
pub async fn get_session(pool: &DbPool, session_key: &str) -> Option<SessionRecord> {
    if session_key.is_empty() {
        return None;
    }

    let row = sqlx::query(
        "SELECT session_key, state, last_updated
         FROM convo_sessions
         WHERE session_key = ?
         LIMIT 1",
    )
    .bind(session_key)
    .fetch_optional(pool)
    .await;

    match row {
        Ok(Some(row)) => match row_to_session(&row) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("session row for {session_key} failed to decode: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("session read failed for {session_key}: {e}");
            None
        }
    }
}

/// Create a new session. Fails on a duplicate key.
pub async fn create_session(
    pool: &DbPool,
    session_key: &str,
    initial_state: &Value,
) -> Result<SessionRecord, StoreError> {
    if session_key.is_empty() {
        return Err(StoreError::EmptyKey);
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO convo_sessions (session_key, state, last_updated)
         VALUES (?, ?, ?)",
    )
    .bind(session_key)
    .bind(initial_state.to_string())
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(SessionRecord {
        session_key: session_key.to_string(),
        state: initial_state.clone(),
        last_updated: now,
    })
}

/// Replace a session's state, creating the row if it does not exist yet.
/// The upsert is a single atomic statement; there is no in-process
/// read-modify-write.
pub async fn update_session(
    pool: &DbPool,
    session_key: &str,
    new_state: &Value,
) -> Result<SessionRecord, StoreError> {
    if session_key.is_empty() {
        return Err(StoreError::EmptyKey);
    }

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO convo_sessions (session_key, state, last_updated)
         VALUES (?, ?, ?)
         ON CONFLICT(session_key) DO UPDATE
         SET state = excluded.state, last_updated = excluded.last_updated",
    )
    .bind(session_key)
    .bind(new_state.to_string())
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(SessionRecord {
        session_key: session_key.to_string(),
        state: new_state.clone(),
        last_updated: now,
    })
}
