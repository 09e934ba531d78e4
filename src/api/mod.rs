pub mod chat;
pub mod session;
pub mod vendor;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the application router. Lives here rather than in `main` so
/// integration tests drive the exact same route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/vendor/{id}", get(vendor::vendor_detail))
        .route(
            "/api/session/test",
            post(session::create_session).get(session::read_session),
        )
        .with_state(state)
}
