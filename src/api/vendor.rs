use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::ApiError;
use crate::models::VendorProfile;
use crate::state::AppState;

/// GET /api/vendor/{id} - Full vendor profile: core row, images, offers,
/// recent reviews, and derived review stats.
pub async fn vendor_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VendorProfile>, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::ClientInput("id required".to_string()));
    }

    let pool = state
        .db
        .as_ref()
        .ok_or(ApiError::Configuration("vendor database", "DATABASE_URL"))?;

    let profile = db::vendor::get_vendor_profile(pool, id).await?;
    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(ApiError::NotFound("vendor not found".to_string())),
    }
}
