use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, instrument};
use uuid::Uuid;

use super::repo::{self, NutritionistProfile};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(put_profile))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PutProfileRequest {
    pub workspace_id: Uuid,
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub logo_url: Option<String>,
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<ProfileQuery>,
) -> Result<Json<NutritionistProfile>, (StatusCode, String)> {
    let profile = repo::get_profile(&state.db, q.workspace_id)
        .await
        .map_err(internal)?;
    profile
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Profile not found".into()))
}

#[instrument(skip(state, payload))]
pub async fn put_profile(
    State(state): State<AppState>,
    Json(payload): Json<PutProfileRequest>,
) -> Result<Json<NutritionistProfile>, (StatusCode, String)> {
    let profile = repo::upsert_profile(
        &state.db,
        payload.workspace_id,
        payload.name.as_deref().filter(|s| !s.trim().is_empty()),
        payload.license_number.as_deref().filter(|s| !s.trim().is_empty()),
        payload.logo_url.as_deref().filter(|s| !s.trim().is_empty()),
    )
    .await
    .map_err(internal)?;
    Ok(Json(profile))
}
