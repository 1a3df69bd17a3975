use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{error, instrument};

use super::dto::{EstimateRequest, EstimateResponse};
use super::service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/estimate", post(estimate))
}

#[instrument(skip(state, payload))]
pub async fn estimate(
    State(state): State<AppState>,
    Json(payload): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, (StatusCode, String)> {
    let items = payload.into_items();
    if items.is_empty() {
        return Ok(Json(EstimateResponse { results: vec![] }));
    }

    let results = service::estimate_batch(&state, items)
        .await
        .map_err(|e| {
            error!(error = %e, "estimate batch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(EstimateResponse { results }))
}
