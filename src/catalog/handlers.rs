use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::dto::{
    CreateDishRequest, CreateProteinTypeRequest, UpdateDishRequest, UpdateProteinTypeRequest,
    WorkspaceQuery,
};
use super::repo::{self, DishDetails, ProteinType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/protein-types", get(list_protein_types).post(create_protein_type))
        .route(
            "/protein-types/:id",
            put(update_protein_type).delete(delete_protein_type),
        )
        .route("/dishes", get(list_dishes).post(create_dish))
        .route("/dishes/:id", get(get_dish).put(update_dish).delete(delete_dish))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// --- protein types ---

#[instrument(skip(state))]
pub async fn list_protein_types(
    State(state): State<AppState>,
    Query(q): Query<WorkspaceQuery>,
) -> Result<Json<Vec<ProteinType>>, (StatusCode, String)> {
    let rows = repo::list_protein_types(&state.db, q.workspace_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
pub async fn create_protein_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateProteinTypeRequest>,
) -> Result<(StatusCode, Json<ProteinType>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    let row = repo::create_protein_type(
        &state.db,
        payload.workspace_id,
        payload.name.trim(),
        payload.color.trim(),
    )
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, payload))]
pub async fn update_protein_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProteinTypeRequest>,
) -> Result<Json<ProteinType>, (StatusCode, String)> {
    let row = repo::update_protein_type(&state.db, id, payload.name.trim(), payload.color.trim())
        .await
        .map_err(internal)?;
    row.map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Protein type not found".into()))
}

/// Deletion is refused while any dish still references the type; the
/// database FK would restrict anyway, but the caller gets a clean 409.
#[instrument(skip(state))]
pub async fn delete_protein_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let referencing = repo::count_dishes_for_protein_type(&state.db, id)
        .await
        .map_err(internal)?;
    if referencing > 0 {
        warn!(%id, referencing, "protein type still referenced");
        return Err((
            StatusCode::CONFLICT,
            format!("Protein type is used by {referencing} dish(es)"),
        ));
    }
    let deleted = repo::delete_protein_type(&state.db, id)
        .await
        .map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Protein type not found".into()))
    }
}

// --- dishes ---

#[instrument(skip(state))]
pub async fn list_dishes(
    State(state): State<AppState>,
    Query(q): Query<WorkspaceQuery>,
) -> Result<Json<Vec<DishDetails>>, (StatusCode, String)> {
    let rows = repo::list_dishes(&state.db, q.workspace_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DishDetails>, (StatusCode, String)> {
    let dish = repo::get_dish(&state.db, id).await.map_err(internal)?;
    dish.map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Dish not found".into()))
}

#[instrument(skip(state, payload))]
pub async fn create_dish(
    State(state): State<AppState>,
    Json(payload): Json<CreateDishRequest>,
) -> Result<(StatusCode, Json<DishDetails>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    let ingredients = payload.ingredients.into_iter().map(|i| i.into_new()).collect();
    let dish_id = repo::create_dish(
        &state.db,
        payload.workspace_id,
        payload.protein_type_id,
        payload.name.trim(),
        payload.description.as_deref(),
        ingredients,
    )
    .await
    .map_err(internal)?;

    let dish = repo::get_dish(&state.db, dish_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "dish vanished".into()))?;
    Ok((StatusCode::CREATED, Json(dish)))
}

#[instrument(skip(state, payload))]
pub async fn update_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDishRequest>,
) -> Result<Json<DishDetails>, (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    let ingredients = payload.ingredients.into_iter().map(|i| i.into_new()).collect();
    let updated = repo::update_dish(
        &state.db,
        id,
        payload.protein_type_id,
        payload.name.trim(),
        payload.description.as_deref(),
        ingredients,
    )
    .await
    .map_err(internal)?;
    if !updated {
        return Err((StatusCode::NOT_FOUND, "Dish not found".into()));
    }
    let dish = repo::get_dish(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "dish vanished".into()))?;
    Ok(Json(dish))
}

#[instrument(skip(state))]
pub async fn delete_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_dish(&state.db, id).await.map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Dish not found".into()))
    }
}
