use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::Weekday;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::dto::{
    ChartQuery, CreateEntryRequest, CreateSlotRequest, HideSlotRequest, SlotItem, SlotsQuery,
    SlotsResponse, SummaryResponse, WeekQuery,
};
use super::repo::{self, EntryWithDish, LegacySlot, WeekPlanEntry};
use crate::report::aggregate::{self, DaySeries, Nutrient};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meal-slots", get(list_slots).post(create_slot))
        .route("/meal-slots/hide", post(hide_slot))
        .route("/planner/entries", get(list_entries).post(create_entry))
        .route("/planner/entries/:id", axum::routing::delete(delete_entry))
        .route("/planner/summary", get(summary))
        .route("/planner/chart", get(chart))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn ensure_monday(week_start: time::Date) -> Result<(), (StatusCode, String)> {
    if week_start.weekday() != Weekday::Monday {
        warn!(%week_start, "week_start is not a Monday");
        return Err((
            StatusCode::BAD_REQUEST,
            "week_start must be a Monday".into(),
        ));
    }
    Ok(())
}

// --- meal slots ---

#[instrument(skip(state))]
pub async fn list_slots(
    State(state): State<AppState>,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, (StatusCode, String)> {
    let slots = repo::list_meal_slots(&state.db, q.workspace_id)
        .await
        .map_err(internal)?;

    if slots.is_empty() {
        // Workspace predates custom slots: serve the fixed triple.
        return Ok(Json(SlotsResponse {
            fallback: true,
            slots: vec![
                SlotItem::fallback(LegacySlot::Breakfast, 1),
                SlotItem::fallback(LegacySlot::Lunch, 2),
                SlotItem::fallback(LegacySlot::Dinner, 3),
            ],
            hidden_slot_ids: vec![],
        }));
    }

    let hidden_slot_ids = match q.week_start {
        Some(week_start) => repo::hidden_slot_ids_for_week(&state.db, q.workspace_id, week_start)
            .await
            .map_err(internal)?,
        None => vec![],
    };

    Ok(Json(SlotsResponse {
        fallback: false,
        slots: slots.into_iter().map(SlotItem::from).collect(),
        hidden_slot_ids,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_slot(
    State(state): State<AppState>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotItem>), (StatusCode, String)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    let slot = repo::create_meal_slot(&state.db, payload.workspace_id, name, payload.sort_order)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(SlotItem::from(slot))))
}

#[instrument(skip(state, payload))]
pub async fn hide_slot(
    State(state): State<AppState>,
    Json(payload): Json<HideSlotRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    ensure_monday(payload.week_start)?;
    repo::hide_slot_for_week(
        &state.db,
        payload.meal_slot_id,
        payload.workspace_id,
        payload.week_start,
    )
    .await
    .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- entries ---

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    Query(q): Query<WeekQuery>,
) -> Result<Json<Vec<EntryWithDish>>, (StatusCode, String)> {
    ensure_monday(q.week_start)?;
    let entries = repo::list_entries_with_dishes(&state.db, q.workspace_id, q.week_start)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}

/// The `slot` field of an entry request: either a custom meal-slot id or one
/// of the fixed legacy keys.
#[derive(Debug, PartialEq)]
enum SlotRef {
    Custom(Uuid),
    Legacy(LegacySlot),
}

fn parse_slot_ref(slot: &str) -> Option<SlotRef> {
    if let Ok(id) = slot.parse::<Uuid>() {
        return Some(SlotRef::Custom(id));
    }
    LegacySlot::from_key(slot).map(SlotRef::Legacy)
}

/// Placement of a dish into one (day, slot) cell. Moving a dish is a delete
/// plus a fresh insert; entries are never updated in place.
#[instrument(skip(state, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<WeekPlanEntry>), (StatusCode, String)> {
    ensure_monday(payload.week_start)?;

    let bad_slot = || {
        (
            StatusCode::BAD_REQUEST,
            format!("unknown meal slot '{}'", payload.slot),
        )
    };
    let (legacy, slot_id) = match parse_slot_ref(&payload.slot) {
        Some(SlotRef::Custom(id)) => {
            // a well-formed uuid must still name a slot of this workspace
            let known = repo::meal_slot_exists(&state.db, payload.workspace_id, id)
                .await
                .map_err(internal)?;
            if !known {
                return Err(bad_slot());
            }
            (None, Some(id))
        }
        Some(SlotRef::Legacy(key)) => (Some(key), None),
        None => return Err(bad_slot()),
    };

    let entry = repo::create_entry(
        &state.db,
        payload.workspace_id,
        payload.dish_id,
        payload.week_start,
        payload.day_of_week,
        legacy,
        slot_id,
    )
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_entry(&state.db, id).await.map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Entry not found".into()))
    }
}

// --- rollups ---

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    Query(q): Query<WeekQuery>,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    ensure_monday(q.week_start)?;
    let entries = repo::list_entries_with_dishes(&state.db, q.workspace_id, q.week_start)
        .await
        .map_err(internal)?;
    Ok(Json(SummaryResponse {
        total_cost: aggregate::total_cost(&entries),
        total_kcal: aggregate::total(&entries, Nutrient::Kcal),
        protein_buckets: aggregate::protein_buckets(&entries),
    }))
}

#[instrument(skip(state))]
pub async fn chart(
    State(state): State<AppState>,
    Query(q): Query<ChartQuery>,
) -> Result<Json<Vec<DaySeries>>, (StatusCode, String)> {
    ensure_monday(q.week_start)?;
    let entries = repo::list_entries_with_dishes(&state.db, q.workspace_id, q.week_start)
        .await
        .map_err(internal)?;
    Ok(Json(aggregate::daily_chart_series(
        &entries,
        q.metric,
        q.daily_limit,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slot_ref_uuid_vs_legacy() {
        let id = Uuid::new_v4();
        assert_eq!(parse_slot_ref(&id.to_string()), Some(SlotRef::Custom(id)));
        assert_eq!(
            parse_slot_ref("breakfast"),
            Some(SlotRef::Legacy(LegacySlot::Breakfast))
        );
        assert_eq!(
            parse_slot_ref("dinner"),
            Some(SlotRef::Legacy(LegacySlot::Dinner))
        );
        assert_eq!(parse_slot_ref("brunch"), None);
        assert_eq!(parse_slot_ref(""), None);
    }
}
