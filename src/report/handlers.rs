use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use serde::Deserialize;
use time::{Date, Duration, OffsetDateTime, Weekday};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::aggregate::WeeklyReferences;
use super::pdf::{self, ReportOptions};
use super::repo;
use crate::planner::repo::list_entries_with_dishes;
use crate::profile::repo::get_profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/reports/nutrition", get(nutrition_report))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub workspace_id: Uuid,
    pub week_start: Date,
    #[serde(default)]
    pub requested_by: Option<String>,
}

/// Renders the full 5-page weekly report and streams it back as a PDF
/// attachment. All-or-nothing: a render failure answers 500 with no body.
#[instrument(skip(state))]
pub async fn nutrition_report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Result<(HeaderMap, Vec<u8>), (StatusCode, String)> {
    if q.week_start.weekday() != Weekday::Monday {
        warn!(week_start = %q.week_start, "week_start is not a Monday");
        return Err((
            StatusCode::BAD_REQUEST,
            "week_start must be a Monday".into(),
        ));
    }
    let week_end = q.week_start + Duration::days(6);

    let workspace_name = repo::workspace_name(&state.db, q.workspace_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Workspace not found".into()))?;

    let entries = list_entries_with_dishes(&state.db, q.workspace_id, q.week_start)
        .await
        .map_err(internal)?;
    let nutritionist = get_profile(&state.db, q.workspace_id)
        .await
        .map_err(internal)?;

    let opts = ReportOptions {
        entries: &entries,
        week_start: q.week_start,
        week_end,
        workspace_name: &workspace_name,
        requested_by: q.requested_by.as_deref().unwrap_or(""),
        nutritionist: nutritionist.as_ref(),
        refs: WeeklyReferences::default(),
        generated_on: OffsetDateTime::now_utc().date(),
    };

    let bytes = pdf::render(&opts).map_err(internal)?;
    let filename = pdf::report_filename(&workspace_name, q.week_start, week_end);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/pdf"),
    );
    let disposition = format!("attachment; filename=\"{filename}\"")
        .parse()
        .map_err(|e| internal(anyhow::anyhow!("content-disposition header: {e}")))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok((headers, bytes))
}
