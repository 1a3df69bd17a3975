use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo::{DayOfWeek, LegacySlot, MealSlot};
use crate::report::aggregate::Nutrient;

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub workspace_id: Uuid,
    pub week_start: Date,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub workspace_id: Uuid,
    pub week_start: Option<Date>,
}

/// One planner column. Custom slots carry their row id; fallback slots only
/// a legacy key.
#[derive(Debug, Serialize)]
pub struct SlotItem {
    pub id: Option<Uuid>,
    pub key: Option<LegacySlot>,
    pub name: String,
    pub sort_order: i32,
    pub is_default: bool,
}

impl SlotItem {
    pub fn fallback(key: LegacySlot, sort_order: i32) -> Self {
        Self {
            id: None,
            key: Some(key),
            name: key.label_es().to_string(),
            sort_order,
            is_default: true,
        }
    }
}

impl From<MealSlot> for SlotItem {
    fn from(s: MealSlot) -> Self {
        Self {
            id: Some(s.id),
            key: None,
            name: s.name,
            sort_order: s.sort_order,
            is_default: s.is_default,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub fallback: bool,
    pub slots: Vec<SlotItem>,
    pub hidden_slot_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub workspace_id: Uuid,
    pub name: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: i32,
}

fn default_sort_order() -> i32 {
    99
}

#[derive(Debug, Deserialize)]
pub struct HideSlotRequest {
    pub workspace_id: Uuid,
    pub meal_slot_id: Uuid,
    pub week_start: Date,
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub workspace_id: Uuid,
    pub dish_id: Uuid,
    pub week_start: Date,
    pub day_of_week: DayOfWeek,
    /// Either a meal-slot uuid or a legacy key (breakfast/lunch/dinner).
    pub slot: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub workspace_id: Uuid,
    pub week_start: Date,
    #[serde(default = "default_metric")]
    pub metric: Nutrient,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: f64,
}

fn default_metric() -> Nutrient {
    Nutrient::Kcal
}

fn default_daily_limit() -> f64 {
    2000.0
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total_cost: f64,
    pub total_kcal: f64,
    pub protein_buckets: Vec<crate::report::aggregate::ProteinBucket>,
}
