use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::repo::{attach_details, Dish, DishDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "day_of_week", rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn label_es(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Lunes",
            DayOfWeek::Tuesday => "Martes",
            DayOfWeek::Wednesday => "Miércoles",
            DayOfWeek::Thursday => "Jueves",
            DayOfWeek::Friday => "Viernes",
            DayOfWeek::Saturday => "Sábado",
            DayOfWeek::Sunday => "Domingo",
        }
    }

    pub fn short_label_es(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Lun",
            DayOfWeek::Tuesday => "Mar",
            DayOfWeek::Wednesday => "Mié",
            DayOfWeek::Thursday => "Jue",
            DayOfWeek::Friday => "Vie",
            DayOfWeek::Saturday => "Sáb",
            DayOfWeek::Sunday => "Dom",
        }
    }
}

/// Fixed slot triple predating per-workspace custom slots. Still written for
/// workspaces that never created their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "meal_slot", rename_all = "lowercase")]
pub enum LegacySlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl LegacySlot {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            _ => None,
        }
    }

    pub fn label_es(self) -> &'static str {
        match self {
            Self::Breakfast => "Desayuno",
            Self::Lunch => "Almuerzo",
            Self::Dinner => "Cena",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealSlot {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub is_default: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeekPlanEntry {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub dish_id: Uuid,
    pub week_start: Date,
    pub day_of_week: DayOfWeek,
    pub meal_slot: Option<LegacySlot>,
    pub meal_slot_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryWithDish {
    #[serde(flatten)]
    pub entry: WeekPlanEntry,
    pub dish: DishDetails,
}

// --- meal slots ---

pub async fn list_meal_slots(db: &PgPool, workspace_id: Uuid) -> anyhow::Result<Vec<MealSlot>> {
    let rows = sqlx::query_as::<_, MealSlot>(
        r#"
        SELECT id, workspace_id, name, sort_order, is_default, created_at
        FROM meal_slots
        WHERE workspace_id = $1
        ORDER BY sort_order, created_at
        "#,
    )
    .bind(workspace_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_meal_slot(
    db: &PgPool,
    workspace_id: Uuid,
    name: &str,
    sort_order: i32,
) -> anyhow::Result<MealSlot> {
    let row = sqlx::query_as::<_, MealSlot>(
        r#"
        INSERT INTO meal_slots (workspace_id, name, sort_order, is_default)
        VALUES ($1, $2, $3, false)
        RETURNING id, workspace_id, name, sort_order, is_default, created_at
        "#,
    )
    .bind(workspace_id)
    .bind(name)
    .bind(sort_order)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn meal_slot_exists(db: &PgPool, workspace_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as(
        r#"SELECT 1 FROM meal_slots WHERE id = $1 AND workspace_id = $2"#,
    )
    .bind(id)
    .bind(workspace_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

pub async fn hide_slot_for_week(
    db: &PgPool,
    meal_slot_id: Uuid,
    workspace_id: Uuid,
    week_start: Date,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meal_slot_hidden_weeks (meal_slot_id, workspace_id, week_start)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(meal_slot_id)
    .bind(workspace_id)
    .bind(week_start)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn hidden_slot_ids_for_week(
    db: &PgPool,
    workspace_id: Uuid,
    week_start: Date,
) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT meal_slot_id
        FROM meal_slot_hidden_weeks
        WHERE workspace_id = $1 AND week_start = $2
        "#,
    )
    .bind(workspace_id)
    .bind(week_start)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// --- week plan entries ---

/// All entries of one week with their dish, protein type and ingredients.
/// One snapshot read; safe to run while the planner is being edited.
pub async fn list_entries_with_dishes(
    db: &PgPool,
    workspace_id: Uuid,
    week_start: Date,
) -> anyhow::Result<Vec<EntryWithDish>> {
    let entries = sqlx::query_as::<_, WeekPlanEntry>(
        r#"
        SELECT id, workspace_id, dish_id, week_start, day_of_week, meal_slot,
               meal_slot_id, created_at
        FROM week_plan_entries
        WHERE workspace_id = $1 AND week_start = $2
        ORDER BY created_at
        "#,
    )
    .bind(workspace_id)
    .bind(week_start)
    .fetch_all(db)
    .await?;

    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let dish_ids: Vec<Uuid> = entries.iter().map(|e| e.dish_id).collect();
    let dishes = sqlx::query_as::<_, Dish>(
        r#"
        SELECT id, workspace_id, protein_type_id, name, description, created_at
        FROM dishes
        WHERE id = ANY($1)
        "#,
    )
    .bind(&dish_ids)
    .fetch_all(db)
    .await?;
    let details = attach_details(db, dishes).await?;

    // Entries referencing a dish that disappeared mid-read are skipped.
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            details
                .iter()
                .find(|d| d.dish.id == entry.dish_id)
                .cloned()
                .map(|dish| EntryWithDish { entry, dish })
        })
        .collect())
}

pub async fn create_entry(
    db: &PgPool,
    workspace_id: Uuid,
    dish_id: Uuid,
    week_start: Date,
    day_of_week: DayOfWeek,
    meal_slot: Option<LegacySlot>,
    meal_slot_id: Option<Uuid>,
) -> anyhow::Result<WeekPlanEntry> {
    let row = sqlx::query_as::<_, WeekPlanEntry>(
        r#"
        INSERT INTO week_plan_entries
            (workspace_id, dish_id, week_start, day_of_week, meal_slot, meal_slot_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, workspace_id, dish_id, week_start, day_of_week, meal_slot,
                  meal_slot_id, created_at
        "#,
    )
    .bind(workspace_id)
    .bind(dish_id)
    .bind(week_start)
    .bind(day_of_week)
    .bind(meal_slot)
    .bind(meal_slot_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_entry(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM week_plan_entries WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
