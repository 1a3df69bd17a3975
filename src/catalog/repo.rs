use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProteinType {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dish {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub protein_type_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub dish_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub estimated_cost: f64,
    pub estimated_kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
    pub vitamin_c_mg: f64,
    pub vitamin_d_ui: f64,
    pub calcium_mg: f64,
    pub iron_mg: f64,
    pub potassium_mg: f64,
    pub estimated_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// A dish with its joined protein type and ingredient list, the shape the
/// planner and the report both read.
#[derive(Debug, Clone, Serialize)]
pub struct DishDetails {
    #[serde(flatten)]
    pub dish: Dish,
    pub protein_type: Option<ProteinType>,
    pub ingredients: Vec<Ingredient>,
}

// --- protein types ---

pub async fn list_protein_types(db: &PgPool, workspace_id: Uuid) -> anyhow::Result<Vec<ProteinType>> {
    let rows = sqlx::query_as::<_, ProteinType>(
        r#"
        SELECT id, workspace_id, name, color, created_at
        FROM protein_types
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(workspace_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_protein_type(
    db: &PgPool,
    workspace_id: Uuid,
    name: &str,
    color: &str,
) -> anyhow::Result<ProteinType> {
    let row = sqlx::query_as::<_, ProteinType>(
        r#"
        INSERT INTO protein_types (workspace_id, name, color)
        VALUES ($1, $2, $3)
        RETURNING id, workspace_id, name, color, created_at
        "#,
    )
    .bind(workspace_id)
    .bind(name)
    .bind(color)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_protein_type(
    db: &PgPool,
    id: Uuid,
    name: &str,
    color: &str,
) -> anyhow::Result<Option<ProteinType>> {
    let row = sqlx::query_as::<_, ProteinType>(
        r#"
        UPDATE protein_types SET name = $2, color = $3
        WHERE id = $1
        RETURNING id, workspace_id, name, color, created_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(color)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn count_dishes_for_protein_type(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as(r#"SELECT COUNT(*) FROM dishes WHERE protein_type_id = $1"#)
            .bind(id)
            .fetch_one(db)
            .await?;
    Ok(count)
}

pub async fn delete_protein_type(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM protein_types WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// --- dishes ---

pub async fn list_dishes(db: &PgPool, workspace_id: Uuid) -> anyhow::Result<Vec<DishDetails>> {
    let dishes = sqlx::query_as::<_, Dish>(
        r#"
        SELECT id, workspace_id, protein_type_id, name, description, created_at
        FROM dishes
        WHERE workspace_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(workspace_id)
    .fetch_all(db)
    .await?;
    attach_details(db, dishes).await
}

pub async fn get_dish(db: &PgPool, id: Uuid) -> anyhow::Result<Option<DishDetails>> {
    let dish = sqlx::query_as::<_, Dish>(
        r#"
        SELECT id, workspace_id, protein_type_id, name, description, created_at
        FROM dishes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    let Some(dish) = dish else { return Ok(None) };
    Ok(attach_details(db, vec![dish]).await?.into_iter().next())
}

/// Hydrate dishes with their protein types and ingredients in two batched
/// reads instead of one query per dish.
pub async fn attach_details(db: &PgPool, dishes: Vec<Dish>) -> anyhow::Result<Vec<DishDetails>> {
    if dishes.is_empty() {
        return Ok(Vec::new());
    }
    let dish_ids: Vec<Uuid> = dishes.iter().map(|d| d.id).collect();
    let pt_ids: Vec<Uuid> = dishes.iter().filter_map(|d| d.protein_type_id).collect();

    let protein_types = if pt_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, ProteinType>(
            r#"
            SELECT id, workspace_id, name, color, created_at
            FROM protein_types
            WHERE id = ANY($1)
            "#,
        )
        .bind(&pt_ids)
        .fetch_all(db)
        .await?
    };

    let ingredients = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, dish_id, name, quantity, unit, estimated_cost, estimated_kcal,
               protein_g, carbs_g, fat_g, fiber_g, sodium_mg, vitamin_c_mg,
               vitamin_d_ui, calcium_mg, iron_mg, potassium_mg, estimated_at, created_at
        FROM ingredients
        WHERE dish_id = ANY($1)
        ORDER BY created_at
        "#,
    )
    .bind(&dish_ids)
    .fetch_all(db)
    .await?;

    Ok(dishes
        .into_iter()
        .map(|dish| {
            let protein_type = dish
                .protein_type_id
                .and_then(|id| protein_types.iter().find(|pt| pt.id == id).cloned());
            let ingredients = ingredients
                .iter()
                .filter(|i| i.dish_id == dish.id)
                .cloned()
                .collect();
            DishDetails {
                dish,
                protein_type,
                ingredients,
            }
        })
        .collect())
}

pub struct NewIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub estimated_cost: f64,
}

pub async fn create_dish(
    db: &PgPool,
    workspace_id: Uuid,
    protein_type_id: Option<Uuid>,
    name: &str,
    description: Option<&str>,
    ingredients: Vec<NewIngredient>,
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await?;
    let (dish_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO dishes (workspace_id, protein_type_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(workspace_id)
    .bind(protein_type_id)
    .bind(name)
    .bind(description)
    .fetch_one(&mut *tx)
    .await?;
    insert_ingredients_tx(&mut tx, dish_id, ingredients).await?;
    tx.commit().await?;
    Ok(dish_id)
}

/// Dish edits replace the ingredient list wholesale. Nutrition resets to
/// zero and `estimated_at` to NULL: the new rows are re-estimated afterwards.
pub async fn update_dish(
    db: &PgPool,
    id: Uuid,
    protein_type_id: Option<Uuid>,
    name: &str,
    description: Option<&str>,
    ingredients: Vec<NewIngredient>,
) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;
    let updated = sqlx::query(
        r#"
        UPDATE dishes SET protein_type_id = $2, name = $3, description = $4
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(protein_type_id)
    .bind(name)
    .bind(description)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(r#"DELETE FROM ingredients WHERE dish_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_ingredients_tx(&mut tx, id, ingredients).await?;
    tx.commit().await?;
    Ok(true)
}

async fn insert_ingredients_tx(
    tx: &mut Transaction<'_, Postgres>,
    dish_id: Uuid,
    ingredients: Vec<NewIngredient>,
) -> anyhow::Result<()> {
    for ing in ingredients {
        sqlx::query(
            r#"
            INSERT INTO ingredients (dish_id, name, quantity, unit, estimated_cost)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(dish_id)
        .bind(&ing.name)
        .bind(ing.quantity)
        .bind(&ing.unit)
        .bind(ing.estimated_cost)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn delete_dish(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    // Cascades to ingredients and week plan entries.
    let result = sqlx::query(r#"DELETE FROM dishes WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
