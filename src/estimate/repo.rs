use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// The eleven nutrition fields tracked per ingredient. Also the shape of a
/// `nutrition_cache` row minus its key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NutritionValues {
    pub kcal: f64,
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
}

#[derive(Debug, FromRow)]
struct CacheRow {
    cache_key: String,
    #[sqlx(flatten)]
    values: NutritionValues,
}

/// Batched cache lookup. Returns only the keys that were found.
pub async fn fetch_cached(
    db: &PgPool,
    keys: &[String],
) -> anyhow::Result<HashMap<String, NutritionValues>> {
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, CacheRow>(
        r#"
        SELECT cache_key, kcal, protein_g, carbs_g, fat_g, fiber_g, sodium_mg,
               vitamin_c_mg, vitamin_d_ui, calcium_mg, iron_mg, potassium_mg
        FROM nutrition_cache
        WHERE cache_key = ANY($1)
        "#,
    )
    .bind(keys)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|r| (r.cache_key, r.values)).collect())
}

/// Insert-or-replace one cache entry. Concurrent writers race harmlessly:
/// last write wins and the values are supposed to be equal.
pub async fn upsert_cache(
    db: &PgPool,
    cache_key: &str,
    v: &NutritionValues,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO nutrition_cache
            (cache_key, kcal, protein_g, carbs_g, fat_g, fiber_g, sodium_mg,
             vitamin_c_mg, vitamin_d_ui, calcium_mg, iron_mg, potassium_mg)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (cache_key) DO UPDATE SET
            kcal = EXCLUDED.kcal,
            protein_g = EXCLUDED.protein_g,
            carbs_g = EXCLUDED.carbs_g,
            fat_g = EXCLUDED.fat_g,
            fiber_g = EXCLUDED.fiber_g,
            sodium_mg = EXCLUDED.sodium_mg,
            vitamin_c_mg = EXCLUDED.vitamin_c_mg,
            vitamin_d_ui = EXCLUDED.vitamin_d_ui,
            calcium_mg = EXCLUDED.calcium_mg,
            iron_mg = EXCLUDED.iron_mg,
            potassium_mg = EXCLUDED.potassium_mg
        "#,
    )
    .bind(cache_key)
    .bind(v.kcal)
    .bind(v.protein_g)
    .bind(v.carbs_g)
    .bind(v.fat_g)
    .bind(v.fiber_g)
    .bind(v.sodium_mg)
    .bind(v.vitamin_c_mg)
    .bind(v.vitamin_d_ui)
    .bind(v.calcium_mg)
    .bind(v.iron_mg)
    .bind(v.potassium_mg)
    .execute(db)
    .await?;
    Ok(())
}

/// Write resolved values onto the ingredient row. `estimated_at` marks the
/// row as estimated, so a genuine zero-calorie result is distinguishable
/// from "never estimated".
pub async fn apply_to_ingredient(
    db: &PgPool,
    ingredient_id: Uuid,
    v: &NutritionValues,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE ingredients SET
            estimated_kcal = $2,
            protein_g = $3,
            carbs_g = $4,
            fat_g = $5,
            fiber_g = $6,
            sodium_mg = $7,
            vitamin_c_mg = $8,
            vitamin_d_ui = $9,
            calcium_mg = $10,
            iron_mg = $11,
            potassium_mg = $12,
            estimated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(ingredient_id)
    .bind(v.kcal)
    .bind(v.protein_g)
    .bind(v.carbs_g)
    .bind(v.fat_g)
    .bind(v.fiber_g)
    .bind(v.sodium_mg)
    .bind(v.vitamin_c_mg)
    .bind(v.vitamin_d_ui)
    .bind(v.calcium_mg)
    .bind(v.iron_mg)
    .bind(v.potassium_mg)
    .execute(db)
    .await?;
    Ok(())
}
