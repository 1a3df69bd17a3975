use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Report letterhead data, one row per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NutritionistProfile {
    pub workspace_id: Uuid,
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub logo_url: Option<String>,
    pub updated_at: OffsetDateTime,
}

pub async fn get_profile(
    db: &PgPool,
    workspace_id: Uuid,
) -> anyhow::Result<Option<NutritionistProfile>> {
    let row = sqlx::query_as::<_, NutritionistProfile>(
        r#"
        SELECT workspace_id, name, license_number, logo_url, updated_at
        FROM nutritionist_profiles
        WHERE workspace_id = $1
        "#,
    )
    .bind(workspace_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn upsert_profile(
    db: &PgPool,
    workspace_id: Uuid,
    name: Option<&str>,
    license_number: Option<&str>,
    logo_url: Option<&str>,
) -> anyhow::Result<NutritionistProfile> {
    let row = sqlx::query_as::<_, NutritionistProfile>(
        r#"
        INSERT INTO nutritionist_profiles (workspace_id, name, license_number, logo_url, updated_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (workspace_id) DO UPDATE SET
            name = EXCLUDED.name,
            license_number = EXCLUDED.license_number,
            logo_url = EXCLUDED.logo_url,
            updated_at = now()
        RETURNING workspace_id, name, license_number, logo_url, updated_at
        "#,
    )
    .bind(workspace_id)
    .bind(name)
    .bind(license_number)
    .bind(logo_url)
    .fetch_one(db)
    .await?;
    Ok(row)
}
