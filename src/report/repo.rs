use sqlx::PgPool;
use uuid::Uuid;

pub async fn workspace_name(db: &PgPool, workspace_id: Uuid) -> anyhow::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(r#"SELECT name FROM workspaces WHERE id = $1"#)
        .bind(workspace_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|(name,)| name))
}
