use anyhow::Result;
use sqlx::SqlitePool;

/// Create the note record table. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One row per note; `document` holds the record JSON as written.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            snapid TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
