use sqlx::SqlitePool;

use crate::config::SqliteConfig;

/// Create the records, recency and meta tables if they do not exist.
///
/// Timestamps are stored as microseconds since the Unix epoch so the
/// expiration index compares numerically.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &SqlitePool, config: &SqliteConfig) -> Result<(), sqlx::Error> {
    let records = config.records_table();
    let recent = config.recent_table();
    let meta = config.meta_table();

    let create_records = format!(
        "CREATE TABLE IF NOT EXISTS {records} (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            created_at_us INTEGER NOT NULL,
            expires_at_us INTEGER
        )"
    );

    let create_expiry_index = format!(
        "CREATE INDEX IF NOT EXISTS {records}_expires_at
            ON {records} (expires_at_us) WHERE expires_at_us IS NOT NULL"
    );

    let create_recent = format!(
        "CREATE TABLE IF NOT EXISTS {recent} (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE
        )"
    );

    let create_meta = format!(
        "CREATE TABLE IF NOT EXISTS {meta} (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )"
    );

    sqlx::query(&create_records).execute(pool).await?;
    sqlx::query(&create_expiry_index).execute(pool).await?;
    sqlx::query(&create_recent).execute(pool).await?;
    sqlx::query(&create_meta).execute(pool).await?;

    Ok(())
}
