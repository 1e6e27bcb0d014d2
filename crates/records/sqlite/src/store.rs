use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info, warn};

use upd_core::Record;
use upd_records::error::RecordError;
use upd_records::store::{MEDIUM_SLOT, RECENT_LIMIT, RecordStore};

use crate::config::SqliteConfig;
use crate::migrations;

/// SQLite-backed implementation of [`RecordStore`].
///
/// Records are stored as JSON documents keyed by identifier. The recency
/// index is a separate table ordered by an autoincrementing sequence, and
/// `put`/`delete` touch both tables inside one transaction. The database runs
/// in WAL mode so readers never block on the single writer.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    config: Arc<SqliteConfig>,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn backend_error(e: sqlx::Error) -> RecordError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RecordError::Connection(e.to_string())
        }
        other => RecordError::Backend(other.to_string()),
    }
}

fn encode(record: &Record) -> Result<String, RecordError> {
    serde_json::to_string(record).map_err(|e| RecordError::Serialization(e.to_string()))
}

/// Decode stored rows, skipping (and logging) any that no longer parse.
fn decode_rows(rows: Vec<(String,)>) -> Vec<Record> {
    rows.into_iter()
        .filter_map(|(body,)| match serde_json::from_str::<Record>(&body) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping undecodable record");
                None
            }
        })
        .collect()
}

impl SqliteRecordStore {
    /// Open (or create) the database file named by `config`.
    ///
    /// Runs an integrity check and the schema migrations. A file that is not
    /// a database, or that fails the check, yields [`RecordError::Corrupt`].
    pub async fn open(config: SqliteConfig) -> Result<Self, RecordError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecordError::Connection(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("not a database") {
                    RecordError::Corrupt(message)
                } else {
                    RecordError::Connection(message)
                }
            })?;

        Self::from_pool(pool, config).await
    }

    /// Create a `SqliteRecordStore` from an existing pool. Runs the integrity
    /// check and migrations on creation.
    pub async fn from_pool(pool: SqlitePool, config: SqliteConfig) -> Result<Self, RecordError> {
        let (verdict,): (String,) = sqlx::query_as("PRAGMA quick_check")
            .fetch_one(&pool)
            .await
            .map_err(|e| RecordError::Corrupt(e.to_string()))?;
        if verdict != "ok" {
            return Err(RecordError::Corrupt(verdict));
        }

        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| RecordError::Backend(e.to_string()))?;

        info!(path = %config.path.display(), "record store opened");
        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// Close the connection pool, checkpointing the write-ahead log.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn bind_medium(&self, medium: &str) -> Result<(), RecordError> {
        let meta = self.config.meta_table();

        let insert = format!("INSERT OR IGNORE INTO {meta} (key, value) VALUES (?1, ?2)");
        sqlx::query(&insert)
            .bind(MEDIUM_SLOT)
            .bind(medium)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        match self.medium().await? {
            Some(stored) if stored == medium => Ok(()),
            Some(stored) => Err(RecordError::MediumMismatch {
                stored,
                configured: medium.to_owned(),
            }),
            None => Err(RecordError::Backend(
                "storage medium slot missing after insert".into(),
            )),
        }
    }

    async fn medium(&self) -> Result<Option<String>, RecordError> {
        let meta = self.config.meta_table();
        let query = format!("SELECT value FROM {meta} WHERE key = ?1");
        let row: Option<(String,)> = sqlx::query_as(&query)
            .bind(MEDIUM_SLOT)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(row.map(|(v,)| v))
    }

    async fn put(&self, record: &Record) -> Result<(), RecordError> {
        let records = self.config.records_table();
        let recent = self.config.recent_table();
        let body = encode(record)?;

        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        let insert = format!(
            "INSERT INTO {records} (id, body, created_at_us, expires_at_us) VALUES (?1, ?2, ?3, ?4)"
        );
        sqlx::query(&insert)
            .bind(&record.id)
            .bind(&body)
            .bind(record.created_at.timestamp_micros())
            .bind(record.expires_at.map(|t| t.timestamp_micros()))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(|d| d.is_unique_violation())
                {
                    RecordError::AlreadyExists(record.id.clone())
                } else {
                    backend_error(e)
                }
            })?;

        let push = format!("INSERT OR REPLACE INTO {recent} (id) VALUES (?1)");
        sqlx::query(&push)
            .bind(&record.id)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        let trim = format!(
            "DELETE FROM {recent} WHERE seq NOT IN \
             (SELECT seq FROM {recent} ORDER BY seq DESC LIMIT ?1)"
        );
        sqlx::query(&trim)
            .bind(i64::try_from(RECENT_LIMIT).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        tx.commit().await.map_err(backend_error)?;
        debug!(id = %record.id, "record stored");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, RecordError> {
        let records = self.config.records_table();
        let query = format!("SELECT body FROM {records} WHERE id = ?1");
        let row: Option<(String,)> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)?;

        row.map(|(body,)| {
            serde_json::from_str(&body).map_err(|e| RecordError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn contains(&self, id: &str) -> Result<bool, RecordError> {
        let records = self.config.records_table();
        let query = format!("SELECT 1 FROM {records} WHERE id = ?1");
        let row: Option<(i64,)> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(row.is_some())
    }

    async fn delete(&self, id: &str) -> Result<bool, RecordError> {
        let records = self.config.records_table();
        let recent = self.config.recent_table();

        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        let delete_record = format!("DELETE FROM {records} WHERE id = ?1");
        let result = sqlx::query(&delete_record)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        let delete_recent = format!("DELETE FROM {recent} WHERE id = ?1");
        sqlx::query(&delete_recent)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        tx.commit().await.map_err(backend_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recent(&self) -> Result<Vec<Record>, RecordError> {
        let records = self.config.records_table();
        let recent = self.config.recent_table();
        let query = format!(
            "SELECT r.body FROM {recent} i JOIN {records} r ON r.id = i.id \
             ORDER BY i.seq DESC LIMIT ?1"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .bind(i64::try_from(RECENT_LIMIT).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(decode_rows(rows))
    }

    async fn scan_all(&self) -> Result<Vec<Record>, RecordError> {
        let records = self.config.records_table();
        let query = format!("SELECT body FROM {records}");
        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(decode_rows(rows))
    }

    async fn scan_expired(&self, now: DateTime<Utc>) -> Result<Vec<Record>, RecordError> {
        let records = self.config.records_table();
        let query = format!(
            "SELECT body FROM {records} \
             WHERE expires_at_us IS NOT NULL AND expires_at_us < ?1"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .bind(now.timestamp_micros())
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(decode_rows(rows))
    }

    async fn count(&self) -> Result<usize, RecordError> {
        let records = self.config.records_table();
        let query = format!("SELECT COUNT(*) FROM {records}");
        let (count,): (i64,) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
