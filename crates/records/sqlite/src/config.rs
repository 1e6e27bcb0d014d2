use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the SQLite record store.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path of the database file. Created on first start.
    pub path: PathBuf,

    /// Maximum number of connections in the `sqlx` connection pool.
    pub pool_size: u32,

    /// How long a writer waits for a competing writer's lock.
    pub busy_timeout: Duration,

    /// Prefix applied to table names (e.g. `"upd_"`).
    pub table_prefix: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("upd.db"),
            pool_size: 5,
            busy_timeout: Duration::from_secs(5),
            table_prefix: String::from("upd_"),
        }
    }
}

impl SqliteConfig {
    /// Configuration for a database file at `path`, other settings default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub(crate) fn records_table(&self) -> String {
        format!("{}records", self.table_prefix)
    }

    pub(crate) fn recent_table(&self) -> String {
        format!("{}recent", self.table_prefix)
    }

    pub(crate) fn meta_table(&self) -> String {
        format!("{}meta", self.table_prefix)
    }
}
