use serde::Deserialize;

/// Configuration for the record store.
#[derive(Debug, Deserialize)]
pub struct RecordsConfig {
    /// `"sqlite"` (durable) or `"memory"` (lost on restart).
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database file for the `sqlite` backend.
    #[serde(default = "default_path")]
    pub path: String,
    /// Connection pool size for the `sqlite` backend.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_owned()
}

fn default_path() -> String {
    "upd.db".to_owned()
}

fn default_pool_size() -> u32 {
    5
}
