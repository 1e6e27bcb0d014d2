mod background;
mod records;
mod server;
mod storage;
mod telemetry;
mod tls;

#[cfg(test)]
mod tests;

pub use background::*;
pub use records::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;
pub use tls::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the upd server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct UpdConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob backend selection.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Record store selection.
    #[serde(default)]
    pub records: RecordsConfig,
    /// Expiry sweep.
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

impl UpdConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ServerError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`. A missing file yields the defaults;
    /// the returned flag tells whether the file existed.
    pub fn load(path: &Path) -> Result<(Self, bool), ServerError> {
        if !path.exists() {
            return Ok((Self::from_toml("")?, false));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok((Self::from_toml(&contents)?, true))
    }

    /// Reject settings that cannot work before any resource is opened.
    pub fn validate(&self) -> Result<(), ServerError> {
        match self.storage.backend.as_str() {
            "fs" => {
                if self.storage.fs.output_dir.trim().is_empty() {
                    return Err(ServerError::Config(
                        "storage.fs.output_dir must not be empty".into(),
                    ));
                }
            }
            "s3" => {
                if self.storage.s3.bucket.trim().is_empty() {
                    return Err(ServerError::Config(
                        "storage.s3.bucket is required for the s3 backend".into(),
                    ));
                }
                if self.storage.s3.access_key.is_some() != self.storage.s3.access_secret.is_some()
                {
                    return Err(ServerError::Config(
                        "storage.s3.access_key and access_secret must be set together".into(),
                    ));
                }
            }
            other => {
                return Err(ServerError::Config(format!(
                    "unknown storage backend {other:?}, expected \"fs\" or \"s3\""
                )));
            }
        }

        match self.records.backend.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(ServerError::Config(format!(
                    "unknown records backend {other:?}, expected \"sqlite\" or \"memory\""
                )));
            }
        }

        if self.background.enabled && self.background.sweep_interval_seconds == 0 {
            return Err(ServerError::Config(
                "background.sweep_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.tls.enabled && (self.tls.cert_path.is_none() || self.tls.key_path.is_none()) {
            return Err(ServerError::Config(
                "tls.cert_path and tls.key_path are required when TLS is enabled".into(),
            ));
        }

        Ok(())
    }
}
