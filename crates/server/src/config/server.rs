use std::fmt;

use serde::Deserialize;

/// HTTP server bind configuration.
#[derive(Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix every route is mounted under (e.g. `"/upd"`). Empty
    /// mounts the routes at the root.
    #[serde(default)]
    pub route: String,
    /// Shared secret expected in the `X-upd-key` header. Empty disables
    /// authentication.
    #[serde(default)]
    pub secret_key: String,
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Maximum time to wait for the sweeper and in-flight requests during
    /// shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl ServerConfig {
    /// The route prefix with a single leading slash and no trailing slash,
    /// or an empty string when routes are mounted at the root.
    pub fn route_prefix(&self) -> String {
        let trimmed = self.route.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            route: String::new(),
            secret_key: String::new(),
            max_upload_bytes: default_max_upload_bytes(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("route", &self.route)
            .field(
                "secret_key",
                &if self.secret_key.is_empty() { "" } else { "[REDACTED]" },
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("shutdown_timeout_seconds", &self.shutdown_timeout_seconds)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    9000
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_shutdown_timeout() -> u64 {
    30
}
