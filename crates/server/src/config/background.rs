use serde::Deserialize;

/// Configuration for the background expiry sweep.
#[derive(Debug, Deserialize)]
pub struct BackgroundConfig {
    /// Whether the sweeper runs. Expired records are still retired lazily
    /// when it is off.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}
