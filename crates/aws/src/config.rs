use serde::{Deserialize, Serialize};

/// Connection settings shared by every AWS client upd builds.
///
/// When both `access_key` and `access_secret` are set they are used as static
/// credentials; otherwise the SDK's environment credential chain applies.
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsBaseConfig {
    /// AWS region (e.g. `"eu-west-1"`).
    pub region: String,

    /// Static access key ID.
    #[serde(default)]
    pub access_key: Option<String>,

    /// Static secret access key.
    #[serde(default)]
    pub access_secret: Option<String>,

    /// Optional endpoint URL override for S3-compatible stores (e.g. `MinIO`).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Address buckets by path instead of virtual host. Most self-hosted
    /// S3-compatible stores require this.
    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for AwsBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBaseConfig")
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field(
                "access_secret",
                &self.access_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl AwsBaseConfig {
    /// Create a new `AwsBaseConfig` with the given region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            access_key: None,
            access_secret: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Use static credentials instead of the environment chain.
    #[must_use]
    pub fn with_static_credentials(
        mut self,
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.access_secret = Some(access_secret.into());
        self
    }

    /// Set an endpoint URL override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Enable path-style bucket addressing.
    #[must_use]
    pub fn with_force_path_style(mut self, force: bool) -> Self {
        self.force_path_style = force;
        self
    }

    /// The static credential pair, if both halves are configured and non-empty.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (self.access_key.as_deref(), self.access_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key, secret))
            }
            _ => None,
        }
    }
}

impl Default for AwsBaseConfig {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_sets_region() {
        let config = AwsBaseConfig::new("eu-west-1");
        assert_eq!(config.region, "eu-west-1");
        assert!(config.static_credentials().is_none());
        assert!(config.endpoint_url.is_none());
        assert!(!config.force_path_style);
    }

    #[test]
    fn static_credentials_need_both_halves() {
        let config = AwsBaseConfig::new("us-east-1").with_static_credentials("AKIA", "s3cr3t");
        assert_eq!(config.static_credentials(), Some(("AKIA", "s3cr3t")));

        let mut partial = config.clone();
        partial.access_secret = Some(String::new());
        assert!(partial.static_credentials().is_none());

        partial.access_secret = None;
        assert!(partial.static_credentials().is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AwsBaseConfig::new("us-east-1").with_static_credentials("AKIA", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("AKIA"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: AwsBaseConfig = serde_json::from_str(r#"{"region": "ap-south-1"}"#).unwrap();
        assert_eq!(config.region, "ap-south-1");
        assert!(config.access_key.is_none());
        assert!(!config.force_path_style);
    }
}
