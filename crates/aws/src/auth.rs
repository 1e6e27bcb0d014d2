use aws_sdk_s3::config::Credentials;
use tracing::{debug, info};

use crate::config::AwsBaseConfig;

/// Build an AWS SDK configuration from the given [`AwsBaseConfig`].
///
/// Static credentials take precedence over the environment credential chain.
/// The endpoint override, when present, applies to every service client built
/// from the returned config.
pub async fn build_sdk_config(config: &AwsBaseConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::from_env().region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    if let Some((key, secret)) = config.static_credentials() {
        info!(access_key = %key, "using static AWS credentials");
        loader = loader.credentials_provider(Credentials::new(key, secret, None, None, "upd-static"));
    }

    loader.load().await
}

/// Build an S3 client, applying S3-specific options on top of the shared SDK
/// configuration.
pub async fn build_s3_client(config: &AwsBaseConfig) -> aws_sdk_s3::Client {
    let sdk_config = build_sdk_config(config).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    // The SDK needs a root certificate store to load; only run these in
    // integration mode.

    #[tokio::test]
    async fn build_sdk_config_sets_region() {
        let config = AwsBaseConfig::new("ap-northeast-1");
        let sdk_config = build_sdk_config(&config).await;
        assert_eq!(
            sdk_config.region().map(|r| r.as_ref()),
            Some("ap-northeast-1")
        );
    }

    #[tokio::test]
    async fn build_sdk_config_with_static_credentials() {
        let config = AwsBaseConfig::new("us-west-2")
            .with_static_credentials("AKIA", "secret")
            .with_endpoint_url("http://localhost:9000");
        let sdk_config = build_sdk_config(&config).await;
        assert!(sdk_config.credentials_provider().is_some());
    }
}
