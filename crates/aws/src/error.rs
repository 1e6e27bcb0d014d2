use thiserror::Error;
use upd_blob::BlobError;

/// Errors specific to AWS operations.
#[derive(Debug, Error)]
pub enum AwsError {
    /// The AWS SDK returned an error from the service.
    #[error("AWS service error: {0}")]
    ServiceError(String),

    /// The request was throttled by the AWS service.
    #[error("AWS request throttled")]
    Throttled,

    /// A network or connection error occurred communicating with AWS.
    #[error("AWS connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("AWS request timed out")]
    Timeout,

    /// AWS credential resolution failed.
    #[error("credential error: {0}")]
    CredentialError(String),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl From<AwsError> for BlobError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Connection(_) | AwsError::Timeout | AwsError::Throttled => {
                BlobError::Connection(err.to_string())
            }
            AwsError::ServiceError(_)
            | AwsError::CredentialError(_)
            | AwsError::Configuration(_) => BlobError::Storage(err.to_string()),
        }
    }
}

/// Classify an AWS SDK error string into the appropriate [`AwsError`].
pub fn classify_sdk_error(error_str: &str) -> AwsError {
    let lower = error_str.to_lowercase();
    if lower.contains("throttl") || lower.contains("rate exceed") || lower.contains("slow down") {
        AwsError::Throttled
    } else if lower.contains("timeout") || lower.contains("timed out") {
        AwsError::Timeout
    } else if lower.contains("credential") || lower.contains("accessdenied") {
        AwsError::CredentialError(error_str.to_owned())
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("network")
        || lower.contains("dispatch failure")
    {
        AwsError::Connection(error_str.to_owned())
    } else {
        AwsError::ServiceError(error_str.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_throttled() {
        assert!(matches!(
            classify_sdk_error("SlowDown: Please reduce your request rate"),
            AwsError::Throttled
        ));
    }

    #[test]
    fn classify_timeout() {
        assert!(matches!(
            classify_sdk_error("Request timed out after 30s"),
            AwsError::Timeout
        ));
    }

    #[test]
    fn classify_connection() {
        assert!(matches!(
            classify_sdk_error("dispatch failure: io error: Connection refused"),
            AwsError::Connection(_)
        ));
    }

    #[test]
    fn classify_credentials() {
        assert!(matches!(
            classify_sdk_error("AccessDenied: Access Denied"),
            AwsError::CredentialError(_)
        ));
    }

    #[test]
    fn classify_generic_service_error() {
        assert!(matches!(
            classify_sdk_error("NoSuchBucket: The specified bucket does not exist"),
            AwsError::ServiceError(_)
        ));
    }

    #[test]
    fn network_errors_map_to_connection() {
        let err: BlobError = AwsError::Timeout.into();
        assert!(matches!(err, BlobError::Connection(_)));
        let err: BlobError = AwsError::Connection("reset".into()).into();
        assert!(matches!(err, BlobError::Connection(_)));
    }

    #[test]
    fn service_errors_map_to_storage() {
        let err: BlobError = AwsError::ServiceError("bad bucket".into()).into();
        assert!(matches!(err, BlobError::Storage(msg) if msg.contains("bad bucket")));
    }
}
