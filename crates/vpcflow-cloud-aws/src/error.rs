//! EC2 SDK error mapping

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use vpcflow_cloud::CloudError;

/// Error codes EC2 returns when a caller exceeds its request rate
const THROTTLING_CODES: [&str; 4] = [
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
];

/// Error codes meaning the credentials are missing or not allowed
const AUTH_CODES: [&str; 4] = [
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
];

pub(crate) const PEERING_NOT_FOUND: &str = "InvalidVpcPeeringConnectionID.NotFound";

pub fn is_throttling(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

/// Classify an SDK error into the provider-neutral taxonomy
pub fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };

    classify(operation, code, message)
}

pub(crate) fn classify(operation: &str, code: String, message: String) -> CloudError {
    if is_throttling(&code) {
        CloudError::Throttled {
            operation: operation.to_string(),
            attempts: 1,
            message,
        }
    } else if AUTH_CODES.contains(&code.as_str()) {
        CloudError::AuthenticationFailed(format!("{} ({}): {}", operation, code, message))
    } else {
        CloudError::rejected(operation, code, message)
    }
}

/// An identifier the API promised but did not return
pub(crate) fn missing_id(operation: &str, field: &str) -> CloudError {
    CloudError::InconsistentState(format!("{} returned no {}", operation, field))
}
