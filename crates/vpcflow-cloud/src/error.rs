//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider declined a request (bad parameter, quota, permission)
    #[error("{operation} rejected by provider ({code}): {message}")]
    Rejected {
        operation: String,
        code: String,
        message: String,
    },

    /// Rate limited and the retry budget ran out
    #[error("{operation} throttled after {attempts} attempts: {message}")]
    Throttled {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Timed out waiting for {resource} {id} to become available ({attempts} polls)")]
    WaitTimeout {
        resource: String,
        id: String,
        attempts: u32,
    },

    #[error("{resource} {id} entered a failed state: {reason}")]
    ResourceFailed {
        resource: String,
        id: String,
        reason: String,
    },

    /// Remote state diverged from what the pipeline guarantees
    #[error("Inconsistent remote state: {0}")]
    InconsistentState(String),

    /// The peering request exists but could not be accepted.
    /// The request is left dangling and must be retried or removed manually.
    #[error("Peering connection {peering_id} could not be accepted: {message}")]
    PeeringAcceptance { peering_id: String, message: String },

    #[error("Cancelled before {0}")]
    Cancelled(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by the orchestrator and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote rejection (including exhausted throttling retries)
    Rejection,
    /// A waited-for resource never became available
    Timeout,
    /// Expected remote association or identifier missing
    Inconsistent,
    /// Recoverable operational condition (dangling peering, cancellation)
    Operational,
    /// Local configuration or credentials
    Config,
}

impl CloudError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Rejected { .. } | CloudError::Throttled { .. } => ErrorKind::Rejection,
            CloudError::WaitTimeout { .. } | CloudError::ResourceFailed { .. } => {
                ErrorKind::Timeout
            }
            CloudError::InconsistentState(_) => ErrorKind::Inconsistent,
            CloudError::PeeringAcceptance { .. } | CloudError::Cancelled(_) => {
                ErrorKind::Operational
            }
            CloudError::AuthenticationFailed(_)
            | CloudError::InvalidConfig(_)
            | CloudError::Json(_) => ErrorKind::Config,
        }
    }

    /// Whether re-running the failed stage can reasonably succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CloudError::WaitTimeout { .. }
                | CloudError::Throttled { .. }
                | CloudError::PeeringAcceptance { .. }
        )
    }

    pub fn rejected(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CloudError::Rejected {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
