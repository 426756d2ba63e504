//! AWS adapter for vpcflow
//!
//! Implements [`vpcflow_cloud::ControlPlane`] on top of the EC2 SDK.
//! Credentials come from the default AWS provider chain
//! (environment, shared profile, instance metadata).

pub mod error;
pub mod provider;

pub use error::{is_throttling, sdk_error};
pub use provider::{AwsControlPlane, AwsNetworkApi};
