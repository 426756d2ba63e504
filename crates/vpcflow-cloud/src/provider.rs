//! Cloud provider trait definitions
//!
//! `ControlPlane` hands out one `NetworkApi` per region. `NetworkApi` is the
//! black-box control-plane surface the provisioning pipeline is written
//! against; every call creates or inspects exactly one remote resource.

use crate::error::Result;
use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cloud provider abstraction trait
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self, region: &str) -> Result<AuthStatus>;

    /// Get an API handle bound to a region's endpoint
    async fn region_api(&self, region: &str) -> Result<Arc<dyn NetworkApi>>;
}

/// Region-scoped networking/compute API
///
/// Calls are not idempotent: invoking a create twice creates two resources.
/// Callers keep the returned identifiers.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Region this handle issues requests against
    fn region(&self) -> &str;

    async fn create_vpc(&self, cidr: &Ipv4Net, name: &str) -> Result<String>;

    /// Enable DNS resolution and DNS hostnames
    async fn enable_vpc_dns(&self, vpc_id: &str) -> Result<()>;

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &Ipv4Net,
        zone: &str,
        name: &str,
    ) -> Result<String>;

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()>;

    async fn create_internet_gateway(&self, name: &str) -> Result<String>;

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    /// Allocate a static public address; returns the allocation id
    async fn allocate_address(&self, name: &str) -> Result<String>;

    async fn create_nat_gateway(
        &self,
        subnet_id: &str,
        allocation_id: &str,
        name: &str,
    ) -> Result<String>;

    async fn nat_gateway_state(&self, nat_gateway_id: &str) -> Result<LifecycleState>;

    async fn create_route_table(&self, vpc_id: &str, name: &str) -> Result<String>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &Ipv4Net,
        target: &RouteTarget,
    ) -> Result<()>;

    /// Returns the association id
    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str)
    -> Result<String>;

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String>;

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()>;

    async fn create_network_acl(&self, vpc_id: &str, name: &str) -> Result<String>;

    async fn create_network_acl_entry(&self, network_acl_id: &str, entry: &AclEntry)
    -> Result<()>;

    /// Active network ACL associations of one subnet
    async fn network_acl_associations(&self, subnet_id: &str) -> Result<Vec<AclAssociation>>;

    /// Returns the new association id
    async fn replace_network_acl_association(
        &self,
        association_id: &str,
        network_acl_id: &str,
    ) -> Result<String>;

    /// Launch one instance; returns the instance id
    async fn run_instance(&self, request: &InstanceRequest) -> Result<String>;

    async fn create_peering_connection(
        &self,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
        name: &str,
    ) -> Result<String>;

    /// Status of a peering connection as seen from this region
    async fn peering_status(&self, peering_id: &str) -> Result<PeeringStatus>;

    async fn accept_peering_connection(&self, peering_id: &str) -> Result<()>;

    async fn create_transit_gateway(&self, request: &TransitHubRequest) -> Result<String>;

    async fn transit_gateway_state(&self, transit_gateway_id: &str) -> Result<LifecycleState>;

    async fn create_transit_attachment(
        &self,
        transit_gateway_id: &str,
        vpc_id: &str,
        subnet_ids: &[String],
        name: &str,
    ) -> Result<String>;

    async fn transit_attachment_state(&self, attachment_id: &str) -> Result<LifecycleState>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Provider-reported lifecycle of an asynchronously provisioned resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    Available,
    Failed(String),
}

/// Peering connection status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeeringStatus {
    /// Not yet propagated to the queried region
    NotVisible,
    Initiating,
    PendingAcceptance,
    Provisioning,
    Active,
    /// Failed, rejected, expired or deleted
    Failed(String),
}

/// Next hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum RouteTarget {
    InternetGateway(String),
    NatGateway(String),
    PeeringConnection(String),
}

impl RouteTarget {
    pub fn id(&self) -> &str {
        match self {
            RouteTarget::InternetGateway(id)
            | RouteTarget::NatGateway(id)
            | RouteTarget::PeeringConnection(id) => id,
        }
    }
}

/// IP protocol selector shared by security-group and ACL rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Icmp,
    All,
}

impl Protocol {
    /// Protocol number as the ACL API expects it
    pub fn number(&self) -> &'static str {
        match self {
            Protocol::Tcp => "6",
            Protocol::Icmp => "1",
            Protocol::All => "-1",
        }
    }

    /// Protocol name as the security-group API expects it
    pub fn group_name(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Icmp => "icmp",
            Protocol::All => "-1",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Icmp => write!(f, "icmp"),
            Protocol::All => write!(f, "all"),
        }
    }
}

/// Security-group ingress rule
///
/// ICMP and all-protocol rules carry `-1` for both ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: Ipv4Net,
}

/// Network ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub rule_number: i32,
    pub protocol: Protocol,
    pub egress: bool,
    pub cidr: Ipv4Net,
    /// Inclusive port range, TCP only
    pub ports: Option<(i32, i32)>,
}

/// Association between a subnet and a network ACL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclAssociation {
    pub association_id: String,
    pub network_acl_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub public_address: bool,
    pub key_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitHubRequest {
    pub name: String,
    pub description: String,
    pub asn: i64,
}

/// Retry configuration for throttled provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before the retry following `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// No delay between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
            backoff_multiplier: 2.0,
        }
    }
}
