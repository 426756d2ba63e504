//! vpcflow Cloud Infrastructure
//!
//! Provider abstraction and the multi-region provisioning pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  vpcflow CLI                     │
//! │               (vpcflow up / plan)                │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                vpcflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │              Orchestrator                 │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐     │
//! │  │ Topology │ │ Peering  │ │ Transit Hub  │     │
//! │  └──────────┘ └──────────┘ └──────────────┘     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Waiter / Retry / trait NetworkApi       │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ vpcflow-cloud │
//!           │     -aws      │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod orchestrator;
pub mod peering;
pub mod progress;
pub mod provider;
pub mod record;
pub mod retry;
pub mod security;
pub mod topology;
pub mod transit;
pub mod waiter;

// Re-exports
pub use action::{Action, ActionType, PlanSummary, ProvisionPlan};
pub use error::{CloudError, ErrorKind, Result};
pub use orchestrator::{Orchestrator, RunFailure, RunStage};
pub use peering::{PeeringConnector, PeeringFailure};
pub use progress::{CancelFlag, NoProgress, ProgressEvent, ProgressSink};
pub use provider::{
    AclAssociation, AclEntry, AuthStatus, ControlPlane, IngressRule, InstanceRequest,
    LifecycleState, NetworkApi, PeeringStatus, Protocol, RetryConfig, RouteTarget,
    TransitHubRequest,
};
pub use record::{
    CompleteTopology, CrossRegionLink, InstalledRoute, ProvisionedTopology, RunReport, TransitHub,
};
pub use retry::with_backoff;
pub use topology::{BuildFailure, BuildStep, TopologyBuilder, replace_subnet_acl};
pub use transit::{HubFailure, TransitHubProvisioner};
pub use waiter::{AsyncResource, Readiness, ResourceState, wait_for};
