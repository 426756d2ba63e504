//! Transit hub provisioner

use crate::error::CloudError;
use crate::provider::{NetworkApi, TransitHubRequest};
use crate::record::{CompleteTopology, TransitHub};
use crate::waiter::{lifecycle_ready, wait_for};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use vpcflow_core::{HubSpec, WaitPolicy};

/// Name tag of the hub
pub const HUB_NAME: &str = "Multi-Region-TGW";

/// Hub provisioning stopped partway
///
/// `hub_id` is set when the hub itself was created before the failure,
/// `attachment_id` when the VPC attachment was.
#[derive(Debug, Error)]
#[error("transit hub provisioning failed: {error}")]
pub struct HubFailure {
    pub hub_id: Option<String>,
    pub attachment_id: Option<String>,
    #[source]
    pub error: CloudError,
}

impl HubFailure {
    fn before_hub(error: CloudError) -> Self {
        Self {
            hub_id: None,
            attachment_id: None,
            error,
        }
    }
}

pub struct TransitHubProvisioner {
    api: Arc<dyn NetworkApi>,
    spec: HubSpec,
    hub_wait: WaitPolicy,
    attachment_wait: WaitPolicy,
}

impl TransitHubProvisioner {
    /// `api` must be bound to the anchor topology's region
    pub fn new(
        api: Arc<dyn NetworkApi>,
        spec: HubSpec,
        hub_wait: WaitPolicy,
        attachment_wait: WaitPolicy,
    ) -> Self {
        Self {
            api,
            spec,
            hub_wait,
            attachment_wait,
        }
    }

    /// Create the hub, wait for it, attach the anchor's private subnet, wait again
    pub async fn provision(
        &self,
        anchor: &CompleteTopology,
    ) -> std::result::Result<TransitHub, HubFailure> {
        if self.api.region() != anchor.region {
            return Err(HubFailure::before_hub(CloudError::InconsistentState(format!(
                "hub API bound to {} but anchor topology is in {}",
                self.api.region(),
                anchor.region
            ))));
        }

        info!(region = %anchor.region, asn = self.spec.asn, "creating transit hub");

        let request = TransitHubRequest {
            name: HUB_NAME.to_string(),
            description: self.spec.description.clone(),
            asn: self.spec.asn,
        };
        let hub_id = self
            .api
            .create_transit_gateway(&request)
            .await
            .map_err(HubFailure::before_hub)?;

        let fail = |error: CloudError| HubFailure {
            hub_id: Some(hub_id.clone()),
            attachment_id: None,
            error,
        };

        let api = self.api.as_ref();
        let id = hub_id.as_str();
        wait_for(
            "transit-gateway",
            id,
            &self.hub_wait,
            move || api.transit_gateway_state(id),
            lifecycle_ready,
        )
        .await
        .and_then(|outcome| outcome.into_available())
        .map_err(fail)?;

        let attachment_id = self
            .api
            .create_transit_attachment(
                &hub_id,
                &anchor.vpc_id,
                std::slice::from_ref(&anchor.private_subnet_id),
                &format!("{}-VPC-Attachment", anchor.label),
            )
            .await
            .map_err(fail)?;

        let attachment = attachment_id.as_str();
        wait_for(
            "transit-attachment",
            attachment,
            &self.attachment_wait,
            move || api.transit_attachment_state(attachment),
            lifecycle_ready,
        )
        .await
        .and_then(|outcome| outcome.into_available())
        .map_err(|error| HubFailure {
            hub_id: Some(hub_id.clone()),
            attachment_id: Some(attachment_id.clone()),
            error,
        })?;

        info!(hub = %hub_id, attachment = %attachment_id, "transit hub available");

        Ok(TransitHub {
            region: anchor.region.clone(),
            hub_id,
            attachment_id,
            vpc_id: anchor.vpc_id.clone(),
            subnet_id: anchor.private_subnet_id.clone(),
        })
    }
}
