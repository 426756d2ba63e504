//! Cross-region peering connector

use crate::error::{CloudError, Result};
use crate::provider::{NetworkApi, RouteTarget};
use crate::record::{CompleteTopology, CrossRegionLink, InstalledRoute};
use crate::waiter::{peering_acceptable, wait_for};
use futures_util::future::join_all;
use ipnet::Ipv4Net;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use vpcflow_core::WaitPolicy;

/// Peering stopped partway
///
/// `peering_id` is set once the request exists; `routes` lists every route
/// that was installed before the failure.
#[derive(Debug, Error)]
#[error("peering failed: {error}")]
pub struct PeeringFailure {
    pub peering_id: Option<String>,
    pub routes: Vec<InstalledRoute>,
    #[source]
    pub error: CloudError,
}

impl PeeringFailure {
    fn before_request(error: CloudError) -> Self {
        Self {
            peering_id: None,
            routes: Vec::new(),
            error,
        }
    }
}

/// Connects two complete topologies with a peering connection
///
/// The initiator's handle issues the request; the accepter's handle, bound to
/// the peer region, accepts it.
pub struct PeeringConnector {
    initiator_api: Arc<dyn NetworkApi>,
    accepter_api: Arc<dyn NetworkApi>,
    visibility_wait: WaitPolicy,
}

impl PeeringConnector {
    pub fn new(
        initiator_api: Arc<dyn NetworkApi>,
        accepter_api: Arc<dyn NetworkApi>,
        visibility_wait: WaitPolicy,
    ) -> Self {
        Self {
            initiator_api,
            accepter_api,
            visibility_wait,
        }
    }

    /// Request, accept, then install the four routes
    ///
    /// A failed acceptance is reported as `CloudError::PeeringAcceptance` with
    /// no routes installed. A failed route install still lets the sibling
    /// routes finish; the failure carries the peering id and the routes that
    /// made it.
    pub async fn connect(
        &self,
        initiator: &CompleteTopology,
        accepter: &CompleteTopology,
    ) -> std::result::Result<CrossRegionLink, PeeringFailure> {
        if initiator.region == accepter.region {
            return Err(PeeringFailure::before_request(CloudError::InvalidConfig(
                format!("peering requires two regions, got {} twice", initiator.region),
            )));
        }

        info!(
            initiator = %initiator.region,
            accepter = %accepter.region,
            "requesting peering connection"
        );

        let peering_id = self
            .initiator_api
            .create_peering_connection(
                &initiator.vpc_id,
                &accepter.vpc_id,
                &accepter.region,
                &format!("{}-{}-Peering", initiator.label, accepter.label),
            )
            .await
            .map_err(PeeringFailure::before_request)?;

        if let Err(error) = self.accept(&peering_id).await {
            warn!(
                peering = %peering_id,
                error = %error,
                "acceptance failed, request left dangling"
            );
            return Err(PeeringFailure {
                peering_id: Some(peering_id.clone()),
                routes: Vec::new(),
                error: CloudError::PeeringAcceptance {
                    peering_id,
                    message: error.to_string(),
                },
            });
        }

        let (routes, failed) = self.install_routes(&peering_id, initiator, accepter).await;
        if let Some(error) = failed {
            warn!(
                peering = %peering_id,
                installed = routes.len(),
                error = %error,
                "route install failed after acceptance"
            );
            return Err(PeeringFailure {
                peering_id: Some(peering_id),
                routes,
                error,
            });
        }
        info!(peering = %peering_id, routes = routes.len(), "peering established");

        Ok(CrossRegionLink {
            initiator: initiator.region.clone(),
            accepter: accepter.region.clone(),
            peering_id,
            routes,
            transit_hub_id: None,
            transit_attachment_id: None,
        })
    }

    async fn accept(&self, peering_id: &str) -> Result<()> {
        // リクエストが相手リージョンから見えるまで待つ
        let api = self.accepter_api.as_ref();
        wait_for(
            "peering-connection",
            peering_id,
            &self.visibility_wait,
            move || api.peering_status(peering_id),
            peering_acceptable,
        )
        .await?
        .into_available()?;

        self.accepter_api.accept_peering_connection(peering_id).await
    }

    /// Issue every route and wait for all of them
    ///
    /// Returns the routes that succeeded and the first error, if any.
    async fn install_routes(
        &self,
        peering_id: &str,
        initiator: &CompleteTopology,
        accepter: &CompleteTopology,
    ) -> (Vec<InstalledRoute>, Option<CloudError>) {
        let target = RouteTarget::PeeringConnection(peering_id.to_string());

        let mut planned: Vec<(&dyn NetworkApi, &str, &str, Ipv4Net)> = Vec::with_capacity(4);
        for table in initiator.route_table_ids() {
            planned.push((
                self.initiator_api.as_ref(),
                &initiator.region,
                table,
                accepter.cidr,
            ));
        }
        for table in accepter.route_table_ids() {
            planned.push((
                self.accepter_api.as_ref(),
                &accepter.region,
                table,
                initiator.cidr,
            ));
        }

        // 4本のルートは互いに独立
        let results: Vec<Result<()>> = join_all(
            planned
                .iter()
                .map(|(api, _, table, destination)| api.create_route(table, destination, &target)),
        )
        .await;

        let mut installed = Vec::with_capacity(planned.len());
        let mut first_error = None;
        for ((_, region, table, destination), result) in planned.into_iter().zip(results) {
            match result {
                Ok(()) => installed.push(InstalledRoute {
                    region: region.to_string(),
                    route_table_id: table.to_string(),
                    destination,
                }),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        (installed, first_error)
    }
}
