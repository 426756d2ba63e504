//! Per-region topology builder
//!
//! Builds one region's network stack as an ordered list of steps. Each step
//! writes the identifiers it creates into the record before the next request,
//! so a failure leaves exactly what exists remotely in the partial record.

use crate::error::{CloudError, Result};
use crate::progress::{CancelFlag, NoProgress, ProgressEvent, ProgressSink};
use crate::provider::{InstanceRequest, NetworkApi, RouteTarget};
use crate::record::ProvisionedTopology;
use crate::security::{anywhere, ingress_rules, private_acl_entries, public_acl_entries};
use crate::waiter::{lifecycle_ready, wait_for};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use vpcflow_core::{RegionSpec, WaitPolicy};

/// One stage of the per-region pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    Vpc,
    VpcDns,
    Subnets,
    PublicAddressing,
    InternetGateway,
    NatGateway,
    RouteTables,
    SecurityGroup,
    NetworkAcls,
    Instances,
}

impl BuildStep {
    /// Execution order
    pub const ALL: [BuildStep; 10] = [
        BuildStep::Vpc,
        BuildStep::VpcDns,
        BuildStep::Subnets,
        BuildStep::PublicAddressing,
        BuildStep::InternetGateway,
        BuildStep::NatGateway,
        BuildStep::RouteTables,
        BuildStep::SecurityGroup,
        BuildStep::NetworkAcls,
        BuildStep::Instances,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            BuildStep::Vpc => "VPC",
            BuildStep::VpcDns => "VPC DNS attributes",
            BuildStep::Subnets => "Subnets",
            BuildStep::PublicAddressing => "Public IP auto-assign",
            BuildStep::InternetGateway => "Internet Gateway",
            BuildStep::NatGateway => "NAT Gateway",
            BuildStep::RouteTables => "Route Tables",
            BuildStep::SecurityGroup => "Security Group",
            BuildStep::NetworkAcls => "Network ACLs",
            BuildStep::Instances => "EC2 Instances",
        }
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A region build that stopped at `step`
///
/// `topology` holds every identifier created before the failure.
#[derive(Debug, Error)]
#[error("{step} failed in {region}: {error}", region = .topology.region)]
pub struct BuildFailure {
    pub topology: ProvisionedTopology,
    pub step: BuildStep,
    #[source]
    pub error: CloudError,
}

/// Builds one region's stack against a region-bound API handle
pub struct TopologyBuilder<'a> {
    api: Arc<dyn NetworkApi>,
    spec: &'a RegionSpec,
    instance_type: String,
    peer_cidrs: Vec<Ipv4Net>,
    nat_wait: WaitPolicy,
    cancel: CancelFlag,
    progress: Arc<dyn ProgressSink>,
}

impl<'a> TopologyBuilder<'a> {
    pub fn new(api: Arc<dyn NetworkApi>, spec: &'a RegionSpec, instance_type: &str) -> Self {
        Self {
            api,
            spec,
            instance_type: instance_type.to_string(),
            peer_cidrs: Vec::new(),
            nat_wait: vpcflow_core::WaitSettings::default().nat_gateway,
            cancel: CancelFlag::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// VPC blocks admitted by the security group's cross-region rule
    pub fn peer_cidrs(mut self, peer_cidrs: Vec<Ipv4Net>) -> Self {
        self.peer_cidrs = peer_cidrs;
        self
    }

    pub fn nat_wait(mut self, policy: WaitPolicy) -> Self {
        self.nat_wait = policy;
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn region(&self) -> &str {
        &self.spec.region
    }

    /// Run every step in order
    pub async fn build(&self) -> std::result::Result<ProvisionedTopology, BuildFailure> {
        let region = self.spec.region.clone();
        let mut topology = ProvisionedTopology::new(self.spec);

        info!(region = %region, cidr = %self.spec.cidr, "building topology");

        for step in BuildStep::ALL {
            if self.cancel.is_cancelled() {
                warn!(region = %region, %step, "cancelled");
                return Err(BuildFailure {
                    topology,
                    step,
                    error: CloudError::Cancelled(format!("{} in {}", step, region)),
                });
            }

            self.progress.emit(ProgressEvent::StepStarted {
                region: region.clone(),
                step,
            });

            if let Err(error) = self.run_step(step, &mut topology).await {
                warn!(region = %region, %step, error = %error, "step failed");
                self.progress.emit(ProgressEvent::RegionFailed {
                    region: region.clone(),
                    step,
                    message: error.to_string(),
                });
                return Err(BuildFailure {
                    topology,
                    step,
                    error,
                });
            }

            debug!(region = %region, %step, "step finished");
            self.progress.emit(ProgressEvent::StepFinished {
                region: region.clone(),
                step,
            });
        }

        info!(region = %region, vpc = ?topology.vpc_id, "topology complete");
        Ok(topology)
    }

    async fn run_step(&self, step: BuildStep, topology: &mut ProvisionedTopology) -> Result<()> {
        match step {
            BuildStep::Vpc => self.create_vpc(topology).await,
            BuildStep::VpcDns => {
                let vpc_id = require(&topology.vpc_id, "vpc")?;
                self.api.enable_vpc_dns(vpc_id).await
            }
            BuildStep::Subnets => self.create_subnets(topology).await,
            BuildStep::PublicAddressing => {
                let subnet_id = require(&topology.public_subnet_id, "public-subnet")?;
                self.api.enable_public_ip_on_launch(subnet_id).await
            }
            BuildStep::InternetGateway => self.create_internet_gateway(topology).await,
            BuildStep::NatGateway => self.create_nat_gateway(topology).await,
            BuildStep::RouteTables => self.create_route_tables(topology).await,
            BuildStep::SecurityGroup => self.create_security_group(topology).await,
            BuildStep::NetworkAcls => self.create_network_acls(topology).await,
            BuildStep::Instances => self.launch_instances(topology).await,
        }
    }

    async fn create_vpc(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let vpc_id = self
            .api
            .create_vpc(&self.spec.cidr, &self.spec.resource_name("VPC"))
            .await?;
        topology.vpc_id = Some(vpc_id);
        Ok(())
    }

    async fn create_subnets(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let vpc_id = require(&topology.vpc_id, "vpc")?.to_string();
        let zone = self.spec.zone();

        let public = self
            .api
            .create_subnet(
                &vpc_id,
                &self.spec.public_subnet,
                &zone,
                &self.spec.resource_name("Public-Subnet"),
            )
            .await?;
        topology.public_subnet_id = Some(public);

        let private = self
            .api
            .create_subnet(
                &vpc_id,
                &self.spec.private_subnet,
                &zone,
                &self.spec.resource_name("Private-Subnet"),
            )
            .await?;
        topology.private_subnet_id = Some(private);
        Ok(())
    }

    async fn create_internet_gateway(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let gateway_id = self
            .api
            .create_internet_gateway(&self.spec.resource_name("IGW"))
            .await?;
        topology.internet_gateway_id = Some(gateway_id.clone());

        let vpc_id = require(&topology.vpc_id, "vpc")?;
        self.api.attach_internet_gateway(&gateway_id, vpc_id).await
    }

    async fn create_nat_gateway(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let allocation_id = self
            .api
            .allocate_address(&self.spec.resource_name("NAT-EIP"))
            .await?;
        topology.address_allocation_id = Some(allocation_id.clone());

        let subnet_id = require(&topology.public_subnet_id, "public-subnet")?;
        let nat_id = self
            .api
            .create_nat_gateway(subnet_id, &allocation_id, &self.spec.resource_name("NAT"))
            .await?;
        topology.nat_gateway_id = Some(nat_id.clone());

        self.progress.emit(ProgressEvent::Waiting {
            region: self.spec.region.clone(),
            resource: "nat-gateway".to_string(),
            id: nat_id.clone(),
        });

        let api = self.api.as_ref();
        let id = nat_id.as_str();
        wait_for(
            "nat-gateway",
            id,
            &self.nat_wait,
            move || api.nat_gateway_state(id),
            lifecycle_ready,
        )
        .await?
        .into_available()?;
        Ok(())
    }

    async fn create_route_tables(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let vpc_id = require(&topology.vpc_id, "vpc")?.to_string();
        let gateway_id = require(&topology.internet_gateway_id, "internet-gateway")?.to_string();
        let nat_id = require(&topology.nat_gateway_id, "nat-gateway")?.to_string();
        let public_subnet = require(&topology.public_subnet_id, "public-subnet")?.to_string();
        let private_subnet = require(&topology.private_subnet_id, "private-subnet")?.to_string();

        let public_rt = self
            .api
            .create_route_table(&vpc_id, &self.spec.resource_name("Public-RT"))
            .await?;
        topology.public_route_table_id = Some(public_rt.clone());
        self.api
            .create_route(&public_rt, &anywhere(), &RouteTarget::InternetGateway(gateway_id))
            .await?;
        self.api.associate_route_table(&public_rt, &public_subnet).await?;

        // プライベート側のデフォルトルートは必ず NAT 経由
        let private_rt = self
            .api
            .create_route_table(&vpc_id, &self.spec.resource_name("Private-RT"))
            .await?;
        topology.private_route_table_id = Some(private_rt.clone());
        self.api
            .create_route(&private_rt, &anywhere(), &RouteTarget::NatGateway(nat_id))
            .await?;
        self.api.associate_route_table(&private_rt, &private_subnet).await?;
        Ok(())
    }

    async fn create_security_group(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let vpc_id = require(&topology.vpc_id, "vpc")?.to_string();
        let group_id = self
            .api
            .create_security_group(
                &vpc_id,
                &self.spec.resource_name("SG"),
                &format!("SG {}", self.spec.label()),
            )
            .await?;
        topology.security_group_id = Some(group_id.clone());

        let rules = ingress_rules(&self.peer_cidrs);
        debug!(region = %self.spec.region, rules = rules.len(), "authorizing ingress");
        self.api.authorize_ingress(&group_id, &rules).await
    }

    async fn create_network_acls(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let vpc_id = require(&topology.vpc_id, "vpc")?.to_string();
        let public_subnet = require(&topology.public_subnet_id, "public-subnet")?.to_string();
        let private_subnet = require(&topology.private_subnet_id, "private-subnet")?.to_string();

        let public_acl = self
            .api
            .create_network_acl(&vpc_id, &self.spec.resource_name("Public-NACL"))
            .await?;
        topology.public_network_acl_id = Some(public_acl.clone());
        for entry in public_acl_entries() {
            self.api.create_network_acl_entry(&public_acl, &entry).await?;
        }
        replace_subnet_acl(self.api.as_ref(), &public_subnet, &public_acl).await?;

        let private_acl = self
            .api
            .create_network_acl(&vpc_id, &self.spec.resource_name("Private-NACL"))
            .await?;
        topology.private_network_acl_id = Some(private_acl.clone());
        for entry in private_acl_entries(self.spec.public_subnet) {
            self.api.create_network_acl_entry(&private_acl, &entry).await?;
        }
        replace_subnet_acl(self.api.as_ref(), &private_subnet, &private_acl).await?;
        Ok(())
    }

    async fn launch_instances(&self, topology: &mut ProvisionedTopology) -> Result<()> {
        let group_id = require(&topology.security_group_id, "security-group")?.to_string();
        let public_subnet = require(&topology.public_subnet_id, "public-subnet")?.to_string();
        let private_subnet = require(&topology.private_subnet_id, "private-subnet")?.to_string();

        for (public, subnet_id, suffix) in [
            (true, public_subnet, "Public-Instance"),
            (false, private_subnet, "Private-Instance"),
        ] {
            let request = InstanceRequest {
                name: self.spec.resource_name(suffix),
                image_id: self.spec.image.clone(),
                instance_type: self.instance_type.clone(),
                subnet_id,
                security_group_id: group_id.clone(),
                public_address: public,
                key_name: self.spec.key_name.clone(),
            };

            let instance_id = self.api.run_instance(&request).await?;
            if public {
                topology.public_instance_id = Some(instance_id);
            } else {
                topology.private_instance_id = Some(instance_id);
            }
        }
        Ok(())
    }
}

/// Point a subnet at `network_acl_id`, replacing its current association
///
/// Returns the association id now in effect. A subnet without exactly one
/// association is an inconsistent remote state.
pub async fn replace_subnet_acl(
    api: &dyn NetworkApi,
    subnet_id: &str,
    network_acl_id: &str,
) -> Result<String> {
    let associations: Vec<_> = api
        .network_acl_associations(subnet_id)
        .await?
        .into_iter()
        .filter(|a| a.subnet_id == subnet_id)
        .collect();

    match associations.as_slice() {
        [current] if current.network_acl_id == network_acl_id => {
            debug!(subnet = subnet_id, acl = network_acl_id, "already associated");
            Ok(current.association_id.clone())
        }
        [current] => {
            api.replace_network_acl_association(&current.association_id, network_acl_id)
                .await
        }
        [] => Err(CloudError::InconsistentState(format!(
            "subnet {} has no network ACL association",
            subnet_id
        ))),
        many => Err(CloudError::InconsistentState(format!(
            "subnet {} has {} network ACL associations",
            subnet_id,
            many.len()
        ))),
    }
}

fn require<'t>(id: &'t Option<String>, field: &str) -> Result<&'t str> {
    id.as_deref().ok_or_else(|| {
        CloudError::InconsistentState(format!("{} identifier missing before dependent step", field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(BuildStep::ALL.first(), Some(&BuildStep::Vpc));
        assert_eq!(BuildStep::ALL.last(), Some(&BuildStep::Instances));

        let nat = BuildStep::ALL.iter().position(|s| *s == BuildStep::NatGateway);
        let routes = BuildStep::ALL.iter().position(|s| *s == BuildStep::RouteTables);
        assert!(nat < routes);
    }

    #[test]
    fn test_require_missing() {
        assert!(require(&None, "vpc").is_err());
        assert_eq!(require(&Some("vpc-1".to_string()), "vpc").unwrap(), "vpc-1");
    }
}
