//! Provisioned resource records
//!
//! Identifiers produced by a run, accumulated as each step commits.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use vpcflow_core::RegionSpec;

/// Identifiers of one region's stack, filled field by field
///
/// A record with unset fields after an error is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedTopology {
    pub region: String,
    pub label: String,
    pub cidr: Ipv4Net,
    pub vpc_id: Option<String>,
    pub public_subnet_id: Option<String>,
    pub private_subnet_id: Option<String>,
    pub internet_gateway_id: Option<String>,
    pub address_allocation_id: Option<String>,
    pub nat_gateway_id: Option<String>,
    pub public_route_table_id: Option<String>,
    pub private_route_table_id: Option<String>,
    pub security_group_id: Option<String>,
    pub public_network_acl_id: Option<String>,
    pub private_network_acl_id: Option<String>,
    pub public_instance_id: Option<String>,
    pub private_instance_id: Option<String>,
}

impl ProvisionedTopology {
    pub fn new(spec: &RegionSpec) -> Self {
        Self {
            region: spec.region.clone(),
            label: spec.label().to_string(),
            cidr: spec.cidr,
            vpc_id: None,
            public_subnet_id: None,
            private_subnet_id: None,
            internet_gateway_id: None,
            address_allocation_id: None,
            nat_gateway_id: None,
            public_route_table_id: None,
            private_route_table_id: None,
            security_group_id: None,
            public_network_acl_id: None,
            private_network_acl_id: None,
            public_instance_id: None,
            private_instance_id: None,
        }
    }

    /// All identifier fields in creation order
    pub fn identifiers(&self) -> [(&'static str, Option<&str>); 13] {
        [
            ("vpc", self.vpc_id.as_deref()),
            ("public-subnet", self.public_subnet_id.as_deref()),
            ("private-subnet", self.private_subnet_id.as_deref()),
            ("internet-gateway", self.internet_gateway_id.as_deref()),
            ("address-allocation", self.address_allocation_id.as_deref()),
            ("nat-gateway", self.nat_gateway_id.as_deref()),
            ("public-route-table", self.public_route_table_id.as_deref()),
            ("private-route-table", self.private_route_table_id.as_deref()),
            ("security-group", self.security_group_id.as_deref()),
            ("public-network-acl", self.public_network_acl_id.as_deref()),
            ("private-network-acl", self.private_network_acl_id.as_deref()),
            ("public-instance", self.public_instance_id.as_deref()),
            ("private-instance", self.private_instance_id.as_deref()),
        ]
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.identifiers()
            .into_iter()
            .filter(|(_, id)| id.is_none())
            .map(|(field, _)| field)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.identifiers().iter().all(|(_, id)| id.is_some())
    }

    /// Seal a fully populated record
    pub fn to_complete(&self) -> Result<CompleteTopology> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(CloudError::InconsistentState(format!(
                "topology for {} is incomplete (missing: {})",
                self.region,
                missing.join(", ")
            )));
        }

        let take = |id: &Option<String>| id.clone().unwrap_or_default();
        Ok(CompleteTopology {
            region: self.region.clone(),
            label: self.label.clone(),
            cidr: self.cidr,
            vpc_id: take(&self.vpc_id),
            public_subnet_id: take(&self.public_subnet_id),
            private_subnet_id: take(&self.private_subnet_id),
            internet_gateway_id: take(&self.internet_gateway_id),
            address_allocation_id: take(&self.address_allocation_id),
            nat_gateway_id: take(&self.nat_gateway_id),
            public_route_table_id: take(&self.public_route_table_id),
            private_route_table_id: take(&self.private_route_table_id),
            security_group_id: take(&self.security_group_id),
            public_network_acl_id: take(&self.public_network_acl_id),
            private_network_acl_id: take(&self.private_network_acl_id),
            public_instance_id: take(&self.public_instance_id),
            private_instance_id: take(&self.private_instance_id),
        })
    }
}

/// A region's stack with every identifier present
///
/// Only obtainable through [`ProvisionedTopology::to_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompleteTopology {
    pub region: String,
    pub label: String,
    pub cidr: Ipv4Net,
    pub vpc_id: String,
    pub public_subnet_id: String,
    pub private_subnet_id: String,
    pub internet_gateway_id: String,
    pub address_allocation_id: String,
    pub nat_gateway_id: String,
    pub public_route_table_id: String,
    pub private_route_table_id: String,
    pub security_group_id: String,
    pub public_network_acl_id: String,
    pub private_network_acl_id: String,
    pub public_instance_id: String,
    pub private_instance_id: String,
}

impl CompleteTopology {
    pub fn route_table_ids(&self) -> [&str; 2] {
        [&self.public_route_table_id, &self.private_route_table_id]
    }
}

/// A route installed through a peering connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRoute {
    pub region: String,
    pub route_table_id: String,
    pub destination: Ipv4Net,
}

/// Peering between two complete topologies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRegionLink {
    /// Region that issued the request
    pub initiator: String,
    /// Region that accepted it
    pub accepter: String,
    pub peering_id: String,
    pub routes: Vec<InstalledRoute>,
    /// Set when the hub is anchored at one of the two regions
    pub transit_hub_id: Option<String>,
    pub transit_attachment_id: Option<String>,
}

impl CrossRegionLink {
    pub fn involves(&self, region: &str) -> bool {
        self.initiator == region || self.accepter == region
    }
}

/// Transit hub and the attachment of the anchor's private subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitHub {
    pub region: String,
    pub hub_id: String,
    pub attachment_id: String,
    pub vpc_id: String,
    pub subnet_id: String,
}

/// Everything a run created, complete or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub deployment: String,
    pub topologies: Vec<ProvisionedTopology>,
    pub links: Vec<CrossRegionLink>,
    pub hub: Option<TransitHub>,
    /// Hub created but not fully attached when the run failed
    pub dangling_hub_id: Option<String>,
    /// Attachment created but never available when the run failed
    pub dangling_attachment_id: Option<String>,
    /// Peering created but not fully routed when the run failed
    pub dangling_peering_id: Option<String>,
    /// Routes installed for the dangling peering before the failure
    #[serde(default)]
    pub dangling_routes: Vec<InstalledRoute>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            topologies: Vec::new(),
            links: Vec::new(),
            hub: None,
            dangling_hub_id: None,
            dangling_attachment_id: None,
            dangling_peering_id: None,
            dangling_routes: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn topology(&self, region: &str) -> Option<&ProvisionedTopology> {
        self.topologies.iter().find(|t| t.region == region)
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RegionSpec {
        RegionSpec {
            region: "us-west-2".to_string(),
            label: Some("Oregon".to_string()),
            cidr: "10.0.0.0/16".parse().unwrap(),
            public_subnet: "10.0.1.0/24".parse().unwrap(),
            private_subnet: "10.0.2.0/24".parse().unwrap(),
            image: "ami-00a8151272c45cd8e".to_string(),
            key_name: None,
            availability_zone: "a".to_string(),
        }
    }

    fn filled() -> ProvisionedTopology {
        let mut topology = ProvisionedTopology::new(&spec());
        topology.vpc_id = Some("vpc-1".into());
        topology.public_subnet_id = Some("subnet-1".into());
        topology.private_subnet_id = Some("subnet-2".into());
        topology.internet_gateway_id = Some("igw-1".into());
        topology.address_allocation_id = Some("eipalloc-1".into());
        topology.nat_gateway_id = Some("nat-1".into());
        topology.public_route_table_id = Some("rtb-1".into());
        topology.private_route_table_id = Some("rtb-2".into());
        topology.security_group_id = Some("sg-1".into());
        topology.public_network_acl_id = Some("acl-1".into());
        topology.private_network_acl_id = Some("acl-2".into());
        topology.public_instance_id = Some("i-1".into());
        topology.private_instance_id = Some("i-2".into());
        topology
    }

    #[test]
    fn test_new_topology_is_empty() {
        let topology = ProvisionedTopology::new(&spec());
        assert_eq!(topology.label, "Oregon");
        assert_eq!(topology.missing_fields().len(), 13);
        assert!(!topology.is_complete());
    }

    #[test]
    fn test_complete_conversion() {
        let complete = filled().to_complete().unwrap();
        assert_eq!(complete.nat_gateway_id, "nat-1");
        assert_eq!(complete.route_table_ids(), ["rtb-1", "rtb-2"]);
    }

    #[test]
    fn test_incomplete_conversion_lists_missing() {
        let mut topology = filled();
        topology.security_group_id = None;

        let err = topology.to_complete().unwrap_err();
        assert!(matches!(
            &err,
            CloudError::InconsistentState(msg) if msg.contains("security-group")
        ));
    }

    #[test]
    fn test_report_json() {
        let mut report = RunReport::new("lab");
        report.topologies.push(filled());
        report.finish();

        let json = report.to_json().unwrap();
        assert!(json.contains("\"vpc_id\": \"vpc-1\""));
        assert!(json.contains("\"cidr\": \"10.0.0.0/16\""));
        assert!(report.topology("us-west-2").is_some());
    }
}
