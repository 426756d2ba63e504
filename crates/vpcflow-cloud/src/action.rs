//! Dry-run plan of a provisioning run

use crate::error::{CloudError, Result};
use crate::security::{ingress_rules, private_acl_entries, public_acl_entries};
use crate::topology::BuildStep;
use crate::transit::HUB_NAME;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vpcflow_core::{Deployment, RegionSpec, WaitPolicy};

/// Represents a planned action against the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Region whose endpoint receives the request
    pub region: String,

    /// Pipeline step, for per-region actions
    pub step: Option<BuildStep>,

    /// Resource type (e.g., "vpc", "nat-gateway", "route")
    pub resource_type: String,

    /// Name tag or target of the action
    pub name: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Change an attribute or association of a resource
    Modify,
    /// Block until a resource becomes available
    Wait,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Modify => write!(f, "modify"),
            ActionType::Wait => write!(f, "wait"),
        }
    }
}

/// Every action a run of the deployment would take, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionPlan {
    pub deployment: String,
    pub actions: Vec<Action>,
}

struct PlanBuilder {
    actions: Vec<Action>,
}

impl PlanBuilder {
    fn push(
        &mut self,
        action_type: ActionType,
        region: &str,
        step: Option<BuildStep>,
        resource_type: &str,
        name: impl Into<String>,
        details: Vec<(&str, serde_json::Value)>,
    ) {
        let id = format!("{}/{}/{}", region, resource_type, self.actions.len() + 1);
        self.actions.push(Action {
            id,
            action_type,
            region: region.to_string(),
            step,
            resource_type: resource_type.to_string(),
            name: name.into(),
            details: details
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        });
    }

    fn wait(
        &mut self,
        region: &str,
        step: Option<BuildStep>,
        resource_type: &str,
        policy: &WaitPolicy,
    ) {
        self.push(
            ActionType::Wait,
            region,
            step,
            resource_type,
            format!("{} available", resource_type),
            vec![
                ("interval_ms", policy.interval_ms.into()),
                ("max_attempts", policy.max_attempts.into()),
            ],
        );
    }

    fn region(&mut self, deployment: &Deployment, spec: &RegionSpec) {
        use serde_json::json;
        let r = spec.region.as_str();

        self.push(
            ActionType::Create,
            r,
            Some(BuildStep::Vpc),
            "vpc",
            spec.resource_name("VPC"),
            vec![("cidr", json!(spec.cidr.to_string()))],
        );
        self.push(
            ActionType::Modify,
            r,
            Some(BuildStep::VpcDns),
            "vpc",
            "enable DNS support and hostnames",
            vec![],
        );

        for (suffix, cidr) in [
            ("Public-Subnet", spec.public_subnet),
            ("Private-Subnet", spec.private_subnet),
        ] {
            self.push(
                ActionType::Create,
                r,
                Some(BuildStep::Subnets),
                "subnet",
                spec.resource_name(suffix),
                vec![("cidr", json!(cidr.to_string())), ("zone", json!(spec.zone()))],
            );
        }
        self.push(
            ActionType::Modify,
            r,
            Some(BuildStep::PublicAddressing),
            "subnet",
            "map public IP on launch",
            vec![],
        );

        self.push(
            ActionType::Create,
            r,
            Some(BuildStep::InternetGateway),
            "internet-gateway",
            spec.resource_name("IGW"),
            vec![],
        );
        self.push(
            ActionType::Modify,
            r,
            Some(BuildStep::InternetGateway),
            "internet-gateway",
            "attach to VPC",
            vec![],
        );

        self.push(
            ActionType::Create,
            r,
            Some(BuildStep::NatGateway),
            "elastic-ip",
            spec.resource_name("NAT-EIP"),
            vec![],
        );
        self.push(
            ActionType::Create,
            r,
            Some(BuildStep::NatGateway),
            "nat-gateway",
            spec.resource_name("NAT"),
            vec![],
        );
        self.wait(
            r,
            Some(BuildStep::NatGateway),
            "nat-gateway",
            &deployment.waits.nat_gateway,
        );

        for (suffix, target) in [("Public-RT", "internet-gateway"), ("Private-RT", "nat-gateway")] {
            self.push(
                ActionType::Create,
                r,
                Some(BuildStep::RouteTables),
                "route-table",
                spec.resource_name(suffix),
                vec![],
            );
            self.push(
                ActionType::Create,
                r,
                Some(BuildStep::RouteTables),
                "route",
                "0.0.0.0/0",
                vec![("target", json!(target))],
            );
            self.push(
                ActionType::Modify,
                r,
                Some(BuildStep::RouteTables),
                "route-table",
                "associate with subnet",
                vec![],
            );
        }

        let rules: Vec<String> = ingress_rules(&deployment.peer_cidrs(r))
            .iter()
            .map(|rule| {
                format!(
                    "{} {}-{} from {}",
                    rule.protocol, rule.from_port, rule.to_port, rule.cidr
                )
            })
            .collect();
        self.push(
            ActionType::Create,
            r,
            Some(BuildStep::SecurityGroup),
            "security-group",
            spec.resource_name("SG"),
            vec![],
        );
        self.push(
            ActionType::Modify,
            r,
            Some(BuildStep::SecurityGroup),
            "security-group",
            "authorize ingress",
            vec![("rules", json!(rules))],
        );

        for (suffix, entries) in [
            ("Public-NACL", public_acl_entries().len()),
            ("Private-NACL", private_acl_entries(spec.public_subnet).len()),
        ] {
            self.push(
                ActionType::Create,
                r,
                Some(BuildStep::NetworkAcls),
                "network-acl",
                spec.resource_name(suffix),
                vec![("entries", json!(entries))],
            );
            self.push(
                ActionType::Modify,
                r,
                Some(BuildStep::NetworkAcls),
                "network-acl",
                "replace subnet association",
                vec![],
            );
        }

        for (suffix, public) in [("Public-Instance", true), ("Private-Instance", false)] {
            self.push(
                ActionType::Create,
                r,
                Some(BuildStep::Instances),
                "instance",
                spec.resource_name(suffix),
                vec![
                    ("image", json!(spec.image)),
                    ("instance_type", json!(deployment.instance_type)),
                    ("public_address", json!(public)),
                    ("key_name", json!(spec.key_name)),
                ],
            );
        }
    }
}

impl ProvisionPlan {
    /// Plan a run without touching the provider
    pub fn for_deployment(deployment: &Deployment) -> Result<Self> {
        use serde_json::json;

        deployment
            .validate()
            .map_err(|e| CloudError::InvalidConfig(e.to_string()))?;

        let mut plan = PlanBuilder { actions: Vec::new() };
        for spec in &deployment.regions {
            plan.region(deployment, spec);
        }

        let pair = deployment
            .peering_pair()
            .map_err(|e| CloudError::InvalidConfig(e.to_string()))?;
        if let Some((a, b)) = pair {
            plan.push(
                ActionType::Create,
                &a.region,
                None,
                "peering-connection",
                format!("{}-{}-Peering", a.label(), b.label()),
                vec![("peer_region", json!(b.region))],
            );
            plan.wait(&b.region, None, "peering-connection", &deployment.waits.peering);
            plan.push(
                ActionType::Modify,
                &b.region,
                None,
                "peering-connection",
                "accept",
                vec![],
            );
            for (from, to) in [(a, b), (a, b), (b, a), (b, a)] {
                plan.push(
                    ActionType::Create,
                    &from.region,
                    None,
                    "route",
                    to.cidr.to_string(),
                    vec![("target", json!("peering-connection"))],
                );
            }
        }

        let anchor = deployment
            .hub_anchor()
            .map_err(|e| CloudError::InvalidConfig(e.to_string()))?;
        if let Some(anchor) = anchor {
            let r = anchor.region.as_str();
            plan.push(
                ActionType::Create,
                r,
                None,
                "transit-gateway",
                HUB_NAME,
                vec![
                    ("asn", json!(deployment.hub.asn)),
                    ("description", json!(deployment.hub.description)),
                ],
            );
            plan.wait(r, None, "transit-gateway", &deployment.waits.transit_hub);
            plan.push(
                ActionType::Create,
                r,
                None,
                "transit-attachment",
                anchor.resource_name("VPC-Attachment"),
                vec![("subnet", json!(anchor.private_subnet.to_string()))],
            );
            plan.wait(
                r,
                None,
                "transit-attachment",
                &deployment.waits.transit_attachment,
            );
        }

        Ok(Self {
            deployment: deployment.name.clone(),
            actions: plan.actions,
        })
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn actions_for_region(&self, region: &str) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.region == region).collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        let mut regions: Vec<&str> = self.actions.iter().map(|a| a.region.as_str()).collect();
        regions.sort_unstable();
        regions.dedup();

        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            modify: self.actions_by_type(ActionType::Modify).len(),
            wait: self.actions_by_type(ActionType::Wait).len(),
            regions: regions.len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub modify: usize,
    pub wait: usize,
    pub regions: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to modify, {} waits across {} regions",
            self.create, self.modify, self.wait, self.regions
        )
    }
}
