//! In-memory control plane for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use vpcflow_cloud::{
    AclAssociation, AclEntry, AuthStatus, CloudError, ControlPlane, IngressRule, InstanceRequest,
    LifecycleState, NetworkApi, PeeringStatus, Result, RouteTarget, TransitHubRequest,
};
use vpcflow_core::{Deployment, WaitSettings, parse_kdl_string};

pub const LAB_KDL: &str = r#"
project "lab"
instance-type "t2.micro"

region "us-west-2" {
    label "Oregon"
    cidr "10.0.0.0/16"
    public-subnet "10.0.1.0/24"
    private-subnet "10.0.2.0/24"
    image "ami-00a8151272c45cd8e"
}

region "us-east-1" {
    label "Virginia"
    cidr "10.1.0.0/16"
    public-subnet "10.1.1.0/24"
    private-subnet "10.1.2.0/24"
    image "ami-07ff62358b87c7116"
    key-name "vockey"
}
"#;

/// A/B lab deployment with zero-interval waits
pub fn lab_deployment() -> Deployment {
    let mut deployment = parse_kdl_string(LAB_KDL, "lab".to_string()).unwrap();
    deployment.waits = WaitSettings::immediate();
    deployment
}

/// Injected misbehavior for one (region, operation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The call is rejected
    Reject,
    /// State polls report a failed lifecycle
    FailedState,
    /// State polls stay pending forever
    NeverReady,
    /// Lookups return nothing
    Empty,
}

#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub region: String,
    pub route_table_id: String,
    pub destination: Ipv4Net,
    pub target: RouteTarget,
}

#[derive(Debug, Clone)]
pub struct PeeringRecord {
    pub requester_region: String,
    pub accepter_region: String,
    pub vpc_id: String,
    pub peer_vpc_id: String,
    pub accepted: bool,
    /// Status polls from the accepter side before the request shows up
    pub hidden_polls: u32,
}

#[derive(Debug, Clone)]
pub struct HubRecord {
    pub region: String,
    pub request: TransitHubRequest,
    pub polls: u32,
}

#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub region: String,
    pub transit_gateway_id: String,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub polls: u32,
}

#[derive(Debug, Default)]
pub struct CloudState {
    next_id: u64,
    /// (region, operation) in call order
    pub calls: Vec<(String, String)>,
    pub faults: HashMap<(String, String), Fault>,
    /// Pending answers before an async resource reports available
    pub pending_polls: u32,
    pub vpcs: HashMap<String, (String, Ipv4Net)>,
    pub subnets: HashMap<String, (String, Ipv4Net)>,
    pub routes: Vec<RouteRecord>,
    pub route_table_associations: Vec<(String, String)>,
    pub ingress: HashMap<String, Vec<IngressRule>>,
    pub acl_entries: HashMap<String, Vec<AclEntry>>,
    pub acl_associations: Vec<AclAssociation>,
    pub nat_polls: HashMap<String, u32>,
    pub instances: Vec<(String, InstanceRequest)>,
    pub peerings: HashMap<String, PeeringRecord>,
    pub hubs: HashMap<String, HubRecord>,
    pub attachments: HashMap<String, AttachmentRecord>,
}

impl CloudState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls.iter().filter(|(_, op)| op == operation).count()
    }

    pub fn calls_in(&self, region: &str, operation: &str) -> usize {
        self.calls
            .iter()
            .filter(|(r, op)| r == region && op == operation)
            .count()
    }

    pub fn associations_of(&self, subnet_id: &str) -> Vec<&AclAssociation> {
        self.acl_associations
            .iter()
            .filter(|a| a.subnet_id == subnet_id)
            .collect()
    }

    pub fn peering_routes(&self) -> Vec<&RouteRecord> {
        self.routes
            .iter()
            .filter(|r| matches!(r.target, RouteTarget::PeeringConnection(_)))
            .collect()
    }
}

/// Control plane whose regions share one state
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        let cloud = Self::default();
        cloud.state().pending_polls = 2;
        cloud
    }

    pub fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap()
    }

    pub fn inject(&self, region: &str, operation: &str, fault: Fault) {
        self.state()
            .faults
            .insert((region.to_string(), operation.to_string()), fault);
    }

    pub fn region(&self, region: &str) -> FakeRegion {
        FakeRegion {
            region: region.to_string(),
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl ControlPlane for FakeCloud {
    fn name(&self) -> &str {
        "fake"
    }

    fn display_name(&self) -> &str {
        "In-memory cloud"
    }

    async fn check_auth(&self, region: &str) -> Result<AuthStatus> {
        Ok(AuthStatus::ok(format!("fake account ({})", region)))
    }

    async fn region_api(&self, region: &str) -> Result<Arc<dyn NetworkApi>> {
        Ok(Arc::new(self.region(region)))
    }
}

pub struct FakeRegion {
    region: String,
    state: Arc<Mutex<CloudState>>,
}

impl FakeRegion {
    /// Record the call and apply an injected rejection
    fn enter(&self, operation: &str) -> Result<(MutexGuard<'_, CloudState>, Option<Fault>)> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((self.region.clone(), operation.to_string()));
        let fault = state
            .faults
            .get(&(self.region.clone(), operation.to_string()))
            .copied();
        if fault == Some(Fault::Reject) {
            return Err(CloudError::rejected(
                operation,
                "InjectedFault",
                format!("{} rejected in {}", operation, self.region),
            ));
        }
        Ok((state, fault))
    }

    fn lifecycle(fault: Option<Fault>, polls: u32, pending_polls: u32) -> LifecycleState {
        match fault {
            Some(Fault::FailedState) => LifecycleState::Failed("injected failure".to_string()),
            Some(Fault::NeverReady) => LifecycleState::Pending,
            _ if polls > pending_polls => LifecycleState::Available,
            _ => LifecycleState::Pending,
        }
    }
}

fn not_found(operation: &str, id: &str) -> CloudError {
    CloudError::rejected(operation, "NotFound", format!("{} does not exist", id))
}

#[async_trait]
impl NetworkApi for FakeRegion {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_vpc(&self, cidr: &Ipv4Net, _name: &str) -> Result<String> {
        let (mut state, _) = self.enter("create_vpc")?;
        let id = state.id("vpc");
        state.vpcs.insert(id.clone(), (self.region.clone(), *cidr));
        Ok(id)
    }

    async fn enable_vpc_dns(&self, vpc_id: &str) -> Result<()> {
        let (state, _) = self.enter("enable_vpc_dns")?;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(not_found("enable_vpc_dns", vpc_id));
        }
        Ok(())
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &Ipv4Net,
        _zone: &str,
        _name: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("create_subnet")?;
        let id = state.id("subnet");
        state.subnets.insert(id.clone(), (vpc_id.to_string(), *cidr));

        // 新しいサブネットは VPC のデフォルト ACL に関連付く
        let association_id = state.id("aclassoc");
        state.acl_associations.push(AclAssociation {
            association_id,
            network_acl_id: format!("acl-default-{}", vpc_id),
            subnet_id: id.clone(),
        });
        Ok(id)
    }

    async fn enable_public_ip_on_launch(&self, _subnet_id: &str) -> Result<()> {
        let _state = self.enter("enable_public_ip_on_launch")?;
        Ok(())
    }

    async fn create_internet_gateway(&self, _name: &str) -> Result<String> {
        let (mut state, _) = self.enter("create_internet_gateway")?;
        Ok(state.id("igw"))
    }

    async fn attach_internet_gateway(&self, _gateway_id: &str, _vpc_id: &str) -> Result<()> {
        let _state = self.enter("attach_internet_gateway")?;
        Ok(())
    }

    async fn allocate_address(&self, _name: &str) -> Result<String> {
        let (mut state, _) = self.enter("allocate_address")?;
        Ok(state.id("eipalloc"))
    }

    async fn create_nat_gateway(
        &self,
        _subnet_id: &str,
        _allocation_id: &str,
        _name: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("create_nat_gateway")?;
        Ok(state.id("nat"))
    }

    async fn nat_gateway_state(&self, nat_gateway_id: &str) -> Result<LifecycleState> {
        let (mut state, fault) = self.enter("nat_gateway_state")?;
        let pending = state.pending_polls;
        let polls = state.nat_polls.entry(nat_gateway_id.to_string()).or_insert(0);
        *polls += 1;
        Ok(Self::lifecycle(fault, *polls, pending))
    }

    async fn create_route_table(&self, _vpc_id: &str, _name: &str) -> Result<String> {
        let (mut state, _) = self.enter("create_route_table")?;
        Ok(state.id("rtb"))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &Ipv4Net,
        target: &RouteTarget,
    ) -> Result<()> {
        let (mut state, _) = self.enter("create_route")?;
        state.routes.push(RouteRecord {
            region: self.region.clone(),
            route_table_id: route_table_id.to_string(),
            destination: *destination,
            target: target.clone(),
        });
        Ok(())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("associate_route_table")?;
        state
            .route_table_associations
            .push((route_table_id.to_string(), subnet_id.to_string()));
        Ok(state.id("rtbassoc"))
    }

    async fn create_security_group(
        &self,
        _vpc_id: &str,
        _name: &str,
        _description: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("create_security_group")?;
        Ok(state.id("sg"))
    }

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()> {
        let (mut state, _) = self.enter("authorize_ingress")?;
        let existing = state.ingress.entry(group_id.to_string()).or_default();
        for rule in rules {
            if existing.contains(rule) {
                return Err(CloudError::rejected(
                    "authorize_ingress",
                    "InvalidPermission.Duplicate",
                    "rule already exists",
                ));
            }
            existing.push(rule.clone());
        }
        Ok(())
    }

    async fn create_network_acl(&self, _vpc_id: &str, _name: &str) -> Result<String> {
        let (mut state, _) = self.enter("create_network_acl")?;
        Ok(state.id("acl"))
    }

    async fn create_network_acl_entry(&self, network_acl_id: &str, entry: &AclEntry) -> Result<()> {
        let (mut state, _) = self.enter("create_network_acl_entry")?;
        let entries = state.acl_entries.entry(network_acl_id.to_string()).or_default();
        if entries
            .iter()
            .any(|e| e.rule_number == entry.rule_number && e.egress == entry.egress)
        {
            return Err(CloudError::rejected(
                "create_network_acl_entry",
                "NetworkAclEntryAlreadyExists",
                "duplicate rule number",
            ));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn network_acl_associations(&self, subnet_id: &str) -> Result<Vec<AclAssociation>> {
        let (state, fault) = self.enter("network_acl_associations")?;
        if fault == Some(Fault::Empty) {
            return Ok(Vec::new());
        }
        Ok(state
            .acl_associations
            .iter()
            .filter(|a| a.subnet_id == subnet_id)
            .cloned()
            .collect())
    }

    async fn replace_network_acl_association(
        &self,
        association_id: &str,
        network_acl_id: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("replace_network_acl_association")?;
        let new_id = state.id("aclassoc");
        let Some(association) = state
            .acl_associations
            .iter_mut()
            .find(|a| a.association_id == association_id)
        else {
            return Err(not_found("replace_network_acl_association", association_id));
        };
        association.association_id = new_id.clone();
        association.network_acl_id = network_acl_id.to_string();
        Ok(new_id)
    }

    async fn run_instance(&self, request: &InstanceRequest) -> Result<String> {
        let (mut state, _) = self.enter("run_instance")?;
        state.instances.push((self.region.clone(), request.clone()));
        Ok(state.id("i"))
    }

    async fn create_peering_connection(
        &self,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
        _name: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("create_peering_connection")?;
        let id = state.id("pcx");
        let hidden_polls = state.pending_polls;
        state.peerings.insert(
            id.clone(),
            PeeringRecord {
                requester_region: self.region.clone(),
                accepter_region: peer_region.to_string(),
                vpc_id: vpc_id.to_string(),
                peer_vpc_id: peer_vpc_id.to_string(),
                accepted: false,
                hidden_polls,
            },
        );
        Ok(id)
    }

    async fn peering_status(&self, peering_id: &str) -> Result<PeeringStatus> {
        let (mut state, fault) = self.enter("peering_status")?;
        let Some(peering) = state.peerings.get_mut(peering_id) else {
            return Ok(PeeringStatus::NotVisible);
        };
        if peering.accepted {
            return Ok(PeeringStatus::Active);
        }
        if fault == Some(Fault::FailedState) {
            return Ok(PeeringStatus::Failed("rejected".to_string()));
        }
        if peering.requester_region == self.region {
            return Ok(PeeringStatus::PendingAcceptance);
        }
        if fault == Some(Fault::NeverReady) || peering.hidden_polls > 0 {
            peering.hidden_polls = peering.hidden_polls.saturating_sub(1);
            return Ok(PeeringStatus::NotVisible);
        }
        Ok(PeeringStatus::PendingAcceptance)
    }

    async fn accept_peering_connection(&self, peering_id: &str) -> Result<()> {
        let (mut state, _) = self.enter("accept_peering_connection")?;
        let region = self.region.clone();
        match state.peerings.get_mut(peering_id) {
            Some(peering) if peering.accepter_region == region => {
                peering.accepted = true;
                Ok(())
            }
            Some(_) => Err(CloudError::rejected(
                "accept_peering_connection",
                "OperationNotPermitted",
                "only the accepter region can accept",
            )),
            None => Err(not_found("accept_peering_connection", peering_id)),
        }
    }

    async fn create_transit_gateway(&self, request: &TransitHubRequest) -> Result<String> {
        let (mut state, _) = self.enter("create_transit_gateway")?;
        let id = state.id("tgw");
        state.hubs.insert(
            id.clone(),
            HubRecord {
                region: self.region.clone(),
                request: request.clone(),
                polls: 0,
            },
        );
        Ok(id)
    }

    async fn transit_gateway_state(&self, transit_gateway_id: &str) -> Result<LifecycleState> {
        let (mut state, fault) = self.enter("transit_gateway_state")?;
        let pending = state.pending_polls;
        let Some(hub) = state.hubs.get_mut(transit_gateway_id) else {
            return Err(not_found("transit_gateway_state", transit_gateway_id));
        };
        hub.polls += 1;
        Ok(Self::lifecycle(fault, hub.polls, pending))
    }

    async fn create_transit_attachment(
        &self,
        transit_gateway_id: &str,
        vpc_id: &str,
        subnet_ids: &[String],
        _name: &str,
    ) -> Result<String> {
        let (mut state, _) = self.enter("create_transit_attachment")?;
        let id = state.id("tgw-attach");
        state.attachments.insert(
            id.clone(),
            AttachmentRecord {
                region: self.region.clone(),
                transit_gateway_id: transit_gateway_id.to_string(),
                vpc_id: vpc_id.to_string(),
                subnet_ids: subnet_ids.to_vec(),
                polls: 0,
            },
        );
        Ok(id)
    }

    async fn transit_attachment_state(&self, attachment_id: &str) -> Result<LifecycleState> {
        let (mut state, fault) = self.enter("transit_attachment_state")?;
        let pending = state.pending_polls;
        let Some(attachment) = state.attachments.get_mut(attachment_id) else {
            return Err(not_found("transit_attachment_state", attachment_id));
        };
        attachment.polls += 1;
        Ok(Self::lifecycle(fault, attachment.polls, pending))
    }
}
