//! EC2-backed control plane
//!
//! Every request goes through [`with_backoff`], so throttled calls are
//! retried before they surface; the SDK's own retry layer is disabled.
//! All created resources carry a `Name` tag.

use crate::error::{PEERING_NOT_FOUND, missing_id, sdk_error};
use async_trait::async_trait;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::{
    AttributeBooleanValue, DefaultRouteTableAssociationValue, DefaultRouteTablePropagationValue,
    DnsSupportValue, DomainType, Filter, IcmpTypeCode, InstanceNetworkInterfaceSpecification,
    InstanceType, IpPermission, IpRange, NatGatewayState, PortRange, ResourceType, RuleAction,
    Tag, TagSpecification, TransitGatewayAttachmentState, TransitGatewayRequestOptions,
    TransitGatewayState, VpcPeeringConnectionStateReasonCode, VpnEcmpSupportValue,
};
use ipnet::Ipv4Net;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use vpcflow_cloud::{
    AclAssociation, AclEntry, AuthStatus, CloudError, ControlPlane, IngressRule, InstanceRequest,
    LifecycleState, NetworkApi, PeeringStatus, Protocol, Result, RetryConfig, RouteTarget,
    TransitHubRequest, with_backoff,
};

/// AWS control plane; hands out one EC2 client per region
pub struct AwsControlPlane {
    retry: RetryConfig,
    regions: Mutex<HashMap<String, Arc<AwsNetworkApi>>>,
}

impl AwsControlPlane {
    pub fn new() -> Self {
        Self::with_retry(RetryConfig::default())
    }

    pub fn with_retry(retry: RetryConfig) -> Self {
        Self {
            retry,
            regions: Mutex::new(HashMap::new()),
        }
    }

    async fn client_for(region: &str) -> Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(sdk_retry_config())
            .load()
            .await;
        Client::new(&config)
    }
}

/// SDK 側のリトライは切る。バックオフは `with_backoff` だけが持つ
fn sdk_retry_config() -> SdkRetryConfig {
    SdkRetryConfig::disabled()
}

impl Default for AwsControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for AwsControlPlane {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services (EC2)"
    }

    async fn check_auth(&self, region: &str) -> Result<AuthStatus> {
        let client = Self::client_for(region).await;
        match client.describe_account_attributes().send().await {
            Ok(output) => {
                let platforms = output
                    .account_attributes()
                    .iter()
                    .find(|a| a.attribute_name() == Some("supported-platforms"))
                    .map(|a| {
                        a.attribute_values()
                            .iter()
                            .filter_map(|v| v.attribute_value())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_else(|| "unknown".to_string());
                Ok(AuthStatus::ok(format!(
                    "EC2 {} (platforms: {})",
                    region, platforms
                )))
            }
            Err(e) => Ok(AuthStatus::failed(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn region_api(&self, region: &str) -> Result<Arc<dyn NetworkApi>> {
        let mut regions = self.regions.lock().await;
        if let Some(api) = regions.get(region) {
            return Ok(api.clone());
        }

        tracing::debug!(region, "creating EC2 client");
        let api = Arc::new(AwsNetworkApi {
            region: region.to_string(),
            client: Self::client_for(region).await,
            retry: self.retry.clone(),
        });
        regions.insert(region.to_string(), api.clone());
        Ok(api)
    }
}

/// EC2 client bound to one region
pub struct AwsNetworkApi {
    region: String,
    client: Client,
    retry: RetryConfig,
}

fn name_tag(resource_type: ResourceType, name: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key("Name").value(name).build())
        .build()
}

fn enabled() -> AttributeBooleanValue {
    AttributeBooleanValue::builder().value(true).build()
}

fn ip_permission(rule: &IngressRule) -> IpPermission {
    let builder = IpPermission::builder()
        .ip_protocol(rule.protocol.group_name())
        .ip_ranges(IpRange::builder().cidr_ip(rule.cidr.to_string()).build());
    match rule.protocol {
        Protocol::All => builder.build(),
        Protocol::Tcp | Protocol::Icmp => builder
            .from_port(rule.from_port)
            .to_port(rule.to_port)
            .build(),
    }
}

pub(crate) fn nat_state(state: Option<&NatGatewayState>, failure: Option<&str>) -> LifecycleState {
    match state {
        Some(NatGatewayState::Available) => LifecycleState::Available,
        Some(NatGatewayState::Failed | NatGatewayState::Deleting | NatGatewayState::Deleted) => {
            LifecycleState::Failed(failure.unwrap_or("NAT gateway failed").to_string())
        }
        _ => LifecycleState::Pending,
    }
}

pub(crate) fn hub_state(state: Option<&TransitGatewayState>) -> LifecycleState {
    match state {
        Some(TransitGatewayState::Available) => LifecycleState::Available,
        Some(s @ (TransitGatewayState::Deleting | TransitGatewayState::Deleted)) => {
            LifecycleState::Failed(format!("transit gateway is {}", s.as_str()))
        }
        _ => LifecycleState::Pending,
    }
}

pub(crate) fn attachment_state(state: Option<&TransitGatewayAttachmentState>) -> LifecycleState {
    match state {
        Some(TransitGatewayAttachmentState::Available) => LifecycleState::Available,
        Some(
            s @ (TransitGatewayAttachmentState::Failed
            | TransitGatewayAttachmentState::Failing
            | TransitGatewayAttachmentState::Rejected
            | TransitGatewayAttachmentState::Rejecting
            | TransitGatewayAttachmentState::Deleting
            | TransitGatewayAttachmentState::Deleted),
        ) => LifecycleState::Failed(format!("attachment is {}", s.as_str())),
        _ => LifecycleState::Pending,
    }
}

pub(crate) fn peering_state(
    code: Option<&VpcPeeringConnectionStateReasonCode>,
    message: Option<&str>,
) -> PeeringStatus {
    match code {
        Some(VpcPeeringConnectionStateReasonCode::PendingAcceptance) => {
            PeeringStatus::PendingAcceptance
        }
        Some(VpcPeeringConnectionStateReasonCode::Active) => PeeringStatus::Active,
        Some(VpcPeeringConnectionStateReasonCode::Provisioning) => PeeringStatus::Provisioning,
        Some(VpcPeeringConnectionStateReasonCode::InitiatingRequest) | None => {
            PeeringStatus::Initiating
        }
        Some(other) => PeeringStatus::Failed(format!(
            "{}: {}",
            other.as_str(),
            message.unwrap_or("no reason given")
        )),
    }
}

#[async_trait]
impl NetworkApi for AwsNetworkApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create_vpc(&self, cidr: &Ipv4Net, name: &str) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateVpc", move || async move {
            client
                .create_vpc()
                .cidr_block(cidr.to_string())
                .tag_specifications(name_tag(ResourceType::Vpc, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateVpc", e))
        })
        .await?;

        let vpc_id = output
            .vpc()
            .and_then(|v| v.vpc_id())
            .ok_or_else(|| missing_id("CreateVpc", "VpcId"))?;
        tracing::info!(region = %self.region, vpc = vpc_id, %cidr, "created VPC");
        Ok(vpc_id.to_string())
    }

    async fn enable_vpc_dns(&self, vpc_id: &str) -> Result<()> {
        let client = &self.client;
        // 属性は1リクエストに1つしか指定できない
        with_backoff(&self.retry, "ModifyVpcAttribute", move || async move {
            client
                .modify_vpc_attribute()
                .vpc_id(vpc_id)
                .enable_dns_support(enabled())
                .send()
                .await
                .map_err(|e| sdk_error("ModifyVpcAttribute", e))
        })
        .await?;
        with_backoff(&self.retry, "ModifyVpcAttribute", move || async move {
            client
                .modify_vpc_attribute()
                .vpc_id(vpc_id)
                .enable_dns_hostnames(enabled())
                .send()
                .await
                .map_err(|e| sdk_error("ModifyVpcAttribute", e))
        })
        .await?;
        Ok(())
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr: &Ipv4Net,
        zone: &str,
        name: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateSubnet", move || async move {
            client
                .create_subnet()
                .vpc_id(vpc_id)
                .cidr_block(cidr.to_string())
                .availability_zone(zone)
                .tag_specifications(name_tag(ResourceType::Subnet, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateSubnet", e))
        })
        .await?;

        output
            .subnet()
            .and_then(|s| s.subnet_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateSubnet", "SubnetId"))
    }

    async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()> {
        let client = &self.client;
        with_backoff(&self.retry, "ModifySubnetAttribute", move || async move {
            client
                .modify_subnet_attribute()
                .subnet_id(subnet_id)
                .map_public_ip_on_launch(enabled())
                .send()
                .await
                .map_err(|e| sdk_error("ModifySubnetAttribute", e))
        })
        .await?;
        Ok(())
    }

    async fn create_internet_gateway(&self, name: &str) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateInternetGateway", move || async move {
            client
                .create_internet_gateway()
                .tag_specifications(name_tag(ResourceType::InternetGateway, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateInternetGateway", e))
        })
        .await?;

        output
            .internet_gateway()
            .and_then(|g| g.internet_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateInternetGateway", "InternetGatewayId"))
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        let client = &self.client;
        with_backoff(&self.retry, "AttachInternetGateway", move || async move {
            client
                .attach_internet_gateway()
                .internet_gateway_id(gateway_id)
                .vpc_id(vpc_id)
                .send()
                .await
                .map_err(|e| sdk_error("AttachInternetGateway", e))
        })
        .await?;
        Ok(())
    }

    async fn allocate_address(&self, name: &str) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "AllocateAddress", move || async move {
            client
                .allocate_address()
                .domain(DomainType::Vpc)
                .tag_specifications(name_tag(ResourceType::ElasticIp, name))
                .send()
                .await
                .map_err(|e| sdk_error("AllocateAddress", e))
        })
        .await?;

        output
            .allocation_id()
            .map(str::to_string)
            .ok_or_else(|| missing_id("AllocateAddress", "AllocationId"))
    }

    async fn create_nat_gateway(
        &self,
        subnet_id: &str,
        allocation_id: &str,
        name: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateNatGateway", move || async move {
            client
                .create_nat_gateway()
                .subnet_id(subnet_id)
                .allocation_id(allocation_id)
                .tag_specifications(name_tag(ResourceType::Natgateway, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateNatGateway", e))
        })
        .await?;

        output
            .nat_gateway()
            .and_then(|n| n.nat_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateNatGateway", "NatGatewayId"))
    }

    async fn nat_gateway_state(&self, nat_gateway_id: &str) -> Result<LifecycleState> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "DescribeNatGateways", move || async move {
            client
                .describe_nat_gateways()
                .nat_gateway_ids(nat_gateway_id)
                .send()
                .await
                .map_err(|e| sdk_error("DescribeNatGateways", e))
        })
        .await?;

        // 作成直後は一覧に現れないことがある
        Ok(match output.nat_gateways().first() {
            Some(nat) => nat_state(nat.state(), nat.failure_message()),
            None => LifecycleState::Pending,
        })
    }

    async fn create_route_table(&self, vpc_id: &str, name: &str) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateRouteTable", move || async move {
            client
                .create_route_table()
                .vpc_id(vpc_id)
                .tag_specifications(name_tag(ResourceType::RouteTable, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateRouteTable", e))
        })
        .await?;

        output
            .route_table()
            .and_then(|r| r.route_table_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateRouteTable", "RouteTableId"))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &Ipv4Net,
        target: &RouteTarget,
    ) -> Result<()> {
        let client = &self.client;
        with_backoff(&self.retry, "CreateRoute", move || async move {
            let request = client
                .create_route()
                .route_table_id(route_table_id)
                .destination_cidr_block(destination.to_string());
            let request = match target {
                RouteTarget::InternetGateway(id) => request.gateway_id(id),
                RouteTarget::NatGateway(id) => request.nat_gateway_id(id),
                RouteTarget::PeeringConnection(id) => request.vpc_peering_connection_id(id),
            };
            request
                .send()
                .await
                .map_err(|e| sdk_error("CreateRoute", e))
        })
        .await?;

        tracing::debug!(
            region = %self.region,
            route_table = route_table_id,
            %destination,
            target = target.id(),
            "created route"
        );
        Ok(())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "AssociateRouteTable", move || async move {
            client
                .associate_route_table()
                .route_table_id(route_table_id)
                .subnet_id(subnet_id)
                .send()
                .await
                .map_err(|e| sdk_error("AssociateRouteTable", e))
        })
        .await?;

        output
            .association_id()
            .map(str::to_string)
            .ok_or_else(|| missing_id("AssociateRouteTable", "AssociationId"))
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateSecurityGroup", move || async move {
            client
                .create_security_group()
                .group_name(name)
                .description(description)
                .vpc_id(vpc_id)
                .tag_specifications(name_tag(ResourceType::SecurityGroup, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateSecurityGroup", e))
        })
        .await?;

        output
            .group_id()
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateSecurityGroup", "GroupId"))
    }

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()> {
        let client = &self.client;
        with_backoff(&self.retry, "AuthorizeSecurityGroupIngress", move || async move {
            client
                .authorize_security_group_ingress()
                .group_id(group_id)
                .set_ip_permissions(Some(rules.iter().map(ip_permission).collect()))
                .send()
                .await
                .map_err(|e| sdk_error("AuthorizeSecurityGroupIngress", e))
        })
        .await?;
        Ok(())
    }

    async fn create_network_acl(&self, vpc_id: &str, name: &str) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateNetworkAcl", move || async move {
            client
                .create_network_acl()
                .vpc_id(vpc_id)
                .tag_specifications(name_tag(ResourceType::NetworkAcl, name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateNetworkAcl", e))
        })
        .await?;

        output
            .network_acl()
            .and_then(|a| a.network_acl_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateNetworkAcl", "NetworkAclId"))
    }

    async fn create_network_acl_entry(&self, network_acl_id: &str, entry: &AclEntry) -> Result<()> {
        let client = &self.client;
        with_backoff(&self.retry, "CreateNetworkAclEntry", move || async move {
            let mut request = client
                .create_network_acl_entry()
                .network_acl_id(network_acl_id)
                .rule_number(entry.rule_number)
                .protocol(entry.protocol.number())
                .rule_action(RuleAction::Allow)
                .egress(entry.egress)
                .cidr_block(entry.cidr.to_string());
            if let Some((from, to)) = entry.ports {
                request = request.port_range(PortRange::builder().from(from).to(to).build());
            }
            if entry.protocol == Protocol::Icmp {
                let any = IcmpTypeCode::builder().r#type(-1).code(-1).build();
                request = request.icmp_type_code(any);
            }
            request
                .send()
                .await
                .map_err(|e| sdk_error("CreateNetworkAclEntry", e))
        })
        .await?;
        Ok(())
    }

    async fn network_acl_associations(&self, subnet_id: &str) -> Result<Vec<AclAssociation>> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "DescribeNetworkAcls", move || async move {
            client
                .describe_network_acls()
                .filters(
                    Filter::builder()
                        .name("association.subnet-id")
                        .values(subnet_id)
                        .build(),
                )
                .send()
                .await
                .map_err(|e| sdk_error("DescribeNetworkAcls", e))
        })
        .await?;

        let mut associations = Vec::new();
        for acl in output.network_acls() {
            for association in acl.associations() {
                if let (Some(association_id), Some(network_acl_id), Some(subnet)) = (
                    association.network_acl_association_id(),
                    association.network_acl_id(),
                    association.subnet_id(),
                ) {
                    associations.push(AclAssociation {
                        association_id: association_id.to_string(),
                        network_acl_id: network_acl_id.to_string(),
                        subnet_id: subnet.to_string(),
                    });
                }
            }
        }
        Ok(associations)
    }

    async fn replace_network_acl_association(
        &self,
        association_id: &str,
        network_acl_id: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(
            &self.retry,
            "ReplaceNetworkAclAssociation",
            move || async move {
                client
                    .replace_network_acl_association()
                    .association_id(association_id)
                    .network_acl_id(network_acl_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error("ReplaceNetworkAclAssociation", e))
            },
        )
        .await?;

        output
            .new_association_id()
            .map(str::to_string)
            .ok_or_else(|| missing_id("ReplaceNetworkAclAssociation", "NewAssociationId"))
    }

    async fn run_instance(&self, request: &InstanceRequest) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "RunInstances", move || async move {
            let interface = InstanceNetworkInterfaceSpecification::builder()
                .device_index(0)
                .subnet_id(&request.subnet_id)
                .groups(&request.security_group_id)
                .associate_public_ip_address(request.public_address)
                .build();
            client
                .run_instances()
                .image_id(&request.image_id)
                .instance_type(InstanceType::from(request.instance_type.as_str()))
                .min_count(1)
                .max_count(1)
                .network_interfaces(interface)
                .set_key_name(request.key_name.clone())
                .tag_specifications(name_tag(ResourceType::Instance, &request.name))
                .send()
                .await
                .map_err(|e| sdk_error("RunInstances", e))
        })
        .await?;

        let instance_id = output
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .ok_or_else(|| missing_id("RunInstances", "InstanceId"))?;
        tracing::info!(
            region = %self.region,
            instance = instance_id,
            name = %request.name,
            "launched instance"
        );
        Ok(instance_id.to_string())
    }

    async fn create_peering_connection(
        &self,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_region: &str,
        name: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(
            &self.retry,
            "CreateVpcPeeringConnection",
            move || async move {
                client
                    .create_vpc_peering_connection()
                    .vpc_id(vpc_id)
                    .peer_vpc_id(peer_vpc_id)
                    .peer_region(peer_region)
                    .tag_specifications(name_tag(ResourceType::VpcPeeringConnection, name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("CreateVpcPeeringConnection", e))
            },
        )
        .await?;

        output
            .vpc_peering_connection()
            .and_then(|p| p.vpc_peering_connection_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateVpcPeeringConnection", "VpcPeeringConnectionId"))
    }

    async fn peering_status(&self, peering_id: &str) -> Result<PeeringStatus> {
        let client = &self.client;
        let result = with_backoff(
            &self.retry,
            "DescribeVpcPeeringConnections",
            move || async move {
                match client
                    .describe_vpc_peering_connections()
                    .vpc_peering_connection_ids(peering_id)
                    .send()
                    .await
                {
                    Ok(output) => Ok(Some(output)),
                    // 相手リージョンへの伝播前
                    Err(e) if e.code() == Some(PEERING_NOT_FOUND) => Ok(None),
                    Err(e) => Err(sdk_error("DescribeVpcPeeringConnections", e)),
                }
            },
        )
        .await?;

        let Some(output) = result else {
            return Ok(PeeringStatus::NotVisible);
        };
        Ok(match output.vpc_peering_connections().first() {
            Some(connection) => {
                let status = connection.status();
                peering_state(
                    status.and_then(|s| s.code()),
                    status.and_then(|s| s.message()),
                )
            }
            None => PeeringStatus::NotVisible,
        })
    }

    async fn accept_peering_connection(&self, peering_id: &str) -> Result<()> {
        let client = &self.client;
        with_backoff(
            &self.retry,
            "AcceptVpcPeeringConnection",
            move || async move {
                client
                    .accept_vpc_peering_connection()
                    .vpc_peering_connection_id(peering_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error("AcceptVpcPeeringConnection", e))
            },
        )
        .await?;
        tracing::info!(region = %self.region, peering = peering_id, "accepted peering connection");
        Ok(())
    }

    async fn create_transit_gateway(&self, request: &TransitHubRequest) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "CreateTransitGateway", move || async move {
            let options = TransitGatewayRequestOptions::builder()
                .amazon_side_asn(request.asn)
                .default_route_table_association(DefaultRouteTableAssociationValue::Enable)
                .default_route_table_propagation(DefaultRouteTablePropagationValue::Enable)
                .dns_support(DnsSupportValue::Enable)
                .vpn_ecmp_support(VpnEcmpSupportValue::Enable)
                .build();
            client
                .create_transit_gateway()
                .description(&request.description)
                .options(options)
                .tag_specifications(name_tag(ResourceType::TransitGateway, &request.name))
                .send()
                .await
                .map_err(|e| sdk_error("CreateTransitGateway", e))
        })
        .await?;

        output
            .transit_gateway()
            .and_then(|t| t.transit_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| missing_id("CreateTransitGateway", "TransitGatewayId"))
    }

    async fn transit_gateway_state(&self, transit_gateway_id: &str) -> Result<LifecycleState> {
        let client = &self.client;
        let output = with_backoff(&self.retry, "DescribeTransitGateways", move || async move {
            client
                .describe_transit_gateways()
                .transit_gateway_ids(transit_gateway_id)
                .send()
                .await
                .map_err(|e| sdk_error("DescribeTransitGateways", e))
        })
        .await?;

        Ok(match output.transit_gateways().first() {
            Some(hub) => hub_state(hub.state()),
            None => LifecycleState::Pending,
        })
    }

    async fn create_transit_attachment(
        &self,
        transit_gateway_id: &str,
        vpc_id: &str,
        subnet_ids: &[String],
        name: &str,
    ) -> Result<String> {
        let client = &self.client;
        let output = with_backoff(
            &self.retry,
            "CreateTransitGatewayVpcAttachment",
            move || async move {
                client
                    .create_transit_gateway_vpc_attachment()
                    .transit_gateway_id(transit_gateway_id)
                    .vpc_id(vpc_id)
                    .set_subnet_ids(Some(subnet_ids.to_vec()))
                    .tag_specifications(name_tag(ResourceType::TransitGatewayAttachment, name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("CreateTransitGatewayVpcAttachment", e))
            },
        )
        .await?;

        output
            .transit_gateway_vpc_attachment()
            .and_then(|a| a.transit_gateway_attachment_id())
            .map(str::to_string)
            .ok_or_else(|| {
                missing_id("CreateTransitGatewayVpcAttachment", "TransitGatewayAttachmentId")
            })
    }

    async fn transit_attachment_state(&self, attachment_id: &str) -> Result<LifecycleState> {
        let client = &self.client;
        let output = with_backoff(
            &self.retry,
            "DescribeTransitGatewayVpcAttachments",
            move || async move {
                client
                    .describe_transit_gateway_vpc_attachments()
                    .transit_gateway_attachment_ids(attachment_id)
                    .send()
                    .await
                    .map_err(|e| sdk_error("DescribeTransitGatewayVpcAttachments", e))
            },
        )
        .await?;

        Ok(match output.transit_gateway_vpc_attachments().first() {
            Some(attachment) => attachment_state(attachment.state()),
            None => LifecycleState::Pending,
        })
    }
}
