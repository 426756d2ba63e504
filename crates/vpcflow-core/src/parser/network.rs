//! peering / transit-hub / waits ノードのパース

use super::region::first_string;
use crate::error::{FlowError, Result};
use crate::model::{HubSpec, PeeringSpec, WaitPolicy, WaitSettings};
use kdl::KdlNode;

/// peering ノードをパース
pub fn parse_peering(node: &KdlNode) -> Result<PeeringSpec> {
    let mut initiator = None;
    let mut accepter = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "initiator" | "from" => initiator = first_string(child),
                "accepter" | "acceptor" | "to" => accepter = first_string(child),
                _ => {}
            }
        }
    }

    match (initiator, accepter) {
        (Some(initiator), Some(accepter)) => Ok(PeeringSpec {
            initiator,
            accepter,
        }),
        _ => Err(FlowError::InvalidConfig(
            "peering requires both initiator and accepter".to_string(),
        )),
    }
}

/// transit-hub ノードをパース
pub fn parse_hub(node: &KdlNode) -> Result<HubSpec> {
    let mut hub = HubSpec::default();

    // transit-hub enabled=#false
    if let Some(enabled) = node.get("enabled").and_then(|v| v.as_bool()) {
        hub.enabled = enabled;
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "anchor" | "region" => hub.anchor = first_string(child),
                "asn" => {
                    if let Some(entry) = child.entries().first()
                        && let Some(value) = entry.value().as_integer()
                    {
                        hub.asn = i64::try_from(value).map_err(|_| {
                            FlowError::InvalidConfig(format!("asn is out of range: {}", value))
                        })?;
                    }
                }
                "description" => {
                    if let Some(description) = first_string(child) {
                        hub.description = description;
                    }
                }
                "enabled" => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_bool()) {
                        hub.enabled = value;
                    }
                }
                _ => {}
            }
        }
    }

    Ok(hub)
}

/// waits ノードをパース
///
/// ```kdl
/// waits {
///     nat-gateway interval=15 attempts=40
///     transit-hub interval=10 attempts=60
/// }
/// ```
pub fn parse_waits(node: &KdlNode) -> Result<WaitSettings> {
    let mut waits = WaitSettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let target = match child.name().value() {
                "nat-gateway" | "nat_gateway" | "nat" => &mut waits.nat_gateway,
                "transit-hub" | "transit_hub" => &mut waits.transit_hub,
                "transit-attachment" | "transit_attachment" => &mut waits.transit_attachment,
                "peering" => &mut waits.peering,
                other => {
                    return Err(FlowError::InvalidConfig(format!(
                        "unknown wait target: {}",
                        other
                    )));
                }
            };
            *target = parse_wait_policy(child, *target)?;
        }
    }

    Ok(waits)
}

fn parse_wait_policy(node: &KdlNode, default: WaitPolicy) -> Result<WaitPolicy> {
    let mut policy = default;

    if let Some(interval) = node.get("interval").and_then(|v| v.as_integer()) {
        let secs = u64::try_from(interval).map_err(|_| {
            FlowError::InvalidConfig(format!("interval must not be negative: {}", interval))
        })?;
        policy.interval_ms = secs.checked_mul(1000).ok_or_else(|| {
            FlowError::InvalidConfig(format!("interval is too large: {}", interval))
        })?;
    }

    if let Some(attempts) = node.get("attempts").and_then(|v| v.as_integer()) {
        policy.max_attempts = u32::try_from(attempts)
            .ok()
            .filter(|a| *a > 0)
            .ok_or_else(|| {
                FlowError::InvalidConfig(format!("attempts must be positive: {}", attempts))
            })?;
    }

    Ok(policy)
}
