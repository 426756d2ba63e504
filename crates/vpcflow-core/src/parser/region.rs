//! region ノードのパース

use crate::error::{FlowError, Result};
use crate::model::{DEFAULT_ZONE_SUFFIX, RegionSpec};
use ipnet::Ipv4Net;
use kdl::KdlNode;

/// ノードの最初の引数を文字列として取得
pub(super) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn parse_cidr(region: &str, field: &str, value: Option<String>) -> Result<Option<Ipv4Net>> {
    match value {
        Some(raw) => raw
            .parse::<Ipv4Net>()
            .map(Some)
            .map_err(|_| FlowError::InvalidCidr {
                field: format!("{}.{}", region, field),
                value: raw,
            }),
        None => Ok(None),
    }
}

/// region ノードをパース
///
/// ```kdl
/// region "us-east-1" {
///     label "Virginia"
///     cidr "10.1.0.0/16"
///     public-subnet "10.1.1.0/24"
///     private-subnet "10.1.2.0/24"
///     image "ami-07ff62358b87c7116"
///     key-name "vockey"
///     availability-zone "a"
/// }
/// ```
pub fn parse_region(node: &KdlNode) -> Result<RegionSpec> {
    let region = first_string(node)
        .ok_or_else(|| FlowError::InvalidConfig("region requires a name".to_string()))?;

    let mut label = None;
    let mut cidr = None;
    let mut public_subnet = None;
    let mut private_subnet = None;
    let mut image = None;
    let mut key_name = None;
    let mut availability_zone = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "label" | "name" => label = first_string(child),
                "cidr" | "vpc-cidr" | "vpc_cidr" => {
                    cidr = parse_cidr(&region, "cidr", first_string(child))?;
                }
                "public-subnet" | "public_subnet" => {
                    public_subnet = parse_cidr(&region, "public-subnet", first_string(child))?;
                }
                "private-subnet" | "private_subnet" => {
                    private_subnet = parse_cidr(&region, "private-subnet", first_string(child))?;
                }
                "image" | "ami" => image = first_string(child),
                "key-name" | "key_name" | "key-pair" => key_name = first_string(child),
                "availability-zone" | "availability_zone" | "zone" => {
                    availability_zone = first_string(child);
                }
                other => {
                    tracing::debug!("Ignoring unknown region field: {}", other);
                }
            }
        }
    }

    let missing = |field: &'static str| FlowError::MissingField {
        region: region.clone(),
        field,
    };

    Ok(RegionSpec {
        cidr: cidr.ok_or_else(|| missing("cidr"))?,
        public_subnet: public_subnet.ok_or_else(|| missing("public-subnet"))?,
        private_subnet: private_subnet.ok_or_else(|| missing("private-subnet"))?,
        image: image.ok_or_else(|| missing("image"))?,
        label,
        key_name,
        availability_zone: availability_zone.unwrap_or_else(|| DEFAULT_ZONE_SUFFIX.to_string()),
        region,
    })
}
