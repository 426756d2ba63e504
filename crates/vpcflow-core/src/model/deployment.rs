//! デプロイメント全体のモデル
//!
//! 複数リージョンの構成と、ピアリング・Transit Gateway・待機設定をまとめたもの

use super::region::{RegionSpec, overlaps};
use crate::error::{FlowError, Result};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// インスタンスタイプのデフォルト
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Transit Gateway の Amazon 側 ASN のデフォルト
pub const DEFAULT_HUB_ASN: i64 = 64512;

/// デプロイメント構成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// プロジェクト名
    pub name: String,

    /// 全リージョン共通のインスタンスタイプ
    pub instance_type: String,

    /// リージョン定義（定義順を保持）
    pub regions: Vec<RegionSpec>,

    /// ピアリング設定（未指定時は先頭2リージョン）
    pub peering: Option<PeeringSpec>,

    /// Transit Gateway 設定
    pub hub: HubSpec,

    /// 非同期リソースの待機設定
    pub waits: WaitSettings,

    /// リージョンごとの構築を並列に実行するか
    pub parallel_regions: bool,
}

impl Deployment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            regions: Vec::new(),
            peering: None,
            hub: HubSpec::default(),
            waits: WaitSettings::default(),
            parallel_regions: false,
        }
    }

    pub fn region(&self, id: &str) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.region == id)
    }

    /// 指定リージョン以外の全 VPC ブロック
    ///
    /// セキュリティグループのクロスリージョン許可ルールに使用
    pub fn peer_cidrs(&self, region: &str) -> Vec<Ipv4Net> {
        let mut cidrs: Vec<Ipv4Net> = Vec::new();
        for spec in self.regions.iter().filter(|r| r.region != region) {
            if !cidrs.contains(&spec.cidr) {
                cidrs.push(spec.cidr);
            }
        }
        cidrs
    }

    /// ピアリングする (initiator, accepter) の組を解決
    ///
    /// リージョンが1つしかない場合は None
    pub fn peering_pair(&self) -> Result<Option<(&RegionSpec, &RegionSpec)>> {
        match &self.peering {
            Some(peering) => {
                let initiator = self
                    .region(&peering.initiator)
                    .ok_or_else(|| FlowError::RegionNotFound(peering.initiator.clone()))?;
                let accepter = self
                    .region(&peering.accepter)
                    .ok_or_else(|| FlowError::RegionNotFound(peering.accepter.clone()))?;
                Ok(Some((initiator, accepter)))
            }
            None => match self.regions.as_slice() {
                [first, second, ..] => Ok(Some((first, second))),
                _ => Ok(None),
            },
        }
    }

    /// Transit Gateway をアタッチするリージョンを解決
    pub fn hub_anchor(&self) -> Result<Option<&RegionSpec>> {
        if !self.hub.enabled {
            return Ok(None);
        }
        match &self.hub.anchor {
            Some(anchor) => self
                .region(anchor)
                .map(Some)
                .ok_or_else(|| FlowError::RegionNotFound(anchor.clone())),
            None => Ok(self.regions.first()),
        }
    }

    /// 構成全体を検証
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(FlowError::NoRegions);
        }

        let mut seen = HashSet::new();
        for spec in &self.regions {
            if !seen.insert(spec.region.as_str()) {
                return Err(FlowError::DuplicateRegion(spec.region.clone()));
            }
            spec.validate()?;
        }

        // ピアリングするVPC同士はアドレスが重なってはいけない
        for (i, a) in self.regions.iter().enumerate() {
            for b in self.regions.iter().skip(i + 1) {
                if overlaps(&a.cidr, &b.cidr) {
                    return Err(FlowError::InvalidConfig(format!(
                        "リージョン '{}' ({}) と '{}' ({}) の VPC ブロックが重なっています",
                        a.region, a.cidr, b.region, b.cidr
                    )));
                }
            }
        }

        if let Some((initiator, accepter)) = self.peering_pair()?
            && initiator.region == accepter.region
        {
            return Err(FlowError::InvalidConfig(format!(
                "ピアリングの initiator と accepter が同じリージョンです: {}",
                initiator.region
            )));
        }

        self.hub_anchor()?;

        if self.instance_type.trim().is_empty() {
            return Err(FlowError::InvalidConfig(
                "instance-type が空です".to_string(),
            ));
        }

        Ok(())
    }
}

/// ピアリング設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringSpec {
    /// リクエストを発行する側のリージョン
    pub initiator: String,
    /// リクエストを承認する側のリージョン
    pub accepter: String,
}

/// Transit Gateway 設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSpec {
    pub enabled: bool,

    /// アタッチ先リージョン（未指定時は先頭リージョン）
    pub anchor: Option<String>,

    /// Amazon 側 ASN
    pub asn: i64,

    pub description: String,
}

impl Default for HubSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            anchor: None,
            asn: DEFAULT_HUB_ASN,
            description: "Multi-Region TGW".to_string(),
        }
    }
}

/// 1種類の非同期リソースに対する待機ポリシー（固定間隔）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// ポーリング間隔（ミリ秒）
    pub interval_ms: u64,
    /// 最大試行回数
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub fn from_secs(interval_secs: u64, max_attempts: u32) -> Self {
        Self {
            interval_ms: interval_secs * 1000,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 待機時間の上限（最後の試行後は待たない）
    pub fn ceiling(&self) -> Duration {
        self.interval() * self.max_attempts.saturating_sub(1)
    }
}

/// リソース種別ごとの待機設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    pub nat_gateway: WaitPolicy,
    pub transit_hub: WaitPolicy,
    pub transit_attachment: WaitPolicy,
    pub peering: WaitPolicy,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            // EC2 の nat_gateway_available waiter と同じ予算
            nat_gateway: WaitPolicy::from_secs(15, 40),
            transit_hub: WaitPolicy::from_secs(10, 60),
            transit_attachment: WaitPolicy::from_secs(5, 60),
            peering: WaitPolicy::from_secs(5, 12),
        }
    }
}

impl WaitSettings {
    /// 間隔0で待機する設定（試行回数はデフォルトのまま）
    pub fn immediate() -> Self {
        let defaults = Self::default();
        let zero = |p: WaitPolicy| WaitPolicy {
            interval_ms: 0,
            max_attempts: p.max_attempts,
        };
        Self {
            nat_gateway: zero(defaults.nat_gateway),
            transit_hub: zero(defaults.transit_hub),
            transit_attachment: zero(defaults.transit_attachment),
            peering: zero(defaults.peering),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, second_octet: u8) -> RegionSpec {
        RegionSpec {
            region: id.to_string(),
            label: None,
            cidr: format!("10.{}.0.0/16", second_octet).parse().unwrap(),
            public_subnet: format!("10.{}.1.0/24", second_octet).parse().unwrap(),
            private_subnet: format!("10.{}.2.0/24", second_octet).parse().unwrap(),
            image: "ami-test".to_string(),
            key_name: None,
            availability_zone: "a".to_string(),
        }
    }

    fn two_regions() -> Deployment {
        let mut deployment = Deployment::new("test");
        deployment.regions.push(region("us-west-2", 0));
        deployment.regions.push(region("us-east-1", 1));
        deployment
    }

    #[test]
    fn test_default_pairing_uses_first_two() {
        let deployment = two_regions();
        let (a, b) = deployment.peering_pair().unwrap().unwrap();
        assert_eq!(a.region, "us-west-2");
        assert_eq!(b.region, "us-east-1");
    }

    #[test]
    fn test_single_region_has_no_pair() {
        let mut deployment = Deployment::new("solo");
        deployment.regions.push(region("us-west-2", 0));
        assert!(deployment.peering_pair().unwrap().is_none());
        assert!(deployment.peer_cidrs("us-west-2").is_empty());
    }

    #[test]
    fn test_explicit_pairing_unknown_region() {
        let mut deployment = two_regions();
        deployment.peering = Some(PeeringSpec {
            initiator: "us-west-2".to_string(),
            accepter: "eu-west-1".to_string(),
        });
        assert!(matches!(
            deployment.peering_pair(),
            Err(FlowError::RegionNotFound(r)) if r == "eu-west-1"
        ));
    }

    #[test]
    fn test_peer_cidrs_exclude_self() {
        let mut deployment = two_regions();
        deployment.regions.push(region("eu-west-1", 2));

        let peers = deployment.peer_cidrs("us-east-1");
        assert_eq!(peers.len(), 2);
        assert!(peers.contains(&"10.0.0.0/16".parse().unwrap()));
        assert!(peers.contains(&"10.2.0.0/16".parse().unwrap()));
    }

    #[test]
    fn test_overlapping_vpcs_rejected() {
        let mut deployment = two_regions();
        deployment.regions[1] = region("us-east-1", 0);
        assert!(deployment.validate().is_err());
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let mut deployment = two_regions();
        deployment.regions.push(region("us-west-2", 3));
        assert!(matches!(
            deployment.validate(),
            Err(FlowError::DuplicateRegion(_))
        ));
    }

    #[test]
    fn test_hub_anchor_defaults_to_first_region() {
        let mut deployment = two_regions();
        assert_eq!(deployment.hub_anchor().unwrap().unwrap().region, "us-west-2");

        deployment.hub.anchor = Some("us-east-1".to_string());
        assert_eq!(deployment.hub_anchor().unwrap().unwrap().region, "us-east-1");

        deployment.hub.enabled = false;
        assert!(deployment.hub_anchor().unwrap().is_none());
    }

    #[test]
    fn test_wait_policy_ceiling() {
        let policy = WaitPolicy::from_secs(10, 60);
        assert_eq!(policy.ceiling(), Duration::from_secs(590));
        assert_eq!(WaitSettings::immediate().transit_hub.interval(), Duration::ZERO);
    }

    #[test]
    fn test_empty_deployment_rejected() {
        assert!(matches!(
            Deployment::new("empty").validate(),
            Err(FlowError::NoRegions)
        ));
    }
}
