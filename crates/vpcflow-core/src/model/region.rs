//! リージョン定義
//!
//! 1リージョン分のネットワーク構成（VPC・サブネット・AMIなど）を表します。

use crate::error::{FlowError, Result};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// アベイラビリティゾーン未指定時のサフィックス
pub const DEFAULT_ZONE_SUFFIX: &str = "a";

/// 1リージョン分の宣言的な構成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// リージョン識別子（us-west-2 など）
    pub region: String,

    /// Nameタグに使う表示名（未指定時はリージョン識別子）
    pub label: Option<String>,

    /// VPC のアドレスブロック
    pub cidr: Ipv4Net,

    /// パブリックサブネットのアドレスブロック
    pub public_subnet: Ipv4Net,

    /// プライベートサブネットのアドレスブロック
    pub private_subnet: Ipv4Net,

    /// インスタンスに使うマシンイメージ（AMI ID）
    pub image: String,

    /// ログイン用キーペア名（指定されたリージョンのみ）
    pub key_name: Option<String>,

    /// アベイラビリティゾーン指定
    /// "a" のようなサフィックス、または "us-west-2a" のような完全名
    pub availability_zone: String,
}

impl RegionSpec {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.region)
    }

    /// アベイラビリティゾーン名を解決
    pub fn zone(&self) -> String {
        let selector = self.availability_zone.as_str();
        if selector.starts_with(&self.region) {
            selector.to_string()
        } else {
            format!("{}{}", self.region, selector)
        }
    }

    /// リソース名を生成（例: "Oregon-Public-Subnet"）
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.label(), suffix)
    }

    /// アドレスブロックの不変条件を検証
    ///
    /// - 各ブロックはネットワークアドレスで指定されていること
    /// - パブリック/プライベートサブネットはVPCブロックの部分範囲であること
    /// - 2つのサブネットは重ならないこと
    pub fn validate(&self) -> Result<()> {
        for (field, net) in [
            ("cidr", self.cidr),
            ("public-subnet", self.public_subnet),
            ("private-subnet", self.private_subnet),
        ] {
            if net.trunc() != net {
                return Err(FlowError::InvalidConfig(format!(
                    "リージョン '{}' の {} ({}) はネットワークアドレスではありません（{} を指定してください）",
                    self.region,
                    field,
                    net,
                    net.trunc()
                )));
            }
        }

        for (field, subnet) in [
            ("public-subnet", self.public_subnet),
            ("private-subnet", self.private_subnet),
        ] {
            if !self.cidr.contains(&subnet) {
                return Err(FlowError::InvalidConfig(format!(
                    "リージョン '{}' の {} ({}) が VPC ブロック {} に含まれていません",
                    self.region, field, subnet, self.cidr
                )));
            }
        }

        if overlaps(&self.public_subnet, &self.private_subnet) {
            return Err(FlowError::InvalidConfig(format!(
                "リージョン '{}' のパブリックサブネット {} とプライベートサブネット {} が重なっています",
                self.region, self.public_subnet, self.private_subnet
            )));
        }

        if self.image.trim().is_empty() {
            return Err(FlowError::MissingField {
                region: self.region.clone(),
                field: "image",
            });
        }

        Ok(())
    }
}

/// 2つのCIDRブロックが重なっているか
///
/// CIDR同士は包含関係になるか完全に離れるかのどちらか
pub fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(b) || b.contains(a)
}
