//! KDLパーサー
//!
//! vpcflow の KDL 設定ファイルをパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod network;
mod region;

use network::{parse_hub, parse_peering, parse_waits};

// 外部クレートから再利用可能なパース関数
pub use region::parse_region;

use crate::error::{FlowError, Result};
use crate::model::Deployment;
use kdl::KdlDocument;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてDeploymentを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Deployment> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| FlowError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// KDL文字列をパース
///
/// 構文上の解釈のみを行い、アドレスブロックの検証は [`Deployment::validate`] で行う
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Deployment> {
    let doc: KdlDocument = content.parse()?;

    let mut deployment = Deployment::new(default_name);

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    deployment.name = project_name.to_string();
                }
            }
            "instance-type" | "instance_type" => {
                if let Some(instance_type) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    deployment.instance_type = instance_type.to_string();
                }
            }
            "parallel-regions" | "parallel_regions" => {
                deployment.parallel_regions = node
                    .entries()
                    .first()
                    .and_then(|e| e.value().as_bool())
                    .unwrap_or(true);
            }
            "region" => {
                deployment.regions.push(parse_region(node)?);
            }
            "peering" => {
                deployment.peering = Some(parse_peering(node)?);
            }
            "transit-hub" | "transit_hub" => {
                deployment.hub = parse_hub(node)?;
            }
            "waits" => {
                deployment.waits = parse_waits(node)?;
            }
            other => {
                // 不明なノードはスキップ
                tracing::debug!("Skipping unknown node: {}", other);
            }
        }
    }

    Ok(deployment)
}
