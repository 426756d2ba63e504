pub mod auth;
pub mod plan;
pub mod up;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use vpcflow_cloud::ControlPlane;
use vpcflow_core::Deployment;

/// 設定ファイルを探してロード（検証込み）
pub fn load(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, Deployment)> {
    let path = vpcflow_config::resolve_deployment_file(explicit)?;
    tracing::debug!(path = %path.display(), "using deployment file");
    let deployment = vpcflow_core::load_deployment(&path)?;
    Ok((path, deployment))
}

#[cfg(feature = "aws-cloud")]
pub fn control_plane() -> anyhow::Result<Arc<dyn ControlPlane>> {
    Ok(Arc::new(vpcflow_cloud_aws::AwsControlPlane::new()))
}

#[cfg(not(feature = "aws-cloud"))]
pub fn control_plane() -> anyhow::Result<Arc<dyn ControlPlane>> {
    anyhow::bail!("このバイナリは aws-cloud feature なしでビルドされています")
}
