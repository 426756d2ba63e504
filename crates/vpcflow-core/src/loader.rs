//! 統合ローダー
//!
//! パースと検証を統合

use crate::error::Result;
use crate::model::Deployment;
use crate::parser::parse_kdl_file;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 設定ファイルをロードして検証済みのDeploymentを生成
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_deployment<P: AsRef<Path>>(path: P) -> Result<Deployment> {
    debug!("Step 1: Parsing KDL");
    let deployment = parse_kdl_file(path.as_ref())?;

    debug!("Step 2: Validating address blocks");
    deployment.validate()?;

    info!(
        regions = deployment.regions.len(),
        hub = deployment.hub.enabled,
        "Deployment loaded successfully"
    );
    Ok(deployment)
}
