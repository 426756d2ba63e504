pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 設定ファイルパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "VPCFLOW_CONFIG_PATH";

/// 探索する設定ファイル名（優先順）
const CANDIDATES: [&str; 4] = [
    "vpcflow.local.kdl",
    ".vpcflow.local.kdl",
    "vpcflow.kdl",
    ".vpcflow.kdl",
];

/// グローバル設定ファイルのパス (~/.config/vpcflow/vpcflow.kdl)
pub fn global_deployment_file() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(config_dir.join("vpcflow").join("vpcflow.kdl"))
}

/// 設定ファイルを解決
///
/// 明示的なパス（--config）があればそれを使い、なければ [`find_deployment_file`] で探索する
pub fn resolve_deployment_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ConfigError::ExplicitPathNotFound(path.to_path_buf())),
        None => find_deployment_file(),
    }
}

/// カレントディレクトリから設定ファイルを探す
pub fn find_deployment_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_deployment_file_in(&current_dir)
}

/// 指定ディレクトリを起点に設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 VPCFLOW_CONFIG_PATH (直接パス指定)
/// 2. 起点ディレクトリ: vpcflow.local.kdl, .vpcflow.local.kdl, vpcflow.kdl, .vpcflow.kdl
/// 3. ./.vpcflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/vpcflow/vpcflow.kdl (グローバル設定)
pub fn find_deployment_file_in(start: &Path) -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    // 2. 起点ディレクトリで検索
    for filename in &CANDIDATES {
        let path = start.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.vpcflow/ ディレクトリで検索
    let flow_dir = start.join(".vpcflow");
    if flow_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = flow_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Ok(global_config) = global_deployment_file()
        && global_config.exists()
    {
        return Ok(global_config);
    }

    Err(ConfigError::DeploymentFileNotFound)
}
