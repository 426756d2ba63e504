use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("CIDR '{value}' を解釈できません ({field})")]
    InvalidCidr { field: String, value: String },

    #[error("リージョン '{region}' の {field} が指定されていません")]
    MissingField { region: String, field: &'static str },

    #[error("リージョンが見つかりません: {0}")]
    RegionNotFound(String),

    #[error("リージョン '{0}' が重複しています")]
    DuplicateRegion(String),

    #[error(
        "リージョンが定義されていません\nヒント: vpcflow.kdl に region \"us-west-2\" {{ ... }} を追加してください"
    )]
    NoRegions,
}

pub type Result<T> = std::result::Result<T, FlowError>;
