//! モデル定義
//!
//! vpcflow で使用される入力側のデータモデルを定義します。

mod deployment;
mod region;

// Re-exports
pub use deployment::*;
pub use region::*;
