//! vpcflow Core
//!
//! マルチリージョン VPC 構成の宣言的モデルと、その KDL パーサーを提供します。

pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use error::{FlowError, Result};
pub use loader::load_deployment;
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string, parse_region};
