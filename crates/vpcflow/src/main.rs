mod commands;
mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vpcflow")]
#[command(about = "KDLで書いたマルチリージョンVPCを、そのまま構築する。", long_about = None)]
struct Cli {
    /// デバッグログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 全リージョンのネットワークを構築し、ピアリングとTransit Gatewayで接続
    Up {
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "VPCFLOW_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// リージョンを並列に構築
        #[arg(long)]
        parallel: bool,
        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 実行される操作を表示（APIは呼ばない）
    Plan {
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "VPCFLOW_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// 計画をJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 設定を検証
    Validate {
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "VPCFLOW_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// AWS認証情報を確認
    Auth {
        /// 確認するリージョン（省略時は設定ファイルの全リージョン）
        #[arg(short, long)]
        region: Option<String>,
        /// 設定ファイルのパス（省略時は自動探索）
        #[arg(short, long, env = "VPCFLOW_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ。stdoutは --json の出力に使う
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Up {
            config,
            parallel,
            json,
        } => {
            commands::up::handle(config.as_deref(), parallel, json).await?;
        }
        Commands::Plan { config, json } => {
            commands::plan::handle(config.as_deref(), json)?;
        }
        Commands::Validate { config } => {
            commands::validate::handle(config.as_deref())?;
        }
        Commands::Auth { region, config } => {
            commands::auth::handle(region, config.as_deref()).await?;
        }
        Commands::Version => {
            println!("vpcflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
