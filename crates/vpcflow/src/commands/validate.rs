use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let path = match vpcflow_config::resolve_deployment_file(config) {
        Ok(path) => path,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定ファイルが見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    println!("設定ファイル: {}", path.display().to_string().cyan());

    let deployment = match vpcflow_core::load_deployment(&path) {
        Ok(deployment) => deployment,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", deployment.name.cyan());
    println!("  インスタンスタイプ: {}", deployment.instance_type);
    println!("  リージョン: {}個", deployment.regions.len());
    for spec in &deployment.regions {
        println!(
            "    - {} ({}) {} public={} private={} zone={}",
            spec.region.cyan(),
            spec.label(),
            spec.cidr,
            spec.public_subnet,
            spec.private_subnet,
            spec.zone()
        );
    }

    if let Some((initiator, accepter)) = deployment.peering_pair()? {
        println!(
            "  ピアリング: {} → {}",
            initiator.region.cyan(),
            accepter.region.cyan()
        );
    } else {
        println!("  ピアリング: なし（リージョンが1つ）");
    }

    match deployment.hub_anchor()? {
        Some(anchor) => println!(
            "  Transit Gateway: {} (ASN {})",
            anchor.region.cyan(),
            deployment.hub.asn
        ),
        None => println!("  Transit Gateway: 無効"),
    }

    Ok(())
}
