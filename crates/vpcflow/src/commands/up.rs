use crate::progress::TerminalProgress;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use vpcflow_cloud::{Orchestrator, RunReport};

pub async fn handle(config: Option<&Path>, parallel: bool, json: bool) -> anyhow::Result<()> {
    let (path, mut deployment) = super::load(config)?;
    if parallel {
        deployment.parallel_regions = true;
    }

    let control = super::control_plane()?;
    let mut orchestrator = Orchestrator::new(control);
    let progress = Arc::new(TerminalProgress::new());

    if !json {
        println!("設定ファイル: {}", path.display().to_string().cyan());
        println!(
            "プロジェクト: {} ({}リージョン{})",
            deployment.name.cyan(),
            deployment.regions.len(),
            if deployment.parallel_regions {
                ", 並列"
            } else {
                ""
            }
        );
        println!();
        orchestrator = orchestrator.with_progress(progress.clone());
    }

    match orchestrator.run(&deployment).await {
        Ok(report) => {
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!();
                println!("{}", "✓ 構築が完了しました".green().bold());
                print_report(&report);
            }
            Ok(())
        }
        Err(failure) => {
            progress.abandon_all();
            if json {
                println!("{}", failure.report.to_json()?);
            } else {
                print_report(&failure.report);
            }

            eprintln!();
            eprintln!(
                "{} {} で失敗しました",
                "✗".red().bold(),
                failure.stage.to_string().bold()
            );
            eprintln!("  {}", failure.error);
            if failure.error.is_retriable() {
                eprintln!(
                    "{}",
                    "ヒント: 一時的なエラーです。作成済みのリソースは上記の通り残っています".yellow()
                );
            }
            std::process::exit(1);
        }
    }
}

/// 作成済みのリソースIDを表示（失敗時は途中までのもの）
fn print_report(report: &RunReport) {
    for topology in &report.topologies {
        println!();
        println!(
            "{} {} ({})",
            topology.label.bold(),
            topology.region.cyan(),
            topology.cidr
        );
        for (field, id) in topology.identifiers() {
            match id {
                Some(id) => println!("  {:<24} {}", field, id),
                None => println!("  {:<24} {}", field, "-".dimmed()),
            }
        }
    }

    for link in &report.links {
        println!();
        println!(
            "{} {} ↔ {}",
            "Peering".bold(),
            link.initiator.cyan(),
            link.accepter.cyan()
        );
        println!("  {:<24} {}", "peering_id", link.peering_id);
        for route in &link.routes {
            println!(
                "  {:<24} {} {} → {}",
                "route",
                route.region,
                route.route_table_id,
                route.destination
            );
        }
    }

    if let Some(hub) = &report.hub {
        println!();
        println!("{} {}", "Transit Gateway".bold(), hub.region.cyan());
        println!("  {:<24} {}", "hub_id", hub.hub_id);
        println!("  {:<24} {}", "attachment_id", hub.attachment_id);
    }

    if let Some(id) = &report.dangling_peering_id {
        println!();
        println!("{} {}", "⚠ 未完了のピアリング:".yellow(), id);
        for route in &report.dangling_routes {
            println!(
                "  {:<24} {} {} → {}",
                "route",
                route.region,
                route.route_table_id,
                route.destination
            );
        }
    }
    if let Some(id) = &report.dangling_hub_id {
        println!();
        println!("{} {}", "⚠ 未完了のTransit Gateway:".yellow(), id);
        if let Some(attachment) = &report.dangling_attachment_id {
            println!("  {:<24} {}", "attachment_id", attachment);
        }
    }
}
