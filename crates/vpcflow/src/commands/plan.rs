use colored::Colorize;
use std::path::Path;
use vpcflow_cloud::{ActionType, ProvisionPlan};

pub fn handle(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (path, deployment) = super::load(config)?;
    let plan = ProvisionPlan::for_deployment(&deployment)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("設定ファイル: {}", path.display().to_string().cyan());
    println!("プロジェクト: {}", plan.deployment.cyan());
    println!();

    let mut current_region: Option<&str> = None;
    for action in &plan.actions {
        if current_region != Some(action.region.as_str()) {
            println!("{}", format!("[{}]", action.region).bold());
            current_region = Some(action.region.as_str());
        }

        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Modify => "~".yellow(),
            ActionType::Wait => "…".blue(),
        };
        println!(
            "  {} {:<18} {}",
            marker,
            action.resource_type,
            action.name.dimmed()
        );
    }

    println!();
    println!("{}", format!("Plan: {}", plan.summary()).bold());
    Ok(())
}
