use colored::Colorize;
use std::path::Path;

pub async fn handle(region: Option<String>, config: Option<&Path>) -> anyhow::Result<()> {
    let regions = match region {
        Some(region) => vec![region],
        None => {
            let (_, deployment) = super::load(config)?;
            deployment.regions.into_iter().map(|r| r.region).collect()
        }
    };

    let control = super::control_plane()?;
    println!(
        "{}",
        format!("{} の認証情報を確認中...", control.display_name()).blue()
    );

    let mut failed = 0;
    for region in &regions {
        let status = control.check_auth(region).await?;
        if status.authenticated {
            println!(
                "  {} {} {}",
                "✓".green(),
                region.cyan(),
                status.account_info.unwrap_or_default()
            );
        } else {
            failed += 1;
            println!(
                "  {} {} {}",
                "✗".red(),
                region.cyan(),
                status.error.unwrap_or_default()
            );
        }
    }

    if failed > 0 {
        anyhow::bail!("{}/{} リージョンで認証に失敗しました", failed, regions.len());
    }
    Ok(())
}
