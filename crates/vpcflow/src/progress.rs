use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use vpcflow_cloud::{ProgressEvent, ProgressSink};

const PEERING_KEY: &str = "peering";
const HUB_KEY: &str = "hub";

/// リージョンごとにスピナーを出すターミナル表示
pub struct TerminalProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner(&self, key: &str, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message);

        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        bars.insert(key.to_string(), pb);
    }

    fn with_bar(&self, key: &str, f: impl FnOnce(&ProgressBar)) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = bars.get(key) {
            f(pb);
        }
    }

    fn line(&self, message: String) {
        // MultiProgress 経由でないとスピナーの描画と混ざる
        let _ = self.multi.println(message);
    }

    /// 走っているスピナーを止める（失敗で中断した場合）
    pub fn abandon_all(&self) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for pb in bars.values().filter(|pb| !pb.is_finished()) {
            pb.abandon_with_message(format!("{} 中断", "✗".red()));
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RegionStarted { region } => {
                let message = format!("{} 構築開始", region.cyan());
                self.spinner(&region, message);
            }
            ProgressEvent::StepStarted { region, step } => {
                self.with_bar(&region, |pb| {
                    pb.set_message(format!("{} {}", region.cyan(), step.description()));
                });
            }
            ProgressEvent::StepFinished { region, step } => {
                self.line(format!("  {} {} {}", "✓".green(), region.cyan(), step));
            }
            ProgressEvent::Waiting {
                region,
                resource,
                id,
            } => {
                self.with_bar(&region, |pb| {
                    pb.set_message(format!(
                        "{} {} {} を待機中",
                        region.cyan(),
                        resource,
                        id.dimmed()
                    ));
                });
            }
            ProgressEvent::RegionFinished { region } => {
                self.with_bar(&region, |pb| {
                    pb.finish_with_message(format!("{} {} 完了", "✓".green(), region.cyan()));
                });
            }
            ProgressEvent::RegionFailed {
                region,
                step,
                message,
            } => {
                self.with_bar(&region, |pb| {
                    pb.abandon_with_message(format!(
                        "{} {} {}: {}",
                        "✗".red(),
                        region.cyan(),
                        step,
                        message
                    ));
                });
            }
            ProgressEvent::PeeringStarted {
                initiator,
                accepter,
            } => {
                let message = format!("ピアリング {} → {}", initiator.cyan(), accepter.cyan());
                self.spinner(PEERING_KEY, message);
            }
            ProgressEvent::PeeringFinished { peering_id, routes } => {
                self.with_bar(PEERING_KEY, |pb| {
                    pb.finish_with_message(format!(
                        "{} ピアリング {} (ルート {}本)",
                        "✓".green(),
                        peering_id,
                        routes
                    ));
                });
            }
            ProgressEvent::HubStarted { region } => {
                let message = format!("Transit Gateway ({})", region.cyan());
                self.spinner(HUB_KEY, message);
            }
            ProgressEvent::HubFinished {
                hub_id,
                attachment_id,
            } => {
                self.with_bar(HUB_KEY, |pb| {
                    pb.finish_with_message(format!(
                        "{} Transit Gateway {} (attachment {})",
                        "✓".green(),
                        hub_id,
                        attachment_id
                    ));
                });
            }
        }
    }
}
