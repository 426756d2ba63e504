#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

const LAB_KDL: &str = r#"
project "multi-region-lab"
instance-type "t2.micro"

region "us-west-2" {
    label "Oregon"
    cidr "10.0.0.0/16"
    public-subnet "10.0.1.0/24"
    private-subnet "10.0.2.0/24"
    image "ami-00a8151272c45cd8e"
}

region "us-east-1" {
    label "Virginia"
    cidr "10.1.0.0/16"
    public-subnet "10.1.1.0/24"
    private-subnet "10.1.2.0/24"
    image "ami-07ff62358b87c7116"
    key-name "vockey"
}
"#;

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("vpcflow.kdl");
    std::fs::write(&path, content).unwrap();
    path
}

fn vpcflow() -> Command {
    let mut cmd = Command::cargo_bin("vpcflow").unwrap();
    cmd.env_remove("VPCFLOW_CONFIG_PATH");
    cmd
}

/// CLIヘルプにサブコマンドが並ぶことを確認
#[test]
fn test_cli_help() {
    vpcflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("auth"));
}

#[test]
fn test_cli_version() {
    vpcflow()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpcflow"));
}

#[test]
fn test_up_help() {
    vpcflow()
        .arg("up")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--parallel"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_invalid_command() {
    vpcflow().arg("invalid-command").assert().failure();
}

#[test]
fn test_validate_ok() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, LAB_KDL);

    vpcflow()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("us-west-2"))
        .stdout(predicate::str::contains("Virginia"))
        .stdout(predicate::str::contains("64512"));
}

/// アドレス帯が重なる設定は検証で落ちる
#[test]
fn test_validate_overlapping_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, &LAB_KDL.replace("10.1.0.0/16", "10.0.0.0/16"));

    vpcflow()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定エラー"));
}

#[test]
fn test_validate_missing_explicit_path() {
    vpcflow()
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/vpcflow.kdl")
        .assert()
        .failure();
}

/// 設定ファイルのディレクトリで実行すれば自動で見つかる
#[test]
fn test_validate_discovers_file_in_current_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_config(&dir, LAB_KDL);

    vpcflow()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("multi-region-lab"));
}

#[test]
fn test_plan_lists_actions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, LAB_KDL);

    vpcflow()
        .arg("plan")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Oregon-VPC"))
        .stdout(predicate::str::contains("Virginia-NAT"))
        .stdout(predicate::str::contains("Oregon-Virginia-Peering"))
        .stdout(predicate::str::contains("Plan:"));
}

#[test]
fn test_plan_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, LAB_KDL);

    let output = vpcflow()
        .arg("plan")
        .arg("--json")
        .env("VPCFLOW_CONFIG_PATH", &path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["deployment"], "multi-region-lab");
    assert!(plan["actions"].as_array().unwrap().len() > 20);
}
