#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("knotgen").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("version"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("knotgen").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("knotgen"));
}

/// generateコマンドのヘルプにフラグが揃っていることを確認
#[test]
fn test_generate_help() {
    let mut cmd = Command::cargo_bin("knotgen").unwrap();
    cmd.arg("generate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[BUILD_CONTEXT]"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--instances"))
        .stdout(predicate::str::contains("--strict-labels"))
        .stdout(predicate::str::contains("KNOTGEN_INSTANCES"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("knotgen").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_generate_writes_all_artifacts() {
    let project = TestProject::new();
    project.write_labels(&["x", "y", "z"]);

    project
        .knotgen()
        .args(["generate", "../app", "--instances", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("トポロジー検証 OK"))
        .stdout(predicate::str::contains("作成 11"));

    for id in 1..=3 {
        assert!(project.exists(&format!("envs/instance{}.env", id)));
        assert!(project.exists(&format!("postgres/instance{}/pg_hba.conf", id)));
        assert!(project.exists(&format!("postgres/instance{}/postgresql.conf", id)));
    }

    let compose: serde_yaml::Value =
        serde_yaml::from_str(&project.read("docker-compose.yml")).unwrap();
    assert_eq!(compose["services"].as_mapping().unwrap().len(), 21);
    assert_eq!(compose["networks"].as_mapping().unwrap().len(), 3);
    assert_eq!(compose["volumes"].as_mapping().unwrap().len(), 3);
    assert_eq!(
        compose["services"]["app-server-1"]["build"]["context"].as_str(),
        Some("../app")
    );

    let nginx = project.read("nginx.conf");
    assert_eq!(nginx.matches("server {").count(), 3);
    assert!(nginx.contains("server_name z.example.com;"));
    assert!(nginx.contains("proxy_pass http://127.0.0.1:8083;"));

    let env = project.read("envs/instance2.env");
    assert!(env.contains("AUGUR_PORT=7002\n"));
    assert!(env.contains("DEFAULT_SEARCHBAR_LABEL=y\n"));
}

#[test]
fn test_rerun_without_force_skips_existing_files() {
    let project = TestProject::new();
    project.write_labels(&["x", "y"]);

    project
        .knotgen()
        .args(["generate", "-n", "2"])
        .assert()
        .success();
    project.write_file("nginx.conf", "# hand edited\n");

    project
        .knotgen()
        .args(["generate", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("スキップ（既存）: nginx.conf"))
        .stdout(predicate::str::contains("--force"));
    assert_eq!(project.read("nginx.conf"), "# hand edited\n");

    project
        .knotgen()
        .args(["generate", "-n", "2", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("上書き: nginx.conf"));
    assert!(project.read("nginx.conf").contains("server_name x.example.com;"));
}

#[test]
fn test_failed_write_is_reported_and_siblings_are_written() {
    let project = TestProject::new();
    project.write_labels(&["x", "y"]);
    std::fs::create_dir(project.path().join("nginx.conf")).unwrap();

    project
        .knotgen()
        .args(["generate", "-n", "2", "--force"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("失敗: nginx.conf"))
        .stderr(predicate::str::contains("1個のファイルの書き込みに失敗しました"))
        .stderr(predicate::str::contains("nginx.conf"));

    assert!(project.read("docker-compose.yml").contains("app-server-2"));
    assert!(project.exists("envs/instance2.env"));
}

#[test]
fn test_strict_labels_failure_writes_nothing() {
    let project = TestProject::new();
    project.write_labels(&["x", "y"]);

    project
        .knotgen()
        .args(["generate", "-n", "3", "--strict-labels"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ラベルが不足しています"));

    assert!(!project.exists("docker-compose.yml"));
    assert!(!project.exists("envs"));
}

#[test]
fn test_overlapping_ports_fail_validation() {
    let project = TestProject::new();
    project.write_labels(&["x", "y", "z"]);

    project
        .knotgen()
        .args(["generate", "-n", "3", "--base-http-port", "7001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("トポロジー検証に失敗しました"))
        .stderr(predicate::str::contains("port '7002' <- instance 1, 2"));

    assert!(!project.exists("docker-compose.yml"));
    assert!(!project.exists("nginx.conf"));
}

#[test]
fn test_similar_labels_get_distinct_server_names() {
    let project = TestProject::new();
    project.write_labels(&["a", "a-3"]);

    project
        .knotgen()
        .args(["generate", "-n", "3"])
        .assert()
        .success();

    let nginx = project.read("nginx.conf");
    assert!(nginx.contains("server_name a.example.com;"));
    assert!(nginx.contains("server_name a-3.example.com;"));
    assert!(nginx.contains("server_name a--3.example.com;"));
}

#[test]
fn test_labels_are_reused_cyclically() {
    let project = TestProject::new();
    project.write_labels(&["a", "b", "c"]);

    project
        .knotgen()
        .args(["generate", "-n", "5"])
        .assert()
        .success();

    assert!(project.read("envs/instance4.env").contains("DEFAULT_SEARCHBAR_LABEL=a\n"));
    assert!(project.read("envs/instance5.env").contains("DEFAULT_SEARCHBAR_LABEL=b\n"));
    assert!(project.read("nginx.conf").contains("server_name a--4.example.com;"));
}

#[test]
fn test_missing_label_file_uses_default_label() {
    let project = TestProject::new();

    project
        .knotgen()
        .args(["generate", "-n", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("labels.txt が見つかりません"));

    assert!(project.read("envs/instance1.env").contains("DEFAULT_SEARCHBAR_LABEL=default\n"));
}

#[test]
fn test_comment_only_label_file_warns_about_fallback() {
    let project = TestProject::new();
    project.write_file("labels.txt", "# no labels yet\n\n");

    project
        .knotgen()
        .args(["generate", "-n", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "labels.txt に有効なラベルがありません。ラベル 'default' を使用します",
        ));

    assert!(project.read("envs/instance1.env").contains("DEFAULT_SEARCHBAR_LABEL=default\n"));
}

#[test]
fn test_secrets_file_feeds_credentials() {
    let project = TestProject::new();
    project.write_labels(&["x"]);
    project.write_file(
        ".secrets.env",
        "AUGUR_PASSWORD=upstream-pw\nCREDENTIAL_SEED=seed\n",
    );

    project
        .knotgen()
        .args(["generate", "-n", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("⚠").not());

    let env = project.read("envs/instance1.env");
    assert!(env.contains("AUGUR_PASSWORD=upstream-pw\n"));
    assert!(env.contains("REDIS_CACHE_PASSWORD=seed-cache-1\n"));
    assert!(env.contains("POSTGRES_PASSWORD=seed-db-1\n"));
}

#[test]
fn test_missing_secrets_file_warns_and_continues() {
    let project = TestProject::new();
    project.write_labels(&["x"]);

    project
        .knotgen()
        .args(["generate", "-n", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains(".secrets.env を読み込めません"));

    assert!(project.read("envs/instance1.env").contains("AUGUR_PASSWORD=augur\n"));
}

#[test]
fn test_output_dir_and_custom_ports() {
    let project = TestProject::new();
    project.write_labels(&["x", "y"]);

    project
        .knotgen()
        .args([
            "generate",
            "-n",
            "2",
            "--output-dir",
            "out",
            "--base-http-port",
            "9000",
            "--base-upstream-port",
            "6000",
            "--domain",
            "8knot.test",
        ])
        .assert()
        .success();

    assert!(!project.exists("docker-compose.yml"));
    let nginx = project.read("out/nginx.conf");
    assert!(nginx.contains("server_name y.8knot.test;"));
    assert!(nginx.contains("proxy_pass http://127.0.0.1:9002;"));
    assert!(project.read("out/envs/instance1.env").contains("AUGUR_PORT=6001\n"));
}

#[test]
fn test_settings_file_and_env_override() {
    let project = TestProject::new();
    project.write_labels(&["x", "y", "z"]);
    project.write_file("knotgen.yaml", "instances: 2\ndomain: settings.test\n");

    project
        .knotgen()
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("knotgen.yaml"));
    assert!(project.exists("envs/instance2.env"));
    assert!(!project.exists("envs/instance3.env"));
    assert!(project.read("nginx.conf").contains("server_name x.settings.test;"));

    project
        .knotgen()
        .env("KNOTGEN_INSTANCES", "3")
        .arg("generate")
        .assert()
        .success();
    assert!(project.exists("envs/instance3.env"));
}

#[test]
fn test_invalid_settings_file_fails() {
    let project = TestProject::new();
    project.write_labels(&["x"]);
    project.write_file("knotgen.yaml", "instance_count: 2\n");

    project
        .knotgen()
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定ファイルの形式が不正です"));
}

#[test]
fn test_plan_is_a_dry_run() {
    let project = TestProject::new();
    project.write_labels(&["x", "y", "z"]);

    project
        .knotgen()
        .args(["plan", "-n", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[2] y (y.example.com)"))
        .stdout(predicate::str::contains("http: 8083"))
        .stdout(predicate::str::contains("起動順 (instance 1):"));

    assert!(!project.exists("docker-compose.yml"));
    assert!(!project.exists("envs"));
}

#[test]
fn test_plan_json_output() {
    let project = TestProject::new();
    project.write_labels(&["x", "y"]);

    let output = project
        .knotgen()
        .args(["plan", "-n", "2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[1]["http_port"], 8082);
    assert_eq!(plans[1]["network_name"], "net-2");
    assert!(plans[1].get("credentials").is_none());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("pass-cache-1"));
    assert!(!stdout.contains("pass-db-2"));
}

#[test]
fn test_zero_instances_is_rejected() {
    let project = TestProject::new();
    project.write_labels(&["x"]);

    project
        .knotgen()
        .args(["generate", "-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("インスタンス数は1以上"));
}
