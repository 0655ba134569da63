#![allow(clippy::unwrap_used, missing_docs)]

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &str = include_str!("../../crawler-core/tests/fixtures/boostablebosses.html");
const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// A `tibia-crawler` command isolated from the user's config and environment.
fn crawler_cmd(config_dir: &TempDir) -> Command {
    let config = config_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tibia-crawler"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env_remove("TIBIA_CRAWLER_BASE_URL");
    cmd.env("NO_COLOR", "1");
    cmd.arg("--config").arg(config);
    cmd
}

async fn origin(template: ResponseTemplate) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/"))
        .and(query_param("subtopic", "boostablebosses"))
        .respond_with(template)
        .mount(&mock_server)
        .await;
    mock_server
}

#[test]
fn test_help_lists_commands() {
    Command::new(assert_cmd::cargo::cargo_bin!("tibia-crawler"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bosses"))
        .stdout(predicate::str::contains("boosted"));
}

#[test]
fn test_invalid_base_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    crawler_cmd(&dir)
        .args(["--base-url", "not a url", "bosses"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid base URL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bosses_prints_json() -> anyhow::Result<()> {
    let mock_server = origin(ResponseTemplate::new(200).set_body_string(FIXTURE)).await;
    let dir = tempfile::tempdir()?;
    let mut cmd = crawler_cmd(&dir);
    cmd.args(["--base-url", &mock_server.uri(), "bosses", "--no-rate-limit"]);

    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;
    let assert = output.assert().success();

    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(value["boosted"]["name"], "Utua Stone Sting");
    assert_eq!(value["boostable_boss_list"].as_array().map(Vec::len), Some(91));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_boosted_prints_text() -> anyhow::Result<()> {
    let mock_server = origin(ResponseTemplate::new(200).set_body_string(FIXTURE)).await;
    let dir = tempfile::tempdir()?;
    let mut cmd = crawler_cmd(&dir);
    cmd.args([
        "--base-url",
        &mock_server.uri(),
        "boosted",
        "--format",
        "text",
        "--no-rate-limit",
    ]);

    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;
    output.assert().success().stdout(predicate::str::starts_with(
        "Utua Stone Sting\thttps://static.tibia.com/images/global/header/monsters/utua.gif",
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_maintenance_is_reported() -> anyhow::Result<()> {
    let mock_server = origin(
        ResponseTemplate::new(302).insert_header("location", "https://maintenance.tibia.com/"),
    )
    .await;
    let dir = tempfile::tempdir()?;
    let mut cmd = crawler_cmd(&dir);
    cmd.args(["--base-url", &mock_server.uri(), "bosses", "--retries", "3"]);

    let output = tokio::task::spawn_blocking(move || cmd.output()).await??;
    output
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("maintenance"));
    Ok(())
}
