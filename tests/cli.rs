mod support;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use support::MockApi;
use tempfile::TempDir;

fn para_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_para-cli"))
}

fn write_config(dir: &Path, endpoint: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            r#"[credentials]
access_key = "app:test"
secret_key = "secret"
endpoint = "{}"

[client]
max_retries = 0
timeout_secs = 5
"#,
            endpoint
        ),
    )
    .unwrap();
    path
}

/// Run the binary with a clean environment; returns (stdout, stderr, success).
fn run_para(home: &Path, config: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(para_binary())
        .env("HOME", home)
        .env_remove("PARA_ACCESS_KEY")
        .env_remove("PARA_SECRET_KEY")
        .env_remove("PARA_ENDPOINT")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run para-cli: {}", e));

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

async fn run_para_async(home: PathBuf, config: PathBuf, args: Vec<String>) -> (String, String, bool) {
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_para(&home, &config, &args)
    })
    .await
    .unwrap()
}

#[test]
fn create_without_matches_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "http://127.0.0.1:9");
    let cwd = tmp.path().to_str().unwrap();

    let (_, stderr, ok) = run_para(tmp.path(), &config, &["create", "nothing/*.md", "--cwd", cwd]);
    assert!(!ok);
    assert!(stderr.contains("✖ No files specified."), "stderr: {}", stderr);
}

#[test]
fn create_without_pattern_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "http://127.0.0.1:9");
    let (_, stderr, ok) = run_para(tmp.path(), &config, &["create"]);
    assert!(!ok);
    assert!(stderr.contains("No files specified."));
}

#[test]
fn read_requires_an_id() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "http://127.0.0.1:9");
    let (_, stderr, ok) = run_para(tmp.path(), &config, &["read"]);
    assert!(!ok);
    assert!(stderr.contains("Must specify object id."));
}

#[test]
fn bad_endpoint_flag_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "http://127.0.0.1:9");
    let (_, stderr, ok) = run_para(tmp.path(), &config, &["--endpoint", "ftp://x", "ping"]);
    assert!(!ok);
    assert!(stderr.contains("http:// or https://"), "stderr: {}", stderr);
}

#[test]
fn new_jwt_is_written_to_config() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("fresh/config.toml");

    let (stdout, stderr, ok) = run_para(tmp.path(), &config, &["new-jwt"]);
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("New JWT generated and saved in"));

    let saved = fs::read_to_string(&config).unwrap();
    assert!(saved.contains("jwt = \"ey"));
    assert!(saved.contains("access_key = \"app:app\""));
}

#[test]
fn default_config_lives_under_home() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(para_binary())
        .env("HOME", tmp.path())
        .env_remove("PARA_ACCESS_KEY")
        .env_remove("PARA_SECRET_KEY")
        .env_remove("PARA_ENDPOINT")
        .arg("new-jwt")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(tmp.path().join(".config/para-cli/config.toml").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn ping_reports_identity() {
    let api = MockApi::default();
    let base = api.start().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &base);

    let (stdout, stderr, ok) =
        run_para_async(tmp.path().to_path_buf(), config, vec!["ping".to_string()]).await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("✔ Authenticated as: app Test (app:test)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn create_submits_one_batch() {
    let api = MockApi::default();
    let base = api.start().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &base);
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("a.md"), "# Alpha\n\nfirst").unwrap();
    fs::write(docs.join("b.json"), r#"{"title": "Beta"}"#).unwrap();
    fs::write(docs.join("c.png"), "not really").unwrap();

    let args = vec![
        "create".to_string(),
        "docs/*".to_string(),
        "--type".to_string(),
        "note".to_string(),
        "--cwd".to_string(),
        tmp.path().to_string_lossy().to_string(),
    ];
    let (stdout, stderr, ok) = run_para_async(tmp.path().to_path_buf(), config, args).await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("✔ Created 2 objects"), "stdout: {}", stdout);
    assert!(stderr.contains("Creating docs/a.md"));

    let seen = api.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1/_batch");
    let body = seen[0].body.as_array().unwrap();
    assert_eq!(body.len(), 2);
    assert!(body.iter().all(|o| o["type"] == "note"));
    assert_eq!(body[1]["title"], "Beta");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_fails_when_every_batch_fails() {
    let api = MockApi::default();
    api.reply(400, json!({"message": "nope"}));
    let base = api.start().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &base);
    fs::write(tmp.path().join("a.txt"), "hello").unwrap();

    let args = vec![
        "create".to_string(),
        "a.txt".to_string(),
        "--cwd".to_string(),
        tmp.path().to_string_lossy().to_string(),
    ];
    let (stdout, stderr, ok) = run_para_async(tmp.path().to_path_buf(), config, args).await;
    assert!(!ok);
    assert!(stdout.contains("HTTP 400: nope"), "stdout: {}", stdout);
    assert!(stderr.contains("Failed to create documents."));
}
