//! CLI integration tests against a mock API.
//!
//! Each test gets its own HOME and XDG_DATA_HOME so the session file never
//! touches the real user directory.

use std::path::{Path, PathBuf};
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_cli(args: &[&str], home: &Path, api_url: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_drivedesk"))
        .args(args)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("DRIVEDESK_API_URL", api_url)
        .env("DRIVEDESK_CLIENT_ID", "2")
        .env("DRIVEDESK_CLIENT_SECRET", "client-secret")
        .env_remove("DRIVEDESK_TOKEN_URL")
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("Failed to execute CLI")
}

async fn run_cli_success(args: &[&str], home: &Path, api_url: &str) -> String {
    let output = run_cli(args, home, api_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

async fn session_file(home: &Path, api_url: &str) -> PathBuf {
    let stdout = run_cli_success(&["whoami", "--json"], home, api_url).await;
    let summary: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    PathBuf::from(summary["path"].as_str().unwrap())
}

async fn mount_password_grant(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=admin%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": access,
            "refresh_token": refresh
        })))
        .mount(server)
        .await;
}

async fn login(home: &Path, api_url: &str) {
    run_cli_success(
        &[
            "login",
            "--username",
            "admin@example.com",
            "--password",
            "hunter2",
        ],
        home,
        api_url,
    )
    .await;
}

#[tokio::test]
async fn login_whoami_logout_round_trip() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "A1", "R1").await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let api = server.uri();

    login(home, &api).await;

    let stdout = run_cli_success(&["whoami"], home, &api).await;
    assert!(stdout.contains("Session"));
    assert!(stdout.contains("[REDACTED]"));
    assert!(!stdout.contains("A1"));

    let file = session_file(home, &api).await;
    assert!(file.starts_with(home));
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(stored["access_token"], "A1");
    assert_eq!(stored["refresh_token"], "R1");

    run_cli_success(&["logout"], home, &api).await;
    assert!(!file.exists());

    let output = run_cli(&["whoami"], home, &api).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No active session"));
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "message": "The user credentials were incorrect."
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = run_cli(
        &["login", "--username", "admin@example.com", "--password", "nope"],
        temp.path(),
        &server.uri(),
    )
    .await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid credentials"));
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "A1", "R1").await;

    Mock::given(method("GET"))
        .and(path("/api/registrations"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/registrations"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 41}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A2",
            "refresh_token": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let api = server.uri();

    login(home, &api).await;

    let stdout = run_cli_success(&["get", "/api/registrations"], home, &api).await;
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["data"][0]["id"], 41);

    let file = session_file(home, &api).await;
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(stored["access_token"], "A2");
    assert_eq!(stored["refresh_token"], "R2");
}

#[tokio::test]
async fn rejected_refresh_reports_expired_session() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "A1", "R1").await;

    Mock::given(method("GET"))
        .and(path("/api/registrations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let api = server.uri();

    login(home, &api).await;

    let output = run_cli(&["get", "/api/registrations"], home, &api).await;
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Session expired. Run 'drivedesk login'."));
    assert!(err.contains("401"));

    let output = run_cli(&["whoami"], home, &api).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn post_sends_json_body_with_bearer_token() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "A1", "R1").await;

    Mock::given(method("POST"))
        .and(path("/api/exam-schedules"))
        .and(header("authorization", "Bearer A1"))
        .and(wiremock::matchers::body_json(json!({"date": "2026-11-02"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let api = server.uri();

    login(home, &api).await;

    let stdout = run_cli_success(
        &[
            "post",
            "/api/exam-schedules",
            "--data",
            r#"{"date":"2026-11-02"}"#,
        ],
        home,
        &api,
    )
    .await;
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["id"], 5);
}

#[tokio::test]
async fn request_without_session_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = run_cli(&["get", "/api/registrations"], temp.path(), &server.uri()).await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No active session"));
}

#[tokio::test]
async fn extra_headers_are_forwarded() {
    let server = MockServer::start().await;
    mount_password_grant(&server, "A1", "R1").await;

    Mock::given(method("GET"))
        .and(path("/api/branches"))
        .and(header("authorization", "Bearer A1"))
        .and(header("x-campus", "north"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let api = server.uri();

    login(home, &api).await;

    let stdout = run_cli_success(
        &["get", "/api/branches", "--header", "X-Campus: north"],
        home,
        &api,
    )
    .await;
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}
