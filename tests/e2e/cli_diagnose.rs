//! Diagnose command end to end, without a live backend.

use dernek_testkit::env::{valid_env, with, without};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const DEAD_HEALTH_URL: &str = "http://127.0.0.1:9/api/health";

fn run_cli(args: &[&str], env: &BTreeMap<String, String>) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_dernek"))
        .args(["--env-file", "/nonexistent/dernek.env"])
        .args(args)
        .env_clear()
        .envs(env)
        .output()
}

fn mock_env() -> BTreeMap<String, String> {
    with(
        &valid_env(),
        &[
            ("BACKEND_PROVIDER", "mock"),
            ("NEXT_PUBLIC_BACKEND_PROVIDER", "mock"),
            ("DERNEK_HEALTH_URL", DEAD_HEALTH_URL),
            ("DERNEK_HTTP_TIMEOUT_MS", "500"),
        ],
    )
}

fn temp_path(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("dernek-e2e-{label}-{unique}.json"))
}

#[test]
fn mock_section_passes_against_seed_data() -> io::Result<()> {
    let output = run_cli(&["--output", "json", "diagnose", "--section", "mock"], &mock_env())?;

    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(report["overallHealthScore"], Value::from(100));
    assert_eq!(report["results"]["mockSchema"]["summary"]["invalidCollections"], Value::from(0));
    assert_eq!(report["results"]["mockAPI"]["failed"], Value::from(0));
    assert_eq!(report["environment"]["provider"], "mock");
    Ok(())
}

#[test]
fn unreachable_health_endpoint_fails_the_run() -> io::Result<()> {
    let output = run_cli(&["diagnose", "--section", "health"], &mock_env())?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Health score: 60/100"), "{stdout}");
    assert!(stdout.contains("[error] Health check error:"), "{stdout}");
    assert!(stdout.contains("$ dernek validate-config"));
    Ok(())
}

#[test]
fn save_writes_the_json_report() -> io::Result<()> {
    let path = temp_path("save");
    let path_arg = path.to_string_lossy().to_string();

    let output = run_cli(
        &["diagnose", "--section", "sdk", "--save", path_arg.as_str()],
        &mock_env(),
    )?;

    assert_eq!(output.status.code(), Some(0));
    let saved: Value = serde_json::from_slice(&std::fs::read(&path)?).map_err(io::Error::other)?;
    std::fs::remove_file(&path)?;
    assert_eq!(saved["overallHealthScore"], Value::from(100));
    assert_eq!(saved["documentationLinks"].as_array().map(Vec::len), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("report saved to"));
    Ok(())
}

#[test]
fn unwritable_save_path_exits_with_io_code() -> io::Result<()> {
    let output = run_cli(
        &["diagnose", "--section", "sdk", "--save", "/nonexistent/dir/report.json"],
        &mock_env(),
    )?;
    assert_eq!(output.status.code(), Some(3));
    Ok(())
}

#[test]
fn ndjson_emits_issue_lines_then_summary() -> io::Result<()> {
    let output = run_cli(
        &["--output", "ndjson", "diagnose", "--section", "health"],
        &mock_env(),
    )?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .map_err(io::Error::other)?;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "issue");
    assert_eq!(lines[0]["critical"], Value::Bool(true));
    assert_eq!(lines[1]["type"], "summary");
    assert_eq!(lines[1]["kind"], "diagnose");
    assert_eq!(lines[1]["overallHealthScore"], Value::from(60));
    Ok(())
}

#[test]
fn unconfigured_remote_backend_is_reported_not_fatal() -> io::Result<()> {
    let env = BTreeMap::from([
        ("BACKEND_PROVIDER".to_owned(), "appwrite".to_owned()),
        ("DERNEK_HEALTH_URL".to_owned(), DEAD_HEALTH_URL.to_owned()),
    ]);
    let output = run_cli(&["--json", "diagnose", "--section", "connectivity"], &env)?;

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(report["overallHealthScore"], Value::from(70));
    assert_eq!(
        report["issues"][0],
        "Connectivity test failed: backend client is not configured: \
         NEXT_PUBLIC_APPWRITE_ENDPOINT is not defined"
    );
    Ok(())
}

#[test]
fn text_config_section_prints_grouped_validation_report() -> io::Result<()> {
    let env = without(&mock_env(), &["NEXT_PUBLIC_APPWRITE_PROJECT_ID"]);
    let output = run_cli(&["diagnose", "--section", "config"], &env)?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration:"), "{stdout}");
    assert!(stdout.contains("🔍 Environment Variable Validation Report"), "{stdout}");
    assert!(stdout.contains("❌ Errors: 1"), "{stdout}");
    assert!(stdout.contains("NEXT_PUBLIC_APPWRITE_PROJECT_ID is not defined"), "{stdout}");
    assert!(stdout.contains("📊 Summary: 1 errors, 0 warnings, 3 valid"), "{stdout}");
    Ok(())
}

#[test]
fn sections_without_config_skip_the_validation_report() -> io::Result<()> {
    let output = run_cli(&["diagnose", "--section", "sdk"], &mock_env())?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Validation Report"), "{stdout}");
    assert!(stdout.contains("Health score: 100/100"), "{stdout}");
    Ok(())
}
