//! CLI configuration commands end to end.

use dernek_testkit::env::{valid_env, without};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Output};

fn run_cli(args: &[&str], env: &BTreeMap<String, String>) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_dernek"))
        .args(["--env-file", "/nonexistent/dernek.env"])
        .args(args)
        .env_clear()
        .envs(env)
        .output()
}

fn stdout_json(output: &Output) -> io::Result<Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn valid_environment_passes_validation() -> io::Result<()> {
    let output = run_cli(&["validate-config"], &valid_env())?;
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Environment Variable Validation Report"));
    assert!(stdout.contains("0 errors"));
    Ok(())
}

#[test]
fn missing_project_id_fails_validation() -> io::Result<()> {
    let env = without(&valid_env(), &["NEXT_PUBLIC_APPWRITE_PROJECT_ID"]);
    let output = run_cli(&["--output", "json", "validate-config"], &env)?;

    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output)?;
    assert_eq!(report["summary"]["errors"], Value::from(1));
    let failing: Vec<&Value> = report["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter(|result| result["severity"] == "error")
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0]["variable"], "NEXT_PUBLIC_APPWRITE_PROJECT_ID");
    Ok(())
}

#[test]
fn ndjson_validation_ends_with_summary() -> io::Result<()> {
    let output = run_cli(&["--output", "ndjson", "validate-config"], &valid_env())?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let last = stdout.lines().last().unwrap_or_default();
    let summary: Value = serde_json::from_str(last).map_err(io::Error::other)?;

    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["kind"], "validate-config");
    assert_eq!(summary["isValid"], Value::Bool(true));
    Ok(())
}

#[test]
fn unrecognized_provider_falls_back_to_mock() -> io::Result<()> {
    let env = BTreeMap::from([("BACKEND_PROVIDER".to_owned(), "Firebase".to_owned())]);
    let output = run_cli(&["--json", "provider"], &env)?;

    assert_eq!(output.status.code(), Some(0));
    let payload = stdout_json(&output)?;
    assert_eq!(payload["provider"], "mock");
    assert_eq!(payload["source"], "server_env");
    assert_eq!(payload["raw"], "firebase");
    assert_eq!(payload["recognized"], Value::Bool(false));
    Ok(())
}

#[test]
fn browser_context_reads_public_flag() -> io::Result<()> {
    let env = BTreeMap::from([
        ("NEXT_PUBLIC_BACKEND_PROVIDER".to_owned(), "appwrite".to_owned()),
        ("BACKEND_PROVIDER".to_owned(), "mock".to_owned()),
    ]);

    let browser = stdout_json(&run_cli(&["--json", "provider", "--context", "browser"], &env)?)?;
    let server = stdout_json(&run_cli(&["--json", "provider"], &env)?)?;

    assert_eq!(browser["provider"], "appwrite");
    assert_eq!(server["provider"], "mock");
    Ok(())
}

#[test]
fn health_snapshot_reports_flags() -> io::Result<()> {
    let env = without(&valid_env(), &["APPWRITE_API_KEY"]);
    let output = run_cli(&["--output", "json", "health"], &env)?;

    assert_eq!(output.status.code(), Some(0));
    let snapshot = stdout_json(&output)?;
    assert_eq!(snapshot["ok"], Value::Bool(true));
    assert_eq!(snapshot["provider"], "appwrite");
    assert_eq!(snapshot["appwrite"]["apiKeyConfigured"], Value::Bool(false));
    assert_eq!(snapshot["readyForProduction"], Value::Bool(false));
    Ok(())
}
