//! Integration tests for env snapshots loaded from fixtures.

use dernek_config::{
    AppwriteEnv, EnvMap, EnvParseError, ProviderSource, Severity, config_status, health_snapshot,
    resolve_provider, validation_report,
};
use dernek_domain::{ExecutionContext, ProviderMode};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn read_env_map(relative: &str) -> Result<EnvMap, Box<dyn Error>> {
    let path = workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join(relative);
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn production_fixture_parses_into_server_settings() -> Result<(), Box<dyn Error>> {
    let env = read_env_map("env/production.valid.json")?;
    let parsed = AppwriteEnv::from_map(&env)?;

    assert_eq!(parsed.storage.receipts.as_str(), "makbuzlar");
    assert_eq!(parsed.storage.documents.as_str(), "documents");
    assert_eq!(parsed.http_timeout_ms, 15_000);

    let settings = parsed.require_server()?;
    assert_eq!(settings.endpoint.as_str(), "https://fra.cloud.appwrite.io/v1");
    assert_eq!(settings.database_id.as_ref(), "dernek_db");
    assert!(settings.api_key.is_some());
    Ok(())
}

#[test]
fn production_fixture_is_valid_and_ready() -> Result<(), Box<dyn Error>> {
    let env = read_env_map("env/production.valid.json")?;

    let report = validation_report(&env);
    assert!(!report.has_errors());
    assert_eq!(report.summary.infos, 4);
    assert!(config_status(&env).is_valid);

    let snapshot = health_snapshot(&env, chrono::Utc::now());
    assert!(snapshot.ready_for_production);
    assert_eq!(snapshot.provider.as_ref(), "appwrite");

    let selection = resolve_provider(&env, ExecutionContext::Browser);
    assert_eq!(selection.mode, ProviderMode::Appwrite);
    assert_eq!(selection.source, ProviderSource::ClientEnv);
    Ok(())
}

#[test]
fn placeholder_fixture_reports_each_placeholder() -> Result<(), Box<dyn Error>> {
    let env = read_env_map("env/placeholders.json")?;

    let report = validation_report(&env);
    let errors: Vec<&str> = report
        .with_severity(Severity::Error)
        .map(|result| result.variable.as_ref())
        .collect();
    assert_eq!(
        errors,
        vec![
            "NEXT_PUBLIC_APPWRITE_PROJECT_ID",
            "NEXT_PUBLIC_DATABASE_ID",
            "APPWRITE_API_KEY"
        ]
    );

    let status = config_status(&env);
    assert!(!status.is_valid);
    assert!(
        status
            .errors
            .iter()
            .all(|message| message.ends_with("appears to be a placeholder value"))
    );
    assert_eq!(status.suggestions.len(), 3);
    Ok(())
}

#[test]
fn malformed_timeout_is_a_parse_error() -> Result<(), Box<dyn Error>> {
    let mut env = read_env_map("env/production.valid.json")?;
    env.insert("DERNEK_HTTP_TIMEOUT_MS".to_owned(), "soon".to_owned());

    let error = AppwriteEnv::from_map(&env).err();
    assert_eq!(
        error,
        Some(EnvParseError::InvalidInt {
            var: "DERNEK_HTTP_TIMEOUT_MS",
            value: "soon".to_owned(),
        })
    );
    Ok(())
}
