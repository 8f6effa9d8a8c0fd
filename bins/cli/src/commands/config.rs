//! Configuration commands: `validate-config`, `provider`, and `health`.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, json_document, ndjson_summary};
use dernek_infra::{
    EnvMap, ExecutionContext, HealthSnapshot, ProviderSelection, format_validation_report,
    run_health_snapshot, run_provider, run_validate_config,
};
use std::fmt::Write as _;

/// Run the validate-config command. Any error-severity result fails the run.
pub fn run_validate_config_command(
    mode: OutputMode,
    env: &EnvMap,
) -> Result<CliOutput, CliError> {
    let report = run_validate_config(env);

    let stdout = if mode.is_ndjson() {
        let mut out = String::new();
        for result in &report.results {
            let mut line = serde_json::json!({ "type": "result" });
            if let (Some(target), serde_json::Value::Object(fields)) =
                (line.as_object_mut(), serde_json::to_value(result)?)
            {
                target.extend(fields);
            }
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }
        out.push_str(&ndjson_summary(
            "validate-config",
            &serde_json::json!({
                "isValid": !report.has_errors(),
                "summary": report.summary,
                "timestamp": report.timestamp,
            }),
        )?);
        out
    } else if mode.is_json() {
        json_document(&report)?
    } else {
        format_validation_report(&report)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: if report.has_errors() {
            ExitCode::Failed
        } else {
            ExitCode::Ok
        },
    })
}

/// Run the provider command.
pub fn run_provider_command(
    mode: OutputMode,
    env: &EnvMap,
    context: ExecutionContext,
) -> Result<CliOutput, CliError> {
    let selection = run_provider(env, context);

    let stdout = if mode.is_machine() {
        let payload = provider_payload(&selection, context);
        if mode.is_ndjson() {
            ndjson_summary("provider", &payload)?
        } else {
            json_document(&payload)?
        }
    } else {
        format_provider_text(&selection, context)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

/// Run the health command.
pub fn run_health(mode: OutputMode, env: &EnvMap) -> Result<CliOutput, CliError> {
    let snapshot = run_health_snapshot(env);

    let stdout = if mode.is_ndjson() {
        ndjson_summary("health", &snapshot)?
    } else if mode.is_json() {
        json_document(&snapshot)?
    } else {
        format_health_text(&snapshot)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn provider_payload(
    selection: &ProviderSelection,
    context: ExecutionContext,
) -> serde_json::Value {
    serde_json::json!({
        "provider": selection.mode.as_str(),
        "source": selection.source.as_str(),
        "raw": selection.raw,
        "recognized": selection.is_recognized(),
        "context": context.as_str(),
    })
}

fn format_provider_text(selection: &ProviderSelection, context: ExecutionContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "provider: {}", selection.mode);
    let _ = writeln!(out, "source: {}", selection.source);
    let _ = writeln!(out, "context: {context}");
    if let Some(raw) = selection.raw.as_deref() {
        let _ = writeln!(out, "raw: {raw}");
    }
    if !selection.is_recognized() {
        let _ = writeln!(
            out,
            "warning: unrecognized provider value, falling back to {}",
            selection.mode
        );
    }
    out
}

fn format_health_text(snapshot: &HealthSnapshot) -> String {
    let flag = |set: bool| if set { "set" } else { "missing" };
    let mut out = String::new();
    let _ = writeln!(out, "status: {}", if snapshot.ok { "ok" } else { "down" });
    let _ = writeln!(out, "provider: {}", snapshot.provider);
    let _ = writeln!(out, "endpoint: {}", flag(snapshot.appwrite.endpoint));
    let _ = writeln!(out, "projectId: {}", flag(snapshot.appwrite.project_id));
    let _ = writeln!(out, "databaseId: {}", flag(snapshot.appwrite.database_id));
    let _ = writeln!(out, "apiKey: {}", flag(snapshot.appwrite.api_key_configured));
    let _ = writeln!(out, "readyForProduction: {}", snapshot.ready_for_production);
    let _ = writeln!(out, "timestamp: {}", snapshot.timestamp);
    out
}
