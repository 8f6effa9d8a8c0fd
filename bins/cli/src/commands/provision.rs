//! Provisioning commands: `migrate` and `rollback`.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, json_document, ndjson_summary};
use dernek_infra::{EnvMap, MigrationSummary, RollbackSummary, run_migrate, run_rollback};
use std::fmt::Write as _;

/// Run the migrate command.
pub fn run_migrate_command(mode: OutputMode, env: &EnvMap) -> Result<CliOutput, CliError> {
    let summary = run_migrate(env)?;

    let stdout = if mode.is_ndjson() {
        ndjson_summary("migrate", &summary)?
    } else if mode.is_json() {
        json_document(&summary)?
    } else {
        format_migration_text(&summary)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: if summary.is_success() {
            ExitCode::Ok
        } else {
            ExitCode::Failed
        },
    })
}

/// Run the rollback command. Refused without `--yes`.
pub fn run_rollback_command(
    mode: OutputMode,
    env: &EnvMap,
    confirmed: bool,
) -> Result<CliOutput, CliError> {
    if !confirmed {
        return Err(CliError::InvalidInput(
            "rollback deletes every collection and its documents; pass --yes to confirm"
                .to_owned(),
        ));
    }
    let summary = run_rollback(env, confirmed)?;

    let stdout = if mode.is_ndjson() {
        ndjson_summary("rollback", &summary)?
    } else if mode.is_json() {
        json_document(&summary)?
    } else {
        format_rollback_text(&summary)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: if summary.is_success() {
            ExitCode::Ok
        } else {
            ExitCode::Failed
        },
    })
}

fn format_migration_text(summary: &MigrationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "collections: {} (created {}, skipped {}, failed {})",
        summary.total_collections, summary.created, summary.skipped, summary.failed
    );
    for error in &summary.errors {
        match error.key.as_deref() {
            Some(key) => {
                let _ = writeln!(out, "  error: {} ({key}): {}", error.collection, error.message);
            },
            None => {
                let _ = writeln!(out, "  error: {}: {}", error.collection, error.message);
            },
        }
    }
    let _ = writeln!(out, "{}", summary.message());
    out
}

fn format_rollback_text(summary: &RollbackSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "deleted: {}, absent: {}, failed: {}",
        summary.deleted.len(),
        summary.absent.len(),
        summary.errors.len()
    );
    for collection in &summary.deleted {
        let _ = writeln!(out, "  deleted {collection}");
    }
    for error in &summary.errors {
        let _ = writeln!(out, "  error: {}: {}", error.collection, error.message);
    }
    let _ = writeln!(out, "finished in {} ms", summary.duration_ms);
    out
}
