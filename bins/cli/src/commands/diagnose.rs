//! Diagnose command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, json_document, ndjson_summary};
use dernek_infra::{
    DiagnoseRequest, DiagnosticSection, DiagnosticsReport, EnvMap, ExecutionContext,
    ValidationReport, format_validation_report, is_critical, run_diagnose, run_validate_config,
};
use std::fmt::Write as _;
use std::path::Path;

/// Parsed `diagnose` arguments.
#[derive(Debug)]
pub struct DiagnoseArgs<'a> {
    pub env: EnvMap,
    pub context: ExecutionContext,
    pub section: Option<&'a str>,
    pub save: Option<&'a Path>,
}

/// Run the diagnose command.
pub fn run_diagnose_command(
    mode: OutputMode,
    args: DiagnoseArgs<'_>,
) -> Result<CliOutput, CliError> {
    let section = args.section.map(parse_section).transpose()?;
    let wants_config = section.is_none_or(|only| only == DiagnosticSection::Config);
    let validation = (wants_config && !mode.is_machine()).then(|| run_validate_config(&args.env));
    let mut request = DiagnoseRequest::new(args.env);
    request.context = args.context;
    request.section = section;

    let report = run_diagnose(request)?;

    let mut stderr = String::new();
    if let Some(path) = args.save {
        std::fs::write(path, json_document(&report)?)?;
        let _ = writeln!(stderr, "report saved to {}", path.display());
    }

    let stdout = if mode.is_ndjson() {
        format_report_ndjson(&report)?
    } else if mode.is_json() {
        json_document(&report)?
    } else {
        format_report_text(&report, validation.as_ref())
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: if report.exit_code() == 0 {
            ExitCode::Ok
        } else {
            ExitCode::Failed
        },
    })
}

fn parse_section(value: &str) -> Result<DiagnosticSection, CliError> {
    DiagnosticSection::parse(value).ok_or_else(|| {
        let known: Vec<&str> = DiagnosticSection::ALL
            .iter()
            .map(|section| section.as_str())
            .collect();
        CliError::InvalidInput(format!(
            "unknown section `{value}` (expected one of: {})",
            known.join(", ")
        ))
    })
}

fn format_report_text(report: &DiagnosticsReport, validation: Option<&ValidationReport>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Dernek diagnostics ({} on {})",
        report.environment.provider, report.environment.platform
    );
    let _ = writeln!(out, "Health score: {}/100", report.overall_health_score);

    if let Some(validation) = validation {
        let _ = writeln!(out, "\nConfiguration:");
        out.push_str(&format_validation_report(validation));
    }

    if report.issues.is_empty() {
        let _ = writeln!(out, "\nNo issues found.");
    } else {
        let _ = writeln!(out, "\nIssues ({}):", report.issues.len());
        for issue in &report.issues {
            let marker = if is_critical(issue) { "[error]" } else { "[warn] " };
            let _ = writeln!(out, "  {marker} {issue}");
        }
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations:");
        for recommendation in &report.recommendations {
            let _ = writeln!(out, "  - {recommendation}");
        }
    }

    let _ = writeln!(out, "\nQuick fixes:");
    for command in &report.quick_fix_commands {
        let _ = writeln!(out, "  $ {command}");
    }
    let _ = writeln!(out, "\nDocumentation:");
    for link in &report.documentation_links {
        let _ = writeln!(out, "  - {link}");
    }
    out
}

fn format_report_ndjson(report: &DiagnosticsReport) -> Result<String, CliError> {
    let mut out = String::new();
    for issue in &report.issues {
        let line = serde_json::json!({
            "type": "issue",
            "message": issue,
            "critical": is_critical(issue),
        });
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    out.push_str(&ndjson_summary("diagnose", report)?);
    Ok(out)
}
