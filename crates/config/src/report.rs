//! Validation report and its human-readable printer.

use crate::env::EnvMap;
use crate::validation::{Severity, ValidationResult, validate_environment_variables};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Per-severity counts of one validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Error results.
    pub errors: usize,
    /// Warning results.
    pub warnings: usize,
    /// Info results.
    pub infos: usize,
    /// All results.
    pub total: usize,
}

impl ValidationSummary {
    /// Count results by severity.
    #[must_use]
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let count = |severity| {
            results
                .iter()
                .filter(|result| result.severity == severity)
                .count()
        };
        Self {
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
            total: results.len(),
        }
    }
}

/// Aggregate of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Results in validation order.
    pub results: Vec<ValidationResult>,
    /// Counts per severity.
    pub summary: ValidationSummary,
    /// RFC 3339 generation time.
    pub timestamp: String,
}

impl ValidationReport {
    /// Build a report from results produced at `at`.
    #[must_use]
    pub fn new(results: Vec<ValidationResult>, at: DateTime<Utc>) -> Self {
        let summary = ValidationSummary::from_results(&results);
        Self {
            results,
            summary,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Results of a given severity, in order.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(move |result| result.severity == severity)
    }

    /// True when any result has error severity.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

/// Validate a snapshot and wrap the results with a summary and timestamp.
#[must_use]
pub fn validation_report(env: &EnvMap) -> ValidationReport {
    ValidationReport::new(validate_environment_variables(env), Utc::now())
}

/// Render a report grouped by severity: errors, then warnings, then valid entries.
#[must_use]
pub fn format_validation_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🔍 Environment Variable Validation Report");
    let _ = writeln!(out, "{}", "=".repeat(50));

    let errors: Vec<_> = report.with_severity(Severity::Error).collect();
    if !errors.is_empty() {
        let _ = writeln!(out, "\n❌ Errors: {}", errors.len());
        write_findings(&mut out, &errors);
    }

    let warnings: Vec<_> = report.with_severity(Severity::Warning).collect();
    if !warnings.is_empty() {
        let _ = writeln!(out, "\n⚠️  Warnings: {}", warnings.len());
        write_findings(&mut out, &warnings);
    }

    let infos: Vec<_> = report.with_severity(Severity::Info).collect();
    if !infos.is_empty() {
        let _ = writeln!(out, "\nℹ️  Valid: {}", infos.len());
        for result in infos {
            let _ = writeln!(out, "  • {}", result.message);
        }
    }

    let summary = report.summary;
    let _ = writeln!(
        out,
        "\n📊 Summary: {} errors, {} warnings, {} valid",
        summary.errors, summary.warnings, summary.infos
    );
    let _ = writeln!(out, "⏰ Generated at: {}", report.timestamp);
    out
}

fn write_findings(out: &mut String, results: &[&ValidationResult]) {
    for result in results {
        let _ = writeln!(out, "  • {}", result.message);
        if let Some(suggestion) = &result.suggestion {
            let _ = writeln!(out, "    💡 {suggestion}");
        }
    }
}
