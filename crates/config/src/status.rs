//! Aggregated configuration status.

use crate::env::EnvMap;
use crate::report::{ValidationReport, validation_report};
use crate::validation::Severity;
use serde::{Deserialize, Serialize};

/// Remediation hint tied to the variable it fixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSuggestion {
    /// Variable name.
    pub variable: Box<str>,
    /// Suggested fix.
    pub suggestion: Box<str>,
}

/// Validation results reshaped for CLI and health consumers.
///
/// `is_valid` is keyed on severity only: it is false exactly when some result
/// has [`Severity::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    /// No error-severity result.
    pub is_valid: bool,
    /// Messages of error-severity results.
    pub errors: Vec<Box<str>>,
    /// Messages of warning-severity results.
    pub warnings: Vec<Box<str>>,
    /// Every suggestion attached to any result.
    pub suggestions: Vec<ConfigSuggestion>,
    /// RFC 3339 time of the underlying validation.
    pub timestamp: String,
}

impl From<&ValidationReport> for ConfigStatus {
    fn from(report: &ValidationReport) -> Self {
        let messages = |severity| {
            report
                .with_severity(severity)
                .map(|result| result.message.clone())
                .collect::<Vec<_>>()
        };
        let errors = messages(Severity::Error);
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings: messages(Severity::Warning),
            suggestions: report
                .results
                .iter()
                .filter_map(|result| {
                    result.suggestion.as_ref().map(|suggestion| ConfigSuggestion {
                        variable: result.variable.clone(),
                        suggestion: suggestion.clone(),
                    })
                })
                .collect(),
            timestamp: report.timestamp.clone(),
        }
    }
}

/// Re-run validation over `env` and aggregate it. Nothing is cached.
#[must_use]
pub fn config_status(env: &EnvMap) -> ConfigStatus {
    ConfigStatus::from(&validation_report(env))
}
