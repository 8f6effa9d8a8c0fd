//! Per-variable validators for the backend environment.
//!
//! Validators never fail: a missing or malformed value is reported as a
//! [`ValidationResult`] with [`Severity::Error`]. Validity and severity are
//! independent: the API key validator can return a valid result carrying a
//! warning.

use crate::env::{
    ENV_APPWRITE_API_KEY, ENV_APPWRITE_ENDPOINT, ENV_APPWRITE_PROJECT_ID, ENV_DATABASE_ID, EnvMap,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

const PROJECT_ID_MIN_CHARS: usize = 20;
const PROJECT_ID_MAX_CHARS: usize = 24;
const API_KEY_MIN_CHARS: usize = 50;
const API_KEY_PRODUCTION_CHARS: usize = 80;

/// Whole-value character-class pattern, compiled on first use.
type Pattern = LazyLock<Result<Regex, regex::Error>>;

static ALPHANUMERIC: Pattern = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$"));
static IDENTIFIER: Pattern = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$"));
static BASE64_CHARSET: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$"));

/// A pattern that failed to compile matches nothing, so the value is
/// reported by its validator instead of aborting the run.
fn matches(pattern: &Pattern, value: &str) -> bool {
    let compiled: &Result<Regex, regex::Error> = pattern;
    compiled.as_ref().is_ok_and(|regex| regex.is_match(value))
}

/// Result severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking problem.
    Error,
    /// Non-blocking problem.
    Warning,
    /// Check passed.
    Info,
}

impl Severity {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of validating one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Variable name.
    pub variable: Box<str>,
    /// Whether the value is usable.
    pub is_valid: bool,
    /// Severity of the finding.
    pub severity: Severity,
    /// Human-readable finding.
    pub message: Box<str>,
    /// Remediation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Box<str>>,
}

impl ValidationResult {
    fn error(variable: &str, message: String, suggestion: String) -> Self {
        Self::finding(variable, false, Severity::Error, message, Some(suggestion))
    }

    fn warning(variable: &str, is_valid: bool, message: String, suggestion: String) -> Self {
        Self::finding(variable, is_valid, Severity::Warning, message, Some(suggestion))
    }

    fn valid(variable: &str) -> Self {
        Self::finding(
            variable,
            true,
            Severity::Info,
            format!("{variable} is valid"),
            None,
        )
    }

    fn missing(variable: &str, suggestion: String) -> Self {
        Self::error(variable, format!("{variable} is not defined"), suggestion)
    }

    fn placeholder(variable: &str, suggestion: &str) -> Self {
        Self::error(
            variable,
            format!("{variable} appears to be a placeholder value"),
            suggestion.to_owned(),
        )
    }

    fn finding(
        variable: &str,
        is_valid: bool,
        severity: Severity,
        message: String,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            is_valid,
            severity,
            message: message.into(),
            suggestion: suggestion.map(Into::into),
        }
    }
}

/// The four validated backend variables, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentKey {
    /// `NEXT_PUBLIC_APPWRITE_ENDPOINT`.
    Endpoint,
    /// `NEXT_PUBLIC_APPWRITE_PROJECT_ID`.
    ProjectId,
    /// `NEXT_PUBLIC_DATABASE_ID`.
    DatabaseId,
    /// `APPWRITE_API_KEY`.
    ApiKey,
}

impl EnvironmentKey {
    /// All keys in validation order.
    pub const ALL: [Self; 4] = [Self::Endpoint, Self::ProjectId, Self::DatabaseId, Self::ApiKey];

    /// Environment variable name.
    #[must_use]
    pub const fn var(self) -> &'static str {
        match self {
            Self::Endpoint => ENV_APPWRITE_ENDPOINT,
            Self::ProjectId => ENV_APPWRITE_PROJECT_ID,
            Self::DatabaseId => ENV_DATABASE_ID,
            Self::ApiKey => ENV_APPWRITE_API_KEY,
        }
    }

    /// Validate a raw value for this key.
    #[must_use]
    pub fn validate(self, value: Option<&str>) -> ValidationResult {
        let var = self.var();
        match self {
            Self::Endpoint => validate_endpoint(var, value),
            Self::ProjectId => validate_project_id(var, value),
            Self::DatabaseId => validate_database_id(var, value),
            Self::ApiKey => validate_api_key(var, value),
        }
    }
}

/// Validate every backend variable in a snapshot, in [`EnvironmentKey::ALL`] order.
#[must_use]
pub fn validate_environment_variables(env: &EnvMap) -> Vec<ValidationResult> {
    EnvironmentKey::ALL
        .iter()
        .map(|key| key.validate(env.get(key.var()).map(String::as_str)))
        .collect()
}

/// Validate an endpoint URL.
#[must_use]
pub fn validate_endpoint(var: &str, value: Option<&str>) -> ValidationResult {
    let Some(value) = present(value) else {
        return ValidationResult::missing(
            var,
            format!("Set {var} to your Appwrite endpoint URL (e.g., https://cloud.appwrite.io/v1)"),
        );
    };

    if !value.starts_with("http://") && !value.starts_with("https://") {
        return ValidationResult::error(
            var,
            format!("{var} must start with http:// or https://"),
            format!("Add protocol to {var}: https://{value}"),
        );
    }

    if !value.ends_with("/v1") {
        return ValidationResult::error(
            var,
            format!("{var} must end with /v1 (Appwrite API version)"),
            format!("Append /v1 to {var}: {value}/v1"),
        );
    }

    if value.ends_with("//v1") {
        return ValidationResult::warning(
            var,
            false,
            format!("{var} has double slash before /v1"),
            format!("Remove extra slash: {}", value.replacen("//v1", "/v1", 1)),
        );
    }

    ValidationResult::valid(var)
}

/// Validate a project id.
#[must_use]
pub fn validate_project_id(var: &str, value: Option<&str>) -> ValidationResult {
    let Some(value) = present(value) else {
        return ValidationResult::missing(
            var,
            format!("Set {var} to your Appwrite project ID (found in Appwrite console)"),
        );
    };

    if is_placeholder(value, "your-project-id") {
        return ValidationResult::placeholder(
            var,
            "Replace with actual project ID from Appwrite console",
        );
    }

    let chars = value.chars().count();
    if !(PROJECT_ID_MIN_CHARS..=PROJECT_ID_MAX_CHARS).contains(&chars) {
        return ValidationResult::error(
            var,
            format!("{var} should be 20-24 characters long"),
            "Check project ID in Appwrite console - it should be 20 characters".to_owned(),
        );
    }

    if !matches(&ALPHANUMERIC, value) {
        return ValidationResult::error(
            var,
            format!("{var} should contain only alphanumeric characters"),
            "Project ID should only contain letters and numbers".to_owned(),
        );
    }

    ValidationResult::valid(var)
}

/// Validate a database id.
#[must_use]
pub fn validate_database_id(var: &str, value: Option<&str>) -> ValidationResult {
    let Some(value) = present(value) else {
        return ValidationResult::missing(var, format!("Set {var} to your Appwrite database ID"));
    };

    if is_placeholder(value, "your-database-id") {
        return ValidationResult::placeholder(
            var,
            "Replace with actual database ID from Appwrite console",
        );
    }

    if !matches(&IDENTIFIER, value) {
        return ValidationResult::error(
            var,
            format!("{var} should contain only alphanumeric characters and underscores"),
            "Database ID should only contain letters, numbers, and underscores".to_owned(),
        );
    }

    ValidationResult::valid(var)
}

/// Validate a privileged API key.
///
/// A charset mismatch or a short/demo-looking key yields a valid result with
/// [`Severity::Warning`].
#[must_use]
pub fn validate_api_key(var: &str, value: Option<&str>) -> ValidationResult {
    let Some(value) = present(value) else {
        return ValidationResult::missing(
            var,
            format!("Set {var} to your Appwrite API key (generate in Appwrite console)"),
        );
    };

    if is_placeholder(value, "your-api-key") {
        return ValidationResult::placeholder(var, "Replace with actual API key from Appwrite console");
    }

    let chars = value.chars().count();
    if chars < API_KEY_MIN_CHARS {
        return ValidationResult::error(
            var,
            format!("{var} seems too short for an Appwrite API key"),
            "API keys are typically 50+ characters. Check Appwrite console for correct key"
                .to_owned(),
        );
    }

    if !matches(&BASE64_CHARSET, value) {
        return ValidationResult::warning(
            var,
            true,
            format!("{var} does not appear to be a valid base64 string"),
            "API keys should be base64 encoded. Regenerate if needed".to_owned(),
        );
    }

    if value.contains("demo") || value.contains("test") || chars < API_KEY_PRODUCTION_CHARS {
        return ValidationResult::warning(
            var,
            true,
            format!("{var} may be a test or demo key"),
            "For production, use a proper API key with appropriate permissions".to_owned(),
        );
    }

    ValidationResult::valid(var)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn is_placeholder(value: &str, literal: &str) -> bool {
    value == literal || value.contains("placeholder")
}
