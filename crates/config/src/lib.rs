//! # dernek-config
//!
//! Environment snapshot parsing, validation, and backend provider resolution.
//! This crate depends on `domain` and `shared` only and performs no network I/O.

/// Environment variable names and typed parsing.
pub mod env;
/// Local health snapshot of the configured backend.
pub mod health;
/// Backend provider resolution.
pub mod provider;
/// Validation report and its text printer.
pub mod report;
/// Aggregated configuration status.
pub mod status;
/// Storage bucket configuration.
pub mod storage;
/// Per-variable validators.
pub mod validation;

pub use env::{
    AppwriteEnv, AppwriteSettings, DEFAULT_DATABASE_ID, DEFAULT_HEALTH_URL,
    DEFAULT_HTTP_TIMEOUT_MS, EnvMap, EnvParseError, KNOWN_ENV_VARS, collect_std_env,
    is_production,
};
pub use health::{AppwriteConfigFlags, HealthSnapshot, health_snapshot};
pub use provider::{
    ProviderSelection, ProviderSource, client_flag_selects_appwrite, resolve_provider,
};
pub use report::{ValidationReport, ValidationSummary, format_validation_report, validation_report};
pub use status::{ConfigStatus, ConfigSuggestion, config_status};
pub use storage::StorageBuckets;
pub use validation::{
    EnvironmentKey, Severity, ValidationResult, validate_api_key, validate_database_id,
    validate_endpoint, validate_environment_variables, validate_project_id,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
