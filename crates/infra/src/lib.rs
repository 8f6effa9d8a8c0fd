//! # dernek-infra
//!
//! Infrastructure wiring and runtime composition: environment loading,
//! adapter factories, logger selection, and the blocking runners used by the
//! CLI. This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Environment snapshot loading.
pub mod env;
/// Adapter and dependency factories.
pub mod factory;
/// Logger selection.
pub mod observability;
/// Command runners.
pub mod runners;
/// Async runtime helpers.
pub mod runtime;

pub use env::{DEFAULT_DOTENV_FILE, InfraError, InfraResult, load_env, merge_env, read_dotenv};
pub use factory::{
    build_backend_api, build_connectivity_deps, build_diagnostics_deps, build_health_probe,
    build_migration_deps, build_mock_api, build_schema_admin, build_sdk_guard, client_config,
    settings_for,
};
pub use observability::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, logger_from_env, scope_logger};
pub use runners::{
    DiagnoseRequest, run_diagnose, run_health_snapshot, run_migrate, run_provider, run_rollback,
    run_validate_config,
};
pub use runtime::run_async_with_ctx;

// Types the CLI renders.
pub use dernek_app::{
    DiagnosticSection, DiagnosticsReport, MigrationSummary, RollbackSummary,
    diagnostics::is_critical,
};
pub use dernek_config::{
    EnvMap, HealthSnapshot, ProviderSelection, ProviderSource, Severity, ValidationReport,
    format_validation_report,
};
pub use dernek_domain::{ExecutionContext, ProviderMode};
pub use dernek_shared::{is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
