//! # dernek-app
//!
//! Application use cases: the unified data API, SDK usage guard, schema
//! provisioning and rollback, connectivity and mock checks, and diagnostics.
//! This crate depends on `ports`, `domain`, `shared`, and the pure `config`
//! crate.

pub mod api;
pub mod connectivity;
pub mod diagnostics;
pub mod migration;
pub mod mock_checks;
pub mod rollback;
pub mod sdk_guard;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use api::{ApiResponse, BackendApi, CollectionApi, ListParams};
pub use connectivity::{
    ConnectivityDeps, ConnectivityInput, ConnectivityReport, run_connectivity_test,
};
pub use diagnostics::{
    DiagnosticSection, DiagnosticsDeps, DiagnosticsInput, DiagnosticsReport, run_diagnostics,
};
pub use migration::{
    CollectionState, MigrationDeps, MigrationError, MigrationInput, MigrationStage,
    MigrationSummary, migrate,
};
pub use mock_checks::{
    ApiTestReport, SchemaValidationReport, run_mock_api_tests, validate_mock_schemas,
};
pub use rollback::{RollbackInput, RollbackSummary, rollback};
pub use sdk_guard::{SdkGuard, SdkMisuseError, SdkUsageReport, SdkValidation, SdkViolation};

#[cfg(test)]
mod tests {
    use super::*;
    use dernek_config::config_crate_version;
    use dernek_domain::domain_crate_version;
    use dernek_ports::ports_crate_version;
    use dernek_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        assert!(!app_crate_version().is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared_config() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
    }
}
