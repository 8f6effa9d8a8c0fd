//! Blocking runners behind the `dernek` commands.

use crate::env::InfraResult;
use crate::factory::{build_diagnostics_deps, build_migration_deps};
use crate::observability::{logger_from_env, scope_logger};
use crate::runtime::{run_async_with_ctx, spawn_ctrl_c_watcher};
use chrono::Utc;
use dernek_app::{
    ConnectivityInput, DiagnosticSection, DiagnosticsInput, DiagnosticsReport, MigrationInput,
    MigrationSummary, RollbackInput, RollbackSummary, migrate, rollback, run_diagnostics,
};
use dernek_config::{
    EnvMap, HealthSnapshot, ProviderSelection, ValidationReport, health_snapshot,
    resolve_provider, validation_report,
};
use dernek_domain::{ExecutionContext, collection_catalog};
use dernek_ports::LoggerPort;
use dernek_shared::{RequestContext, RetryPolicy};
use std::sync::Arc;

/// Input of [`run_diagnose`].
#[derive(Debug, Clone)]
pub struct DiagnoseRequest {
    /// Environment snapshot.
    pub env: EnvMap,
    /// Context the backend is resolved for.
    pub context: ExecutionContext,
    /// Restrict the run to one section.
    pub section: Option<DiagnosticSection>,
    /// Retry policy of the connectivity probes.
    pub retry: RetryPolicy,
}

impl DiagnoseRequest {
    /// Full server-side run with the standard probe retry.
    #[must_use]
    pub const fn new(env: EnvMap) -> Self {
        Self {
            env,
            context: ExecutionContext::Server,
            section: None,
            retry: RetryPolicy::STANDARD,
        }
    }
}

/// Run diagnostics end to end.
pub fn run_diagnose(request: DiagnoseRequest) -> InfraResult<DiagnosticsReport> {
    let ctx = RequestContext::new_run();
    let logger = scoped(&ctx);
    let deps = build_diagnostics_deps(request.env, request.context, Some(logger))?;
    let input = DiagnosticsInput {
        section: request.section,
        connectivity: ConnectivityInput {
            retry: request.retry,
        },
        ..DiagnosticsInput::default()
    };

    run_async_with_ctx(ctx, |ctx| async move {
        let watcher = spawn_ctrl_c_watcher(&ctx);
        let report = run_diagnostics(&ctx, &deps, input).await;
        watcher.abort();
        report
    })
}

/// Environment validation report.
pub fn run_validate_config(env: &EnvMap) -> ValidationReport {
    validation_report(env)
}

/// Provider selection for `context`.
pub fn run_provider(env: &EnvMap, context: ExecutionContext) -> ProviderSelection {
    resolve_provider(env, context)
}

/// Local health snapshot taken now.
pub fn run_health_snapshot(env: &EnvMap) -> HealthSnapshot {
    health_snapshot(env, Utc::now())
}

/// Provision every catalog collection on the remote backend.
pub fn run_migrate(env: &EnvMap) -> InfraResult<MigrationSummary> {
    let ctx = RequestContext::new_run();
    let deps = build_migration_deps(env, Some(scoped(&ctx)))?;
    let input = MigrationInput::new(collection_catalog()?);

    run_async_with_ctx(ctx, |ctx| async move {
        let watcher = spawn_ctrl_c_watcher(&ctx);
        let summary = migrate(&ctx, &deps, input).await;
        watcher.abort();
        summary
    })
}

/// Drop every catalog collection, newest first. Refused unless `confirmed`.
pub fn run_rollback(env: &EnvMap, confirmed: bool) -> InfraResult<RollbackSummary> {
    let ctx = RequestContext::new_run();
    let deps = build_migration_deps(env, Some(scoped(&ctx)))?;
    let input = RollbackInput {
        catalog: collection_catalog()?,
        confirmed,
    };

    run_async_with_ctx(ctx, |ctx| async move {
        let watcher = spawn_ctrl_c_watcher(&ctx);
        let summary = rollback(&ctx, &deps, input).await;
        watcher.abort();
        summary
    })
}

fn scoped(ctx: &RequestContext) -> Arc<dyn LoggerPort> {
    scope_logger(&logger_from_env(), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dernek_domain::ProviderMode;
    use dernek_testkit::env::{valid_env, with, without};

    #[test]
    fn diagnose_sdk_section_on_mock_env_is_clean() -> InfraResult<()> {
        let mut request = DiagnoseRequest::new(EnvMap::new());
        request.section = Some(DiagnosticSection::Sdk);

        let report = run_diagnose(request)?;

        assert_eq!(report.overall_health_score, 100);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.environment.provider, "mock");
        Ok(())
    }

    #[test]
    fn diagnose_mock_section_runs_against_seeded_backend() -> InfraResult<()> {
        let env = with(&valid_env(), &[("BACKEND_PROVIDER", "mock")]);
        let env = without(&env, &["NEXT_PUBLIC_BACKEND_PROVIDER"]);
        let mut request = DiagnoseRequest::new(env);
        request.section = Some(DiagnosticSection::Mock);

        let report = run_diagnose(request)?;

        assert_eq!(report.overall_health_score, 100, "{:?}", report.issues);
        assert!(report.results.mock_schema.is_some());
        assert!(report.results.mock_api.is_some());
        Ok(())
    }

    #[test]
    fn diagnose_reports_unbuildable_client_as_issue() -> InfraResult<()> {
        let env = without(&valid_env(), &["APPWRITE_API_KEY"]);
        let mut request = DiagnoseRequest::new(env);
        request.section = Some(DiagnosticSection::Connectivity);

        let report = run_diagnose(request)?;

        assert_eq!(report.overall_health_score, 70);
        assert_eq!(
            report.issues,
            vec![
                "Connectivity test failed: backend client is not configured: APPWRITE_API_KEY is not defined"
                    .to_owned()
            ]
        );
        assert_eq!(report.exit_code(), 1);
        Ok(())
    }

    #[test]
    fn migrate_without_api_key_fails_before_any_request() {
        let env = without(&valid_env(), &["APPWRITE_API_KEY"]);
        let error = run_migrate(&env).err().map(|error| error.message);
        assert_eq!(error.as_deref(), Some("APPWRITE_API_KEY is not defined"));
    }

    #[test]
    fn provider_and_health_snapshot_follow_env() {
        let env = valid_env();
        assert_eq!(
            run_provider(&env, ExecutionContext::Browser).mode,
            ProviderMode::Appwrite
        );
        let snapshot = run_health_snapshot(&env);
        assert!(snapshot.ok);
        assert!(snapshot.ready_for_production);
        assert!(!run_validate_config(&env).has_errors());
    }
}
