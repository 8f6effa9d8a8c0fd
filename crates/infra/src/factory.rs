//! Adapter factories: env snapshot to ports and use-case dependencies.

use crate::env::InfraResult;
use dernek_adapters::appwrite::{
    AppwriteClientConfig, AppwriteConnectivityProbe, AppwriteDocuments, AppwriteSchemaAdmin,
    AppwriteStorage,
};
use dernek_adapters::health_http::HttpHealthProbe;
use dernek_adapters::mock::MockBackend;
use dernek_app::diagnostics::connectivity_unavailable;
use dernek_app::{BackendApi, ConnectivityDeps, DiagnosticsDeps, MigrationDeps, SdkGuard};
use dernek_config::env::ENV_HEALTH_URL;
use dernek_config::{
    AppwriteEnv, AppwriteSettings, DEFAULT_HEALTH_URL, DEFAULT_HTTP_TIMEOUT_MS, EnvMap,
    ProviderSelection, client_flag_selects_appwrite, is_production, resolve_provider,
};
use dernek_domain::{ExecutionContext, ProviderMode, SdkKind};
use dernek_ports::{HealthProbePort, LoggerPort, SchemaAdminPort};
use dernek_shared::{ErrorEnvelope, RetryPolicy};
use std::sync::Arc;

/// Connection settings for `context`: browser needs endpoint and project,
/// server needs the API key as well.
pub fn settings_for(env: &EnvMap, context: ExecutionContext) -> InfraResult<AppwriteSettings> {
    let parsed = AppwriteEnv::from_map(env)?;
    let settings = match context {
        ExecutionContext::Browser => parsed.require_client()?,
        ExecutionContext::Server => parsed.require_server()?,
    };
    Ok(settings)
}

/// REST client configuration for checked settings.
#[must_use]
pub fn client_config(settings: &AppwriteSettings, retry: RetryPolicy) -> AppwriteClientConfig {
    AppwriteClientConfig {
        endpoint: settings
            .endpoint
            .as_str()
            .trim_end_matches('/')
            .to_owned()
            .into_boxed_str(),
        project_id: settings.project_id.clone(),
        database_id: settings.database_id.clone(),
        api_key: settings.api_key.clone(),
        timeout_ms: settings.timeout_ms,
        retry,
    }
}

/// Unified API over the seeded in-memory backend.
pub fn build_mock_api() -> InfraResult<BackendApi> {
    let mock = Arc::new(MockBackend::seeded()?);
    Ok(BackendApi::new(ProviderMode::Mock, mock.clone(), mock))
}

/// SDK usage guard for one execution context. Every builder of a run
/// records into the same guard, and diagnostics reports what it holds.
#[must_use]
pub fn build_sdk_guard(
    env: &EnvMap,
    context: ExecutionContext,
    logger: Option<Arc<dyn LoggerPort>>,
) -> Arc<SdkGuard> {
    let mut guard = SdkGuard::new(context, is_production(env));
    if let Some(logger) = logger {
        guard = guard.with_logger(logger);
    }
    Arc::new(guard)
}

/// SDK behind the remote adapters built for `context`.
const fn sdk_for(context: ExecutionContext) -> SdkKind {
    match context {
        ExecutionContext::Browser => SdkKind::Client,
        ExecutionContext::Server => SdkKind::Server,
    }
}

/// Record the SDK handles a data-layer build loads. The client flag pulls
/// the client SDK in wherever the build runs; `remote` is the SDK behind the
/// remote adapters, if any are built.
fn check_sdk_usage(
    env: &EnvMap,
    guard: &SdkGuard,
    remote: Option<SdkKind>,
    strict: Option<bool>,
) -> InfraResult<()> {
    if client_flag_selects_appwrite(env) && remote != Some(SdkKind::Client) {
        guard.validate_client_sdk_usage(strict)?;
    }
    match remote {
        Some(SdkKind::Client) => {
            guard.validate_client_sdk_usage(strict)?;
        },
        Some(SdkKind::Server) => {
            guard.validate_server_sdk_usage(strict)?;
        },
        None => {},
    }
    Ok(())
}

/// Unified API for the resolved provider.
///
/// Selecting the remote backend without usable settings is an error; the
/// mock is never substituted silently. SDK misuse fails the build in
/// production.
pub fn build_backend_api(
    env: &EnvMap,
    selection: &ProviderSelection,
    guard: &SdkGuard,
) -> InfraResult<BackendApi> {
    let context = guard.context();
    match selection.mode {
        ProviderMode::Mock => {
            check_sdk_usage(env, guard, None, None)?;
            build_mock_api()
        },
        ProviderMode::Appwrite => {
            check_sdk_usage(env, guard, Some(sdk_for(context)), None)?;
            let config = client_config(&settings_for(env, context)?, RetryPolicy::STANDARD);
            config.validate()?;
            Ok(BackendApi::new(
                ProviderMode::Appwrite,
                Arc::new(AppwriteDocuments::new(&config)?),
                Arc::new(AppwriteStorage::new(&config)?),
            ))
        },
    }
}

/// Schema administration adapter. Provisioning needs the API key, so the
/// server SDK is checked against the guard's context; a violation is
/// recorded, not fatal. The migration retries its own existence checks, so
/// the client does not.
pub fn build_schema_admin(
    env: &EnvMap,
    guard: &SdkGuard,
) -> InfraResult<Arc<dyn SchemaAdminPort>> {
    guard.validate_server_sdk_usage(Some(false))?;
    let config = client_config(
        &settings_for(env, ExecutionContext::Server)?,
        RetryPolicy::NONE,
    );
    config.validate()?;
    Ok(Arc::new(AppwriteSchemaAdmin::new(&config)?))
}

/// Dependencies of migration and rollback, which always run server side.
pub fn build_migration_deps(
    env: &EnvMap,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<MigrationDeps> {
    let guard = build_sdk_guard(env, ExecutionContext::Server, logger.clone());
    Ok(MigrationDeps {
        schema: build_schema_admin(env, &guard)?,
        logger,
    })
}

/// Connectivity probes for the guard's context. SDK misuse is recorded for
/// the diagnostics report instead of failing the build.
pub fn build_connectivity_deps(
    env: &EnvMap,
    guard: &SdkGuard,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<ConnectivityDeps> {
    let context = guard.context();
    check_sdk_usage(env, guard, Some(sdk_for(context)), Some(false))?;
    let config = client_config(&settings_for(env, context)?, RetryPolicy::NONE);
    config.validate()?;
    Ok(ConnectivityDeps {
        probe: Arc::new(AppwriteConnectivityProbe::new(&config)?),
        logger,
    })
}

/// Live health probe. An unparsable environment falls back to the raw
/// health URL so the check still runs and reports its own failure.
pub fn build_health_probe(env: &EnvMap) -> InfraResult<Arc<dyn HealthProbePort>> {
    let (url, timeout_ms) = AppwriteEnv::from_map(env).map_or_else(
        |_| {
            let url = env
                .get(ENV_HEALTH_URL)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_HEALTH_URL);
            (url.to_owned(), DEFAULT_HTTP_TIMEOUT_MS)
        },
        |parsed| (parsed.health_url.to_string(), parsed.http_timeout_ms),
    );
    Ok(Arc::new(HttpHealthProbe::new(url, timeout_ms)?))
}

/// Everything a diagnostics run needs.
///
/// A remote client that cannot be built is carried as the connectivity
/// error, so the run reports it instead of aborting. The SDK section reports
/// the guard the connectivity build recorded into. The mock section always
/// runs against a freshly seeded mock backend.
pub fn build_diagnostics_deps(
    env: EnvMap,
    context: ExecutionContext,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<DiagnosticsDeps> {
    let provider = resolve_provider(&env, context);
    let sdk = build_sdk_guard(&env, context, logger.clone());
    let connectivity =
        build_connectivity_deps(&env, &sdk, logger.clone()).map_err(|error| unavailable(&error));

    Ok(DiagnosticsDeps {
        provider,
        connectivity,
        api: build_mock_api()?,
        sdk,
        health: build_health_probe(&env)?,
        logger,
        env,
    })
}

fn unavailable(error: &ErrorEnvelope) -> ErrorEnvelope {
    connectivity_unavailable(&error.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dernek_testkit::env::{valid_env, with, without};

    #[test]
    fn client_config_strips_trailing_slash() -> InfraResult<()> {
        let env = with(
            &valid_env(),
            &[("NEXT_PUBLIC_APPWRITE_ENDPOINT", "https://fra.cloud.appwrite.io/v1/")],
        );
        let config = client_config(
            &settings_for(&env, ExecutionContext::Server)?,
            RetryPolicy::STANDARD,
        );
        assert_eq!(config.endpoint.as_ref(), "https://fra.cloud.appwrite.io/v1");
        assert!(config.api_key.is_some());
        Ok(())
    }

    #[test]
    fn browser_settings_do_not_need_the_api_key() -> InfraResult<()> {
        let env = without(&valid_env(), &["APPWRITE_API_KEY"]);

        let settings = settings_for(&env, ExecutionContext::Browser)?;
        assert!(settings.api_key.is_none());

        let error = settings_for(&env, ExecutionContext::Server)
            .err()
            .map(|error| error.message);
        assert_eq!(error.as_deref(), Some("APPWRITE_API_KEY is not defined"));
        Ok(())
    }

    #[test]
    fn mock_selection_builds_mock_api() -> InfraResult<()> {
        let env = EnvMap::new();
        let selection = resolve_provider(&env, ExecutionContext::Server);
        let guard = build_sdk_guard(&env, ExecutionContext::Server, None);
        let api = build_backend_api(&env, &selection, &guard)?;
        assert_eq!(api.mode(), ProviderMode::Mock);
        assert_eq!(guard.violation_count(), 0);
        Ok(())
    }

    #[test]
    fn remote_selection_without_endpoint_is_an_error() {
        let env = without(&valid_env(), &["NEXT_PUBLIC_APPWRITE_ENDPOINT"]);
        let selection = resolve_provider(&env, ExecutionContext::Server);
        assert_eq!(selection.mode, ProviderMode::Appwrite);

        let guard = build_sdk_guard(&env, ExecutionContext::Server, None);
        let result = build_backend_api(&env, &selection, &guard);
        assert!(result.is_err());
    }

    #[test]
    fn remote_selection_builds_remote_api() -> InfraResult<()> {
        let env = valid_env();
        let selection = resolve_provider(&env, ExecutionContext::Server);
        let guard = build_sdk_guard(&env, ExecutionContext::Server, None);
        let api = build_backend_api(&env, &selection, &guard)?;
        assert_eq!(api.mode(), ProviderMode::Appwrite);
        Ok(())
    }

    #[test]
    fn client_flag_on_server_records_client_sdk_violation() -> InfraResult<()> {
        let env = valid_env();
        let selection = resolve_provider(&env, ExecutionContext::Server);
        let guard = build_sdk_guard(&env, ExecutionContext::Server, None);

        build_backend_api(&env, &selection, &guard)?;

        let report = guard.report();
        assert_eq!(report.count, 1);
        assert_eq!(report.violations[0].kind, SdkKind::Client);
        assert_eq!(
            report.violations[0].message,
            "Client SDK used on server. Use server SDK instead."
        );
        Ok(())
    }

    #[test]
    fn browser_build_of_client_handles_is_clean() -> InfraResult<()> {
        let env = valid_env();
        let selection = resolve_provider(&env, ExecutionContext::Browser);
        let guard = build_sdk_guard(&env, ExecutionContext::Browser, None);

        let api = build_backend_api(&env, &selection, &guard)?;

        assert_eq!(api.mode(), ProviderMode::Appwrite);
        assert_eq!(guard.violation_count(), 0);
        Ok(())
    }

    #[test]
    fn production_client_flag_on_server_fails_api_build() {
        let env = with(&valid_env(), &[("NODE_ENV", "production")]);
        let selection = resolve_provider(&env, ExecutionContext::Server);
        let guard = build_sdk_guard(&env, ExecutionContext::Server, None);

        let error = build_backend_api(&env, &selection, &guard).err();

        assert_eq!(
            error.map(|error| error.code),
            Some(dernek_shared::ErrorCode::new("sdk", "wrong_context"))
        );
        assert_eq!(guard.violation_count(), 1);
    }

    #[test]
    fn schema_admin_in_browser_guard_records_server_sdk_violation() -> InfraResult<()> {
        let env = with(&valid_env(), &[("NODE_ENV", "production")]);
        let guard = build_sdk_guard(&env, ExecutionContext::Browser, None);

        build_schema_admin(&env, &guard)?;

        let report = guard.report();
        assert_eq!(report.count, 1);
        assert_eq!(report.violations[0].kind, SdkKind::Server);
        Ok(())
    }

    #[test]
    fn diagnostics_guard_holds_connectivity_build_violations() -> InfraResult<()> {
        let server = build_diagnostics_deps(valid_env(), ExecutionContext::Server, None)?;
        assert_eq!(server.sdk.violation_count(), 1);

        let browser = build_diagnostics_deps(valid_env(), ExecutionContext::Browser, None)?;
        assert_eq!(browser.sdk.violation_count(), 0);
        Ok(())
    }

    #[test]
    fn diagnostics_deps_carry_client_errors() -> InfraResult<()> {
        let env = without(&valid_env(), &["NEXT_PUBLIC_APPWRITE_PROJECT_ID"]);
        let deps = build_diagnostics_deps(env, ExecutionContext::Server, None)?;

        let message = deps.connectivity.err().map(|error| error.message);
        assert_eq!(
            message.as_deref(),
            Some(
                "backend client is not configured: NEXT_PUBLIC_APPWRITE_PROJECT_ID is not defined"
            )
        );
        assert_eq!(deps.api.mode(), ProviderMode::Mock);
        Ok(())
    }

    #[test]
    fn health_probe_uses_configured_url() -> InfraResult<()> {
        let env = with(
            &valid_env(),
            &[("DERNEK_HEALTH_URL", "http://127.0.0.1:4000/api/health")],
        );
        let probe = build_health_probe(&env)?;
        assert_eq!(probe.url(), "http://127.0.0.1:4000/api/health");
        Ok(())
    }
}
