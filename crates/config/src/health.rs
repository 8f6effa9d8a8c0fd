//! Local health snapshot of the configured backend.

use crate::env::{
    ENV_APPWRITE_API_KEY, ENV_APPWRITE_ENDPOINT, ENV_APPWRITE_PROJECT_ID, ENV_BACKEND_PROVIDER,
    ENV_CLIENT_BACKEND_PROVIDER, ENV_DATABASE_ID, EnvMap,
};
use crate::provider::{ProviderSelection, ProviderSource};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Which backend settings are present. Values are never included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppwriteConfigFlags {
    /// Endpoint configured.
    pub endpoint: bool,
    /// Project id configured.
    pub project_id: bool,
    /// Database id configured.
    pub database_id: bool,
    /// API key configured.
    pub api_key_configured: bool,
}

/// Health payload served by the dashboard and printed by `dernek health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Always true: the process answered.
    pub ok: bool,
    /// Lower-cased provider flag, `mock` when unset.
    pub provider: Box<str>,
    /// Presence flags of backend settings.
    pub appwrite: AppwriteConfigFlags,
    /// Settings are complete for the selected provider.
    pub ready_for_production: bool,
    /// RFC 3339 snapshot time.
    pub timestamp: String,
}

/// Build a snapshot. The public provider flag takes precedence over the
/// server flag, matching what the dashboard route reports.
#[must_use]
pub fn health_snapshot(env: &EnvMap, at: DateTime<Utc>) -> HealthSnapshot {
    let flags = AppwriteConfigFlags {
        endpoint: is_set(env, ENV_APPWRITE_ENDPOINT),
        project_id: is_set(env, ENV_APPWRITE_PROJECT_ID),
        database_id: is_set(env, ENV_DATABASE_ID),
        api_key_configured: is_set(env, ENV_APPWRITE_API_KEY),
    };
    let selection = ProviderSelection::from_candidates(
        env,
        &[
            (ENV_CLIENT_BACKEND_PROVIDER, ProviderSource::ClientEnv),
            (ENV_BACKEND_PROVIDER, ProviderSource::ServerEnv),
        ],
    );
    let provider: Box<str> = selection.raw.unwrap_or_else(|| "mock".into());

    let backend_ready = match provider.as_ref() {
        "mock" => true,
        "appwrite" => flags.api_key_configured && flags.database_id,
        _ => false,
    };

    HealthSnapshot {
        ok: true,
        ready_for_production: flags.endpoint && flags.project_id && backend_ready,
        provider,
        appwrite: flags,
        timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn is_set(env: &EnvMap, var: &str) -> bool {
    env.get(var).is_some_and(|value| !value.trim().is_empty())
}
