//! Environment variable names and typed parsing.
//!
//! All parsing works on an [`EnvMap`] snapshot so callers decide when the
//! process environment is read. [`collect_std_env`] takes a fresh snapshot on
//! every call; nothing is cached.

use crate::storage::StorageBuckets;
use dernek_shared::{ErrorCode, ErrorEnvelope, SecretString, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Snapshot of environment variables by name.
pub type EnvMap = BTreeMap<String, String>;

/// Env var: Appwrite endpoint URL (must end with `/v1`).
pub const ENV_APPWRITE_ENDPOINT: &str = "NEXT_PUBLIC_APPWRITE_ENDPOINT";
/// Env var: Appwrite project id.
pub const ENV_APPWRITE_PROJECT_ID: &str = "NEXT_PUBLIC_APPWRITE_PROJECT_ID";
/// Env var: database id.
pub const ENV_DATABASE_ID: &str = "NEXT_PUBLIC_DATABASE_ID";
/// Env var: server-only privileged API key.
pub const ENV_APPWRITE_API_KEY: &str = "APPWRITE_API_KEY";
/// Env var: provider flag visible to browser bundles.
pub const ENV_CLIENT_BACKEND_PROVIDER: &str = "NEXT_PUBLIC_BACKEND_PROVIDER";
/// Env var: provider flag readable in any context.
pub const ENV_BACKEND_PROVIDER: &str = "BACKEND_PROVIDER";
/// Env var: runtime environment (`production` enables strict SDK checks).
pub const ENV_NODE_ENV: &str = "NODE_ENV";
/// Env var: documents bucket id.
pub const ENV_STORAGE_DOCUMENTS: &str = "NEXT_PUBLIC_STORAGE_DOCUMENTS";
/// Env var: receipts bucket id.
pub const ENV_STORAGE_RECEIPTS: &str = "NEXT_PUBLIC_STORAGE_RECEIPTS";
/// Env var: photos bucket id.
pub const ENV_STORAGE_PHOTOS: &str = "NEXT_PUBLIC_STORAGE_PHOTOS";
/// Env var: reports bucket id.
pub const ENV_STORAGE_REPORTS: &str = "NEXT_PUBLIC_STORAGE_REPORTS";
/// Env var: dashboard health endpoint probed by diagnostics.
pub const ENV_HEALTH_URL: &str = "DERNEK_HEALTH_URL";
/// Env var: per-request HTTP timeout in milliseconds.
pub const ENV_HTTP_TIMEOUT_MS: &str = "DERNEK_HTTP_TIMEOUT_MS";

/// Database id used when none is configured.
pub const DEFAULT_DATABASE_ID: &str = "dernek_db";
/// Health endpoint used when none is configured.
pub const DEFAULT_HEALTH_URL: &str = "http://localhost:3000/api/health?detailed=true";
/// HTTP timeout used when none is configured.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Every variable this workspace reads.
pub const KNOWN_ENV_VARS: &[&str] = &[
    ENV_APPWRITE_ENDPOINT,
    ENV_APPWRITE_PROJECT_ID,
    ENV_DATABASE_ID,
    ENV_APPWRITE_API_KEY,
    ENV_CLIENT_BACKEND_PROVIDER,
    ENV_BACKEND_PROVIDER,
    ENV_NODE_ENV,
    ENV_STORAGE_DOCUMENTS,
    ENV_STORAGE_RECEIPTS,
    ENV_STORAGE_PHOTOS,
    ENV_STORAGE_REPORTS,
    ENV_HEALTH_URL,
    ENV_HTTP_TIMEOUT_MS,
];

/// Snapshot the known variables from the process environment.
pub fn collect_std_env() -> EnvMap {
    KNOWN_ENV_VARS
        .iter()
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| ((*name).to_owned(), value))
        })
        .collect()
}

/// Returns true when `NODE_ENV` is `production`.
pub fn is_production(env: &EnvMap) -> bool {
    trimmed(env, ENV_NODE_ENV) == Some("production")
}

/// Typed view of the Appwrite-related environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppwriteEnv {
    /// Endpoint URL, when set.
    pub endpoint: Option<Url>,
    /// Project id, when set.
    pub project_id: Option<Box<str>>,
    /// Database id, defaulted.
    pub database_id: Box<str>,
    /// Whether the database id came from the environment.
    pub database_id_configured: bool,
    /// Privileged API key, when set.
    pub api_key: Option<SecretString>,
    /// Storage bucket ids.
    pub storage: StorageBuckets,
    /// Dashboard health endpoint.
    pub health_url: Url,
    /// Per-request HTTP timeout.
    pub http_timeout_ms: u64,
}

/// Checked connection settings for the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppwriteSettings {
    /// Endpoint URL.
    pub endpoint: Url,
    /// Project id.
    pub project_id: Box<str>,
    /// Database id.
    pub database_id: Box<str>,
    /// API key; present for server settings.
    pub api_key: Option<SecretString>,
    /// Per-request HTTP timeout.
    pub timeout_ms: u64,
}

impl AppwriteEnv {
    /// Parse from an env snapshot. Empty values count as unset.
    pub fn from_map(env: &EnvMap) -> Result<Self, EnvParseError> {
        let database = trimmed(env, ENV_DATABASE_ID);
        Ok(Self {
            endpoint: parse_optional_url(env, ENV_APPWRITE_ENDPOINT)?,
            project_id: trimmed(env, ENV_APPWRITE_PROJECT_ID).map(Box::from),
            database_id: database.unwrap_or(DEFAULT_DATABASE_ID).into(),
            database_id_configured: database.is_some(),
            api_key: trimmed(env, ENV_APPWRITE_API_KEY).map(|key| SecretString::new(key)),
            storage: StorageBuckets::from_map(env),
            health_url: parse_optional_url(env, ENV_HEALTH_URL)?
                .map_or_else(default_health_url, Ok)?,
            http_timeout_ms: parse_optional_u64(env, ENV_HTTP_TIMEOUT_MS)?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
        })
    }

    /// Snapshot and parse the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        Self::from_map(&collect_std_env())
    }

    /// Settings for unprivileged access: endpoint and project id are required.
    pub fn require_client(&self) -> Result<AppwriteSettings, EnvParseError> {
        let endpoint = self.endpoint.clone().ok_or(EnvParseError::Missing {
            var: ENV_APPWRITE_ENDPOINT,
        })?;
        let project_id = self.project_id.clone().ok_or(EnvParseError::Missing {
            var: ENV_APPWRITE_PROJECT_ID,
        })?;
        Ok(AppwriteSettings {
            endpoint,
            project_id,
            database_id: self.database_id.clone(),
            api_key: None,
            timeout_ms: self.http_timeout_ms,
        })
    }

    /// Settings for privileged access: the API key is required as well.
    pub fn require_server(&self) -> Result<AppwriteSettings, EnvParseError> {
        let mut settings = self.require_client()?;
        settings.api_key = Some(self.api_key.clone().ok_or(EnvParseError::Missing {
            var: ENV_APPWRITE_API_KEY,
        })?);
        Ok(settings)
    }
}

/// Env parsing errors for typed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// A required variable is unset or empty.
    Missing {
        /// Env var name.
        var: &'static str,
    },
    /// An integer variable failed to parse.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// A URL variable failed to parse.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Missing { .. } => ErrorCode::new("config", "env_missing"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "env_invalid_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "env_invalid_url"),
        }
    }

    /// Env var the error refers to.
    #[must_use]
    pub const fn var(&self) -> &'static str {
        match self {
            Self::Missing { var } | Self::InvalidInt { var, .. } | Self::InvalidUrl { var, .. } => {
                var
            },
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { var } => write!(formatter, "{var} is not defined"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be a whole number"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope =
            Self::expected(error.error_code(), error.to_string()).with_metadata("envVar", error.var());
        match error {
            EnvParseError::Missing { .. } => envelope,
            EnvParseError::InvalidInt { var, value } | EnvParseError::InvalidUrl { var, value } => {
                envelope.with_metadata("value", redact_if_secret(var, &value))
            },
        }
    }
}

fn trimmed<'a>(env: &'a EnvMap, var: &str) -> Option<&'a str> {
    env.get(var)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_optional_url(env: &EnvMap, var: &'static str) -> Result<Option<Url>, EnvParseError> {
    trimmed(env, var)
        .map(|raw| {
            Url::parse(raw).map_err(|_| EnvParseError::InvalidUrl {
                var,
                value: raw.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_u64(env: &EnvMap, var: &'static str) -> Result<Option<u64>, EnvParseError> {
    trimmed(env, var)
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: raw.to_owned(),
            })
        })
        .transpose()
}

fn default_health_url() -> Result<Url, EnvParseError> {
    Url::parse(DEFAULT_HEALTH_URL).map_err(|_| EnvParseError::InvalidUrl {
        var: ENV_HEALTH_URL,
        value: DEFAULT_HEALTH_URL.to_owned(),
    })
}
