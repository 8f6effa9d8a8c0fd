//! Backend provider resolution.
//!
//! The provider is chosen from environment flags with a fixed precedence. In
//! a browser context the client-visible flag wins, then the server flag, then
//! the `mock` default. A server context never reads the client flag.

use crate::env::{ENV_BACKEND_PROVIDER, ENV_CLIENT_BACKEND_PROVIDER, EnvMap};
use dernek_domain::{ExecutionContext, ProviderMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the provider value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSource {
    /// `NEXT_PUBLIC_BACKEND_PROVIDER`.
    ClientEnv,
    /// `BACKEND_PROVIDER`.
    ServerEnv,
    /// Neither flag set.
    Default,
}

impl ProviderSource {
    /// Stable snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientEnv => "client_env",
            Self::ServerEnv => "server_env",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ProviderSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Resolved provider plus how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    /// Effective provider.
    pub mode: ProviderMode,
    /// Origin of the value.
    pub source: ProviderSource,
    /// Normalized (trimmed, lower-cased) raw value, if any flag was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Box<str>>,
}

impl ProviderSelection {
    /// False when a flag was set to something other than `mock` or `appwrite`.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.raw
            .as_deref()
            .is_none_or(|raw| matches!(raw, "mock" | "appwrite"))
    }

    pub(crate) fn from_candidates(env: &EnvMap, candidates: &[(&str, ProviderSource)]) -> Self {
        let found = candidates.iter().find_map(|(var, source)| {
            env.get(*var)
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .map(|value| (value, *source))
        });

        let Some((raw, source)) = found else {
            return Self {
                mode: ProviderMode::Mock,
                source: ProviderSource::Default,
                raw: None,
            };
        };

        let mode = if raw == "appwrite" {
            ProviderMode::Appwrite
        } else {
            ProviderMode::Mock
        };
        let selection = Self {
            mode,
            source,
            raw: Some(raw.into()),
        };
        if !selection.is_recognized() {
            tracing::warn!(
                event = "dernek.provider.unrecognized",
                source = source.as_str(),
                value = selection.raw.as_deref().unwrap_or_default(),
                "unrecognized backend provider, falling back to mock"
            );
        }
        selection
    }
}

/// Resolve the active provider for an execution context.
#[must_use]
pub fn resolve_provider(env: &EnvMap, context: ExecutionContext) -> ProviderSelection {
    match context {
        ExecutionContext::Browser => ProviderSelection::from_candidates(
            env,
            &[
                (ENV_CLIENT_BACKEND_PROVIDER, ProviderSource::ClientEnv),
                (ENV_BACKEND_PROVIDER, ProviderSource::ServerEnv),
            ],
        ),
        ExecutionContext::Server => ProviderSelection::from_candidates(
            env,
            &[(ENV_BACKEND_PROVIDER, ProviderSource::ServerEnv)],
        ),
    }
}

/// True when the client-visible flag selects the remote backend. The
/// dashboard then loads the client SDK wherever its data layer runs.
#[must_use]
pub fn client_flag_selects_appwrite(env: &EnvMap) -> bool {
    env.get(ENV_CLIENT_BACKEND_PROVIDER)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("appwrite"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_to_mock_without_flags() {
        for context in [ExecutionContext::Browser, ExecutionContext::Server] {
            let selection = resolve_provider(&EnvMap::new(), context);
            assert_eq!(selection.mode, ProviderMode::Mock);
            assert_eq!(selection.source, ProviderSource::Default);
            assert!(selection.is_recognized());
        }
    }

    #[test]
    fn values_are_case_insensitive() {
        let upper = resolve_provider(&env(&[(ENV_BACKEND_PROVIDER, " MOCK ")]), ExecutionContext::Server);
        let lower = resolve_provider(&env(&[(ENV_BACKEND_PROVIDER, "mock")]), ExecutionContext::Server);
        assert_eq!(upper, lower);

        let appwrite = resolve_provider(
            &env(&[(ENV_BACKEND_PROVIDER, "AppWrite")]),
            ExecutionContext::Server,
        );
        assert_eq!(appwrite.mode, ProviderMode::Appwrite);
    }

    #[test]
    fn browser_prefers_client_flag() {
        let flags = env(&[
            (ENV_CLIENT_BACKEND_PROVIDER, "appwrite"),
            (ENV_BACKEND_PROVIDER, "mock"),
        ]);

        let browser = resolve_provider(&flags, ExecutionContext::Browser);
        assert_eq!(browser.mode, ProviderMode::Appwrite);
        assert_eq!(browser.source, ProviderSource::ClientEnv);

        let server = resolve_provider(&flags, ExecutionContext::Server);
        assert_eq!(server.mode, ProviderMode::Mock);
        assert_eq!(server.source, ProviderSource::ServerEnv);
    }

    #[test]
    fn server_ignores_client_flag() {
        let selection = resolve_provider(
            &env(&[(ENV_CLIENT_BACKEND_PROVIDER, "appwrite")]),
            ExecutionContext::Server,
        );
        assert_eq!(selection.source, ProviderSource::Default);
        assert_eq!(selection.mode, ProviderMode::Mock);
    }

    #[test]
    fn unknown_value_falls_back_to_mock_and_is_flagged() {
        let selection = resolve_provider(
            &env(&[(ENV_BACKEND_PROVIDER, "firebase")]),
            ExecutionContext::Server,
        );
        assert_eq!(selection.mode, ProviderMode::Mock);
        assert!(!selection.is_recognized());
        assert_eq!(selection.raw.as_deref(), Some("firebase"));
    }

    #[test]
    fn client_flag_is_read_regardless_of_context() {
        let client = |value| env(&[(ENV_CLIENT_BACKEND_PROVIDER, value)]);
        assert!(client_flag_selects_appwrite(&client(" AppWrite ")));
        assert!(!client_flag_selects_appwrite(&client("mock")));

        let server_only = env(&[(ENV_BACKEND_PROVIDER, "appwrite")]);
        assert!(!client_flag_selects_appwrite(&server_only));
    }

    #[test]
    fn blank_client_flag_falls_through_to_server_flag() {
        let selection = resolve_provider(
            &env(&[
                (ENV_CLIENT_BACKEND_PROVIDER, "  "),
                (ENV_BACKEND_PROVIDER, "appwrite"),
            ]),
            ExecutionContext::Browser,
        );
        assert_eq!(selection.source, ProviderSource::ServerEnv);
        assert_eq!(selection.mode, ProviderMode::Appwrite);
    }
}
