//! Backend and SDK vocabulary shared by configuration and the data API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Active data-access implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// In-memory mock backend for local development.
    Mock,
    /// Remote Appwrite backend.
    Appwrite,
}

impl ProviderMode {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Appwrite => "appwrite",
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Where the calling code executes. Set once by the process entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Browser bundle: client-visible configuration only.
    Browser,
    /// Server process: privileged configuration available.
    Server,
}

impl ExecutionContext {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Flavour of remote SDK handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkKind {
    /// Unprivileged, browser-safe handle.
    Client,
    /// Privileged handle holding the API key.
    Server,
}

impl SdkKind {
    /// Context this handle belongs to.
    #[must_use]
    pub const fn home_context(self) -> ExecutionContext {
        match self {
            Self::Client => ExecutionContext::Browser,
            Self::Server => ExecutionContext::Server,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for SdkKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
