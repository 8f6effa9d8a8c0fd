//! Connectivity and health probe boundary contracts.

use crate::BoxFuture;
use dernek_shared::{RequestContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend surface probed by the connectivity tester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeTarget {
    /// `GET /health`.
    Endpoint,
    /// `GET /account` without a session.
    Account,
    /// `GET /databases`.
    Databases,
    /// `GET /storage/buckets`.
    StorageBuckets,
}

impl ProbeTarget {
    /// All targets in probe order.
    pub const ALL: [Self; 4] = [
        Self::Endpoint,
        Self::Account,
        Self::Databases,
        Self::StorageBuckets,
    ];

    /// Path relative to the endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Endpoint => "health",
            Self::Account => "account",
            Self::Databases => "databases",
            Self::StorageBuckets => "storage/buckets",
        }
    }

    /// Human-readable test name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint Reachability",
            Self::Account => "Account Service",
            Self::Databases => "Database Service",
            Self::StorageBuckets => "Storage Service",
        }
    }
}

/// Raw probe answer. Transport failures are errors instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    /// HTTP status.
    pub status: u16,
    /// Parsed JSON body, when the body was JSON.
    pub body: Option<Value>,
}

/// Boundary contract for raw connectivity probes against the backend.
pub trait ConnectivityProbePort: Send + Sync {
    /// Endpoint the probes run against, for reports.
    fn endpoint(&self) -> &str;

    /// Issue one probe.
    fn probe(&self, ctx: &RequestContext, target: ProbeTarget)
    -> BoxFuture<'_, Result<ProbeResponse>>;
}

/// Parsed answer of the dashboard health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// HTTP status.
    pub status: u16,
    /// `healthy` flag reported by the endpoint.
    pub healthy: bool,
    /// Recommendations reported by the endpoint.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl HealthCheckResponse {
    /// 2xx with `healthy == true`.
    #[must_use]
    pub fn passed(&self) -> bool {
        (200..300).contains(&self.status) && self.healthy
    }
}

/// Boundary contract for the live dashboard health check.
pub trait HealthProbePort: Send + Sync {
    /// URL being checked, for reports.
    fn url(&self) -> &str;

    /// Fetch and parse the health endpoint.
    fn check(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<HealthCheckResponse>>;
}
