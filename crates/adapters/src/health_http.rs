//! Live health check against the dashboard's health endpoint.

use dernek_ports::{BoxFuture, HealthCheckResponse, HealthProbePort};
use dernek_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, timeout_with_context,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct HealthBody {
    #[serde(default)]
    healthy: bool,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Health probe fetching a JSON health document over HTTP.
#[derive(Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: Box<str>,
    timeout: Duration,
}

impl HttpHealthProbe {
    /// Creates the probe.
    pub fn new(url: impl Into<Box<str>>, timeout_ms: u64) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "health URL is required",
            ));
        }
        let timeout = Duration::from_millis(timeout_ms.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("health", "client_init_failed"),
                    format!("failed to build health client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    async fn fetch(&self) -> Result<HealthCheckResponse> {
        let response = self
            .client
            .get(self.url.as_ref())
            .send()
            .await
            .map_err(|error| map_health_transport_error(&error))?;
        let status = response.status().as_u16();
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_health_transport_error(&error))?;
        let body: HealthBody = serde_json::from_slice(&payload).unwrap_or_default();
        Ok(HealthCheckResponse {
            status,
            healthy: body.healthy,
            recommendations: body.recommendations,
        })
    }
}

fn map_health_transport_error(error: &reqwest::Error) -> ErrorEnvelope {
    let class = if error.is_timeout() || error.is_connect() {
        ErrorClass::Retriable
    } else {
        ErrorClass::NonRetriable
    };
    ErrorEnvelope::unexpected(
        ErrorCode::new("health", "request_failed"),
        format!("health request failed: {error}"),
        class,
    )
    .with_metadata("operation", "health.fetch")
}

impl HealthProbePort for HttpHealthProbe {
    fn url(&self) -> &str {
        &self.url
    }

    fn check(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<HealthCheckResponse>> {
        let ctx = ctx.clone();
        let probe = self.clone();
        Box::pin(async move {
            timeout_with_context(&ctx, probe.timeout, "health.fetch", probe.fetch()).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_is_rejected() {
        let error = HttpHealthProbe::new("  ", 1_000).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() -> Result<()> {
        let probe = HttpHealthProbe::new("http://127.0.0.1:9/api/health", 500)?;
        let result = probe.check(&RequestContext::new_request()).await;
        assert!(result.is_err());
        Ok(())
    }
}
