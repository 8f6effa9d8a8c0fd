//! Shared Appwrite REST client: headers, deadlines, cancellation, retry.

use crate::appwrite::error::{
    cancelled_error, invalid_response_error, map_status_error, map_transport_error, timeout_error,
};
use dernek_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, RetryPolicy, SecretString,
    retry_async,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Project header sent with every request.
pub const PROJECT_HEADER: &str = "x-appwrite-project";
/// API key header sent by server-side clients.
pub const KEY_HEADER: &str = "x-appwrite-key";

/// Appwrite REST client configuration.
#[derive(Debug, Clone)]
pub struct AppwriteClientConfig {
    /// API endpoint, ending in `/v1`.
    pub endpoint: Box<str>,
    /// Project id.
    pub project_id: Box<str>,
    /// Database id used by document and schema calls.
    pub database_id: Box<str>,
    /// Server API key; client-side configurations leave it unset.
    pub api_key: Option<SecretString>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retry policy for retriable failures.
    pub retry: RetryPolicy,
}

impl AppwriteClientConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Appwrite endpoint is required",
            ));
        }
        if self.project_id.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Appwrite project id is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Appwrite timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Low-level Appwrite REST client shared by the adapters.
#[derive(Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    base_url: Box<str>,
    project_id: Box<str>,
    database_id: Box<str>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AppwriteClient {
    /// Builds a client with the project (and optional key) headers installed.
    pub fn new(config: &AppwriteClientConfig) -> Result<Self> {
        Self::build(config, true)
    }

    /// Builds a client that never sends the API key, for anonymous probes.
    pub fn anonymous(config: &AppwriteClientConfig) -> Result<Self> {
        Self::build(config, false)
    }

    fn build(config: &AppwriteClientConfig, with_key: bool) -> Result<Self> {
        config.validate()?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(PROJECT_HEADER),
            header_value(config.project_id.trim(), "project id")?,
        );
        if with_key {
            if let Some(key) = config.api_key.as_ref() {
                let mut value = header_value(key.expose().trim(), "API key")?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static(KEY_HEADER), value);
            }
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("backend", "client_init_failed"),
                    format!("failed to build Appwrite client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim().trim_end_matches('/').into(),
            project_id: config.project_id.trim().into(),
            database_id: config.database_id.trim().into(),
            timeout,
            retry: config.retry,
        })
    }

    /// Endpoint without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Project id sent in the project header.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Database id for document and schema paths.
    #[must_use]
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Underlying HTTP client.
    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a request built per attempt and decodes a JSON response.
    pub async fn send_json<T, F>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        build: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let body = self.send(ctx, operation, build).await?;
        serde_json::from_slice(&body).map_err(|error| invalid_response_error(operation, &error))
    }

    /// Sends a request built per attempt, discarding the response body.
    pub async fn send_unit<F>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        build: F,
    ) -> Result<()>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.send(ctx, operation, build).await.map(|_| ())
    }

    /// Sends a request, retrying retriable failures under the configured policy.
    pub async fn send<F>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        build: F,
    ) -> Result<Vec<u8>>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        retry_async(ctx, self.retry, operation, || {
            self.send_once(ctx, operation, build(&self.http))
        })
        .await
    }

    /// Single attempt returning the raw status and body, without status mapping.
    pub async fn send_raw(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<(u16, Vec<u8>)> {
        ctx.ensure_not_cancelled(operation)?;
        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            res = tokio::time::timeout(self.timeout, request.send()) => res,
        };
        let response = match response {
            Ok(result) => result.map_err(|error| map_transport_error(&error, operation))?,
            Err(_) => return Err(timeout_error(operation)),
        };

        let status = response.status().as_u16();
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_transport_error(&error, operation))?;
        Ok((status, payload.to_vec()))
    }

    async fn send_once(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<u8>> {
        let (status, payload) = self.send_raw(ctx, operation, request).await?;
        if !(200..300).contains(&status) {
            return Err(map_status_error(status, &payload, operation));
        }
        Ok(payload)
    }
}

fn header_value(value: &str, label: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            format!("Appwrite {label} contains invalid header characters"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppwriteClientConfig {
        AppwriteClientConfig {
            endpoint: "https://cloud.appwrite.io/v1/".into(),
            project_id: "p1".into(),
            database_id: "dernek_db".into(),
            api_key: None,
            timeout_ms: 1_000,
            retry: RetryPolicy::NONE,
        }
    }

    #[test]
    fn urls_join_without_double_slashes() -> Result<()> {
        let client = AppwriteClient::new(&config())?;
        assert_eq!(client.base_url(), "https://cloud.appwrite.io/v1");
        assert_eq!(
            client.url("/databases/dernek_db"),
            "https://cloud.appwrite.io/v1/databases/dernek_db"
        );
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = AppwriteClientConfig {
            timeout_ms: 0,
            ..config()
        };
        let error = AppwriteClient::new(&config).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }

    #[test]
    fn newline_in_key_is_rejected() {
        let config = AppwriteClientConfig {
            api_key: Some(SecretString::new("abc\ndef")),
            ..config()
        };
        assert!(AppwriteClient::new(&config).is_err());
        assert!(AppwriteClient::anonymous(&config).is_ok());
    }
}
