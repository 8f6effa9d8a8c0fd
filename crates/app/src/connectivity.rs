//! Backend connectivity tester.
//!
//! Runs four probes in order (endpoint, account, databases, storage
//! buckets), each timed and retried, and summarises them into a report.

use crate::migration::duration_ms;
use chrono::{SecondsFormat, Utc};
use dernek_ports::{ConnectivityProbePort, LoggerPort, ProbeResponse, ProbeTarget, log_fields};
use dernek_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, RetryPolicy,
    retry_async_with_observer,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Dependencies of [`run_connectivity_test`].
#[derive(Clone)]
pub struct ConnectivityDeps {
    /// Raw probes against the backend.
    pub probe: Arc<dyn ConnectivityProbePort>,
    /// Optional structured logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Input of [`run_connectivity_test`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityInput {
    /// Retry policy applied to each probe.
    pub retry: RetryPolicy,
}

impl Default for ConnectivityInput {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::STANDARD,
        }
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Whether the service behaved as a healthy backend would.
    pub success: bool,
    /// Wall-clock duration including retries.
    pub timing: u64,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts made before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    /// Probe-specific details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Per-probe results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityTests {
    /// `GET /health` reachability.
    pub endpoint: TestResult,
    /// Anonymous account lookup, expected to answer 401.
    pub account: TestResult,
    /// Database listing with the API key.
    pub database: TestResult,
    /// Bucket listing with the API key.
    pub storage: TestResult,
}

impl ConnectivityTests {
    fn all(&self) -> [&TestResult; 4] {
        [&self.endpoint, &self.account, &self.database, &self.storage]
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivitySummary {
    /// Probes run.
    pub total_tests: usize,
    /// Probes that passed.
    pub successful_tests: usize,
    /// Probes that failed.
    pub failed_tests: usize,
    /// Share of successful probes, rounded percent.
    pub overall_health: u8,
}

/// Full connectivity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    /// Endpoint the probes ran against.
    pub endpoint: String,
    /// RFC 3339 time the report was built.
    pub timestamp: String,
    /// Per-probe results.
    pub tests: ConnectivityTests,
    /// Aggregate counts.
    pub summary: ConnectivitySummary,
    /// Remediation hints for failed probes.
    pub recommendations: Vec<String>,
}

/// Run the four probes and build the report.
///
/// Probe failures land in the report. Only cancellation is returned as an
/// error.
#[tracing::instrument(name = "connectivity.run", skip_all)]
pub async fn run_connectivity_test(
    ctx: &RequestContext,
    deps: &ConnectivityDeps,
    input: ConnectivityInput,
) -> Result<ConnectivityReport> {
    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "dernek.connectivity.start",
            "Running backend connectivity tests",
            Some(log_fields([("endpoint", Value::from(deps.probe.endpoint()))])),
        );
    }

    let tests = ConnectivityTests {
        endpoint: run_probe(ctx, deps, input.retry, ProbeTarget::Endpoint).await?,
        account: run_probe(ctx, deps, input.retry, ProbeTarget::Account).await?,
        database: run_probe(ctx, deps, input.retry, ProbeTarget::Databases).await?,
        storage: run_probe(ctx, deps, input.retry, ProbeTarget::StorageBuckets).await?,
    };

    let total_tests = tests.all().len();
    let successful_tests = tests.all().iter().filter(|test| test.success).count();
    let summary = ConnectivitySummary {
        total_tests,
        successful_tests,
        failed_tests: total_tests - successful_tests,
        overall_health: health_percent(successful_tests, total_tests),
    };
    let recommendations = recommendations(&tests);

    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "dernek.connectivity.completed",
            &format!("{successful_tests}/{total_tests} connectivity tests passed"),
            Some(log_fields([(
                "overallHealth",
                Value::from(summary.overall_health),
            )])),
        );
    }

    Ok(ConnectivityReport {
        endpoint: deps.probe.endpoint().to_owned(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tests,
        summary,
        recommendations,
    })
}

async fn run_probe(
    ctx: &RequestContext,
    deps: &ConnectivityDeps,
    policy: RetryPolicy,
    target: ProbeTarget,
) -> Result<TestResult> {
    let started_at = Instant::now();
    let mut attempts = 1u32;
    let mut send = || {
        let probe = Arc::clone(&deps.probe);
        let ctx = ctx.clone();
        async move {
            let response = probe.probe(&ctx, target).await?;
            interpret(target, &response)
        }
    };

    let on_retry = |attempt: u32, error: &ErrorEnvelope| {
        attempts = attempt.saturating_add(1);
        if let Some(logger) = deps.logger.as_ref() {
            logger.debug(
                "dernek.connectivity.retry",
                &error.message,
                Some(log_fields([
                    ("test", Value::from(target.label())),
                    ("attempt", Value::from(attempt)),
                ])),
            );
        }
    };
    let outcome =
        retry_async_with_observer(ctx, policy, "connectivity.probe", &mut send, on_retry).await;

    let timing = duration_ms(started_at);
    match outcome {
        Ok(Verdict::Passed(details)) => Ok(TestResult {
            success: true,
            timing,
            error: None,
            retry_count: None,
            details,
        }),
        Ok(Verdict::Rejected(message)) => Ok(TestResult {
            success: false,
            timing,
            error: Some(message),
            retry_count: None,
            details: None,
        }),
        Err(error) if error.is_cancelled() => Err(error),
        Err(error) => Ok(TestResult {
            success: false,
            timing,
            error: Some(error.message),
            retry_count: Some(attempts),
            details: None,
        }),
    }
}

enum Verdict {
    Passed(Option<Value>),
    /// Answered, but not the way a healthy backend does. Not retried.
    Rejected(String),
}

fn interpret(target: ProbeTarget, response: &ProbeResponse) -> Result<Verdict> {
    let status = response.status;
    let ok = (200..300).contains(&status);
    match target {
        ProbeTarget::Endpoint if ok => Ok(Verdict::Passed(Some(details([(
            "status",
            Value::from(status),
        )])))),
        ProbeTarget::Account if status == 401 => Ok(Verdict::Passed(Some(details([(
            "expected401",
            Value::Bool(true),
        )])))),
        ProbeTarget::Account if ok => Ok(Verdict::Rejected(
            "Account service returned user data unexpectedly (should be 401)".to_owned(),
        )),
        ProbeTarget::Databases if ok => Ok(Verdict::Passed(Some(details([(
            "databaseCount",
            Value::from(listed_count(response.body.as_ref(), "databases")),
        )])))),
        ProbeTarget::StorageBuckets if ok => Ok(Verdict::Passed(Some(details([(
            "bucketCount",
            Value::from(listed_count(response.body.as_ref(), "buckets")),
        )])))),
        _ => Err(status_error(target, response)),
    }
}

fn details<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect::<Map<_, _>>(),
    )
}

/// `total` from a list response, else the length of the listed array.
fn listed_count(body: Option<&Value>, list_key: &str) -> u64 {
    let Some(body) = body else {
        return 0;
    };
    body.get("total")
        .and_then(Value::as_u64)
        .or_else(|| {
            body.get(list_key)
                .and_then(Value::as_array)
                .and_then(|items| u64::try_from(items.len()).ok())
        })
        .unwrap_or(0)
}

fn status_error(target: ProbeTarget, response: &ProbeResponse) -> ErrorEnvelope {
    let status = response.status;
    let detail = response
        .body
        .as_ref()
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {status}"));
    let class = if status == 429 || status >= 500 {
        ErrorClass::Retriable
    } else {
        ErrorClass::NonRetriable
    };
    let code = match status {
        401 | 403 => ErrorCode::unauthorized(),
        404 => ErrorCode::not_found(),
        429 => ErrorCode::rate_limited(),
        _ => ErrorCode::unavailable(),
    };
    ErrorEnvelope::unexpected(code, format!("{}: {detail}", target.label()), class)
        .with_http_status(status)
}

fn health_percent(successful: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (successful * 100 + total / 2) / total;
    u8::try_from(rounded).unwrap_or(100)
}

fn recommendations(tests: &ConnectivityTests) -> Vec<String> {
    let mut out = Vec::new();
    if !tests.endpoint.success {
        out.push("Check Appwrite endpoint URL and network connectivity".to_owned());
        out.push("Verify NEXT_PUBLIC_APPWRITE_ENDPOINT environment variable".to_owned());
    }
    if !tests.account.success {
        out.push("Account service may be down or misconfigured".to_owned());
    }
    if !tests.database.success {
        out.push("Check APPWRITE_API_KEY and database permissions".to_owned());
        out.push("Verify database exists in Appwrite console".to_owned());
    }
    if !tests.storage.success {
        out.push("Check APPWRITE_API_KEY and storage permissions".to_owned());
        out.push("Verify storage buckets exist in Appwrite console".to_owned());
    }
    out
}
