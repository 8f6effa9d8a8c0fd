//! Backend diagnostics.
//!
//! Runs the configuration, connectivity, mock, SDK and health sections in a
//! fixed order and folds their findings into one scored report. The score
//! starts at 100 and each failing category subtracts a fixed weight.

use crate::api::BackendApi;
use crate::connectivity::{
    ConnectivityDeps, ConnectivityInput, ConnectivityReport, run_connectivity_test,
};
use crate::mock_checks::{
    ApiTestReport, SchemaValidationReport, run_mock_api_tests, validate_mock_schemas,
};
use crate::sdk_guard::{SdkGuard, SdkUsageReport};
use chrono::{SecondsFormat, Utc};
use dernek_config::{ConfigStatus, EnvMap, ProviderSelection, config_status};
use dernek_domain::{ProviderMode, collection_catalog};
use dernek_ports::{HealthCheckResponse, HealthProbePort, LoggerPort, log_fields};
use dernek_shared::{ErrorEnvelope, RequestContext, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Penalty when configuration has error-severity results.
pub const WEIGHT_CONFIG_INVALID: u8 = 50;
/// Penalty when configuration has warnings.
pub const WEIGHT_CONFIG_WARNINGS: u8 = 10;
/// Penalty when any connectivity probe fails.
pub const WEIGHT_CONNECTIVITY: u8 = 30;
/// Penalty for invalid mock schemas, and separately for failed mock API tests.
pub const WEIGHT_MOCK: u8 = 20;
/// Penalty when SDK violations were recorded.
pub const WEIGHT_SDK: u8 = 10;
/// Penalty when the live health check fails.
pub const WEIGHT_HEALTH: u8 = 40;

/// Commands suggested at the end of every report.
pub const QUICK_FIX_COMMANDS: [&str; 5] = [
    "dernek validate-config",
    "dernek diagnose --section connectivity",
    "dernek diagnose --section mock",
    "dernek diagnose",
    "dernek health",
];

/// Documents linked from every report.
pub const DOCUMENTATION_LINKS: [&str; 2] = [
    "docs/APPWRITE_SETUP.md",
    "docs/CONFIGURATION-TROUBLESHOOTING.md",
];

/// Words marking an issue as critical.
const CRITICAL_MARKERS: [&str; 3] = ["error", "failed", "invalid"];

/// One diagnostics section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSection {
    /// Environment validation.
    Config,
    /// Remote connectivity probes (remote provider only).
    Connectivity,
    /// Mock schema and API checks (mock provider only).
    Mock,
    /// SDK usage violations.
    Sdk,
    /// Live health endpoint.
    Health,
}

impl DiagnosticSection {
    /// All sections in run order.
    pub const ALL: [Self; 5] = [
        Self::Config,
        Self::Connectivity,
        Self::Mock,
        Self::Sdk,
        Self::Health,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Connectivity => "connectivity",
            Self::Mock => "mock",
            Self::Sdk => "sdk",
            Self::Health => "health",
        }
    }

    /// Parse a section name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for DiagnosticSection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Dependencies of [`run_diagnostics`].
pub struct DiagnosticsDeps {
    /// Environment snapshot the run is judged against.
    pub env: EnvMap,
    /// Resolved provider.
    pub provider: ProviderSelection,
    /// Probes for the connectivity section; an error when the remote client
    /// could not be built.
    pub connectivity: Result<ConnectivityDeps>,
    /// Unified API for the mock section.
    pub api: BackendApi,
    /// Guard whose accumulated violations are reported.
    pub sdk: Arc<SdkGuard>,
    /// Live health endpoint.
    pub health: Arc<dyn HealthProbePort>,
    /// Optional structured logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Input of [`run_diagnostics`].
#[derive(Debug, Clone)]
pub struct DiagnosticsInput {
    /// Restrict the run to one section.
    pub section: Option<DiagnosticSection>,
    /// Connectivity probe settings.
    pub connectivity: ConnectivityInput,
    /// Platform name reported in the environment block.
    pub platform: String,
}

impl Default for DiagnosticsInput {
    fn default() -> Self {
        Self {
            section: None,
            connectivity: ConnectivityInput::default(),
            platform: std::env::consts::OS.to_owned(),
        }
    }
}

/// Raw section outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResults {
    /// Config section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigStatus>,
    /// Connectivity section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<ConnectivityReport>,
    /// Mock schema check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_schema: Option<SchemaValidationReport>,
    /// Mock API check.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mockAPI")]
    pub mock_api: Option<ApiTestReport>,
    /// SDK section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk: Option<SdkUsageReport>,
    /// Health section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheckResponse>,
}

/// Environment block of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsEnvironment {
    /// Resolved provider name.
    pub provider: String,
    /// Operating system.
    pub platform: String,
}

/// Consolidated diagnostics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    /// RFC 3339 time of the run.
    pub timestamp: String,
    /// 0 to 100.
    pub overall_health_score: u8,
    /// Issues in section order.
    pub issues: Vec<String>,
    /// Deduplicated recommendations, first occurrence wins.
    pub recommendations: Vec<String>,
    /// Commands worth running next.
    pub quick_fix_commands: Vec<String>,
    /// Related documentation.
    pub documentation_links: Vec<String>,
    /// Raw section outputs.
    pub results: DiagnosticsResults,
    /// Where the run happened.
    pub environment: DiagnosticsEnvironment,
}

impl DiagnosticsReport {
    /// Whether any issue mentions an error, a failure or invalid input.
    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|issue| is_critical(issue))
    }

    /// 1 when critical issues exist, else 0. Warning-only runs exit 0.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_critical_issues())
    }
}

/// Whether an issue message counts as critical.
pub fn is_critical(issue: &str) -> bool {
    let lowered = issue.to_lowercase();
    CRITICAL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Running score with the issues and recommendations that lowered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    score: u8,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Default for Scorecard {
    fn default() -> Self {
        Self {
            score: 100,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

impl Scorecard {
    /// Subtract `weight` (floored at 0) and record issues and remediation.
    pub fn penalize<I, R>(&mut self, weight: u8, issues: I, recommendations: R)
    where
        I: IntoIterator<Item = String>,
        R: IntoIterator<Item = String>,
    {
        self.score = self.score.saturating_sub(weight);
        self.issues.extend(issues);
        self.recommendations.extend(recommendations);
    }

    /// Current score.
    pub const fn score(&self) -> u8 {
        self.score
    }

    /// Issues so far.
    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    fn into_parts(self) -> (u8, Vec<String>, Vec<String>) {
        let mut seen = BTreeSet::new();
        let recommendations = self
            .recommendations
            .into_iter()
            .filter(|recommendation| seen.insert(recommendation.clone()))
            .collect();
        (self.score, self.issues, recommendations)
    }
}

/// Run the diagnostics sections and build the report.
///
/// Section failures become issues. Only cancellation and catalog invariant
/// failures are returned as errors.
#[tracing::instrument(name = "diagnostics.run", skip_all, fields(section = ?input.section))]
pub async fn run_diagnostics(
    ctx: &RequestContext,
    deps: &DiagnosticsDeps,
    input: DiagnosticsInput,
) -> Result<DiagnosticsReport> {
    let wants = |section: DiagnosticSection| input.section.is_none_or(|only| only == section);
    let mut card = Scorecard::default();
    let mut results = DiagnosticsResults::default();

    if wants(DiagnosticSection::Config) {
        let status = config_status(&deps.env);
        score_config(&mut card, &status);
        results.config = Some(status);
    }

    if wants(DiagnosticSection::Connectivity) && deps.provider.mode == ProviderMode::Appwrite {
        ctx.ensure_not_cancelled("diagnostics.connectivity")?;
        let outcome = match deps.connectivity.as_ref() {
            Ok(connectivity) => run_connectivity_test(ctx, connectivity, input.connectivity).await,
            Err(error) => Err(error.clone()),
        };
        match outcome {
            Ok(report) => {
                score_connectivity(&mut card, &report);
                results.connectivity = Some(report);
            },
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => card.penalize(
                WEIGHT_CONNECTIVITY,
                [format!("Connectivity test failed: {}", error.message)],
                [],
            ),
        }
    }

    if wants(DiagnosticSection::Mock) && deps.provider.mode == ProviderMode::Mock {
        let catalog = collection_catalog()?;
        let schema = validate_mock_schemas(ctx, deps.api.documents(), &catalog).await?;
        score_mock_schema(&mut card, &schema);
        results.mock_schema = Some(schema);

        let api = run_mock_api_tests(ctx, &deps.api).await?;
        score_mock_api(&mut card, &api);
        results.mock_api = Some(api);
    }

    if wants(DiagnosticSection::Sdk) {
        let report = deps.sdk.report();
        score_sdk(&mut card, &report);
        results.sdk = Some(report);
    }

    if wants(DiagnosticSection::Health) {
        match deps.health.check(ctx).await {
            Ok(response) => {
                score_health(&mut card, &response);
                results.health = Some(response);
            },
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => card.penalize(
                WEIGHT_HEALTH,
                [format!("Health check error: {}", error.message)],
                [],
            ),
        }
    }

    let (score, issues, recommendations) = card.into_parts();
    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "dernek.diagnostics.completed",
            &format!("Health score {score}/100 with {} issues", issues.len()),
            Some(log_fields([
                ("score", Value::from(score)),
                ("issues", Value::from(issues.len())),
            ])),
        );
    }

    Ok(DiagnosticsReport {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        overall_health_score: score,
        issues,
        recommendations,
        quick_fix_commands: QUICK_FIX_COMMANDS.iter().map(|&cmd| cmd.to_owned()).collect(),
        documentation_links: DOCUMENTATION_LINKS.iter().map(|&link| link.to_owned()).collect(),
        results,
        environment: DiagnosticsEnvironment {
            provider: deps.provider.mode.as_str().to_owned(),
            platform: input.platform,
        },
    })
}

/// Config section scoring.
pub fn score_config(card: &mut Scorecard, status: &ConfigStatus) {
    if !status.is_valid {
        card.penalize(
            WEIGHT_CONFIG_INVALID,
            status
                .errors
                .iter()
                .map(|error| format!("Configuration invalid: {error}")),
            status
                .suggestions
                .iter()
                .map(|suggestion| suggestion.suggestion.to_string()),
        );
    }
    if !status.warnings.is_empty() {
        card.penalize(
            WEIGHT_CONFIG_WARNINGS,
            status.warnings.iter().map(ToString::to_string),
            [],
        );
    }
}

fn score_connectivity(card: &mut Scorecard, report: &ConnectivityReport) {
    if report.summary.failed_tests > 0 {
        card.penalize(
            WEIGHT_CONNECTIVITY,
            [format!(
                "Connectivity: {} failed tests",
                report.summary.failed_tests
            )],
            report.recommendations.iter().cloned(),
        );
    }
}

fn score_mock_schema(card: &mut Scorecard, report: &SchemaValidationReport) {
    if report.summary.invalid_collections > 0 {
        card.penalize(
            WEIGHT_MOCK,
            [format!(
                "Mock Schema: {} invalid collections",
                report.summary.invalid_collections
            )],
            report.recommendations.iter().cloned(),
        );
    }
}

fn score_mock_api(card: &mut Scorecard, report: &ApiTestReport) {
    if report.failed > 0 {
        card.penalize(
            WEIGHT_MOCK,
            [format!("Mock API: {} failed tests", report.failed)],
            report.recommendations.iter().cloned(),
        );
    }
}

fn score_sdk(card: &mut Scorecard, report: &SdkUsageReport) {
    if report.count > 0 {
        card.penalize(
            WEIGHT_SDK,
            [format!("SDK: {} usage violations", report.count)],
            report.suggestions.iter().cloned(),
        );
    }
}

fn score_health(card: &mut Scorecard, response: &HealthCheckResponse) {
    if !response.passed() {
        card.penalize(
            WEIGHT_HEALTH,
            ["Health check failed".to_owned()],
            response.recommendations.iter().cloned(),
        );
    }
}

/// Missing remote client, reported as a connectivity failure.
pub fn connectivity_unavailable(reason: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        dernek_shared::ErrorCode::invalid_input(),
        format!("backend client is not configured: {reason}"),
    )
}
