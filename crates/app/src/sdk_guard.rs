//! SDK usage guard.
//!
//! Records every use of a client or server SDK handle outside its home
//! execution context. The guard is owned by the caller and passed to the
//! components that need it, so each test builds a fresh one.

use chrono::{SecondsFormat, Utc};
use dernek_domain::{ExecutionContext, SdkKind};
use dernek_ports::{LoggerPort, log_fields};
use dernek_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Event logged for every recorded violation.
pub const EVENT_SDK_VIOLATION: &str = "dernek.sdk.violation";

/// One recorded misuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkViolation {
    /// SDK handle that was misused.
    #[serde(rename = "type")]
    pub kind: SdkKind,
    /// Context the handle was used in.
    pub context: ExecutionContext,
    /// Human-readable description.
    pub message: String,
    /// Origin hint such as the import site, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// RFC 3339 time of recording.
    pub timestamp: String,
}

/// Outcome of a non-strict check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkValidation {
    /// Whether the handle matches the context.
    pub is_valid: bool,
    /// Violation messages.
    pub errors: Vec<String>,
}

impl SdkValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }
}

/// Accumulated violations with one suggestion per violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkUsageReport {
    /// Recorded violations, oldest first.
    pub violations: Vec<SdkViolation>,
    /// Number of violations.
    pub count: usize,
    /// Remediation per violation, same order.
    pub suggestions: Vec<String>,
}

/// Strict-mode failure: an SDK handle used in the wrong context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SdkMisuseError {
    /// SDK handle that was misused.
    pub kind: SdkKind,
    /// Context it was used in.
    pub context: ExecutionContext,
    /// Violation message.
    pub message: String,
}

impl From<SdkMisuseError> for ErrorEnvelope {
    fn from(error: SdkMisuseError) -> Self {
        Self::invariant(ErrorCode::new("sdk", "wrong_context"), error.message.clone())
            .with_metadata("sdkType", error.kind.as_str())
            .with_metadata("context", error.context.as_str())
    }
}

/// Guard over SDK handle usage for one execution context.
pub struct SdkGuard {
    context: ExecutionContext,
    production: bool,
    violations: Mutex<Vec<SdkViolation>>,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl SdkGuard {
    /// Guard for `context`. In production, checks are strict unless the
    /// caller says otherwise.
    #[must_use]
    pub const fn new(context: ExecutionContext, production: bool) -> Self {
        Self {
            context,
            production,
            violations: Mutex::new(Vec::new()),
            logger: None,
        }
    }

    /// Send violation warnings to `logger` instead of `tracing`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Context this guard checks against.
    pub const fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Check that the client SDK may be used here.
    ///
    /// Strictness defaults to the production flag when `strict` is `None`.
    pub fn validate_client_sdk_usage(
        &self,
        strict: Option<bool>,
    ) -> Result<SdkValidation, SdkMisuseError> {
        self.validate(SdkKind::Client, strict)
    }

    /// Check that the server SDK may be used here.
    pub fn validate_server_sdk_usage(
        &self,
        strict: Option<bool>,
    ) -> Result<SdkValidation, SdkMisuseError> {
        self.validate(SdkKind::Server, strict)
    }

    /// Record and warn about an import in the wrong context. Never fails.
    pub fn warn_if_wrong_sdk(&self, kind: SdkKind, import_path: Option<&str>) {
        if kind.home_context() == self.context {
            return;
        }
        let message = import_message(kind, import_path);
        self.record(kind, message, import_path.map(str::to_owned));
    }

    /// Snapshot of accumulated violations.
    pub fn report(&self) -> SdkUsageReport {
        let violations = self.lock().clone();
        let suggestions = violations
            .iter()
            .map(|violation| suggestion(violation.kind).to_owned())
            .collect();
        SdkUsageReport {
            count: violations.len(),
            violations,
            suggestions,
        }
    }

    /// Number of recorded violations.
    pub fn violation_count(&self) -> usize {
        self.lock().len()
    }

    /// Forget every recorded violation.
    pub fn clear_violations(&self) {
        self.lock().clear();
    }

    fn validate(
        &self,
        kind: SdkKind,
        strict: Option<bool>,
    ) -> Result<SdkValidation, SdkMisuseError> {
        if kind.home_context() == self.context {
            return Ok(SdkValidation::valid());
        }

        let message = usage_message(kind).to_owned();
        self.record(kind, message.clone(), None);

        if strict.unwrap_or(self.production) {
            return Err(SdkMisuseError {
                kind,
                context: self.context,
                message,
            });
        }

        Ok(SdkValidation {
            is_valid: false,
            errors: vec![message],
        })
    }

    fn record(&self, kind: SdkKind, message: String, location: Option<String>) {
        match self.logger.as_ref() {
            Some(logger) => {
                let mut fields = log_fields([
                    ("sdkType", Value::from(kind.as_str())),
                    ("context", Value::from(self.context.as_str())),
                ]);
                if let Some(path) = location.as_deref() {
                    fields.insert("location".into(), Value::from(path));
                }
                logger.warn(EVENT_SDK_VIOLATION, &message, Some(fields));
            },
            None => tracing::warn!(
                sdk_type = kind.as_str(),
                context = self.context.as_str(),
                "{message}"
            ),
        }

        self.lock().push(SdkViolation {
            kind,
            context: self.context,
            message,
            location,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SdkViolation>> {
        self.violations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SdkGuard {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SdkGuard")
            .field("context", &self.context)
            .field("production", &self.production)
            .field("violations", &self.violation_count())
            .finish_non_exhaustive()
    }
}

const fn usage_message(kind: SdkKind) -> &'static str {
    match kind {
        SdkKind::Client => "Client SDK used on server. Use server SDK instead.",
        SdkKind::Server => "Server SDK used in browser. Use client SDK instead.",
    }
}

fn import_message(kind: SdkKind, import_path: Option<&str>) -> String {
    let origin = import_path
        .map(|path| format!(" from {path}"))
        .unwrap_or_default();
    match kind {
        SdkKind::Client => format!("Client SDK imported on server{origin}. Use server SDK instead."),
        SdkKind::Server => {
            format!("Server SDK imported in browser{origin}. Use client SDK instead.")
        },
    }
}

const fn suggestion(kind: SdkKind) -> &'static str {
    match kind {
        SdkKind::Client => "Use the server SDK module instead of the client SDK",
        SdkKind::Server => "Use the client SDK module instead of the server SDK",
    }
}
