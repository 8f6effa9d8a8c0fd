//! Logger selection for CLI runs.

use dernek_adapters::log_sink::{LogSink, StderrLogSink};
use dernek_adapters::logger::JsonLogger;
use dernek_adapters::tracing_logger::TracingLogger;
use dernek_ports::{LogFields, LogLevel, LoggerPort};
use dernek_shared::RequestContext;
use serde_json::Value;
use std::sync::Arc;

/// Selects the logger format; `json` writes one JSON line per event to stderr.
pub const LOG_FORMAT_ENV: &str = "DERNEK_LOG_FORMAT";
/// Minimum level of the JSON logger.
pub const LOG_LEVEL_ENV: &str = "DERNEK_LOG_LEVEL";

/// Logger used by use cases: JSON lines when requested, `tracing` otherwise.
pub fn logger_from_env() -> Arc<dyn LoggerPort> {
    let format = std::env::var(LOG_FORMAT_ENV).ok();
    let level = std::env::var(LOG_LEVEL_ENV).ok();
    select_logger(format.as_deref(), level.as_deref())
}

/// Build a logger from raw format and level values.
pub fn select_logger(format: Option<&str>, level: Option<&str>) -> Arc<dyn LoggerPort> {
    if format.is_some_and(|value| value.trim().eq_ignore_ascii_case("json")) {
        let sink: Arc<dyn LogSink> = Arc::new(StderrLogSink);
        return Arc::new(JsonLogger::new(sink).with_min_level(parse_log_level(level)));
    }
    Arc::new(TracingLogger::new())
}

/// Parse a level name; unknown values fall back to `info`.
pub fn parse_log_level(value: Option<&str>) -> LogLevel {
    match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("debug") => LogLevel::Debug,
        Some("warn") => LogLevel::Warn,
        Some("error") => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

/// Child logger tagged with the request correlation id.
pub fn scope_logger(logger: &Arc<dyn LoggerPort>, ctx: &RequestContext) -> Arc<dyn LoggerPort> {
    let mut fields = LogFields::new();
    fields.insert(
        "correlationId".to_owned().into_boxed_str(),
        Value::String(ctx.correlation_id().as_str().to_owned()),
    );
    Arc::from(logger.child(fields))
}
