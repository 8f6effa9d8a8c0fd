//! Logger adapter forwarding structured events to `tracing`.
//!
//! The binary installs the subscriber; this adapter only emits events, so
//! filtering and formatting follow `RUST_LOG` and the chosen output mode.

use dernek_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use dernek_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};

/// Logger emitting `tracing` events with fields serialized as JSON text.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fields_json(&self, extra: Option<LogFields>) -> Option<String> {
        let mut fields = self.base_fields.clone();
        fields.extend(extra.unwrap_or_default());
        if fields.is_empty() {
            return None;
        }
        let object: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| {
                let value = if is_secret_key(&key) {
                    Value::String(REDACTED.to_owned())
                } else {
                    value
                };
                (key.into_string(), value)
            })
            .collect();
        serde_json::to_string(&object).ok()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let fields = self.fields_json(event.fields).unwrap_or_default();
        let name = event.event.as_ref();
        let message = event.message.as_ref();
        match event.level {
            LogLevel::Debug => tracing::debug!(event = name, fields = %fields, "{message}"),
            LogLevel::Info => tracing::info!(event = name, fields = %fields, "{message}"),
            LogLevel::Warn => tracing::warn!(event = name, fields = %fields, "{message}"),
            LogLevel::Error => tracing::error!(event = name, fields = %fields, "{message}"),
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}
