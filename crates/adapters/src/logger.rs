//! Structured JSON logger adapter.

use crate::log_sink::LogSink;
use chrono::{SecondsFormat, Utc};
use dernek_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use dernek_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};
use std::sync::Arc;

/// JSON logger emitting one line per event.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn encode(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = Map::new();
        payload.insert(
            "timestamp".to_owned(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        payload.insert("level".to_owned(), Value::from(event.level.as_str()));
        payload.insert("event".to_owned(), Value::from(event.event.as_ref()));
        payload.insert("message".to_owned(), Value::from(event.message.as_ref()));
        if !fields.is_empty() {
            let mut object: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            redact_object(&mut object);
            payload.insert("fields".to_owned(), Value::Object(object));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_owned(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| {
                "{\"level\":\"error\",\"event\":\"dernek.logger.serialize_failed\",\"message\":\"log serialization failed\"}\n"
                    .to_owned()
            },
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        self.sink.write_line(&self.encode(event));
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

fn redact_object(map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        if is_secret_key(key) {
            *value = Value::String(REDACTED.to_owned());
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::MemoryLogSink;
    use dernek_ports::log_fields;
    use serde_json::json;

    #[test]
    fn json_logger_redacts_secret_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Debug);

        logger.log(LogEvent {
            event: "dernek.migration.collection_failed".into(),
            level: LogLevel::Error,
            message: "create failed".into(),
            fields: Some(log_fields([
                ("apiKey", json!("standard_abc")),
                ("collection", json!("users")),
            ])),
            error: Some(json!({
                "headers": { "X-Appwrite-Key": "standard_abc", "X-Appwrite-Project": "p1" }
            })),
        });

        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        let payload: Value = serde_json::from_str(lines[0].trim())?;
        assert_eq!(payload["fields"]["apiKey"], json!(REDACTED));
        assert_eq!(payload["fields"]["collection"], json!("users"));
        assert_eq!(payload["error"]["headers"]["X-Appwrite-Key"], json!(REDACTED));
        assert_eq!(payload["error"]["headers"]["X-Appwrite-Project"], json!("p1"));
        assert_eq!(payload["level"], json!("error"));
        Ok(())
    }

    #[test]
    fn min_level_filters_events() {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Warn);

        logger.info("dernek.test.info", "dropped", None);
        logger.warn("dernek.test.warn", "kept", None);

        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn child_logger_merges_fields() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone())
            .with_base_fields(log_fields([("command", json!("migrate"))]));

        let child = logger.child(log_fields([("correlationId", json!("run_123"))]));
        child.info("dernek.test.child", "child log", None);

        let lines = sink.take();
        let payload: Value = serde_json::from_str(lines[0].trim())?;
        assert_eq!(payload["fields"]["correlationId"], json!("run_123"));
        assert_eq!(payload["fields"]["command"], json!("migrate"));
        Ok(())
    }
}
