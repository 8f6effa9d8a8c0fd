//! Output format helpers for CLI commands.

use crate::error::CliError;
use clap::{Args, ValueEnum};
use serde::Serialize;

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
    /// Line-delimited JSON (NDJSON) output.
    Ndjson,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
    /// Emit machine-readable JSON output (legacy alias).
    #[arg(long, global = true, hide = true)]
    pub json: bool,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
}

impl OutputMode {
    /// Build output mode from CLI flags.
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        let format = match (args.output, args.json) {
            (Some(value), _) => value,
            (None, true) => OutputFormat::Json,
            (None, false) => OutputFormat::Text,
        };
        Self { format }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Returns true when NDJSON output is requested.
    #[must_use]
    pub const fn is_ndjson(self) -> bool {
        matches!(self.format, OutputFormat::Ndjson)
    }

    /// Returns true for either machine-readable format.
    #[must_use]
    pub const fn is_machine(self) -> bool {
        !matches!(self.format, OutputFormat::Text)
    }
}

/// Pretty JSON followed by a newline.
pub fn json_document<T: Serialize>(value: &T) -> Result<String, CliError> {
    let mut output = serde_json::to_string_pretty(value)?;
    output.push('\n');
    Ok(output)
}

/// One NDJSON summary line: `{"type":"summary","kind":<kind>, ...value}`.
pub fn ndjson_summary<T: Serialize>(kind: &str, value: &T) -> Result<String, CliError> {
    let mut payload = serde_json::Map::new();
    payload.insert("type".to_owned(), "summary".into());
    payload.insert("kind".to_owned(), kind.into());
    match serde_json::to_value(value)? {
        serde_json::Value::Object(fields) => payload.extend(fields),
        other => {
            payload.insert("value".to_owned(), other);
        },
    }
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
