//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for results carrying an [`ErrorEnvelope`].
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, preserving the success value.
    fn with_metadata(self, key: &str, value: impl Into<String>) -> Result<T>;

    /// Prefix the error message with context, preserving code and class.
    fn context(self, context: impl AsRef<str>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_metadata(self, key: &str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }

    fn context(self, context: impl AsRef<str>) -> Result<T> {
        self.map_err(|mut error| {
            error.message = format!("{}: {}", context.as_ref(), error.message);
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCode, ErrorEnvelope};

    #[test]
    fn context_prefixes_message_and_keeps_code() {
        let value: Result<i32> = Err(ErrorEnvelope::expected(ErrorCode::conflict(), "exists"));
        let error = value.context("create users").err();

        assert_eq!(
            error.as_ref().map(|error| error.message.as_str()),
            Some("create users: exists")
        );
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::conflict()));
    }

    #[test]
    fn ok_values_pass_through() {
        let value: Result<i32> = Ok(2);
        assert!(matches!(value.with_metadata("field", "name"), Ok(2)));
    }
}
