//! Appwrite error mapping helpers.

use dernek_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;

/// Error body returned by the Appwrite REST API.
#[derive(Debug, Default, Deserialize)]
struct AppwriteErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Maps a non-2xx Appwrite response into the shared envelope.
pub fn map_status_error(status: u16, body: &[u8], operation: &'static str) -> ErrorEnvelope {
    let parsed: AppwriteErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            if text.is_empty() {
                format!("HTTP {status}")
            } else {
                text
            }
        });

    let envelope = match status {
        400 => ErrorEnvelope::expected(ErrorCode::invalid_input(), message),
        401 | 403 => ErrorEnvelope::expected(ErrorCode::unauthorized(), message),
        404 => ErrorEnvelope::expected(ErrorCode::not_found(), message),
        409 => ErrorEnvelope::expected(ErrorCode::conflict(), message),
        429 => ErrorEnvelope::expected_with_class(
            ErrorCode::rate_limited(),
            message,
            ErrorClass::Retriable,
        ),
        500.. => ErrorEnvelope::unexpected(ErrorCode::unavailable(), message, ErrorClass::Retriable),
        _ => ErrorEnvelope::unexpected(request_failed_code(), message, ErrorClass::NonRetriable),
    }
    .with_http_status(status)
    .with_metadata("operation", operation);

    match parsed.kind {
        Some(kind) => envelope.with_metadata("appwriteType", kind),
        None => envelope,
    }
}

/// Maps reqwest transport errors into shared envelopes.
pub fn map_transport_error(error: &reqwest::Error, operation: &'static str) -> ErrorEnvelope {
    let envelope = if error.is_timeout() {
        ErrorEnvelope::unexpected(
            backend_timeout_code(),
            format!("Appwrite request timed out: {error}"),
            ErrorClass::Retriable,
        )
    } else if error.is_connect() {
        ErrorEnvelope::unexpected(
            backend_connection_code(),
            format!("Appwrite connection failed: {error}"),
            ErrorClass::Retriable,
        )
    } else {
        ErrorEnvelope::unexpected(
            request_failed_code(),
            format!("Appwrite request failed: {error}"),
            ErrorClass::NonRetriable,
        )
    };
    envelope.with_metadata("operation", operation)
}

/// Timeout raised by the per-request deadline.
pub fn timeout_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        backend_timeout_code(),
        format!("Appwrite request timed out: {operation}"),
        ErrorClass::Retriable,
    )
    .with_metadata("operation", operation)
}

/// Cancellation observed while a request was in flight.
pub fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

/// A 2xx response whose body could not be decoded.
pub fn invalid_response_error(operation: &'static str, error: &serde_json::Error) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("backend", "invalid_response"),
        format!("invalid Appwrite response: {error}"),
        ErrorClass::NonRetriable,
    )
    .with_metadata("operation", operation)
}

fn backend_timeout_code() -> ErrorCode {
    ErrorCode::new("backend", "timeout")
}

fn backend_connection_code() -> ErrorCode {
    ErrorCode::new("backend", "connection")
}

fn request_failed_code() -> ErrorCode {
    ErrorCode::new("backend", "request_failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_backend_codes() {
        let cases = [
            (400, ErrorCode::invalid_input(), false),
            (401, ErrorCode::unauthorized(), false),
            (403, ErrorCode::unauthorized(), false),
            (404, ErrorCode::not_found(), false),
            (409, ErrorCode::conflict(), false),
            (429, ErrorCode::rate_limited(), true),
            (503, ErrorCode::unavailable(), true),
            (418, ErrorCode::new("backend", "request_failed"), false),
        ];
        for (status, code, retriable) in cases {
            let error = map_status_error(status, b"", "appwrite.test");
            assert_eq!(error.code, code, "status {status}");
            assert_eq!(error.class.is_retriable(), retriable, "status {status}");
            assert_eq!(error.http_status(), Some(status));
        }
    }

    #[test]
    fn appwrite_message_and_type_are_kept() {
        let body = br#"{"message":"Collection with the requested ID could not be found.","code":404,"type":"collection_not_found"}"#;
        let error = map_status_error(404, body, "appwrite.get_collection");

        assert!(error.is_not_found());
        assert_eq!(
            error.message,
            "Collection with the requested ID could not be found."
        );
        assert_eq!(
            error.metadata.get("appwriteType").map(String::as_str),
            Some("collection_not_found")
        );
        assert_eq!(
            error.metadata.get("operation").map(String::as_str),
            Some("appwrite.get_collection")
        );
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let error = map_status_error(502, b"Bad Gateway", "appwrite.list_documents");
        assert_eq!(error.message, "Bad Gateway");

        let error = map_status_error(502, b"", "appwrite.list_documents");
        assert_eq!(error.message, "HTTP 502");
    }
}
