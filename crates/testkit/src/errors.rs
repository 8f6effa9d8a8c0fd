//! Test fixtures for shared error codes and backend failures.

use dernek_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::timeout(),
        ErrorCode::internal(),
        ErrorCode::unauthorized(),
        ErrorCode::conflict(),
        ErrorCode::rate_limited(),
        ErrorCode::unavailable(),
        ErrorCode::not_implemented(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input").with_http_status(400)
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}

/// A remote 404.
pub fn not_found_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::not_found(), "not found").with_http_status(404)
}

/// A remote 401.
pub fn unauthorized_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::unauthorized(), "invalid API key").with_http_status(401)
}

/// A remote 429, retriable.
pub fn rate_limited_error() -> ErrorEnvelope {
    ErrorEnvelope::expected_with_class(
        ErrorCode::rate_limited(),
        "rate limit exceeded",
        ErrorClass::Retriable,
    )
    .with_http_status(429)
}

/// A remote 503, retriable.
pub fn unavailable_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::unavailable(),
        "service unavailable",
        ErrorClass::Retriable,
    )
    .with_http_status(503)
}

/// A remote 400 rejecting one attribute.
pub fn attribute_rejected_error(key: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::invalid_input(),
        format!("Attribute \"{key}\" rejected by backend"),
    )
    .with_http_status(400)
}
