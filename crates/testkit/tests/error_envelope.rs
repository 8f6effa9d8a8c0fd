//! Integration tests for shared error propagation.

use dernek_shared::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind};
use dernek_testkit::errors::{
    attribute_rejected_error, cancelled_error, not_found_error, rate_limited_error, timeout_error,
    unauthorized_error, unavailable_error,
};

#[test]
fn error_envelope_crosses_crates() {
    let timeout = timeout_error();
    assert_eq!(timeout.code, ErrorCode::timeout());

    let boxed: Box<dyn std::error::Error> = Box::new(timeout);
    let description = boxed.to_string();
    assert!(description.contains("timeout"));

    let cancelled = cancelled_error();
    assert!(cancelled.is_cancelled());
}

#[test]
fn backend_fixtures_carry_http_status_and_class() {
    assert!(not_found_error().is_not_found());
    assert_eq!(not_found_error().http_status(), Some(404));
    assert_eq!(unauthorized_error().http_status(), Some(401));
    assert_eq!(unauthorized_error().class, ErrorClass::NonRetriable);
    assert!(rate_limited_error().class.is_retriable());
    assert!(unavailable_error().class.is_retriable());

    let rejected = attribute_rejected_error("tc_no");
    assert_eq!(rejected.code, ErrorCode::invalid_input());
    assert!(rejected.message.contains("tc_no"));
}

#[test]
fn io_failures_become_unexpected_envelopes() {
    let io_error = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
    let envelope = ErrorEnvelope::from(io_error);
    assert_eq!(envelope.code, ErrorCode::timeout());
    assert_eq!(envelope.kind, ErrorKind::Unexpected);
    assert!(envelope.class.is_retriable());
}

#[test]
fn error_envelope_constructors_work() {
    let expected = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad input");
    assert_eq!(expected.kind, ErrorKind::Expected);
}
