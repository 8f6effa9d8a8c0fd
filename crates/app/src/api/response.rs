//! Response envelope shared by every data API method.

use dernek_shared::{ErrorCode, ErrorEnvelope, ErrorKind, Result};
use serde::Serialize;

/// Message for 401/403 answers.
pub const MESSAGE_UNAUTHORIZED: &str = "Unauthorized access, please log in again";
/// Message for 404 answers.
pub const MESSAGE_NOT_FOUND: &str = "Record not found";
/// Message for 429 answers.
pub const MESSAGE_RATE_LIMITED: &str = "Too many requests, please try again later";
/// Message for 5xx answers.
pub const MESSAGE_SERVER_ERROR: &str = "Server error, please try again later";
/// Message for operations the mock backend does not provide.
pub const MESSAGE_NOT_IMPLEMENTED: &str = "Not implemented in mock";
/// Fallback when the failure carries no usable message.
pub const MESSAGE_UNEXPECTED: &str = "An unexpected error occurred";

/// `{data, error, total?}` envelope.
///
/// Exactly one of `data` and `error` is set. `total` is only present on list
/// responses and is omitted from JSON otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    /// Payload on success.
    pub data: Option<T>,
    /// User-facing message on failure.
    pub error: Option<String>,
    /// Total matches across pages (list responses only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ApiResponse<T> {
    /// Successful response.
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            total: None,
        }
    }

    /// Failed response.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            total: None,
        }
    }

    /// Attach the list total.
    #[must_use]
    pub const fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Whether the call succeeded.
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fold a port result into the envelope.
///
/// Expected failures become `error` messages. Invariant violations and
/// cancellation stay as `Err`.
pub fn respond<T>(result: Result<T>) -> Result<ApiResponse<T>> {
    match result {
        Ok(data) => Ok(ApiResponse::ok(data)),
        Err(error) if error.kind == ErrorKind::Invariant || error.is_cancelled() => Err(error),
        Err(error) => Ok(ApiResponse::failed(user_message(&error))),
    }
}

/// Same as [`respond`] for list results carrying a total.
pub fn respond_list<T>(result: Result<(T, u64)>) -> Result<ApiResponse<T>> {
    respond(result).map(|response| match response {
        ApiResponse {
            data: Some((data, total)),
            ..
        } => ApiResponse::ok(data).with_total(total),
        ApiResponse { error, .. } => ApiResponse {
            data: None,
            error,
            total: None,
        },
    })
}

/// User-facing message for a failed backend call.
pub fn user_message(error: &ErrorEnvelope) -> String {
    if let Some(status) = error.http_status() {
        match status {
            401 | 403 => return MESSAGE_UNAUTHORIZED.to_owned(),
            404 => return MESSAGE_NOT_FOUND.to_owned(),
            429 => return MESSAGE_RATE_LIMITED.to_owned(),
            500.. => return MESSAGE_SERVER_ERROR.to_owned(),
            _ => {},
        }
    }

    let code = &error.code;
    if *code == ErrorCode::unauthorized() {
        MESSAGE_UNAUTHORIZED.to_owned()
    } else if *code == ErrorCode::not_found() {
        MESSAGE_NOT_FOUND.to_owned()
    } else if *code == ErrorCode::rate_limited() {
        MESSAGE_RATE_LIMITED.to_owned()
    } else if *code == ErrorCode::unavailable() {
        MESSAGE_SERVER_ERROR.to_owned()
    } else if *code == ErrorCode::not_implemented() {
        MESSAGE_NOT_IMPLEMENTED.to_owned()
    } else if error.message.trim().is_empty() {
        MESSAGE_UNEXPECTED.to_owned()
    } else {
        error.message.clone()
    }
}
