//! Secret detection and redaction utilities.
//!
//! Environment variables such as `APPWRITE_API_KEY` must never reach logs,
//! reports, or error metadata in clear text.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// Uses case-insensitive pattern matching on common secret naming conventions.
///
/// # Examples
///
/// ```
/// use dernek_shared::is_secret_key;
///
/// assert!(is_secret_key("APPWRITE_API_KEY"));
/// assert!(is_secret_key("x-appwrite-key"));
/// assert!(is_secret_key("sessionToken"));
/// assert!(!is_secret_key("NEXT_PUBLIC_DATABASE_ID"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
        || key.contains("AUTH")
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use dernek_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("APPWRITE_API_KEY", "standard_abc"), "[REDACTED]");
/// assert_eq!(redact_if_secret("BACKEND_PROVIDER", "mock"), "mock");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Number of characters in the secret, safe to log.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}
