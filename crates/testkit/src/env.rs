//! Environment snapshot fixtures.
//!
//! Snapshots are plain `BTreeMap<String, String>` values so they can be fed
//! to any env-driven entry point without touching the process environment.

use std::collections::BTreeMap;

/// Endpoint that passes validation.
pub const VALID_ENDPOINT: &str = "https://fra.cloud.appwrite.io/v1";
/// 20-character alphanumeric project id.
pub const VALID_PROJECT_ID: &str = "68a1f0c2003b9e7d4a15";
/// Database id that passes validation.
pub const VALID_DATABASE_ID: &str = "dernek_db";
/// 88-character base64 API key with no test-like markers.
pub const VALID_API_KEY: &str = "c2VydmVyLWtleS1mb3ItZGVybmVrLWRhc2hib2FyZC1wcm92aXNpb25pbmctYW5kLWRpYWdub3N0aWNzLXJ1bnM="; // pragma: allowlist secret

/// Snapshot with every backend variable set to a valid value and the
/// Appwrite provider selected.
pub fn valid_env() -> BTreeMap<String, String> {
    env_from([
        ("NEXT_PUBLIC_APPWRITE_ENDPOINT", VALID_ENDPOINT),
        ("NEXT_PUBLIC_APPWRITE_PROJECT_ID", VALID_PROJECT_ID),
        ("NEXT_PUBLIC_DATABASE_ID", VALID_DATABASE_ID),
        ("APPWRITE_API_KEY", VALID_API_KEY),
        ("NEXT_PUBLIC_BACKEND_PROVIDER", "appwrite"),
        ("BACKEND_PROVIDER", "appwrite"),
    ])
}

/// Build a snapshot from key/value pairs.
pub fn env_from<'a, I>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Copy of `base` with the given variables removed.
pub fn without(base: &BTreeMap<String, String>, keys: &[&str]) -> BTreeMap<String, String> {
    base.iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Copy of `base` with the given variables set.
pub fn with(base: &BTreeMap<String, String>, pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut env = base.clone();
    env.extend(
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned())),
    );
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_env_has_backend_variables() {
        let env = valid_env();
        assert_eq!(env.len(), 6);
        assert!(VALID_API_KEY.len() >= 80);
        assert!(!VALID_API_KEY.contains("test") && !VALID_API_KEY.contains("demo"));
        assert_eq!(VALID_PROJECT_ID.len(), 20);
    }

    #[test]
    fn without_and_with_derive_copies() {
        let base = valid_env();
        let stripped = without(&base, &["APPWRITE_API_KEY"]);
        assert!(!stripped.contains_key("APPWRITE_API_KEY"));
        let overridden = with(&stripped, &[("NODE_ENV", "production")]);
        assert_eq!(overridden.get("NODE_ENV").map(String::as_str), Some("production"));
        assert_eq!(base.len(), 6);
    }
}
