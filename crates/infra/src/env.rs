//! Environment loading for CLI surfaces.
//!
//! The snapshot merges an optional dotenv file with the process environment;
//! process values win. Only the variables the tooling knows about are kept.

use dernek_config::{EnvMap, KNOWN_ENV_VARS, collect_std_env};
use dernek_shared::{ErrorCode, ErrorEnvelope};
use std::path::Path;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Default dotenv file read from the working directory.
pub const DEFAULT_DOTENV_FILE: &str = ".env";

/// Read known variables from a dotenv file.
///
/// A missing file yields an empty map. Malformed lines are reported as
/// expected errors naming the file.
pub fn read_dotenv(path: &Path) -> InfraResult<EnvMap> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(error) if error.not_found() => return Ok(EnvMap::new()),
        Err(error) => return Err(dotenv_error(path, &error)),
    };

    let mut env = EnvMap::new();
    for entry in entries {
        let (key, value) = entry.map_err(|error| dotenv_error(path, &error))?;
        if KNOWN_ENV_VARS.contains(&key.as_str()) {
            env.insert(key, value);
        }
    }
    Ok(env)
}

/// Merge a dotenv map with a process snapshot; process values win.
#[must_use]
pub fn merge_env(dotenv: EnvMap, process: EnvMap) -> EnvMap {
    let mut merged = dotenv;
    merged.extend(process);
    merged
}

/// Snapshot the environment: `path` (or `.env`) overlaid by the process env.
pub fn load_env(path: Option<&Path>) -> InfraResult<EnvMap> {
    let dotenv = read_dotenv(path.unwrap_or_else(|| Path::new(DEFAULT_DOTENV_FILE)))?;
    Ok(merge_env(dotenv, collect_std_env()))
}

fn dotenv_error(path: &Path, error: &dotenvy::Error) -> InfraError {
    ErrorEnvelope::expected(
        ErrorCode::new("config", "dotenv_invalid"),
        format!("failed to read {}: {error}", path.display()),
    )
    .with_metadata("path", path.display().to_string())
}
