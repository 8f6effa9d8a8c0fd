//! CLI command handlers.

pub mod config;
pub mod diagnose;
pub mod provision;

pub use config::{run_health, run_provider_command, run_validate_config_command};
pub use diagnose::{DiagnoseArgs, run_diagnose_command};
pub use provision::{run_migrate_command, run_rollback_command};
