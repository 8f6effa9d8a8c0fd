//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{
    DiagnoseArgs, run_diagnose_command, run_health, run_migrate_command, run_provider_command,
    run_rollback_command, run_validate_config_command,
};
use dernek_infra::{EnvMap, ExecutionContext, load_env};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "dernek",
    version,
    about = "Configuration diagnostics and provisioning for the Dernek dashboard backend",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    /// Dotenv file read before the process environment (defaults to `.env`).
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run configuration, connectivity, mock, SDK, and health checks.
    Diagnose {
        /// Run a single section (config, connectivity, mock, sdk, health).
        #[arg(long)]
        section: Option<String>,
        /// Write the JSON report to this file.
        #[arg(long)]
        save: Option<PathBuf>,
        /// Execution context the backend is resolved for.
        #[arg(long, value_enum, default_value_t = ContextArg::Server)]
        context: ContextArg,
    },
    /// Validate the backend environment variables.
    ValidateConfig,
    /// Show which backend provider is selected.
    Provider {
        /// Execution context the backend is resolved for.
        #[arg(long, value_enum, default_value_t = ContextArg::Server)]
        context: ContextArg,
    },
    /// Print the local health snapshot.
    Health,
    /// Create every missing collection on the remote backend.
    Migrate,
    /// Delete every catalog collection from the remote backend.
    Rollback {
        /// Confirm the destructive run.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ContextArg {
    Server,
    Browser,
}

impl From<ContextArg> for ExecutionContext {
    fn from(value: ContextArg) -> Self {
        match value {
            ContextArg::Server => Self::Server,
            ContextArg::Browser => Self::Browser,
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    init_tracing(mode);

    let result = load_env(cli.env_file.as_deref())
        .map_err(CliError::from)
        .and_then(|env| run(&cli.command, mode, env));
    match result {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing(mode: OutputMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (json, text) = if mode.is_machine() {
        (Some(fmt::layer().json().with_writer(io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(io::stderr)),
        )
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init();
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands, mode: OutputMode, env: EnvMap) -> Result<CliOutput, CliError> {
    match command {
        Commands::Diagnose {
            section,
            save,
            context,
        } => run_diagnose_command(
            mode,
            DiagnoseArgs {
                env,
                context: (*context).into(),
                section: section.as_deref(),
                save: save.as_deref(),
            },
        ),
        Commands::ValidateConfig => run_validate_config_command(mode, &env),
        Commands::Provider { context } => run_provider_command(mode, &env, (*context).into()),
        Commands::Health => run_health(mode, &env),
        Commands::Migrate => run_migrate_command(mode, &env),
        Commands::Rollback { yes } => run_rollback_command(mode, &env, *yes),
    }
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diagnose_flags_parse() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "dernek",
            "--output",
            "json",
            "diagnose",
            "--section",
            "health",
            "--save",
            "report.json",
            "--context",
            "browser",
        ])?;
        assert!(OutputMode::from_args(&cli.output).is_json());
        assert!(matches!(
            cli.command,
            Commands::Diagnose {
                section: Some(ref section),
                save: Some(_),
                context: ContextArg::Browser,
            } if section == "health"
        ));
        Ok(())
    }

    #[test]
    fn rollback_defaults_to_unconfirmed() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["dernek", "rollback"])?;
        assert!(matches!(cli.command, Commands::Rollback { yes: false }));
        Ok(())
    }

    #[test]
    fn unconfirmed_rollback_is_invalid_input() {
        let mode = OutputMode::from_args(&OutputArgs {
            output: None,
            json: false,
        });
        let error = run_rollback_command(mode, &EnvMap::new(), false).err();
        assert_eq!(error.map(|error| error.exit_code()), Some(ExitCode::InvalidInput));
    }

    #[test]
    fn legacy_json_flag_is_global() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["dernek", "health", "--json"])?;
        assert!(OutputMode::from_args(&cli.output).is_json());
        Ok(())
    }
}
