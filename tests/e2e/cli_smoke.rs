//! CLI smoke tests: argument handling and exit codes.

use std::io;
use std::process::{Command, Output};

fn run_cli(args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_dernek"))
        .args(["--env-file", "/nonexistent/dernek.env"])
        .args(args)
        .env_clear()
        .envs(env.iter().copied())
        .output()
}

#[test]
fn help_lists_every_command() -> io::Result<()> {
    let output = run_cli(&["--help"], &[])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in [
        "diagnose",
        "validate-config",
        "provider",
        "health",
        "migrate",
        "rollback",
    ] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
    Ok(())
}

#[test]
fn unknown_section_is_invalid_input() -> io::Result<()> {
    let output = run_cli(&["diagnose", "--section", "network"], &[])?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown section `network`"), "{stderr}");
    Ok(())
}

#[test]
fn rollback_requires_confirmation() -> io::Result<()> {
    let output = run_cli(&["rollback"], &[])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--yes"));
    Ok(())
}

#[test]
fn migrate_without_api_key_fails() -> io::Result<()> {
    let output = run_cli(
        &["migrate"],
        &[
            ("NEXT_PUBLIC_APPWRITE_ENDPOINT", "https://fra.cloud.appwrite.io/v1"),
            ("NEXT_PUBLIC_APPWRITE_PROJECT_ID", "dernek"),
        ],
    )?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("APPWRITE_API_KEY is not defined"));
    Ok(())
}

#[test]
fn unknown_output_format_is_rejected_by_clap() -> io::Result<()> {
    let output = run_cli(&["--output", "yaml", "health"], &[])?;
    assert_eq!(output.status.code(), Some(2));
    Ok(())
}
