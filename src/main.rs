//! env-config-gen - Entry Point
//!
//! Generates `env_config.h` for the firmware build from WIFI_SSID and
//! WIFI_PASSWORD.
//!
//! # Startup Order
//!
//! 1. Initialize tracing (stderr)
//! 2. Parse arguments
//! 3. Load .env (explicit ENV_CONFIG_DOTENV file, else nearest .env upward)
//! 4. Resolve settings: arg > env > default
//! 5. Emit header atomically
//!
//! Exit status is 0 on success and 1 on any failure.

use anyhow::Context;
use env_config_gen::env_source::{self, Dotenv, EnvSource, LayeredEnv, ProcessEnv};
use env_config_gen::settings::{self, Command};
use env_config_gen::{emitter, EmitOptions};
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    // ==========================================================================
    // PHASE 1: TRACING INITIALIZATION
    // ==========================================================================
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("env_config_gen=info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .init();

    match run(std::env::args_os().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                op = "gen.failed",
                error = %format!("{:#}", e),
                "Header generation failed"
            );
            ExitCode::FAILURE
        }
    }
}

fn run<I>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = OsString>,
{
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    run_with(args, ProcessEnv, &cwd)
}

/// Startup with the process environment and working directory injected
fn run_with<I, P>(args: I, process_env: P, cwd: &Path) -> anyhow::Result<()>
where
    I: IntoIterator<Item = OsString>,
    P: EnvSource,
{
    // ==========================================================================
    // PHASE 2: ARGUMENTS
    // ==========================================================================
    let output_arg = match settings::parse_args(args).context("Invalid arguments")? {
        Command::Help => {
            println!("{}", settings::USAGE);
            return Ok(());
        }
        Command::Generate { output } => output,
    };

    // ==========================================================================
    // PHASE 3: .ENV LAYERING
    // ==========================================================================
    let dotenv = load_dotenv(&process_env, cwd)?;
    if dotenv.path.is_none() {
        tracing::debug!(op = "dotenv.skipped", "Using process environment only");
    }
    let env = LayeredEnv {
        primary: process_env,
        fallback: dotenv.entries,
    };

    // ==========================================================================
    // PHASE 4: SETTINGS + EMIT
    // ==========================================================================
    let settings = settings::resolve(output_arg, &env);
    let options = EmitOptions {
        missing: settings.missing,
    };

    emitter::emit_with(&env, &settings.output_path, &options)
        .with_context(|| format!("Failed to generate {}", settings.output_path.display()))?;

    Ok(())
}

fn load_dotenv(process_env: &impl EnvSource, cwd: &Path) -> anyhow::Result<Dotenv> {
    if let Some(path) = settings::dotenv_path(process_env) {
        return Ok(env_source::load_dotenv_file(&path)?);
    }

    Ok(env_source::discover_dotenv(cwd))
}
