//! Runtime Settings
//!
//! Resolves where the header goes and how absent variables are handled.
//! Resolution order for each setting:
//! 1. Command-line argument (output path only)
//! 2. ENV_CONFIG_* environment variable (process env or .env file)
//! 3. Default

use crate::emitter::{MissingPolicy, DEFAULT_OUTPUT};
use crate::env_source::EnvSource;
use crate::error::SettingsError;
use std::ffi::OsString;
use std::path::PathBuf;

/// Output path override
pub const OUTPUT_ENV: &str = "ENV_CONFIG_OUTPUT";

/// Explicit .env file, read from the process environment only
pub const DOTENV_ENV: &str = "ENV_CONFIG_DOTENV";

/// Fail on absent variables instead of writing `None`
pub const STRICT_ENV: &str = "ENV_CONFIG_STRICT";

pub const USAGE: &str = "Usage: env-config-gen [OUTPUT]\n\
    Writes WIFI_SSID and WIFI_PASSWORD as #define lines to OUTPUT (default: env_config.h).";

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    Arg,
    Env,
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::Arg => write!(f, "arg"),
            SettingSource::Env => write!(f, "env"),
            SettingSource::Default => write!(f, "default"),
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Generate { output: Option<PathBuf> },
}

/// Parse arguments, excluding the program name
pub fn parse_args<I>(args: I) -> Result<Command, SettingsError>
where
    I: IntoIterator<Item = OsString>,
{
    let mut output = None;

    for arg in args {
        if arg == "-h" || arg == "--help" {
            return Ok(Command::Help);
        }
        let is_flag = arg.to_str().is_some_and(|s| s.starts_with('-') && s != "-");
        if is_flag || output.is_some() {
            return Err(SettingsError::UnexpectedArgument(
                arg.to_string_lossy().into_owned(),
            ));
        }
        output = Some(PathBuf::from(arg));
    }

    Ok(Command::Generate { output })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub output_path: PathBuf,
    pub output_source: SettingSource,
    pub missing: MissingPolicy,
    pub missing_source: SettingSource,
}

/// Resolve settings from the CLI output argument and the environment
pub fn resolve(output_arg: Option<PathBuf>, env: &impl EnvSource) -> Settings {
    let (output_path, output_source) = resolve_output(output_arg, env);
    let (missing, missing_source) = resolve_missing_policy(env);

    tracing::info!(
        op = "settings.resolved",
        output = %output_path.display(),
        output_source = %output_source,
        missing_policy = %missing,
        missing_source = %missing_source,
        "Settings resolved"
    );

    Settings {
        output_path,
        output_source,
        missing,
        missing_source,
    }
}

fn resolve_output(output_arg: Option<PathBuf>, env: &impl EnvSource) -> (PathBuf, SettingSource) {
    if let Some(path) = output_arg {
        return (path, SettingSource::Arg);
    }

    match env.get(OUTPUT_ENV) {
        Some(path) if !path.is_empty() => (PathBuf::from(path), SettingSource::Env),
        _ => (PathBuf::from(DEFAULT_OUTPUT), SettingSource::Default),
    }
}

fn resolve_missing_policy(env: &impl EnvSource) -> (MissingPolicy, SettingSource) {
    match env.get(STRICT_ENV) {
        Some(value) if is_truthy(&value) => (MissingPolicy::Strict, SettingSource::Env),
        Some(_) => (MissingPolicy::Placeholder, SettingSource::Env),
        None => (MissingPolicy::default(), SettingSource::Default),
    }
}

/// Explicit .env path from `ENV_CONFIG_DOTENV`, if set and non-empty
pub fn dotenv_path(env: &impl EnvSource) -> Option<PathBuf> {
    env.get(DOTENV_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
