//! Error types for header generation and settings resolution

use std::path::PathBuf;

// =============================================================================
// Emit Errors
// =============================================================================

/// Error type for writing the header file
#[derive(Debug)]
pub enum EmitError {
    /// Output could not be created, written, synced, or renamed
    Io(std::io::Error),
    /// A required variable was absent and the strict policy is active
    MissingVariable(&'static str),
    /// Output path has no file name component
    InvalidOutputPath(String),
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitError::Io(e) => write!(f, "I/O error: {}", e),
            EmitError::MissingVariable(key) => {
                write!(f, "Required environment variable {} is not set", key)
            }
            EmitError::InvalidOutputPath(path) => {
                write!(f, "Invalid output path: '{}'", path)
            }
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmitError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EmitError {
    fn from(e: std::io::Error) -> Self {
        EmitError::Io(e)
    }
}

// =============================================================================
// Settings Errors
// =============================================================================

/// Error type for startup configuration
#[derive(Debug)]
pub enum SettingsError {
    /// More positional arguments than the CLI accepts
    UnexpectedArgument(String),
    /// Explicit .env file does not exist
    DotenvNotFound(PathBuf),
    /// Explicit .env file could not be read or parsed
    Dotenv(PathBuf, dotenvy::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::UnexpectedArgument(arg) => {
                write!(f, "Unexpected argument: '{}'", arg)
            }
            SettingsError::DotenvNotFound(path) => {
                write!(f, ".env file not found: {}", path.display())
            }
            SettingsError::Dotenv(path, e) => {
                write!(f, "Failed to load .env file {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Dotenv(_, e) => Some(e),
            _ => None,
        }
    }
}
