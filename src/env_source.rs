//! Environment Lookup
//!
//! Every configuration read goes through [`EnvSource`] so the emitter can be
//! driven from the real process environment, a parsed .env file, or an
//! in-memory map in tests.
//!
//! Lookup order for the binary:
//! 1. Process environment
//! 2. .env file entries (never written back into the process environment)

use crate::error::SettingsError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Default .env file name searched for in the working directory and its ancestors
pub const DOTENV_FILENAME: &str = ".env";

/// Read-only key/value lookup
pub trait EnvSource {
    /// Returns the value bound to `key`, or `None` if it is not set
    fn get(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        // Non-UTF-8 values are kept lossily rather than treated as unset
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }
}

/// In-memory environment
///
/// Values are zeroized on drop since .env entries carry credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: HashMap<String, Zeroizing<String>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), Zeroizing::new(value.to_string()));
        self
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(|value| value.as_str().to_owned())
    }
}

impl FromIterator<(String, String)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key, Zeroizing::new(value)))
                .collect(),
        }
    }
}

/// Two sources where `primary` shadows `fallback`
#[derive(Debug, Clone)]
pub struct LayeredEnv<P, F> {
    pub primary: P,
    pub fallback: F,
}

impl<P: EnvSource, F: EnvSource> EnvSource for LayeredEnv<P, F> {
    fn get(&self, key: &str) -> Option<String> {
        self.primary.get(key).or_else(|| self.fallback.get(key))
    }
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

// =============================================================================
// .env Loading
// =============================================================================

/// Result of locating and parsing a .env file
#[derive(Debug, Default)]
pub struct Dotenv {
    /// File the entries came from, if any was found
    pub path: Option<PathBuf>,
    pub entries: MapEnv,
}

/// Parse a specific .env file
///
/// Unlike discovery, a missing or malformed explicit file is an error.
pub fn load_dotenv_file(path: &Path) -> Result<Dotenv, SettingsError> {
    let entries = parse_dotenv(path).map_err(|e| {
        if e.not_found() {
            SettingsError::DotenvNotFound(path.to_path_buf())
        } else {
            SettingsError::Dotenv(path.to_path_buf(), e)
        }
    })?;

    tracing::info!(
        op = "dotenv.loaded",
        path = %path.display(),
        entries = entries.len(),
        "Loaded explicit .env file"
    );

    Ok(Dotenv {
        path: Some(path.to_path_buf()),
        entries,
    })
}

/// Search `start` and its ancestors for a .env file and parse the first one found
///
/// Nothing found is not an error. A file that fails to parse is skipped with a
/// warning so generation still proceeds from the process environment.
pub fn discover_dotenv(start: &Path) -> Dotenv {
    let Some(path) = find_dotenv(start) else {
        tracing::debug!(
            op = "dotenv.not_found",
            start = %start.display(),
            "No .env file found"
        );
        return Dotenv::default();
    };

    match parse_dotenv(&path) {
        Ok(entries) => {
            tracing::info!(
                op = "dotenv.loaded",
                path = %path.display(),
                entries = entries.len(),
                "Loaded .env file"
            );
            Dotenv {
                path: Some(path),
                entries,
            }
        }
        Err(e) => {
            tracing::warn!(
                op = "dotenv.parse_failed",
                path = %path.display(),
                error = %e,
                "Ignoring unreadable .env file"
            );
            Dotenv::default()
        }
    }
}

fn find_dotenv(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DOTENV_FILENAME))
        .find(|candidate| candidate.is_file())
}

fn parse_dotenv(path: &Path) -> Result<MapEnv, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}
