//! Config Emitter
//!
//! Looks up the WiFi credentials and writes them to the C header consumed by
//! the firmware build.
//!
//! # Write Discipline
//!
//! The header is written to `<output>.tmp`, synced, then renamed over the
//! target. A failed run leaves the previous file untouched and removes the
//! temporary file.
//!
//! Credential values are NEVER logged.

use crate::env_source::EnvSource;
use crate::error::EmitError;
use crate::header::{self, MacroBinding, WIFI_BINDINGS};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Default output file, relative to the working directory
pub const DEFAULT_OUTPUT: &str = "env_config.h";

/// How to treat a variable that is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Write the literal `None` in place of the value
    #[default]
    Placeholder,
    /// Fail before touching the output file
    Strict,
}

impl std::fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingPolicy::Placeholder => write!(f, "placeholder"),
            MissingPolicy::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    pub missing: MissingPolicy,
}

/// Outcome of a successful emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    pub path: PathBuf,
    /// Keys rendered with the placeholder, in output order
    pub missing: Vec<&'static str>,
    pub bytes: usize,
    /// An existing file was replaced
    pub replaced: bool,
}

/// Write `WIFI_SSID` and `WIFI_PASSWORD` from `env` to `output_path`
///
/// Absent variables are written as `None`.
pub fn emit(env: &impl EnvSource, output_path: &Path) -> Result<(), EmitError> {
    emit_with(env, output_path, &EmitOptions::default()).map(|_| ())
}

/// Configurable form of [`emit`]
pub fn emit_with(
    env: &impl EnvSource,
    output_path: &Path,
    options: &EmitOptions,
) -> Result<EmitReport, EmitError> {
    if output_path.file_name().is_none() {
        return Err(EmitError::InvalidOutputPath(output_path.display().to_string()));
    }

    let values = lookup(env, &WIFI_BINDINGS);

    let missing: Vec<&'static str> = WIFI_BINDINGS
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(binding, _)| binding.env_key)
        .collect();

    for key in &missing {
        tracing::warn!(
            op = "emit.variable_missing",
            key = %key,
            policy = %options.missing,
            "Environment variable not set"
        );
    }

    if options.missing == MissingPolicy::Strict {
        if let Some(&key) = missing.first() {
            return Err(EmitError::MissingVariable(key));
        }
    }

    let contents = header::render(
        WIFI_BINDINGS
            .iter()
            .zip(&values)
            .map(|(binding, value)| (binding.macro_name, value.as_deref().map(String::as_str))),
    );

    let replaced = write_atomic(output_path, contents.as_bytes())?;

    tracing::info!(
        op = "emit.written",
        path = %output_path.display(),
        bytes = contents.len(),
        missing = missing.len(),
        replaced = replaced,
        "Header written"
    );

    Ok(EmitReport {
        path: output_path.to_path_buf(),
        missing,
        bytes: contents.len(),
        replaced,
    })
}

fn lookup(env: &impl EnvSource, bindings: &[MacroBinding]) -> Vec<Option<Zeroizing<String>>> {
    bindings
        .iter()
        .map(|binding| {
            let value = env.get(binding.env_key).map(Zeroizing::new);
            tracing::debug!(
                op = "emit.lookup",
                key = binding.env_key,
                present = value.is_some(),
                secret = binding.secret,
                "Looked up variable"
            );
            value
        })
        .collect()
}

// =============================================================================
// Atomic Write
// =============================================================================

/// Sibling temporary path: `env_config.h` -> `env_config.h.tmp`
fn tmp_path_for(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(".tmp");
    Some(path.with_file_name(name))
}

/// Follow a symlinked output path to the file it points at
///
/// A dangling link resolves to its target so the write creates that file.
fn resolve_target(path: &Path) -> std::io::Result<PathBuf> {
    let is_symlink = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_symlink {
        return Ok(path.to_path_buf());
    }

    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let link = fs::read_link(path)?;
            Ok(match path.parent() {
                Some(parent) => parent.join(link),
                None => link,
            })
        }
        Err(e) => Err(e),
    }
}

/// Replace `path` with `contents` via tmp file + rename
///
/// Symlinks are written through. The new file keeps the mode of the file it
/// replaces, or 0600 when there was none.
///
/// Returns whether a file already existed at `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<bool, EmitError> {
    let target = resolve_target(path)?;
    let tmp_path = tmp_path_for(&target)
        .ok_or_else(|| EmitError::InvalidOutputPath(path.display().to_string()))?;
    let existing = fs::metadata(&target).ok().filter(|m| m.is_file());
    let replaced = existing.is_some();

    if let Err(e) = write_and_rename(&tmp_path, &target, contents, existing.as_ref()) {
        // The tmp file may not exist if creation itself failed
        let _ = fs::remove_file(&tmp_path);
        tracing::error!(
            op = "emit.write_failed",
            path = %target.display(),
            error = %e,
            "Failed to write header"
        );
        return Err(EmitError::Io(e));
    }

    Ok(replaced)
}

fn write_and_rename(
    tmp_path: &Path,
    path: &Path,
    contents: &[u8],
    existing: Option<&fs::Metadata>,
) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;

    // Restrict before any secret bytes land in the file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = match existing {
            Some(meta) => meta.permissions(),
            None => fs::Permissions::from_mode(0o600),
        };
        fs::set_permissions(tmp_path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = existing;

    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_source::MapEnv;
    use tempfile::TempDir;

    fn wifi_env(ssid: &str, password: &str) -> MapEnv {
        MapEnv::new()
            .with("WIFI_SSID", ssid)
            .with("WIFI_PASSWORD", password)
    }

    #[test]
    fn test_both_present() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);

        emit(&wifi_env("HomeNet", "s3cret!"), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#define WIFI_SSID \"HomeNet\"\n#define WIFI_PASSWORD \"s3cret!\"\n"
        );
    }

    #[test]
    fn test_neither_present() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);

        emit(&MapEnv::new(), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#define WIFI_SSID \"None\"\n#define WIFI_PASSWORD \"None\"\n"
        );
    }

    #[test]
    fn test_only_ssid_present() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        let env = MapEnv::new().with("WIFI_SSID", "Guest");

        let report = emit_with(&env, &path, &EmitOptions::default()).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#define WIFI_SSID \"Guest\"\n#define WIFI_PASSWORD \"None\"\n"
        );
        assert_eq!(report.missing, vec!["WIFI_PASSWORD"]);
        assert!(!report.replaced);
    }

    #[test]
    fn test_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        let env = wifi_env("HomeNet", "s3cret!");

        emit(&env, &path).unwrap();
        let first = fs::read(&path).unwrap();
        let report = emit_with(&env, &path, &EmitOptions::default()).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(report.replaced);
        assert_eq!(report.bytes, second.len());
    }

    #[test]
    fn test_overwrites_previous_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        let stale = "stale content that is much longer than the new header\n".repeat(10);
        fs::write(&path, stale).unwrap();

        emit(&wifi_env("a", "b"), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#define WIFI_SSID \"a\"\n#define WIFI_PASSWORD \"b\"\n"
        );
        assert!(!temp.path().join("env_config.h.tmp").exists());
    }

    #[test]
    fn test_missing_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("no-such-dir").join(DEFAULT_OUTPUT);

        let err = emit(&wifi_env("HomeNet", "s3cret!"), &path).unwrap_err();

        assert!(matches!(err, EmitError::Io(_)));
        assert!(!path.exists());
        assert!(!temp.path().join("no-such-dir").exists());
    }

    #[test]
    fn test_rename_failure_cleans_up_tmp() {
        let temp = TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail
        let path = temp.path().join(DEFAULT_OUTPUT);
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let err = emit(&wifi_env("HomeNet", "s3cret!"), &path).unwrap_err();

        assert!(matches!(err, EmitError::Io(_)));
        assert!(path.is_dir());
        assert!(!temp.path().join("env_config.h.tmp").exists());
    }

    #[test]
    fn test_strict_missing_fails_without_writing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        fs::write(&path, "previous\n").unwrap();
        let env = MapEnv::new().with("WIFI_SSID", "Guest");
        let options = EmitOptions {
            missing: MissingPolicy::Strict,
        };

        let err = emit_with(&env, &path, &options).unwrap_err();

        assert!(matches!(err, EmitError::MissingVariable("WIFI_PASSWORD")));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous\n");
    }

    #[test]
    fn test_strict_reports_first_missing_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        let options = EmitOptions {
            missing: MissingPolicy::Strict,
        };

        let err = emit_with(&MapEnv::new(), &path, &options).unwrap_err();

        assert!(matches!(err, EmitError::MissingVariable("WIFI_SSID")));
        assert!(!path.exists());
    }

    #[test]
    fn test_strict_all_present_succeeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        let options = EmitOptions {
            missing: MissingPolicy::Strict,
        };

        let report = emit_with(&wifi_env("HomeNet", ""), &path, &options).unwrap();

        assert!(report.missing.is_empty());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#define WIFI_SSID \"HomeNet\"\n#define WIFI_PASSWORD \"\"\n"
        );
    }

    #[test]
    fn test_special_characters_escaped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);

        emit(&wifi_env("Cafe \"Net\"", "pa\\ss\nword"), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "#define WIFI_SSID \"Cafe \\\"Net\\\"\"\n#define WIFI_PASSWORD \"pa\\\\ss\\nword\"\n"
        );
        assert_eq!(content.lines().count(), 2);
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_file_is_owner_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);

        emit(&wifi_env("HomeNet", "hunter2"), &path).unwrap();

        assert_eq!(mode_of(&path), 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_mode_is_kept() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_OUTPUT);
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        emit(&wifi_env("HomeNet", "hunter2"), &path).unwrap();

        assert_eq!(mode_of(&path), 0o640);
        assert!(fs::read_to_string(&path).unwrap().contains("hunter2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_written_through() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real_config.h");
        fs::write(&real, "x").unwrap();
        let link = temp.path().join(DEFAULT_OUTPUT);
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let report =
            emit_with(&wifi_env("HomeNet", "s3cret!"), &link, &EmitOptions::default()).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(&real).unwrap(),
            "#define WIFI_SSID \"HomeNet\"\n#define WIFI_PASSWORD \"s3cret!\"\n"
        );
        assert!(report.replaced);
        assert!(!temp.path().join("real_config.h.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_creates_target() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join(DEFAULT_OUTPUT);
        std::os::unix::fs::symlink("generated.h", &link).unwrap();

        emit(&MapEnv::new(), &link).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(temp.path().join("generated.h")).unwrap(),
            "#define WIFI_SSID \"None\"\n#define WIFI_PASSWORD \"None\"\n"
        );
    }

    #[test]
    fn test_invalid_output_path() {
        let err = emit(&MapEnv::new(), Path::new("")).unwrap_err();
        assert!(matches!(err, EmitError::InvalidOutputPath(_)));

        let err = emit(&MapEnv::new(), Path::new("/")).unwrap_err();
        assert!(matches!(err, EmitError::InvalidOutputPath(_)));
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        assert_eq!(
            tmp_path_for(Path::new("build/env_config.h")),
            Some(PathBuf::from("build/env_config.h.tmp"))
        );
        assert_eq!(
            tmp_path_for(Path::new("env_config.h")),
            Some(PathBuf::from("env_config.h.tmp"))
        );
        assert_eq!(tmp_path_for(Path::new("..")), None);
    }
}
