//! Error types for the profile and hook engines.
//!
//! Core modules return these typed errors; the CLI layer folds them into
//! `anyhow::Error` for reporting.

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

/// Errors raised by profile validation, activation, backup and restore.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Profile name fails the character/length policy.
    #[error("invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A referenced profile, backup, template or required file is missing.
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    /// Creation requested for a name that already has a directory.
    #[error("profile '{name}' already exists")]
    AlreadyExists { name: String },

    /// Underlying filesystem failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Restore target cannot be classified from the backup filename.
    #[error("invalid backup filename '{filename}' (expected CLAUDE.md.backup.* or settings.json.backup.*)")]
    InvalidBackupName { filename: String },

    /// Delete requested on the currently active profile.
    #[error("cannot delete active profile '{name}' (activate another profile first)")]
    ActiveProfileConflict { name: String },
}

impl ProfileError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience result type for the profile engine.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Attach a path-aware context to `std::io` results.
pub trait IoContext<T> {
    fn at(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|e| ProfileError::io(format!("failed to {} {}", action, path.display()), e))
    }
}

/// Errors raised while dispatching a single hook.
///
/// These never escape [`crate::hooks::HookRunner::run`]; they are logged as
/// warnings and execution continues with the next hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{interpreter} not found - {hint}")]
    InterpreterNotFound {
        interpreter: &'static str,
        hint: &'static str,
    },

    #[error("{extension} hooks only work on Windows")]
    UnsupportedPlatform { extension: String },

    #[error("failed to start {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("exited with {status}")]
    ExitStatus { status: ExitStatus },

    #[error("timed out after {limit:?} and was killed")]
    TimedOut { limit: Duration },

    #[error("{0}")]
    Builtin(String),
}
