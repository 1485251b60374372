//! Core profile management logic.
//!
//! This module handles the "data model" of profiles:
//! - Validating profile names
//! - Listing available profiles and resolving the active one
//! - Reading and writing the `.current-profile` marker
//! - Creating profiles from the template and removing them
//!
//! The marker file is the only record of which profile is active. Every query
//! re-reads it; nothing is cached between calls.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::error::{IoContext, ProfileError, Result};
use crate::fs_utils::copy_dir_recursive;
use crate::paths::Paths;

/// Maximum allowed length for a profile name
pub const MAX_PROFILE_NAME_LEN: usize = 64;

/// A profile directory as seen by listing and `show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl ProfileDescriptor {
    fn from_dir(name: String, path: PathBuf, metadata: &fs::Metadata, is_active: bool) -> Self {
        Self {
            name,
            path,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_active,
        }
    }
}

/// Validate profile name
///
/// Only allows ASCII alphanumeric characters, underscores, and hyphens, 1 to 64
/// characters long. Names are joined onto filesystem paths, so every mutating
/// operation calls this first.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let invalid = |reason: String| ProfileError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("profile name cannot be empty".into()));
    }

    if name.len() > MAX_PROFILE_NAME_LEN {
        return Err(invalid(format!(
            "too long: {} characters (maximum {} allowed)",
            name.len(),
            MAX_PROFILE_NAME_LEN
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "only letters, numbers, hyphens (-), and underscores (_) are allowed".into(),
        ));
    }

    Ok(())
}

/// Check if a profile exists
pub fn profile_exists(paths: &Paths, name: &str) -> bool {
    paths.profile_dir(name).is_dir()
}

/// List available profiles, sorted by name
///
/// A missing profiles root is created and reported as an empty list.
pub fn list_profiles(paths: &Paths) -> Result<Vec<ProfileDescriptor>> {
    if !paths.profiles_dir.exists() {
        fs::create_dir_all(&paths.profiles_dir)
            .at("create profiles directory", &paths.profiles_dir)?;
        return Ok(Vec::new());
    }

    let active = active_profile_name(paths);
    let mut profiles = Vec::new();

    let entries =
        fs::read_dir(&paths.profiles_dir).at("read profiles directory", &paths.profiles_dir)?;
    for entry in entries {
        let entry = entry.at("read entry in", &paths.profiles_dir)?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };

        let is_active = name == active;
        profiles.push(ProfileDescriptor::from_dir(name, entry.path(), &metadata, is_active));
    }

    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

/// Name recorded in the marker file, trimmed; empty when absent or unreadable
pub fn active_profile_name(paths: &Paths) -> String {
    fs::read_to_string(&paths.marker_file)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Resolve the active profile
///
/// A marker naming a profile that no longer exists yields `None`, not an error.
pub fn active_profile(paths: &Paths) -> Result<Option<ProfileDescriptor>> {
    let name = active_profile_name(paths);
    if name.is_empty() {
        return Ok(None);
    }

    let path = paths.profile_dir(&name);
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(ProfileDescriptor::from_dir(
            name, path, &metadata, true,
        ))),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProfileError::io(
            format!("failed to stat profile directory {}", path.display()),
            e,
        )),
    }
}

/// Overwrite the marker with exactly `name`
pub fn write_active_marker(paths: &Paths, name: &str) -> Result<()> {
    fs::write(&paths.marker_file, name).at("write active marker", &paths.marker_file)
}

/// Remove a marker that names a profile directory which no longer exists
///
/// Returns the stale name when the marker was removed.
pub fn repair_stale_marker(paths: &Paths) -> Result<Option<String>> {
    let name = active_profile_name(paths);
    if name.is_empty() || profile_exists(paths, &name) {
        return Ok(None);
    }

    fs::remove_file(&paths.marker_file).at("remove stale marker", &paths.marker_file)?;
    debug!(profile = %name, "removed stale active marker");
    Ok(Some(name))
}

/// Create a new profile from the sample template
///
/// The template directory is copied verbatim; if `git` is available the new
/// profile is initialised as its own repository. Git failures leave the copied
/// profile in place and are only logged.
pub fn create_profile(paths: &Paths, name: &str) -> Result<PathBuf> {
    validate_profile_name(name)?;

    if profile_exists(paths, name) {
        return Err(ProfileError::AlreadyExists {
            name: name.to_string(),
        });
    }

    fs::create_dir_all(&paths.profiles_dir).at("create profiles directory", &paths.profiles_dir)?;

    if !paths.template_dir.is_dir() {
        return Err(ProfileError::not_found(
            "template",
            paths.template_dir.display().to_string(),
        ));
    }

    let profile_dir = paths.profile_dir(name);
    copy_dir_recursive(&paths.template_dir, &profile_dir).at("copy template to", &profile_dir)?;

    if let Err(e) = init_git_repo(&profile_dir, name) {
        warn!(profile = %name, error = %e, "skipped git initialisation");
    }

    Ok(profile_dir)
}

fn init_git_repo(profile_dir: &Path, name: &str) -> io::Result<()> {
    let Ok(git) = which::which("git") else {
        debug!("git not on PATH, profile left without a repository");
        return Ok(());
    };

    let commit_msg = format!("Initial commit for profile: {}", name);
    let steps: [&[&str]; 3] = [&["init"], &["add", "."], &["commit", "-m", &commit_msg]];

    for args in steps {
        let output = Command::new(&git)
            .args(args)
            .current_dir(profile_dir)
            .output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
    }

    Ok(())
}

/// Remove a profile and its whole directory tree
///
/// The active profile cannot be removed.
pub fn delete_profile(paths: &Paths, name: &str) -> Result<()> {
    validate_profile_name(name)?;

    if !profile_exists(paths, name) {
        return Err(ProfileError::not_found("profile", name));
    }

    if active_profile_name(paths) == name {
        return Err(ProfileError::ActiveProfileConflict {
            name: name.to_string(),
        });
    }

    let profile_dir = paths.profile_dir(name);
    fs::remove_dir_all(&profile_dir).at("remove profile directory", &profile_dir)
}
