//! Profile activation logic.
//!
//! This module implements the core mechanism of `dotclaude`: activating a profile.
//! It handles:
//! - Backing up the deployed CLAUDE.md and settings.json when switching profiles.
//! - Merging `base/CLAUDE.md` with the profile's CLAUDE.md.
//! - Copying the profile's settings.json, or the base one as fallback.
//! - Recording the profile in the `.current-profile` marker.
//!
//! The steps run in order with no rollback. A failure after the backups leaves
//! whatever was already written in place; activating again converges.

use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::backup::{Artifact, backup_file};
use crate::error::{IoContext, ProfileError, Result};
use crate::paths::Paths;
use crate::profiles::{
    active_profile_name, profile_exists, validate_profile_name, write_active_marker,
};

/// What an activation did, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub profile: String,
    /// Marker content before activation (empty when none)
    pub previous: String,
    /// Backups written before the merge
    pub backups: Vec<PathBuf>,
    /// Where the deployed settings.json was copied from
    pub settings_source: PathBuf,
}

impl Activation {
    pub fn switched(&self) -> bool {
        self.previous != self.profile
    }
}

/// Banner placed between base and profile content in the merged CLAUDE.md
///
/// The `# Profile: <name>` line is what restore uses to recover the active
/// profile, so it must start a line.
pub fn profile_separator(name: &str) -> String {
    format!(
        "\n\n# =========================================\n# Profile: {}\n# =========================================\n\n",
        name
    )
}

/// Activate a profile by merging base + profile configuration
pub fn activate_profile(paths: &Paths, name: &str) -> Result<Activation> {
    validate_profile_name(name)?;

    if !profile_exists(paths, name) {
        return Err(ProfileError::not_found("profile", name));
    }

    let previous = active_profile_name(paths);

    fs::create_dir_all(&paths.claude_dir).at("create Claude directory", &paths.claude_dir)?;

    let mut backups = Vec::new();
    if previous != name {
        for artifact in Artifact::ALL {
            if let Some(path) = backup_file(&paths.claude_dir, artifact)? {
                backups.push(path);
            }
        }
    } else {
        debug!(profile = %name, "re-activating current profile, skipping backups");
    }

    merge_claude_md(paths, name)?;
    let settings_source = apply_settings(paths, name)?;
    write_active_marker(paths, name)?;

    debug!(profile = %name, previous = %previous, backups = backups.len(), "profile activated");

    Ok(Activation {
        profile: name.to_string(),
        previous,
        backups,
        settings_source,
    })
}

/// Write base CLAUDE.md + separator + profile CLAUDE.md to the target directory
///
/// Both files are concatenated as raw bytes; neither has to be UTF-8.
pub fn merge_claude_md(paths: &Paths, name: &str) -> Result<()> {
    let base_path = paths.base_claude_md();
    let profile_path = paths.profile_claude_md(name);

    let base = fs::read(&base_path).at("read base", &base_path)?;
    let profile = fs::read(&profile_path).at("read profile", &profile_path)?;

    let separator = profile_separator(name);
    let mut merged = Vec::with_capacity(base.len() + separator.len() + profile.len());
    merged.extend_from_slice(&base);
    merged.extend_from_slice(separator.as_bytes());
    merged.extend_from_slice(&profile);

    fs::write(&paths.claude_md, merged).at("write merged", &paths.claude_md)
}

/// Settings file an activation of `name` copies: the profile's own, else base's
pub fn settings_source(paths: &Paths, name: &str) -> PathBuf {
    let profile_settings = paths.profile_settings(name);
    if profile_settings.is_file() {
        profile_settings
    } else {
        paths.base_settings()
    }
}

/// Copy the profile's settings.json, falling back to base/settings.json
///
/// Returns the source that was used. No default content is synthesized when
/// neither file exists.
pub fn apply_settings(paths: &Paths, name: &str) -> Result<PathBuf> {
    let source = settings_source(paths, name);
    let data = fs::read(&source).at("read settings", &source)?;
    fs::write(&paths.claude_settings, data).at("write settings", &paths.claude_settings)?;
    Ok(source)
}

/// What [`activate_profile`] would do, computed without writing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPlan {
    pub profile: String,
    /// Marker content now (empty when none)
    pub current: String,
    /// Files concatenated into the deployed CLAUDE.md, in order
    pub merge_sources: [PathBuf; 2],
    /// `None` when neither the profile nor base has a settings.json
    pub settings_source: Option<PathBuf>,
}

impl ActivationPlan {
    pub fn is_first_activation(&self) -> bool {
        self.current.is_empty()
    }

    pub fn is_switch(&self) -> bool {
        self.current != self.profile
    }

    /// Backups are only taken when switching away from another profile
    pub fn creates_backups(&self) -> bool {
        !self.is_first_activation() && self.is_switch()
    }
}

/// Preview an activation; runs the same validation as [`activate_profile`]
pub fn plan_activation(paths: &Paths, name: &str) -> Result<ActivationPlan> {
    validate_profile_name(name)?;

    if !profile_exists(paths, name) {
        return Err(ProfileError::not_found("profile", name));
    }

    let source = settings_source(paths, name);
    Ok(ActivationPlan {
        profile: name.to_string(),
        current: active_profile_name(paths),
        merge_sources: [paths.base_claude_md(), paths.profile_claude_md(name)],
        settings_source: source.is_file().then_some(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{BASE_CLAUDE, BASE_SETTINGS, backup_names, setup_repo};
    use tempfile::TempDir;

    fn deployed(paths: &Paths) -> (String, String, String) {
        (
            fs::read_to_string(&paths.claude_md).unwrap(),
            fs::read_to_string(&paths.claude_settings).unwrap(),
            fs::read_to_string(&paths.marker_file).unwrap(),
        )
    }

    #[test]
    fn test_first_activation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        let activation = activate_profile(&paths, "work").unwrap();
        assert!(activation.backups.is_empty());
        assert!(activation.switched());
        assert_eq!(activation.previous, "");

        let (claude, settings, marker) = deployed(&paths);
        assert_eq!(
            claude,
            format!("{}{}{}", BASE_CLAUDE, profile_separator("work"), "# Work rules\n")
        );
        assert_eq!(settings, r#"{"model": "work"}"#);
        assert_eq!(marker, "work");
        assert!(backup_names(&paths, "CLAUDE.md").is_empty());
        assert!(backup_names(&paths, "settings.json").is_empty());
    }

    #[test]
    fn test_settings_fall_back_to_base() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        let activation = activate_profile(&paths, "oss").unwrap();
        assert_eq!(activation.settings_source, paths.base_settings());
        assert_eq!(
            fs::read_to_string(&paths.claude_settings).unwrap(),
            BASE_SETTINGS
        );
    }

    #[test]
    fn test_switching_backs_up_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        activate_profile(&paths, "work").unwrap();
        let work_claude = fs::read_to_string(&paths.claude_md).unwrap();

        let activation = activate_profile(&paths, "oss").unwrap();
        assert_eq!(activation.previous, "work");
        assert_eq!(activation.backups.len(), 2);

        let claude_backups = backup_names(&paths, "CLAUDE.md");
        let settings_backups = backup_names(&paths, "settings.json");
        assert_eq!(claude_backups.len(), 1);
        assert_eq!(settings_backups.len(), 1);
        assert_eq!(
            fs::read_to_string(paths.claude_dir.join(&claude_backups[0])).unwrap(),
            work_claude
        );
        assert_eq!(
            fs::read_to_string(paths.claude_dir.join(&settings_backups[0])).unwrap(),
            r#"{"model": "work"}"#
        );
        assert_eq!(fs::read_to_string(&paths.marker_file).unwrap(), "oss");
    }

    #[test]
    fn test_reactivation_is_idempotent_without_backups() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        activate_profile(&paths, "work").unwrap();
        let first = deployed(&paths);

        let activation = activate_profile(&paths, "work").unwrap();
        assert!(!activation.switched());
        assert!(activation.backups.is_empty());
        assert_eq!(deployed(&paths), first);
        assert!(backup_names(&paths, "CLAUDE.md").is_empty());
        assert!(backup_names(&paths, "settings.json").is_empty());
    }

    #[test]
    fn test_switch_and_return_matches_first_activation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        activate_profile(&paths, "work").unwrap();
        let first = deployed(&paths);
        activate_profile(&paths, "oss").unwrap();
        activate_profile(&paths, "work").unwrap();
        assert_eq!(deployed(&paths), first);
    }

    #[test]
    fn test_validation_and_existence_checked_before_writes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        assert!(matches!(
            activate_profile(&paths, "../base"),
            Err(ProfileError::InvalidName { .. })
        ));
        assert!(matches!(
            activate_profile(&paths, "missing"),
            Err(ProfileError::NotFound { .. })
        ));
        assert!(!paths.claude_dir.exists());
    }

    #[test]
    fn test_merge_keeps_non_utf8_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::write(paths.profile_claude_md("work"), b"caf\xe9 rules\n").unwrap();

        activate_profile(&paths, "work").unwrap();

        let mut expected = BASE_CLAUDE.as_bytes().to_vec();
        expected.extend_from_slice(profile_separator("work").as_bytes());
        expected.extend_from_slice(b"caf\xe9 rules\n");
        assert_eq!(fs::read(&paths.claude_md).unwrap(), expected);
        assert_eq!(fs::read_to_string(&paths.marker_file).unwrap(), "work");
    }

    #[test]
    fn test_plan_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);

        let plan = plan_activation(&paths, "work").unwrap();
        assert!(plan.is_first_activation());
        assert!(!plan.creates_backups());
        assert_eq!(plan.settings_source, Some(paths.profile_settings("work")));
        assert_eq!(plan.merge_sources[1], paths.profile_claude_md("work"));
        assert!(!paths.claude_dir.exists());
    }

    #[test]
    fn test_plan_tracks_switch_and_settings_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        activate_profile(&paths, "work").unwrap();

        let plan = plan_activation(&paths, "oss").unwrap();
        assert_eq!(plan.current, "work");
        assert!(plan.creates_backups());
        assert_eq!(plan.settings_source, Some(paths.base_settings()));

        let same = plan_activation(&paths, "work").unwrap();
        assert!(!same.is_switch());
        assert!(!same.creates_backups());

        fs::remove_file(paths.base_settings()).unwrap();
        assert_eq!(plan_activation(&paths, "oss").unwrap().settings_source, None);
        assert!(backup_names(&paths, "CLAUDE.md").is_empty());
    }

    #[test]
    fn test_plan_validates_like_activate() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        assert!(matches!(
            plan_activation(&paths, "a b"),
            Err(ProfileError::InvalidName { .. })
        ));
        assert!(matches!(
            plan_activation(&paths, "ghost"),
            Err(ProfileError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_base_claude_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::remove_file(paths.base_claude_md()).unwrap();

        let err = activate_profile(&paths, "work").unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
        assert!(!paths.marker_file.exists());
    }

    #[test]
    fn test_missing_profile_claude_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::remove_file(paths.profile_claude_md("oss")).unwrap();

        assert!(matches!(
            activate_profile(&paths, "oss"),
            Err(ProfileError::Io { .. })
        ));
    }

    #[test]
    fn test_no_settings_anywhere_fails_after_merge() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::remove_file(paths.base_settings()).unwrap();

        let err = activate_profile(&paths, "oss").unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
        // no rollback: merged CLAUDE.md stays, marker is not written
        assert!(paths.claude_md.exists());
        assert!(!paths.claude_settings.exists());
        assert!(!paths.marker_file.exists());
    }
}
