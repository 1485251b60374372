//! Restoring deployed files from backups.
//!
//! A restore snapshots whatever is currently deployed before overwriting it, so
//! a restore can itself be undone. Restoring a merged CLAUDE.md also recovers
//! the active profile from its `# Profile: <name>` banner line.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::backup::{Artifact, backup_file};
use crate::error::{IoContext, ProfileError, Result};
use crate::paths::Paths;
use crate::profiles::{validate_profile_name, write_active_marker};

static PROFILE_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# Profile: (\S+)").expect("valid banner pattern"));

/// What a restore did, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub artifact: Artifact,
    pub target: PathBuf,
    /// Snapshot of the file that was overwritten, if there was one
    pub pre_restore_backup: Option<PathBuf>,
    /// Profile written to the marker from the restored CLAUDE.md
    pub recovered_profile: Option<String>,
}

/// Extract the profile name from a merged CLAUDE.md
pub fn profile_from_claude_md(content: &str) -> Option<&str> {
    PROFILE_BANNER
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Restore a backup file onto its deployed location
pub fn restore_backup(paths: &Paths, backup_path: &Path) -> Result<Restored> {
    if !backup_path.is_file() {
        return Err(ProfileError::not_found(
            "backup",
            backup_path.display().to_string(),
        ));
    }

    let filename = backup_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let artifact = Artifact::from_backup_name(filename).ok_or_else(|| {
        ProfileError::InvalidBackupName {
            filename: filename.to_string(),
        }
    })?;

    // Read before snapshotting: the snapshot prunes, and may remove the
    // backup being restored if it is the oldest one.
    let data = fs::read(backup_path).at("read backup", backup_path)?;

    fs::create_dir_all(&paths.claude_dir).at("create Claude directory", &paths.claude_dir)?;
    let pre_restore_backup = backup_file(&paths.claude_dir, artifact)?;

    let target = paths.claude_dir.join(artifact.basename());
    fs::write(&target, &data).at("restore", &target)?;
    debug!(backup = %backup_path.display(), target = %target.display(), "restored backup");

    let recovered_profile = match artifact {
        Artifact::ClaudeMd => recover_active_marker(paths, &data),
        Artifact::Settings => None,
    };

    Ok(Restored {
        artifact,
        target,
        pre_restore_backup,
        recovered_profile,
    })
}

/// Point the marker at the profile named in restored CLAUDE.md content
///
/// Content without a banner leaves the marker alone. Failures here are only
/// logged; the file itself has already been restored.
fn recover_active_marker(paths: &Paths, data: &[u8]) -> Option<String> {
    let content = String::from_utf8_lossy(data);
    let name = profile_from_claude_md(&content)?;

    if let Err(e) = validate_profile_name(name) {
        warn!(error = %e, "restored CLAUDE.md names an invalid profile, marker unchanged");
        return None;
    }

    match write_active_marker(paths, name) {
        Ok(()) => Some(name.to_string()),
        Err(e) => {
            warn!(error = %e, "could not update active profile");
            None
        }
    }
}
