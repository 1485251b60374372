//! Timestamped backups of the deployed artifacts.
//!
//! Backups live next to the file they protect, named
//! `<basename>.backup.<YYYYMMDD-HHMMSS>`. After each new backup the oldest
//! copies beyond [`MAX_BACKUPS`] are pruned by modification time.

use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::error::{IoContext, ProfileError, Result};
use crate::paths::{CLAUDE_MD, SETTINGS_JSON};

/// Number of backups kept per artifact
pub const MAX_BACKUPS: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// The two files a backup can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Artifact {
    #[serde(rename = "CLAUDE.md")]
    ClaudeMd,
    #[serde(rename = "settings.json")]
    Settings,
}

impl Artifact {
    pub const ALL: [Artifact; 2] = [Artifact::ClaudeMd, Artifact::Settings];

    pub fn basename(&self) -> &'static str {
        match self {
            Artifact::ClaudeMd => CLAUDE_MD,
            Artifact::Settings => SETTINGS_JSON,
        }
    }

    /// Filename prefix shared by every backup of this artifact
    pub fn backup_prefix(&self) -> String {
        format!("{}.backup.", self.basename())
    }

    /// Classify a backup by its filename
    pub fn from_backup_name(filename: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| filename.starts_with(&a.backup_prefix()))
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.basename())
    }
}

/// A backup file found in the target directory
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub filename: String,
    pub timestamp: String,
    pub size: u64,
    pub artifact: Artifact,
    #[serde(skip)]
    pub modified: SystemTime,
}

/// Back up `<target_dir>/<artifact>` and prune old copies
///
/// Returns the new backup path, or `None` when there was nothing to back up.
/// Pruning failures are logged and do not fail the call.
pub fn backup_file(target_dir: &Path, artifact: Artifact) -> Result<Option<PathBuf>> {
    let source = target_dir.join(artifact.basename());
    if !source.is_file() {
        return Ok(None);
    }

    let contents = fs::read(&source).at("read", &source)?;
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let backup_path = write_new_backup(target_dir, artifact, &timestamp, &contents)?;
    debug!(backup = %backup_path.display(), "created backup");

    if let Err(e) = prune_backups(target_dir, artifact, MAX_BACKUPS) {
        warn!(artifact = %artifact, error = %e, "failed to clean up old backups");
    }

    Ok(Some(backup_path))
}

/// Write `contents` to a backup path that does not exist yet
///
/// Two backups within the same second get `-1`, `-2`, ... suffixes instead of
/// overwriting each other.
fn write_new_backup(
    target_dir: &Path,
    artifact: Artifact,
    timestamp: &str,
    contents: &[u8],
) -> Result<PathBuf> {
    let base = format!("{}{}", artifact.backup_prefix(), timestamp);
    let mut suffix = 0u32;

    loop {
        let name = if suffix == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, suffix)
        };
        let path = target_dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(contents).at("write backup", &path)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => {
                return Err(ProfileError::io(
                    format!("failed to create backup {}", path.display()),
                    e,
                ));
            }
        }
    }
}

fn collect_backups(target_dir: &Path, artifact: Artifact) -> io::Result<Vec<BackupInfo>> {
    let prefix = artifact.backup_prefix();
    let mut backups = Vec::new();

    let entries = match fs::read_dir(target_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(backups),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let Some(filename) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        let Some(timestamp) = filename.strip_prefix(&prefix).map(String::from) else {
            continue;
        };
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        backups.push(BackupInfo {
            path: entry.path(),
            filename,
            timestamp,
            size: metadata.len(),
            artifact,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    Ok(backups)
}

fn sort_newest_first(backups: &mut [BackupInfo]) {
    backups.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.filename.cmp(&a.filename))
    });
}

/// Keep the `keep` newest backups of `artifact`, delete the rest
///
/// Returns how many files were removed.
pub fn prune_backups(target_dir: &Path, artifact: Artifact, keep: usize) -> Result<usize> {
    let mut backups = collect_backups(target_dir, artifact).at("scan backups in", target_dir)?;
    if backups.len() <= keep {
        return Ok(0);
    }

    sort_newest_first(&mut backups);

    let mut removed = 0;
    for backup in backups.iter().skip(keep) {
        fs::remove_file(&backup.path).at("remove old backup", &backup.path)?;
        removed += 1;
    }
    Ok(removed)
}

/// All backups of both artifacts, newest first
pub fn list_backups(target_dir: &Path) -> Result<Vec<BackupInfo>> {
    let mut backups = Vec::new();
    for artifact in Artifact::ALL {
        backups.extend(collect_backups(target_dir, artifact).at("scan backups in", target_dir)?);
    }
    sort_newest_first(&mut backups);
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{backup_names, setup_test_paths};
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs_ago: u64) {
        let time = SystemTime::now() - Duration::from_secs(secs_ago);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_backup_missing_source_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.claude_dir).unwrap();

        let created = backup_file(&paths.claude_dir, Artifact::ClaudeMd).unwrap();
        assert!(created.is_none());
        assert!(backup_names(&paths, "CLAUDE.md").is_empty());
    }

    #[test]
    fn test_backup_copies_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.claude_dir).unwrap();
        fs::write(&paths.claude_settings, b"{\"a\": 1}\n").unwrap();

        let created = backup_file(&paths.claude_dir, Artifact::Settings)
            .unwrap()
            .unwrap();
        assert_eq!(fs::read(&created).unwrap(), b"{\"a\": 1}\n");

        let name = created.file_name().unwrap().to_str().unwrap();
        let stamp = name.strip_prefix("settings.json.backup.").unwrap();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "-");
    }

    #[test]
    fn test_same_second_backups_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.claude_dir).unwrap();

        let first =
            write_new_backup(&paths.claude_dir, Artifact::ClaudeMd, "20250101-120000", b"one")
                .unwrap();
        let second =
            write_new_backup(&paths.claude_dir, Artifact::ClaudeMd, "20250101-120000", b"two")
                .unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
        assert!(second.ends_with("CLAUDE.md.backup.20250101-120000-1"));
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        for i in 0..7u64 {
            let path = dir.join(format!("CLAUDE.md.backup.2025010{}-000000", i));
            fs::write(&path, format!("{}", i)).unwrap();
            // i == 6 is the newest
            set_mtime(&path, 100 - i * 10);
        }
        fs::write(dir.join("settings.json.backup.20250101-000000"), "{}").unwrap();

        let removed = prune_backups(dir, Artifact::ClaudeMd, 5).unwrap();
        assert_eq!(removed, 2);

        let remaining = collect_backups(dir, Artifact::ClaudeMd).unwrap();
        assert_eq!(remaining.len(), 5);
        assert!(!dir.join("CLAUDE.md.backup.20250100-000000").exists());
        assert!(!dir.join("CLAUDE.md.backup.20250101-000000").exists());
        assert!(dir.join("CLAUDE.md.backup.20250106-000000").exists());
        // other artifact untouched
        assert!(dir.join("settings.json.backup.20250101-000000").exists());
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("CLAUDE.md.backup.1"), "").unwrap();
        fs::write(dir.join("CLAUDE.md.backup.2"), "").unwrap();

        assert_eq!(prune_backups(dir, Artifact::ClaudeMd, 5).unwrap(), 0);
        assert_eq!(collect_backups(dir, Artifact::ClaudeMd).unwrap().len(), 2);
    }

    #[test]
    fn test_backup_prunes_to_max() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for i in 0..MAX_BACKUPS as u64 {
            let path = dir.join(format!("CLAUDE.md.backup.2000010{}-000000", i));
            fs::write(&path, "old").unwrap();
            set_mtime(&path, 1000 - i);
        }
        fs::write(dir.join("CLAUDE.md"), "current").unwrap();

        let created = backup_file(dir, Artifact::ClaudeMd).unwrap().unwrap();

        let remaining = collect_backups(dir, Artifact::ClaudeMd).unwrap();
        assert_eq!(remaining.len(), MAX_BACKUPS);
        assert!(created.exists());
        assert!(!dir.join("CLAUDE.md.backup.20000100-000000").exists());
    }

    #[test]
    fn test_list_backups_sorted_across_types() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        let old = dir.join("CLAUDE.md.backup.20250101-100000");
        let mid = dir.join("settings.json.backup.20250101-110000");
        let new = dir.join("CLAUDE.md.backup.20250101-120000");
        fs::write(&old, "aaaa").unwrap();
        fs::write(&mid, "{}").unwrap();
        fs::write(&new, "b").unwrap();
        set_mtime(&old, 300);
        set_mtime(&mid, 200);
        set_mtime(&new, 100);
        fs::write(dir.join("CLAUDE.md"), "live").unwrap();
        fs::write(dir.join("notes.backup.1"), "ignored").unwrap();

        let backups = list_backups(dir).unwrap();
        let names: Vec<_> = backups.iter().map(|b| b.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "CLAUDE.md.backup.20250101-120000",
                "settings.json.backup.20250101-110000",
                "CLAUDE.md.backup.20250101-100000",
            ]
        );
        assert_eq!(backups[0].timestamp, "20250101-120000");
        assert_eq!(backups[1].artifact, Artifact::Settings);
        assert_eq!(backups[2].size, 4);
    }

    #[test]
    fn test_list_backups_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let backups = list_backups(&temp_dir.path().join("missing")).unwrap();
        assert!(backups.is_empty());
    }

    #[test]
    fn test_artifact_classification() {
        assert_eq!(
            Artifact::from_backup_name("CLAUDE.md.backup.20250101-000000"),
            Some(Artifact::ClaudeMd)
        );
        assert_eq!(
            Artifact::from_backup_name("settings.json.backup.x"),
            Some(Artifact::Settings)
        );
        assert_eq!(Artifact::from_backup_name("CLAUDE.md"), None);
        assert_eq!(Artifact::from_backup_name("other.backup.1"), None);
    }
}
