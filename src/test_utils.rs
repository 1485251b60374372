//! Test utilities shared across test modules
//!
//! Builds a throwaway repository root and target directory inside a
//! `TempDir`, mimicking the real `~/code/dotclaude` and `~/.claude` layout.

use std::fs;

use crate::paths::Paths;
use tempfile::TempDir;

pub const BASE_CLAUDE: &str = "# Base instructions\n";
pub const BASE_SETTINGS: &str = r#"{"model": "base"}"#;

/// Create a Paths struct for testing using a temporary directory
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::from_roots(temp_dir.path().join("repo"), temp_dir.path().join(".claude"))
}

/// Populate `base/` with the default CLAUDE.md and settings.json
pub fn write_base(paths: &Paths) {
    fs::create_dir_all(&paths.base_dir).unwrap();
    fs::write(paths.base_claude_md(), BASE_CLAUDE).unwrap();
    fs::write(paths.base_settings(), BASE_SETTINGS).unwrap();
}

/// Create `profiles/<name>/` with CLAUDE.md and an optional settings.json
pub fn write_profile(paths: &Paths, name: &str, claude: &str, settings: Option<&str>) {
    let dir = paths.profile_dir(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(paths.profile_claude_md(name), claude).unwrap();
    if let Some(settings) = settings {
        fs::write(paths.profile_settings(name), settings).unwrap();
    }
}

/// Base plus two profiles, `work` (own settings) and `oss` (inherits base settings)
pub fn setup_repo(temp_dir: &TempDir) -> Paths {
    let paths = setup_test_paths(temp_dir);
    write_base(&paths);
    write_profile(&paths, "work", "# Work rules\n", Some(r#"{"model": "work"}"#));
    write_profile(&paths, "oss", "# OSS rules\n", None);
    paths
}

/// Names of all entries in the target directory that look like backups of `basename`
pub fn backup_names(paths: &Paths, basename: &str) -> Vec<String> {
    let prefix = format!("{}.backup.", basename);
    let Ok(entries) = fs::read_dir(&paths.claude_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .filter(|n| n.starts_with(&prefix))
        .collect();
    names.sort();
    names
}
