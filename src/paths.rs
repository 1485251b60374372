use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// Name of the merged instructions file, in `base/`, each profile and the target dir.
pub const CLAUDE_MD: &str = "CLAUDE.md";
/// Name of the settings file, in `base/`, each profile and the target dir.
pub const SETTINGS_JSON: &str = "settings.json";
/// Name of the active-profile marker inside the target dir.
pub const MARKER_FILE: &str = ".current-profile";

/// All computed paths used by dotclaude
#[derive(Debug, Clone)]
pub struct Paths {
    /// Repository root (~/code/dotclaude)
    pub repo_dir: PathBuf,
    /// <repo>/base
    pub base_dir: PathBuf,
    /// <repo>/profiles
    pub profiles_dir: PathBuf,
    /// <repo>/examples/sample-profile
    pub template_dir: PathBuf,
    /// Target config root (~/.claude)
    pub claude_dir: PathBuf,
    /// ~/.claude/CLAUDE.md
    pub claude_md: PathBuf,
    /// ~/.claude/settings.json
    pub claude_settings: PathBuf,
    /// ~/.claude/.current-profile
    pub marker_file: PathBuf,
    /// ~/.claude/hooks
    pub hooks_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from optional overrides, falling back to the home directory.
    ///
    /// The CLI passes `--repo-dir`/`DOTCLAUDE_REPO_DIR` and `--claude-dir`/`CLAUDE_DIR`
    /// here; the core never reads the environment itself.
    pub fn new(repo_dir: Option<PathBuf>, claude_dir: Option<PathBuf>) -> Result<Self> {
        let home = || -> Result<PathBuf> {
            let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
            Ok(base_dirs.home_dir().to_path_buf())
        };

        let repo_dir = match repo_dir {
            Some(dir) => dir,
            None => home()?.join("code").join("dotclaude"),
        };
        let claude_dir = match claude_dir {
            Some(dir) => dir,
            None => home()?.join(".claude"),
        };

        Ok(Self::from_roots(repo_dir, claude_dir))
    }

    /// Derive every location from the two roots.
    pub fn from_roots(repo_dir: impl Into<PathBuf>, claude_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        let claude_dir = claude_dir.into();

        Self {
            base_dir: repo_dir.join("base"),
            profiles_dir: repo_dir.join("profiles"),
            template_dir: repo_dir.join("examples").join("sample-profile"),
            claude_md: claude_dir.join(CLAUDE_MD),
            claude_settings: claude_dir.join(SETTINGS_JSON),
            marker_file: claude_dir.join(MARKER_FILE),
            hooks_dir: claude_dir.join("hooks"),
            repo_dir,
            claude_dir,
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    /// Get the path to a specific profile's CLAUDE.md
    pub fn profile_claude_md(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(CLAUDE_MD)
    }

    /// Get the path to a specific profile's settings.json
    pub fn profile_settings(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(SETTINGS_JSON)
    }

    pub fn base_claude_md(&self) -> PathBuf {
        self.base_dir.join(CLAUDE_MD)
    }

    pub fn base_settings(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_JSON)
    }
}
