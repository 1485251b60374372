//! Diagnostic tool for dotclaude.
//!
//! This module implements the `dotclaude doctor` command, which checks the
//! repository and the deployed configuration for common issues:
//! - Existence of required directories.
//! - Base files present and `settings.json` parsing as JSON.
//! - The active marker naming a profile that still exists.
//! - Each profile carrying a CLAUDE.md and valid JSON settings.
//! - Hook directories and scripts that will be skipped.
//!
//! With `--fix`, a stale active marker is removed.

use anstyle::AnsiColor;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use crate::hooks::{HookRunner, HookSource, HookType};
use crate::paths::Paths;
use crate::profiles::{active_profile_name, list_profiles, profile_exists, repair_stale_marker};
use crate::restore::profile_from_claude_md;
use crate::ui::Ui;

/// Outcome of a doctor run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    /// Checks that reported at least one error
    pub failed_checks: usize,
    /// Repairs performed with `--fix`
    pub fixed: Vec<String>,
}

/// Run the doctor diagnostics
pub fn run_doctor(paths: &Paths, ui: &Ui, fix: bool) -> DoctorReport {
    let mut report = DoctorReport::default();

    ui.section("dotclaude Doctor");
    ui.newline();

    check_step(ui, &mut report, "Directories", |_| {
        let mut ok = true;
        for (label, dir) in [
            ("Repository", &paths.repo_dir),
            ("Base directory", &paths.base_dir),
            ("Profiles directory", &paths.profiles_dir),
        ] {
            if dir.is_dir() {
                ui.println(format!("  {} {} exists: {}", ui.icon_ok(), label, dir.display()));
            } else {
                ui.println(format!("  {} {} missing: {}", ui.icon_err(), label, dir.display()));
                ok = false;
            }
        }

        if paths.claude_dir.is_dir() {
            ui.println(format!(
                "  {} Claude directory exists: {}",
                ui.icon_ok(),
                paths.claude_dir.display()
            ));
        } else {
            // created on first activation
            ui.println(format!(
                "  {} Claude directory missing: {}",
                ui.icon_warn(),
                paths.claude_dir.display()
            ));
        }
        ok
    });

    check_step(ui, &mut report, "Base Files", |_| {
        let mut ok = true;
        let base_claude = paths.base_claude_md();
        if base_claude.is_file() {
            ui.println(format!("  {} base/CLAUDE.md present", ui.icon_ok()));
        } else {
            ui.println(format!(
                "  {} base/CLAUDE.md missing (activation will fail)",
                ui.icon_err()
            ));
            ok = false;
        }

        let base_settings = paths.base_settings();
        if base_settings.is_file() {
            match validate_json_file(&base_settings) {
                Ok(()) => ui.println(format!(
                    "  {} base/settings.json is valid JSON",
                    ui.icon_ok()
                )),
                Err(e) => {
                    ui.println(format!("  {} base/settings.json invalid: {:#}", ui.icon_err(), e));
                    ok = false;
                }
            }
        } else {
            ui.println(format!(
                "  {} base/settings.json missing (profiles without settings cannot be activated)",
                ui.icon_warn()
            ));
        }
        ok
    });

    check_step(ui, &mut report, "Active Profile", |report| {
        let active = active_profile_name(paths);
        if active.is_empty() {
            ui.println(format!("  {} No active profile set", ui.icon_info()));
            return true;
        }

        ui.println(format!("  {} Active profile: {}", ui.icon_info(), active));
        if !profile_exists(paths, &active) {
            if !fix {
                ui.println(format!(
                    "  {} Active profile directory MISSING (run 'dotclaude doctor --fix')",
                    ui.icon_err()
                ));
                return false;
            }
            return match repair_stale_marker(paths) {
                Ok(Some(stale)) => {
                    ui.println(format!("  {} Removed stale marker for '{}'", ui.icon_ok(), stale));
                    report.fixed.push(format!("removed stale marker for '{}'", stale));
                    true
                }
                Ok(None) => true,
                Err(e) => {
                    ui.println(format!("  {} Could not remove stale marker: {}", ui.icon_err(), e));
                    false
                }
            };
        }
        ui.println(format!("  {} Active profile directory exists", ui.icon_ok()));

        match fs::read_to_string(&paths.claude_md) {
            Ok(content) => match profile_from_claude_md(&content) {
                Some(deployed) if deployed == active => {
                    ui.println(format!("  {} Deployed CLAUDE.md matches", ui.icon_ok()));
                }
                Some(deployed) => ui.println(format!(
                    "  {} Deployed CLAUDE.md was built for '{}'",
                    ui.icon_warn(),
                    deployed
                )),
                None => ui.println(format!(
                    "  {} Deployed CLAUDE.md has no profile banner",
                    ui.icon_warn()
                )),
            },
            Err(_) => ui.println(format!("  {} Deployed CLAUDE.md missing", ui.icon_warn())),
        }
        true
    });

    check_step(ui, &mut report, "Profiles", |_| {
        let profiles = match list_profiles(paths) {
            Ok(p) => p,
            Err(e) => {
                ui.println(format!("  {} Failed to list profiles: {}", ui.icon_err(), e));
                return false;
            }
        };

        if profiles.is_empty() {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profiles:", profiles.len()));
        let mut all_valid = true;

        for profile in &profiles {
            let name = profile.name.as_str();
            if !paths.profile_claude_md(name).is_file() {
                ui.println(format!("    {} {} (missing CLAUDE.md)", ui.icon_err(), name));
                all_valid = false;
                continue;
            }

            let settings = paths.profile_settings(name);
            if !settings.is_file() {
                ui.println(format!("    {} {} (uses base settings)", ui.icon_ok(), name));
                continue;
            }
            match validate_json_file(&settings) {
                Ok(()) => ui.println(format!("    {} {}", ui.icon_ok(), name)),
                Err(e) => {
                    ui.println(format!(
                        "    {} {} (invalid settings.json: {:#})",
                        ui.icon_err(),
                        name,
                        e
                    ));
                    all_valid = false;
                }
            }
        }
        all_valid
    });

    check_step(ui, &mut report, "Hooks", |_| {
        if !paths.hooks_dir.is_dir() {
            ui.println(format!(
                "  {} Hooks directory missing (run 'dotclaude hook init')",
                ui.icon_info()
            ));
            return true;
        }

        let runner = HookRunner::new(paths.clone());
        for hook_type in HookType::ALL {
            let hooks = runner.list(hook_type);
            let external: Vec<_> = hooks
                .iter()
                .filter(|h| h.source == HookSource::External)
                .collect();
            let disabled: Vec<&str> = external
                .iter()
                .filter(|h| !h.enabled)
                .map(|h| h.name.as_str())
                .collect();

            if disabled.is_empty() {
                ui.println(format!(
                    "  {} {}: {} hook(s)",
                    ui.icon_ok(),
                    hook_type,
                    hooks.len()
                ));
            } else {
                ui.println(format!(
                    "  {} {}: not executable, skipped: {}",
                    ui.icon_warn(),
                    hook_type,
                    disabled.join(", ")
                ));
            }
        }
        true
    });

    check_step(ui, &mut report, "Environment", |_| {
        match env::var("EDITOR") {
            Ok(e) => ui.println(format!("  {} EDITOR set to: {}", ui.icon_ok(), e)),
            Err(_) => ui.println(format!("  {} EDITOR not set", ui.icon_info())),
        }
        match which::which("git") {
            Ok(git) => ui.println(format!("  {} git found: {}", ui.icon_ok(), git.display())),
            Err(_) => ui.println(format!(
                "  {} git not found (new profiles will not be repositories)",
                ui.icon_warn()
            )),
        }
        true
    });

    report
}

fn validate_json_file(path: &Path) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str::<serde_json::Value>(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(())
}

fn check_step<F>(ui: &Ui, report: &mut DoctorReport, name: &str, check_fn: F)
where
    F: FnOnce(&mut DoctorReport) -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    if !check_fn(report) {
        report.failed_checks += 1;
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
}
