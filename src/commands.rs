//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`list`,
//! `activate`, `restore`, `hook run`, etc.). It is the coordination layer
//! between the user and the engine modules:
//! - `crate::ui` for output and prompts.
//! - `crate::profiles`, `crate::activate`, `crate::backup`, `crate::restore`
//!   for the profile engine.
//! - `crate::hooks` for the hook engine.
//!
//! Confirmation prompts live here only; the engine never asks questions.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use inquire::{Confirm, Select};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::activate::{activate_profile, plan_activation};
use crate::backup::{Artifact, BackupInfo, list_backups};
use crate::doctor::run_doctor;
use crate::fs_utils::{dir_size, format_bytes};
use crate::hooks::{HookInfo, HookRunner, HookSource, HookType};
use crate::paths::Paths;
use crate::profiles::{
    active_profile, active_profile_name, create_profile, delete_profile, list_profiles,
    profile_exists, validate_profile_name,
};
use crate::restore::restore_backup;
use crate::ui::Ui;

fn print_json<T: Serialize + ?Sized>(ui: &Ui, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    ui.println(json);
    Ok(())
}

fn require_profile(paths: &Paths, name: &str) -> Result<()> {
    validate_profile_name(name)?;
    if !profile_exists(paths, name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'dotclaude list' to see available profiles.",
            name
        );
    }
    Ok(())
}

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui, json: bool) -> Result<()> {
    let profiles = list_profiles(paths)?;

    if json {
        return print_json(ui, &profiles);
    }

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} create <name>", ui.bold("dotclaude")));
        return Ok(());
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Modified"),
        ui.header_cell("Status"),
    ]);

    for profile in &profiles {
        let icon = if profile.is_active { ui.icon_ok() } else { " " };
        let status_cell = if profile.is_active {
            ui.colored_cell("active", AnsiColor::Green)
        } else {
            ui.cell("-")
        };
        let modified = profile
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".into());

        table.add_row(vec![
            ui.cell(icon),
            ui.cell(&profile.name),
            ui.cell(modified),
            status_cell,
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the active profile and the state of the deployed files
pub fn show(paths: &Paths, ui: &Ui) -> Result<()> {
    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    let active = active_profile(paths)?;

    match &active {
        Some(profile) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(&profile.name)]);
            table.add_row(vec![
                ui.cell("Profile path:"),
                ui.cell(profile.path.display().to_string()),
            ]);
            if let Ok(size) = dir_size(&profile.path) {
                table.add_row(vec![ui.cell("Profile size:"), ui.cell(format_bytes(size))]);
            }
            if let Some(modified) = profile.modified {
                table.add_row(vec![
                    ui.cell("Last modified:"),
                    ui.cell(modified.format("%Y-%m-%d %H:%M:%S").to_string()),
                ]);
            }
        }
        None => {
            let stale = active_profile_name(paths);
            if stale.is_empty() {
                table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
            } else {
                table.add_row(vec![
                    ui.cell("Active profile:"),
                    ui.colored_cell(format!("{} (missing)", stale), AnsiColor::Yellow),
                ]);
            }
        }
    }

    for (label, path) in [
        ("CLAUDE.md:", &paths.claude_md),
        ("settings.json:", &paths.claude_settings),
    ] {
        let cell = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                ui.cell(format!("{} ({})", path.display(), format_bytes(meta.len())))
            }
            _ => ui.colored_cell("missing", AnsiColor::Yellow),
        };
        table.add_row(vec![ui.cell(label), cell]);
    }

    ui.println(table.to_string());

    if let Some(profile) = active {
        ui.newline();
        ui.section("Profile Files");
        let mut files = ui.simple_table();
        let profile_settings = paths.profile_settings(&profile.name);
        let settings_source = if profile_settings.is_file() {
            profile_settings
        } else {
            paths.base_settings()
        };
        for path in [paths.profile_claude_md(&profile.name), settings_source] {
            let size = match std::fs::metadata(&path) {
                Ok(meta) => ui.cell(format_bytes(meta.len())),
                Err(_) => ui.colored_cell("missing", AnsiColor::Red),
            };
            files.add_row(vec![ui.cell(path.display().to_string()), size]);
        }
        ui.println(files.to_string());
    }

    Ok(())
}

/// Create a profile from the sample template
pub fn create(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    validate_profile_name(name)?;
    if profile_exists(paths, name) {
        bail!(
            "Profile '{}' already exists.\nHint: Use 'dotclaude edit {}' to modify it.",
            name,
            name
        );
    }

    let spinner = ui.spinner(format!("Creating profile '{}'...", name));
    match create_profile(paths, name) {
        Ok(dir) => {
            ui.spinner_finish_ok(&spinner, format!("Created profile '{}'", name));
            ui.info(format!("Location: {}", dir.display()));
            ui.info(format!("Activate it with: dotclaude activate {}", name));
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to create: {}", e));
            Err(e.into())
        }
    }
}

/// Delete a profile
pub fn delete(paths: &Paths, name: &str, ui: &Ui, force: bool) -> Result<()> {
    require_profile(paths, name)?;

    if active_profile_name(paths) == name {
        bail!(
            "Cannot delete '{}' because it is the currently active profile.\nHint: Activate another profile first with 'dotclaude activate <other-profile>'.",
            name
        );
    }

    if !force {
        let confirm = Confirm::new(&format!("Are you sure you want to delete profile '{}'?", name))
            .with_default(false)
            .with_help_message("This will permanently delete the profile directory")
            .prompt()
            .context("Confirmation cancelled")?;

        if !confirm {
            ui.warn("Deletion cancelled.");
            return Ok(());
        }
    }

    delete_profile(paths, name)?;

    ui.ok(format!("Deleted profile '{}'", name));
    Ok(())
}

/// Activate a profile, prompting for one when no name is given
pub fn activate(paths: &Paths, name: Option<&str>, ui: &Ui, dry_run: bool) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => select_profile(paths)?,
    };

    if dry_run {
        return preview_activation(paths, &name, ui);
    }

    let spinner = ui.spinner(format!("Activating profile '{}'...", name));

    match activate_profile(paths, &name) {
        Ok(activation) => {
            ui.spinner_finish_ok(&spinner, format!("Active profile: {}", name));
            if !activation.switched() {
                ui.info("Profile was already active, no backups made");
            }
            for backup in &activation.backups {
                ui.info(format!("Backed up: {}", backup.display()));
            }
            if activation.settings_source == paths.base_settings() {
                ui.info("Using base settings.json (profile has none)");
            }
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to activate: {}", e));
            Err(e.into())
        }
    }
}

fn preview_activation(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let plan = plan_activation(paths, name)?;

    ui.section(format!("Activation preview: {}", plan.profile));
    let mut table = ui.simple_table();
    let current = if plan.is_first_activation() {
        ui.dim("none")
    } else {
        plan.current.clone()
    };
    let action = if plan.is_first_activation() {
        "first activation"
    } else if plan.creates_backups() {
        "switch, backing up CLAUDE.md and settings.json"
    } else {
        "update in place, no backups"
    };
    let settings = match &plan.settings_source {
        Some(source) if *source == paths.profile_settings(name) => "profile".to_string(),
        Some(_) => "base (profile has none)".to_string(),
        None => ui.colored("none found, activation would fail", AnsiColor::Red),
    };
    table.add_row(vec![ui.cell("Current"), ui.cell(current)]);
    table.add_row(vec![ui.cell("Action"), ui.cell(action)]);
    for (i, source) in plan.merge_sources.iter().enumerate() {
        let label = if i == 0 { "Merge" } else { "" };
        table.add_row(vec![ui.cell(label), ui.cell(source.display().to_string())]);
    }
    table.add_row(vec![ui.cell("Settings"), ui.cell(settings)]);
    ui.println(table.to_string());
    ui.newline();
    ui.info("Dry run, nothing was written");
    Ok(())
}

fn select_profile(paths: &Paths) -> Result<String> {
    let profiles = list_profiles(paths)?;
    if profiles.is_empty() {
        bail!("No profiles found.\nHint: Create one with 'dotclaude create <name>'.");
    }

    let options: Vec<String> = profiles
        .iter()
        .map(|p| {
            if p.is_active {
                format!("{} (active)", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect();

    let selected = Select::new("Which profile should be activated?", options.clone())
        .prompt()
        .context("Profile selection cancelled")?;

    let idx = options
        .iter()
        .position(|opt| *opt == selected)
        .context("Unknown selection")?;
    Ok(profiles[idx].name.clone())
}

/// List backups in the target directory
pub fn backups(paths: &Paths, ui: &Ui, json: bool) -> Result<()> {
    let backups = list_backups(&paths.claude_dir)?;

    if json {
        return print_json(ui, &backups);
    }

    if backups.is_empty() {
        ui.warn("No backups found.");
        ui.newline();
        ui.println("Backups are created automatically when switching profiles.");
        return Ok(());
    }

    ui.section("Backups");
    ui.newline();

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("File"),
        ui.header_cell("Type"),
        ui.header_cell("Date"),
        ui.header_cell("Size"),
    ]);

    for backup in &backups {
        table.add_row(vec![
            ui.cell(&backup.filename),
            ui.cell(backup.artifact.to_string()),
            ui.cell(backup_date(backup)),
            ui.cell(format_bytes(backup.size)),
        ]);
    }

    ui.println(table.to_string());
    ui.newline();
    ui.info(format!("{} backup(s) found", backups.len()));

    Ok(())
}

fn backup_date(backup: &BackupInfo) -> String {
    let datetime: chrono::DateTime<chrono::Local> = backup.modified.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Restore a backup, offering a menu when no path is given
pub fn restore(paths: &Paths, path: Option<&Path>, ui: &Ui, yes: bool) -> Result<()> {
    let backup_path = match path {
        Some(path) => path.to_path_buf(),
        None => match select_backup(paths)? {
            Some(path) => path,
            None => {
                ui.warn("No backups found.");
                return Ok(());
            }
        },
    };

    if !backup_path.is_file() {
        bail!(
            "Backup '{}' not found.\nHint: Use 'dotclaude backups' to see available backups.",
            backup_path.display()
        );
    }

    if !yes {
        let confirm = Confirm::new(&format!("Restore '{}'?", backup_path.display()))
            .with_default(false)
            .with_help_message("The current file is backed up before being overwritten")
            .prompt()
            .context("Confirmation cancelled")?;

        if !confirm {
            ui.warn("Restore cancelled.");
            return Ok(());
        }
    }

    let restored = restore_backup(paths, &backup_path)?;

    ui.ok(format!(
        "Restored '{}' to {}",
        backup_path.display(),
        restored.target.display()
    ));
    if let Some(snapshot) = &restored.pre_restore_backup {
        ui.info(format!("Previous file saved as {}", snapshot.display()));
    }
    if let Some(profile) = &restored.recovered_profile {
        ui.info(format!("Active profile set to '{}'", profile));
    }
    Ok(())
}

/// Menu entries grouped by artifact, newest first within each group
fn backup_menu(backups: &[BackupInfo]) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();
    let mut number = 1;
    for artifact in Artifact::ALL {
        for backup in backups.iter().filter(|b| b.artifact == artifact) {
            entries.push((
                format!(
                    "{:>2}) [{}] {} ({})",
                    number,
                    artifact,
                    backup.timestamp,
                    format_bytes(backup.size)
                ),
                backup.path.clone(),
            ));
            number += 1;
        }
    }
    entries
}

fn select_backup(paths: &Paths) -> Result<Option<PathBuf>> {
    let backups = list_backups(&paths.claude_dir)?;
    if backups.is_empty() {
        return Ok(None);
    }

    let menu = backup_menu(&backups);
    let options: Vec<String> = menu.iter().map(|(label, _)| label.clone()).collect();

    let selected = Select::new("Which backup should be restored?", options.clone())
        .with_page_size(12)
        .prompt()
        .context("Backup selection cancelled")?;

    let idx = options
        .iter()
        .position(|opt| *opt == selected)
        .context("Unknown selection")?;
    Ok(Some(menu[idx].1.clone()))
}

/// Editor command line: `$EDITOR`, `$VISUAL`, then the first known editor on PATH
pub fn pick_editor(
    editor: Option<String>,
    visual: Option<String>,
    on_path: impl Fn(&str) -> bool,
) -> String {
    if let Some(editor) = editor.filter(|e| !e.trim().is_empty()) {
        return editor;
    }
    if let Some(visual) = visual.filter(|v| !v.trim().is_empty()) {
        return visual;
    }

    let candidates: &[(&str, &str)] = if cfg!(windows) {
        &[("code", "code --wait"), ("notepad++", "notepad++"), ("notepad", "notepad")]
    } else {
        &[("code", "code --wait"), ("vim", "vim"), ("nano", "nano"), ("vi", "vi")]
    };
    candidates
        .iter()
        .find(|(binary, _)| on_path(*binary))
        .map(|(_, command)| command.to_string())
        .unwrap_or_else(|| "vi".to_string())
}

/// Open a profile's CLAUDE.md (or settings.json) in the user's editor
///
/// Defaults to the active profile when no name is given.
pub fn edit(paths: &Paths, name: Option<&str>, settings: bool, ui: &Ui) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let active = active_profile_name(paths);
            if active.is_empty() {
                bail!(
                    "No active profile to edit.\n\
                     Hint: Pass a profile name, or activate one with 'dotclaude activate <name>'."
                );
            }
            active
        }
    };
    require_profile(paths, &name)?;

    let target = if settings {
        let settings_path = paths.profile_settings(&name);
        if !settings_path.is_file() {
            bail!(
                "Profile '{}' has no settings.json.\nHint: Create {} first.",
                name,
                settings_path.display()
            );
        }
        settings_path
    } else {
        paths.profile_claude_md(&name)
    };

    let editor = pick_editor(
        std::env::var("EDITOR").ok(),
        std::env::var("VISUAL").ok(),
        |binary| which::which(binary).is_ok(),
    );
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("No editor configured.\nHint: Set $EDITOR.");
    };

    let status = Command::new(program)
        .args(parts)
        .arg(&target)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        bail!("Editor exited with non-zero status");
    }

    ui.ok(format!("Edited {}", target.display()));
    if active_profile_name(paths) == name {
        ui.info(format!(
            "Run 'dotclaude activate {}' to redeploy the changes",
            name
        ));
    }
    Ok(())
}

/// Profiles compared by `diff`: one name compares the active profile against it
pub fn diff_pair(paths: &Paths, first: &str, second: Option<&str>) -> Result<(String, String)> {
    let (left, right) = match second {
        Some(second) => (first.to_string(), second.to_string()),
        None => {
            let active = active_profile_name(paths);
            if active.is_empty() {
                bail!(
                    "No active profile to compare against.\n\
                     Hint: Pass two profile names, e.g. 'dotclaude diff work oss'."
                );
            }
            (active, first.to_string())
        }
    };
    require_profile(paths, &left)?;
    require_profile(paths, &right)?;
    Ok((left, right))
}

/// Show a unified diff between two profiles' CLAUDE.md files
pub fn diff(paths: &Paths, first: &str, second: Option<&str>, ui: &Ui) -> Result<()> {
    let (left, right) = diff_pair(paths, first, second)?;
    let diff_bin = which::which("diff")
        .context("'diff' not found on PATH\nHint: Install diffutils to compare profiles.")?;

    let left_path = paths.profile_claude_md(&left);
    let right_path = paths.profile_claude_md(&right);
    let status = Command::new(diff_bin)
        .arg("-u")
        .arg(&left_path)
        .arg(&right_path)
        .status()
        .context("Failed to run diff")?;

    // diff exits 1 when the files differ
    match status.code() {
        Some(0) => ui.ok(format!("Profiles '{}' and '{}' are identical", left, right)),
        Some(1) => {}
        _ => bail!("diff exited with {}", status),
    }
    Ok(())
}

/// Run every hook of one type
///
/// Hook failures are logged as warnings and never fail the command.
pub fn hook_run(paths: &Paths, hook_type: HookType, timeout_secs: Option<u64>) -> Result<()> {
    let mut runner = HookRunner::new(paths.clone());
    if let Some(secs) = timeout_secs {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let summary = runner.run(hook_type);
    tracing::debug!(
        hook_type = %hook_type,
        executed = summary.executed.len(),
        failed = summary.failed.len(),
        "hooks finished"
    );
    Ok(())
}

/// List hooks for one type, or all types
pub fn hook_list(paths: &Paths, hook_type: Option<HookType>, ui: &Ui, json: bool) -> Result<()> {
    let runner = HookRunner::new(paths.clone());
    let types: Vec<HookType> = match hook_type {
        Some(t) => vec![t],
        None => HookType::ALL.to_vec(),
    };

    if json {
        let listing: Vec<HookTypeListing> = types
            .iter()
            .map(|t| HookTypeListing {
                hook_type: *t,
                hooks: runner.list(*t),
            })
            .collect();
        return print_json(ui, &listing);
    }

    for t in types {
        let hooks = runner.list(t);
        ui.section(format!("{} ({})", t, runner.hook_dir(t).display()));

        if hooks.is_empty() {
            ui.println(ui.dim("  (no hooks)"));
            ui.newline();
            continue;
        }

        let mut table = ui.simple_table();
        table.set_header(vec![
            ui.header_cell("Priority"),
            ui.header_cell("Hook"),
            ui.header_cell("Source"),
            ui.header_cell("Status"),
        ]);
        for hook in &hooks {
            table.add_row(vec![
                ui.cell(format!("{:02}", hook.priority)),
                ui.cell(&hook.name),
                ui.cell(match hook.source {
                    HookSource::BuiltIn => "built-in",
                    HookSource::External => "external",
                }),
                if hook.enabled {
                    ui.colored_cell("enabled", AnsiColor::Green)
                } else {
                    ui.colored_cell("not executable", AnsiColor::Yellow)
                },
            ]);
        }
        ui.println(table.to_string());
        ui.newline();
    }

    Ok(())
}

#[derive(Serialize)]
struct HookTypeListing {
    hook_type: HookType,
    hooks: Vec<HookInfo>,
}

/// Create the hook directory for every hook type
pub fn hook_init(paths: &Paths, ui: &Ui) -> Result<()> {
    let runner = HookRunner::new(paths.clone());
    runner.ensure_directories()?;

    ui.ok(format!("Hook directories ready under {}", paths.hooks_dir.display()));
    for hook_type in HookType::ALL {
        ui.println(format!("  {} {}", ui.icon_info(), runner.hook_dir(hook_type).display()));
    }
    ui.newline();
    ui.println("Name scripts NN-name (e.g. 05-load-env.sh) to control their order.");
    Ok(())
}

pub fn doctor(paths: &Paths, ui: &Ui, fix: bool) -> Result<()> {
    let report = run_doctor(paths, ui, fix);

    for fixed in &report.fixed {
        ui.ok(format!("Fixed: {}", fixed));
    }
    if report.failed_checks > 0 {
        ui.warn(format!("{} check(s) reported issues", report.failed_checks));
    } else {
        ui.ok("All checks passed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{backup_names, setup_repo, setup_test_paths};
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    #[test]
    fn test_list_empty() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        // Should not error, just show "no profiles"
        assert!(list(&paths, &ui, false).is_ok());
        assert!(paths.profiles_dir.is_dir());
    }

    #[test]
    fn test_list_and_show() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(list(&paths, &ui, false).is_ok());
        assert!(list(&paths, &ui, true).is_ok());
        assert!(show(&paths, &ui).is_ok());

        activate(&paths, Some("work"), &ui, false).unwrap();
        assert!(show(&paths, &ui).is_ok());
    }

    #[test]
    fn test_show_with_stale_marker() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::create_dir_all(&paths.claude_dir).unwrap();
        fs::write(&paths.marker_file, "gone").unwrap();

        assert!(show(&paths, &test_ui()).is_ok());
    }

    #[test]
    fn test_activate_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(activate(&paths, Some("nonexistent"), &ui, false).is_err());
        assert!(activate(&paths, Some("../work"), &ui, false).is_err());
    }

    #[test]
    fn test_create_requires_template() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(create(&paths, "work", &ui).is_err());

        let err = create(&paths, "fresh", &ui).unwrap_err();
        assert!(err.to_string().contains("template"));

        fs::create_dir_all(&paths.template_dir).unwrap();
        fs::write(paths.template_dir.join("CLAUDE.md"), "# Sample\n").unwrap();
        create(&paths, "fresh", &ui).unwrap();
        assert!(paths.profile_claude_md("fresh").is_file());
    }

    #[test]
    fn test_delete_with_force() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        activate(&paths, Some("work"), &ui, false).unwrap();
        assert!(delete(&paths, "work", &ui, true).is_err());
        assert!(delete(&paths, "missing", &ui, true).is_err());

        delete(&paths, "oss", &ui, true).unwrap();
        assert!(!profile_exists(&paths, "oss"));
    }

    #[test]
    fn test_restore_with_yes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        activate(&paths, Some("work"), &ui, false).unwrap();
        activate(&paths, Some("oss"), &ui, false).unwrap();

        let backup = paths.claude_dir.join(&backup_names(&paths, "CLAUDE.md")[0]);
        restore(&paths, Some(&backup), &ui, true).unwrap();
        assert_eq!(active_profile_name(&paths), "work");

        assert!(restore(&paths, Some(&paths.claude_dir.join("nope")), &ui, true).is_err());
    }

    #[test]
    fn test_backups_listing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(backups(&paths, &ui, false).is_ok());

        activate(&paths, Some("work"), &ui, false).unwrap();
        activate(&paths, Some("oss"), &ui, false).unwrap();
        assert!(backups(&paths, &ui, false).is_ok());
        assert!(backups(&paths, &ui, true).is_ok());
    }

    #[test]
    fn test_backup_menu_groups_by_type() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        fs::create_dir_all(&paths.claude_dir).unwrap();
        for name in [
            "settings.json.backup.20240101-000000",
            "CLAUDE.md.backup.20240101-000000",
            "CLAUDE.md.backup.20240102-000000",
        ] {
            fs::write(paths.claude_dir.join(name), "x").unwrap();
        }

        let menu = backup_menu(&list_backups(&paths.claude_dir).unwrap());
        assert_eq!(menu.len(), 3);
        assert!(menu[0].0.starts_with(" 1) [CLAUDE.md]"));
        assert!(menu[1].0.starts_with(" 2) [CLAUDE.md]"));
        assert!(menu[2].0.starts_with(" 3) [settings.json]"));
    }

    #[test]
    fn test_hook_commands() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        hook_init(&paths, &ui).unwrap();
        for hook_type in HookType::ALL {
            assert!(paths.hooks_dir.join(hook_type.as_str()).is_dir());
        }

        assert!(hook_list(&paths, None, &ui, false).is_ok());
        assert!(hook_list(&paths, Some(HookType::SessionStart), &ui, true).is_ok());
        assert!(hook_run(&paths, HookType::PreToolEdit, Some(1)).is_ok());
    }

    #[test]
    fn test_activate_dry_run_leaves_target_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        activate(&paths, Some("work"), &ui, false).unwrap();
        let deployed = fs::read(&paths.claude_md).unwrap();

        activate(&paths, Some("oss"), &ui, true).unwrap();
        assert_eq!(fs::read(&paths.claude_md).unwrap(), deployed);
        assert_eq!(active_profile_name(&paths), "work");
        assert!(backup_names(&paths, "CLAUDE.md").is_empty());

        assert!(activate(&paths, Some("ghost"), &ui, true).is_err());
    }

    #[test]
    fn test_pick_editor_order() {
        let nothing = |_: &str| false;
        assert_eq!(pick_editor(Some("hx".into()), Some("emacs".into()), nothing), "hx");
        assert_eq!(pick_editor(Some(" ".into()), Some("emacs".into()), nothing), "emacs");
        assert_eq!(pick_editor(None, None, nothing), "vi");
        assert_eq!(pick_editor(None, None, |b| b == "code"), "code --wait");
        #[cfg(unix)]
        assert_eq!(pick_editor(None, None, |b| b == "nano" || b == "vi"), "nano");
    }

    #[test]
    #[cfg(unix)]
    #[serial_test::serial]
    fn test_edit_defaults_to_active_profile() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        // SAFETY: serialized with every other env-mutating test
        unsafe { std::env::set_var("EDITOR", "true --ignored") };
        let no_active = edit(&paths, None, false, &ui);
        activate(&paths, Some("oss"), &ui, false).unwrap();
        let claude = edit(&paths, None, false, &ui);
        let missing_settings = edit(&paths, None, true, &ui);
        let settings = edit(&paths, Some("work"), true, &ui);
        unsafe { std::env::remove_var("EDITOR") };

        assert!(no_active.unwrap_err().to_string().contains("No active profile"));
        assert!(claude.is_ok());
        assert!(missing_settings.unwrap_err().to_string().contains("no settings.json"));
        assert!(settings.is_ok());
    }

    #[test]
    fn test_diff_pair_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(diff_pair(&paths, "oss", None).is_err());
        assert_eq!(
            diff_pair(&paths, "work", Some("oss")).unwrap(),
            ("work".to_string(), "oss".to_string())
        );

        activate(&paths, Some("work"), &ui, false).unwrap();
        assert_eq!(
            diff_pair(&paths, "oss", None).unwrap(),
            ("work".to_string(), "oss".to_string())
        );
        assert!(diff_pair(&paths, "ghost", None).is_err());
        assert!(diff_pair(&paths, "work", Some("../base")).is_err());
    }

    #[test]
    fn test_diff_runs_when_available() {
        if which::which("diff").is_err() {
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_repo(&temp_dir);
        let ui = test_ui();

        assert!(diff(&paths, "work", Some("oss"), &ui).is_ok());
        assert!(diff(&paths, "work", Some("work"), &ui).is_ok());
    }

    #[test]
    fn test_doctor_never_fails() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        assert!(doctor(&paths, &test_ui(), false).is_ok());
    }
}
