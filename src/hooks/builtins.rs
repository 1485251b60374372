//! Hooks implemented in-process.

use anstream::println;
use anyhow::{Context, Result, bail};
use chrono::Local;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::{BuiltinHook, HookRunner, HookType};
use crate::profiles::{active_profile_name, profile_exists, validate_profile_name};

/// Project file that pins a profile for a working directory
pub const PROJECT_FILE: &str = ".dotclaude";

/// The built-ins registered on every runner
pub fn defaults() -> HashMap<HookType, Vec<BuiltinHook>> {
    let mut builtins = HashMap::new();
    builtins.insert(
        HookType::SessionStart,
        vec![
            BuiltinHook::new("session-info", 0, session_info),
            BuiltinHook::new("check-dotclaude", 10, check_dotclaude),
        ],
    );
    builtins.insert(
        HookType::PostToolBash,
        vec![BuiltinHook::new("git-tips", 10, git_tips)],
    );
    builtins
}

fn session_info(runner: &HookRunner) -> Result<()> {
    println!("=== Claude Code Session Started ===");
    println!("{}", Local::now().format("%a %b %e %H:%M:%S %Z %Y"));
    println!("Working directory: {}", runner.working_dir.display());

    let Ok(branch) = git_branch(&runner.working_dir) else {
        return Ok(());
    };
    println!("Git branch: {}", branch);

    if !matches!(branch.as_str(), "main" | "master" | "HEAD") {
        let behind = commits_behind(&runner.working_dir, &branch);
        if behind > 0 {
            println!(
                "Warning: Branch is {} commits behind main - consider syncing with main",
                behind
            );
        }
    }

    Ok(())
}

fn check_dotclaude(runner: &HookRunner) -> Result<()> {
    let project_file = runner.working_dir.join(PROJECT_FILE);
    if !project_file.is_file() {
        return Ok(());
    }

    let content = match fs::read_to_string(&project_file) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %project_file.display(), error = %e, "skipping unreadable project file");
            return Ok(());
        }
    };

    if let Some(desired) = parse_project_profile(&content)
        && let Some(notice) = project_profile_notice(runner, &desired)
    {
        println!("{}", notice);
    }

    Ok(())
}

fn git_tips(runner: &HookRunner) -> Result<()> {
    let Some(tool_args) = runner.var("TOOL_USE_ARGS") else {
        return Ok(());
    };

    if is_main_update(&tool_args) && in_git_repo(&runner.working_dir) {
        println!("Tip: Feature branches may be behind main. Rebase them onto main to stay current.");
    }

    Ok(())
}

/// Read the profile name from a `.dotclaude` file
///
/// Accepts `profile: name` and `profile=name`, optionally quoted. Blank lines
/// and `#` comments are skipped; the first profile line wins.
pub fn parse_project_profile(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find_map(|line| {
            line.strip_prefix("profile:")
                .or_else(|| line.strip_prefix("profile="))
        })
        .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|value| !value.is_empty())
}

/// Message to show when the project's profile is not the active one
fn project_profile_notice(runner: &HookRunner, desired: &str) -> Option<String> {
    if validate_profile_name(desired).is_err() {
        return Some(format!(
            "\nWarning: Invalid profile name in {}: {}\n   Profile names must contain only letters, numbers, hyphens, and underscores",
            PROJECT_FILE, desired
        ));
    }

    if !profile_exists(&runner.paths, desired) {
        return Some(format!(
            "\nWarning: Profile '{}' specified in {} not found\n   Available profiles: dotclaude list",
            desired, PROJECT_FILE
        ));
    }

    let active = active_profile_name(&runner.paths);
    if active == desired {
        return None;
    }

    let active = if active.is_empty() { "none" } else { active.as_str() };
    Some(format!(
        "\nProfile mismatch detected\n\n  This project uses:    {}\n  Currently active:     {}\n\n  To activate the project profile:\n    dotclaude activate {}\n",
        desired, active, desired
    ))
}

fn is_main_update(tool_args: &str) -> bool {
    ["git checkout main", "git checkout master", "git pull"]
        .iter()
        .any(|pattern| tool_args.contains(pattern))
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .context("Failed to run git")?;
    if !output.status.success() {
        bail!("git {} failed", args.join(" "));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn in_git_repo(dir: &Path) -> bool {
    git(dir, &["rev-parse", "--git-dir"]).is_ok()
}

fn git_branch(dir: &Path) -> Result<String> {
    git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

fn commits_behind(dir: &Path, branch: &str) -> u32 {
    ["main", "master"]
        .iter()
        .find_map(|base| {
            git(dir, &["rev-list", "--count", &format!("{}..{}", branch, base)])
                .ok()
                .and_then(|count| count.parse().ok())
        })
        .unwrap_or(0)
}
