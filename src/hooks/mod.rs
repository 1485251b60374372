//! Lifecycle hooks.
//!
//! Hooks run at named points of the Claude Code lifecycle. Each hook type has
//! a directory under `<claude-dir>/hooks/`:
//!
//! ```text
//! ~/.claude/hooks/
//! ├── session-start/
//! │   ├── 05-load-env.sh      # external, priority 05
//! │   └── custom.sh           # external, default priority 50
//! └── post-tool-bash/
//! ```
//!
//! Built-in hooks and executable files from the directory are merged into one
//! list ordered by priority, then by `NN-name`. Hooks run one after another;
//! a failing hook is logged and the rest still run.

pub mod builtins;
pub mod exec;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{HookError, IoContext, Result};
use crate::paths::Paths;
use exec::{ExecutableCheck, command_for, platform_check, run_to_completion};

/// Priority for hooks whose filename has no two-digit prefix
pub const DEFAULT_PRIORITY: u8 = 50;

/// Environment variable carrying the repository root to external hooks
pub const ENV_REPO_DIR: &str = "DOTCLAUDE_REPO_DIR";
/// Environment variable carrying the target config root to external hooks
pub const ENV_CLAUDE_DIR: &str = "CLAUDE_DIR";

/// Lifecycle event a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    SessionStart,
    PostToolBash,
    PostToolEdit,
    PreToolBash,
    PreToolEdit,
}

impl HookType {
    pub const ALL: [HookType; 5] = [
        HookType::SessionStart,
        HookType::PostToolBash,
        HookType::PostToolEdit,
        HookType::PreToolBash,
        HookType::PreToolEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::SessionStart => "session-start",
            HookType::PostToolBash => "post-tool-bash",
            HookType::PostToolEdit => "post-tool-edit",
            HookType::PreToolBash => "pre-tool-bash",
            HookType::PreToolEdit => "pre-tool-edit",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown hook type: {}\nValid types: {}",
                    s,
                    Self::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

type BuiltinFn = Box<dyn Fn(&HookRunner) -> anyhow::Result<()>>;

/// A hook implemented in-process
pub struct BuiltinHook {
    pub name: String,
    pub priority: u8,
    run: BuiltinFn,
}

impl BuiltinHook {
    pub fn new(
        name: impl Into<String>,
        priority: u8,
        run: impl Fn(&HookRunner) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            run: Box::new(run),
        }
    }
}

impl fmt::Debug for BuiltinHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinHook")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Where a hook comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookSource {
    BuiltIn,
    External,
}

/// Descriptor returned by [`HookRunner::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookInfo {
    pub name: String,
    /// `NN-name` sort key
    pub full_name: String,
    pub priority: u8,
    pub source: HookSource,
    pub path: Option<PathBuf>,
    pub enabled: bool,
}

/// Outcome of [`HookRunner::run`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Every hook attempted, in execution order
    pub executed: Vec<String>,
    /// Hooks that failed, with the reason
    pub failed: Vec<(String, String)>,
}

enum Action<'a> {
    Builtin(&'a BuiltinHook),
    External(PathBuf),
}

struct Entry<'a> {
    name: String,
    full_name: String,
    priority: u8,
    enabled: bool,
    action: Action<'a>,
}

/// Extract the priority from a hook filename
///
/// Exactly two leading ASCII digits followed by at least one more character
/// give the priority (`07-x.sh` is 7). Anything else, including a single
/// leading digit, gets [`DEFAULT_PRIORITY`].
pub fn extract_priority(name: &str) -> u8 {
    match name.as_bytes() {
        [a, b, _, ..] if a.is_ascii_digit() && b.is_ascii_digit() => (a - b'0') * 10 + (b - b'0'),
        _ => DEFAULT_PRIORITY,
    }
}

fn has_priority_prefix(name: &str) -> bool {
    matches!(name.as_bytes(), [a, b, _, ..] if a.is_ascii_digit() && b.is_ascii_digit())
}

/// Discovers, orders and executes hooks for one repository/target pair
pub struct HookRunner {
    pub paths: Paths,
    /// Directory built-ins treat as the project directory
    pub working_dir: PathBuf,
    env: BTreeMap<String, String>,
    builtins: HashMap<HookType, Vec<BuiltinHook>>,
    check: Box<dyn ExecutableCheck>,
    timeout: Option<Duration>,
}

impl fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRunner")
            .field("hooks_dir", &self.paths.hooks_dir)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("builtins", &self.builtins)
            .field("check", &self.check)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HookRunner {
    /// Runner with the default built-ins and the platform's executable check
    pub fn new(paths: Paths) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            paths,
            working_dir,
            env: BTreeMap::new(),
            builtins: builtins::defaults(),
            check: platform_check(),
            timeout: None,
        }
    }

    /// Replace the built-in table
    pub fn with_builtins(mut self, builtins: HashMap<HookType, Vec<BuiltinHook>>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn with_check(mut self, check: Box<dyn ExecutableCheck>) -> Self {
        self.check = check;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Kill external hooks that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extra variable passed to external hooks and visible to built-ins
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn register(&mut self, hook_type: HookType, hook: BuiltinHook) {
        self.builtins.entry(hook_type).or_default().push(hook);
    }

    /// Look up a variable in the extra env first, then the process env
    pub fn var(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    pub fn hook_dir(&self, hook_type: HookType) -> PathBuf {
        self.paths.hooks_dir.join(hook_type.as_str())
    }

    fn entries(&self, hook_type: HookType) -> Vec<Entry<'_>> {
        let mut entries: Vec<Entry<'_>> = self
            .builtins
            .get(&hook_type)
            .into_iter()
            .flatten()
            .map(|hook| Entry {
                name: hook.name.clone(),
                full_name: format!("{:02}-{}", hook.priority, hook.name),
                priority: hook.priority,
                enabled: true,
                action: Action::Builtin(hook),
            })
            .collect();

        let dir = self.hook_dir(hook_type);
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for dir_entry in read_dir.filter_map(|e| e.ok()) {
                let path = dir_entry.path();
                let Ok(metadata) = fs::metadata(&path) else {
                    continue;
                };
                if !metadata.is_file() {
                    continue;
                }
                let Some(name) = dir_entry.file_name().to_str().map(String::from) else {
                    continue;
                };

                let priority = extract_priority(&name);
                let full_name = if has_priority_prefix(&name) {
                    name.clone()
                } else {
                    format!("{:02}-{}", priority, name)
                };
                let enabled = self.check.is_executable(&path, &metadata);

                entries.push(Entry {
                    name,
                    full_name,
                    priority,
                    enabled,
                    action: Action::External(path),
                });
            }
        }

        entries.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        entries
    }

    /// `NN-name` keys of the hooks `run` would execute, in order
    pub fn plan(&self, hook_type: HookType) -> Vec<String> {
        self.entries(hook_type)
            .into_iter()
            .filter(|e| e.enabled)
            .map(|e| e.full_name)
            .collect()
    }

    /// Run every enabled hook of `hook_type` in order
    ///
    /// Never fails: each hook's error is logged as a warning and recorded in
    /// the summary, and the remaining hooks still run.
    pub fn run(&self, hook_type: HookType) -> RunSummary {
        let mut summary = RunSummary::default();

        for entry in self.entries(hook_type).into_iter().filter(|e| e.enabled) {
            debug!(hook = %entry.full_name, "running hook");

            let result = match &entry.action {
                Action::Builtin(hook) => {
                    (hook.run)(self).map_err(|e| HookError::Builtin(format!("{e:#}")))
                }
                Action::External(path) => self.run_external(path),
            };

            if let Err(e) = result {
                warn!(hook = %entry.full_name, error = %e, "hook failed");
                summary.failed.push((entry.full_name.clone(), e.to_string()));
            }
            summary.executed.push(entry.full_name);
        }

        summary
    }

    fn run_external(&self, path: &Path) -> std::result::Result<(), HookError> {
        let mut cmd = command_for(path)?;
        cmd.env(ENV_REPO_DIR, &self.paths.repo_dir)
            .env(ENV_CLAUDE_DIR, &self.paths.claude_dir)
            .envs(&self.env)
            .current_dir(&self.working_dir);
        run_to_completion(cmd, path, self.timeout)
    }

    /// Descriptors for every hook of `hook_type`, including disabled files
    pub fn list(&self, hook_type: HookType) -> Vec<HookInfo> {
        self.entries(hook_type)
            .into_iter()
            .map(|e| {
                let (source, path) = match e.action {
                    Action::Builtin(_) => (HookSource::BuiltIn, None),
                    Action::External(path) => (HookSource::External, Some(path)),
                };
                HookInfo {
                    name: e.name,
                    full_name: e.full_name,
                    priority: e.priority,
                    source,
                    path,
                    enabled: e.enabled,
                }
            })
            .collect()
    }

    /// Create one directory per hook type under the hooks root
    pub fn ensure_directories(&self) -> Result<()> {
        for hook_type in HookType::ALL {
            let dir = self.hook_dir(hook_type);
            fs::create_dir_all(&dir).at("create hooks directory", &dir)?;
        }
        Ok(())
    }
}
