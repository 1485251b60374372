//! Executable detection and interpreter dispatch for external hook scripts.

use std::fmt;
use std::fs::Metadata;
use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::HookError;

/// Decides whether a file in a hook directory should be run
pub trait ExecutableCheck: fmt::Debug {
    fn is_executable(&self, path: &Path, metadata: &Metadata) -> bool;
}

/// Unix rule: any execute permission bit is set
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionBits;

#[cfg(unix)]
impl ExecutableCheck for PermissionBits {
    fn is_executable(&self, _path: &Path, metadata: &Metadata) -> bool {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
}

/// Windows rule: the extension is on an allow-list
#[derive(Debug, Clone)]
pub struct ExtensionAllowList {
    extensions: Vec<String>,
}

impl ExtensionAllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn windows() -> Self {
        Self::new(["exe", "cmd", "bat", "ps1", "sh"])
    }
}

impl ExecutableCheck for ExtensionAllowList {
    fn is_executable(&self, path: &Path, _metadata: &Metadata) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// The check for the platform this binary was built for
pub fn platform_check() -> Box<dyn ExecutableCheck> {
    #[cfg(unix)]
    {
        Box::new(PermissionBits)
    }
    #[cfg(not(unix))]
    {
        Box::new(ExtensionAllowList::windows())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Build the command that runs `path`, choosing an interpreter by extension
///
/// - `.ps1`: `pwsh`, then `powershell`
/// - `.sh`/`.bash`: `bash`, then `sh` (Unix only)
/// - `.cmd`/`.bat`: `cmd /c` (Windows only)
/// - anything else is executed directly (shebang or native binary)
pub fn command_for(path: &Path) -> Result<Command, HookError> {
    let ext = extension_of(path).unwrap_or_default();

    match ext.as_str() {
        "ps1" => {
            let shell = which::which("pwsh")
                .or_else(|_| which::which("powershell"))
                .map_err(|_| HookError::InterpreterNotFound {
                    interpreter: "PowerShell",
                    hint: "install PowerShell Core (pwsh) to run .ps1 hooks",
                })?;
            let mut cmd = Command::new(shell);
            cmd.args(["-ExecutionPolicy", "Bypass", "-File"]).arg(path);
            Ok(cmd)
        }
        "sh" | "bash" => {
            let shell = match which::which("bash") {
                Ok(bash) => bash,
                Err(_) if cfg!(windows) => {
                    return Err(HookError::InterpreterNotFound {
                        interpreter: "bash",
                        hint: "install Git for Windows or WSL to run .sh hooks",
                    });
                }
                Err(_) => which::which("sh").map_err(|_| HookError::InterpreterNotFound {
                    interpreter: "sh",
                    hint: "no POSIX shell on PATH",
                })?,
            };
            let mut cmd = Command::new(shell);
            cmd.arg(path);
            Ok(cmd)
        }
        "cmd" | "bat" => {
            if cfg!(windows) {
                let mut cmd = Command::new("cmd");
                cmd.arg("/c").arg(path);
                Ok(cmd)
            } else {
                Err(HookError::UnsupportedPlatform {
                    extension: format!(".{}", ext),
                })
            }
        }
        _ => Ok(Command::new(path)),
    }
}

/// Run a command to completion, optionally killing it after `timeout`
pub fn run_to_completion(
    mut cmd: Command,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<(), HookError> {
    let mut child = cmd.spawn().map_err(|source| HookError::Spawn {
        path: path.display().to_string(),
        source,
    })?;

    let status = match timeout {
        None => child.wait(),
        Some(limit) => return wait_with_timeout(child, path, limit),
    }
    .map_err(|source| HookError::Spawn {
        path: path.display().to_string(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(HookError::ExitStatus { status })
    }
}

fn wait_with_timeout(mut child: Child, path: &Path, limit: Duration) -> Result<(), HookError> {
    const POLL: Duration = Duration::from_millis(25);
    let started = Instant::now();

    loop {
        let polled = child.try_wait().map_err(|source| HookError::Spawn {
            path: path.display().to_string(),
            source,
        })?;

        if let Some(status) = polled {
            return if status.success() {
                Ok(())
            } else {
                Err(HookError::ExitStatus { status })
            };
        }

        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(HookError::TimedOut { limit });
        }

        thread::sleep(POLL);
    }
}
