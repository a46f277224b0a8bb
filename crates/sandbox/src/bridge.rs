//! Linux-compatibility bridge (WSL) for host-backed sandboxes on Windows.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

/// Upper bound for a single path-translation call.
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the `wsl` launcher.
#[derive(Debug, Clone)]
pub struct WslBridge {
    program: PathBuf,
}

impl WslBridge {
    /// Locate the bridge. Only Windows hosts have one.
    pub fn detect() -> Option<Self> {
        if !cfg!(windows) {
            return None;
        }
        match which::which("wsl") {
            Ok(program) => Some(Self { program }),
            Err(e) => {
                tracing::debug!(error = %e, "wsl launcher not found");
                None
            }
        }
    }

    /// Use an explicit launcher binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Translate a host directory into the bridge's namespace.
    ///
    /// Tries `wslpath` directly, then through a login shell, then a manual
    /// drive-letter translation. `None` when every method fails.
    pub async fn resolve_root(&self, host_dir: &Path) -> Option<String> {
        let host = host_dir.to_string_lossy().into_owned();

        let direct = self
            .translate(&["wslpath".to_string(), "-a".to_string(), host.clone()])
            .await;
        if let Some(root) = direct {
            return Some(root);
        }

        let via_shell = self
            .translate(&[
                "bash".to_string(),
                "-lc".to_string(),
                format!("wslpath -a {}", shell_quote(&host)),
            ])
            .await;
        if let Some(root) = via_shell {
            return Some(root);
        }

        let manual = translate_drive_path(&host);
        if manual.is_none() {
            tracing::warn!(host_dir = %host, "could not translate sandbox root for the Linux bridge");
        }
        manual
    }

    async fn translate(&self, args: &[String]) -> Option<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);

        match tokio::time::timeout(TRANSLATE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!path.is_empty()).then_some(path)
            }
            Ok(Ok(output)) => {
                tracing::debug!(
                    status = ?output.status.code(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "wslpath translation failed"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "failed to launch wsl");
                None
            }
            Err(_) => {
                tracing::debug!("wslpath translation timed out");
                None
            }
        }
    }

    /// Build an invocation running `command` under a Linux shell, rooted at
    /// `root` inside the bridge.
    pub fn command(&self, root: &str, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("bash")
            .arg("-lc")
            .arg(format!("cd {} && {}", shell_quote(root), command));
        cmd
    }
}

/// `C:\Users\me\tmp` -> `/mnt/c/Users/me/tmp`.
pub fn translate_drive_path(host_path: &str) -> Option<String> {
    let normalized = host_path.replace('\\', "/");
    let mut chars = normalized.chars();
    let drive = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    if chars.next() != Some(':') {
        return None;
    }
    let rest = chars.as_str().trim_start_matches('/');
    let mut translated = format!("/mnt/{}", drive.to_ascii_lowercase());
    if !rest.is_empty() {
        translated.push('/');
        translated.push_str(rest);
    }
    Some(translated)
}

/// Quote a string for POSIX `sh` using single quotes.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_drive_path() {
        assert_eq!(
            translate_drive_path(r"C:\Users\me\AppData\Local\Temp\sandbox_workspace_1a2b"),
            Some("/mnt/c/Users/me/AppData/Local/Temp/sandbox_workspace_1a2b".to_string())
        );
        assert_eq!(translate_drive_path("D:/"), Some("/mnt/d".to_string()));
        assert_eq!(translate_drive_path("/tmp/sandbox"), None);
        assert_eq!(translate_drive_path(""), None);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/mnt/c/tmp"), "'/mnt/c/tmp'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_command_wraps_cd() {
        let bridge = WslBridge::with_program("wsl");
        let cmd = bridge.command("/mnt/c/tmp/sb", "python3 test.py");
        let std_cmd = cmd.as_std();
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["bash", "-lc", "cd '/mnt/c/tmp/sb' && python3 test.py"]);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_no_bridge_off_windows() {
        assert!(WslBridge::detect().is_none());
    }

    #[tokio::test]
    async fn test_resolve_root_falls_back_to_drive_translation() {
        // A launcher that always fails forces the manual translation.
        let bridge = WslBridge::with_program("/nonexistent/wsl-launcher");
        assert_eq!(
            bridge.resolve_root(Path::new(r"C:\tmp\sb")).await,
            Some("/mnt/c/tmp/sb".to_string())
        );
        assert_eq!(bridge.resolve_root(Path::new("/tmp/sb")).await, None);
    }
}
