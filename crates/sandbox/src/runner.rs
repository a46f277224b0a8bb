//! Command execution against the active backend with a bounded timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use workbox_core::{Error, Result};

use crate::bridge::WslBridge;
use crate::runtime::{ContainerRuntime, ExecRequest, ExecResult};
use crate::session::ContainerSession;

pub enum CommandRunner {
    /// Commands go to a running container, through the attached session
    /// when there is one.
    Container {
        runtime: Arc<dyn ContainerRuntime>,
        container_id: String,
        work_dir: String,
        session: Option<ContainerSession>,
    },
    /// Commands run on the host, through the Linux bridge when a bridge
    /// root was resolved.
    Host {
        root: PathBuf,
        bridge: Option<(WslBridge, String)>,
    },
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandRunner::Container {
                container_id,
                session,
                ..
            } => f
                .debug_struct("Container")
                .field("container_id", container_id)
                .field("session", session)
                .finish(),
            CommandRunner::Host { root, bridge } => f
                .debug_struct("Host")
                .field("root", root)
                .field("bridge_root", &bridge.as_ref().map(|(_, r)| r))
                .finish(),
        }
    }
}

impl CommandRunner {
    /// Run `command`, giving up after `timeout`.
    ///
    /// Exceeding the timeout yields `Error::Timeout`; host processes are
    /// killed when the call is abandoned.
    pub async fn run(&self, command: &str, timeout: Duration) -> Result<ExecResult> {
        tracing::debug!(command = %command, timeout_secs = timeout.as_secs_f64(), "Running sandbox command");

        let execution = async {
            match self {
                CommandRunner::Container {
                    runtime,
                    container_id,
                    work_dir,
                    session,
                } => match session {
                    Some(session) if session.is_open() => session.run(command).await,
                    _ => {
                        let request = ExecRequest {
                            command: command.to_string(),
                            working_dir: Some(work_dir.clone()),
                            env: Vec::new(),
                        };
                        runtime.exec(container_id, &request).await
                    }
                },
                CommandRunner::Host { root, bridge } => {
                    let cmd = match bridge {
                        Some((bridge, bridge_root)) => bridge.command(bridge_root, command),
                        None => native_command(command, root),
                    };
                    run_process(cmd).await
                }
            }
        };

        match tokio::time::timeout(timeout, execution).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(command = %command, timeout_secs = timeout.as_secs_f64(), "Sandbox command timed out");
                Err(Error::timeout(command, timeout))
            }
        }
    }

    /// Close the attached session, if any.
    pub fn close(&mut self) -> Result<()> {
        match self {
            CommandRunner::Container {
                session: Some(session),
                ..
            } => session.close(),
            _ => Ok(()),
        }
    }
}

/// The host's own command interpreter, rooted at the private directory.
fn native_command(command: &str, root: &Path) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.current_dir(root);
    cmd
}

async fn run_process(mut cmd: Command) -> Result<ExecResult> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| Error::execution("failed to launch sandbox command", e))?;

    Ok(ExecResult {
        exit_code: output.status.code().map(i64::from).unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn host_runner(root: &std::path::Path) -> CommandRunner {
        CommandRunner::Host {
            root: root.to_path_buf(),
            bridge: None,
        }
    }

    #[tokio::test]
    async fn test_host_runner_uses_private_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = host_runner(dir.path());

        let result = runner
            .run("cat marker.txt; echo oops >&2; exit 3", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(result.stdout, "here");
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output(), "hereoops\n");
    }

    #[tokio::test]
    async fn test_host_runner_timeout_then_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let runner = host_runner(dir.path());

        let err = runner
            .run("sleep 5", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err}");

        let result = runner.run("echo again", Duration::from_secs(10)).await.unwrap();
        assert_eq!(result.stdout, "again\n");
    }

    #[tokio::test]
    async fn test_container_runner_without_session_uses_one_shot_exec() {
        use crate::runtime::{ContainerSpec, MockRuntime};

        let runtime = Arc::new(MockRuntime::new());
        let spec = ContainerSpec {
            name: "sandbox_runner".into(),
            image: "alpine".into(),
            work_dir: "/workspace".into(),
            hostname: "sandbox".into(),
            memory_bytes: 1 << 29,
            cpu_period: 100_000,
            cpu_quota: 100_000,
            network_mode: "none".into(),
            binds: vec![],
        };
        let id = runtime.create_container(&spec).await.unwrap();
        runtime.start_container(&id).await.unwrap();

        let runner = CommandRunner::Container {
            runtime: runtime.clone(),
            container_id: id,
            work_dir: "/workspace".into(),
            session: None,
        };
        let result = runner.run("pwd", Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.stdout, "/workspace\n");

        let err = runner
            .run("sleep 3", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { ref command, .. } if command == "sleep 3"));
    }
}
