//! Command session attached to a running sandbox container.

use std::sync::Arc;

use workbox_core::{Error, Result};

use crate::runtime::{ContainerRuntime, ExecRequest, ExecResult};

/// Environment every session command runs with.
pub const SESSION_ENV: &[(&str, &str)] = &[("PYTHONUNBUFFERED", "1")];

/// Runs commands in one container with a fixed working directory and
/// environment.
pub struct ContainerSession {
    runtime: Arc<dyn ContainerRuntime>,
    container_id: String,
    working_dir: String,
    env: Vec<String>,
    open: bool,
}

impl std::fmt::Debug for ContainerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSession")
            .field("container_id", &self.container_id)
            .field("working_dir", &self.working_dir)
            .field("open", &self.open)
            .finish()
    }
}

impl ContainerSession {
    /// Attach to a started container, checking that it accepts commands.
    pub async fn attach(
        runtime: Arc<dyn ContainerRuntime>,
        container_id: &str,
        working_dir: &str,
    ) -> Result<Self> {
        let session = Self {
            runtime,
            container_id: container_id.to_string(),
            working_dir: working_dir.to_string(),
            env: SESSION_ENV
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect(),
            open: true,
        };

        let probe = session.run("true").await?;
        if !probe.success() {
            return Err(Error::execution_msg(format!(
                "container {} rejected the session probe (exit code {})",
                container_id, probe.exit_code
            )));
        }
        tracing::debug!(container = %container_id, working_dir = %working_dir, "Session attached");
        Ok(session)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub async fn run(&self, command: &str) -> Result<ExecResult> {
        if !self.open {
            return Err(Error::invalid_state("session is closed"));
        }
        let request = ExecRequest {
            command: command.to_string(),
            working_dir: Some(self.working_dir.clone()),
            env: self.env.clone(),
        };
        self.runtime.exec(&self.container_id, &request).await
    }

    /// Detach. Further commands fail; closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            tracing::debug!(container = %self.container_id, "Session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ContainerSpec, MockRuntime};

    async fn started(runtime: &MockRuntime) -> String {
        let spec = ContainerSpec {
            name: "sandbox_session".into(),
            image: "python:3.12-slim".into(),
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
        id
    }

    #[tokio::test]
    async fn test_session_runs_in_working_dir() {
        let runtime = Arc::new(MockRuntime::new());
        let id = started(&runtime).await;

        let session = ContainerSession::attach(runtime.clone(), &id, "/workspace")
            .await
            .unwrap();
        let result = session.run("pwd").await.unwrap();
        assert_eq!(result.stdout.trim(), "/workspace");
        assert_eq!(runtime.commands(), vec!["true", "pwd"]);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_commands() {
        let runtime = Arc::new(MockRuntime::new());
        let id = started(&runtime).await;

        let mut session = ContainerSession::attach(runtime, &id, "/workspace")
            .await
            .unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(!session.is_open());
        assert!(matches!(session.run("ls").await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_attach_fails_on_stopped_container() {
        let runtime = Arc::new(MockRuntime::new());
        let id = started(&runtime).await;
        runtime
            .stop_container(&id, std::time::Duration::from_secs(1))
            .await
            .unwrap();

        assert!(ContainerSession::attach(runtime, &id, "/workspace").await.is_err());
    }
}
