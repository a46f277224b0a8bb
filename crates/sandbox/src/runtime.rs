//! Container runtime boundary.
//!
//! This module provides the `ContainerRuntime` trait, a Docker implementation
//! using the `bollard` crate, and an in-memory runtime for tests. The sandbox
//! only needs lifecycle calls, exec, and the two archive endpoints.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use workbox_core::{Error, Result};

// =============================================================================
// Runtime Types
// =============================================================================

/// Everything needed to create the sandbox container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Unique container name.
    pub name: String,
    pub image: String,
    pub work_dir: String,
    pub hostname: String,
    /// Absolute memory cap in bytes.
    pub memory_bytes: i64,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    /// `none` or `bridge`.
    pub network_mode: String,
    /// `host:container:mode` entries.
    pub binds: Vec<String>,
}

/// A command to run inside a container.
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub command: String,
    pub working_dir: Option<String>,
    /// `KEY=value` entries.
    pub env: Vec<String>,
}

impl ExecRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

/// Result of executing a command in the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecResult {
    /// Exit code of the command (-1 when unknown).
    pub exit_code: i64,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl ExecResult {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined output: stdout followed by stderr.
    pub fn output(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

// =============================================================================
// Container Runtime Trait
// =============================================================================

/// Operations the sandbox needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lightweight liveness probe.
    async fn ping(&self) -> bool;

    /// Create (but do not start) a container. Returns its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn start_container(&self, id: &str) -> Result<()>;

    /// Run a command through `sh -c` and collect its output.
    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecResult>;

    /// Stop with a grace period before the runtime kills the container.
    async fn stop_container(&self, id: &str, grace: Duration) -> Result<()>;

    /// Force-remove the container.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Tar stream of `path`. A missing path is `Error::NotFound`.
    async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>>;

    /// Extract a tar stream into the existing directory `dir`.
    async fn put_archive(&self, id: &str, dir: &str, archive: Vec<u8>) -> Result<()>;
}

// =============================================================================
// Docker Runtime Implementation
// =============================================================================

/// Docker Engine API client.
pub struct DockerRuntime {
    docker: bollard::Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon (socket, named pipe or DOCKER_HOST).
    pub fn connect() -> Result<Self> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            Error::execution("Failed to connect to Docker daemon. Is Docker running?", e)
        })?;
        Ok(Self { docker })
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        use bollard::container::{Config, CreateContainerOptions};
        use bollard::models::HostConfig;

        let host_config = HostConfig {
            memory: Some(spec.memory_bytes),
            cpu_period: Some(spec.cpu_period),
            cpu_quota: Some(spec.cpu_quota),
            network_mode: Some(spec.network_mode.clone()),
            binds: Some(spec.binds.clone()),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(vec![
                "tail".to_string(),
                "-f".to_string(),
                "/dev/null".to_string(),
            ]),
            hostname: Some(spec.hostname.clone()),
            working_dir: Some(spec.work_dir.clone()),
            tty: Some(true),
            host_config: Some(host_config),
            labels: Some(HashMap::from([(
                "managed-by".to_string(),
                "workbox".to_string(),
            )])),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| Error::execution("Failed to create sandbox container", e))?;

        for warning in &response.warnings {
            tracing::warn!(container = %spec.name, warning = %warning, "Docker create warning");
        }

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .map_err(|e| Error::execution("Failed to start sandbox container", e))
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecResult> {
        use bollard::container::LogOutput;
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let exec_options = CreateExecOptions {
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                request.command.clone(),
            ]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            working_dir: request.working_dir.clone(),
            env: (!request.env.is_empty()).then(|| request.env.clone()),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(id, exec_options)
            .await
            .map_err(|e| Error::execution("Failed to create exec in sandbox", e))?;

        let start_result = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| Error::execution("Failed to start exec in sandbox", e))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } = start_result {
            while let Some(msg) = output.next().await {
                match msg {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(_) => {} // ignore stdin echoes
                    Err(e) => {
                        return Err(Error::execution("Sandbox exec stream failed", e));
                    }
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| Error::execution("Failed to inspect exec result", e))?;

        Ok(ExecResult {
            exit_code: inspect.exit_code.unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<()> {
        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: grace.as_secs() as i64,
                }),
            )
            .await
            .map_err(|e| Error::execution("Failed to stop sandbox container", e))
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| Error::execution("Failed to remove sandbox container", e))
    }

    async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>> {
        use bollard::container::DownloadFromContainerOptions;

        let mut stream = std::pin::pin!(self
            .docker
            .download_from_container(id, Some(DownloadFromContainerOptions { path })));

        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => archive.extend_from_slice(&bytes),
                Err(e) if is_not_found(&e) => return Err(Error::not_found(path)),
                Err(e) => return Err(Error::execution("Failed to download archive", e)),
            }
        }
        Ok(archive)
    }

    async fn put_archive(&self, id: &str, dir: &str, archive: Vec<u8>) -> Result<()> {
        use bollard::container::UploadToContainerOptions;

        let options = UploadToContainerOptions {
            path: dir.to_string(),
            ..Default::default()
        };

        self.docker
            .upload_to_container(id, Some(options), bytes::Bytes::from(archive))
            .await
            .map_err(|e| Error::execution("Failed to upload archive", e))
    }
}

// =============================================================================
// Mock Runtime (for testing without Docker)
// =============================================================================

/// Failure switches for [`MockRuntime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MockFailures {
    pub create: bool,
    pub start: bool,
    pub stop: bool,
    pub remove: bool,
    /// `mkdir -p` commands time out.
    pub mkdir_timeout: bool,
}

#[derive(Debug, Default)]
struct MockContainer {
    name: String,
    running: bool,
    dirs: HashSet<String>,
    files: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    containers: HashMap<String, MockContainer>,
    specs: Vec<ContainerSpec>,
    commands: Vec<String>,
    removed: Vec<String>,
}

/// In-memory container runtime.
///
/// Archives are really packed and unpacked, so file round trips exercise
/// the same tar handling as Docker. Exec understands a handful of commands
/// (`mkdir -p`, `cat`, `echo`, `sleep`, `pwd`); anything else succeeds with
/// a canned message.
#[derive(Debug)]
pub struct MockRuntime {
    available: bool,
    failures: MockFailures,
    state: Mutex<MockState>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// A reachable runtime.
    pub fn new() -> Self {
        Self {
            available: true,
            failures: MockFailures::default(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// A runtime whose liveness probe fails.
    pub fn unreachable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_failures(mut self, failures: MockFailures) -> Self {
        self.failures = failures;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Specs of every container created so far.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.lock().specs.clone()
    }

    /// Names of containers that still exist.
    pub fn live_containers(&self) -> Vec<String> {
        self.lock()
            .containers
            .values()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Ids of force-removed containers.
    pub fn removed(&self) -> Vec<String> {
        self.lock().removed.clone()
    }

    /// Every command passed to exec, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Raw content of a file inside a container.
    pub fn file(&self, id: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .containers
            .get(id)
            .and_then(|c| c.files.get(path).cloned())
    }

    fn no_such_container(id: &str) -> Error {
        Error::execution_msg(format!("No such container: {}", id))
    }
}

fn add_dir_with_ancestors(dirs: &mut HashSet<String>, dir: &str) {
    let mut current = String::new();
    dirs.insert("/".to_string());
    for part in dir.split('/').filter(|p| !p.is_empty()) {
        current.push('/');
        current.push_str(part);
        dirs.insert(current.clone());
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ping(&self) -> bool {
        self.available
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        if self.failures.create {
            return Err(Error::execution_msg(format!(
                "No such image: {}",
                spec.image
            )));
        }
        let mut state = self.lock();
        if state.containers.values().any(|c| c.name == spec.name) {
            return Err(Error::execution_msg(format!(
                "Conflict: container name {} already in use",
                spec.name
            )));
        }
        state.next_id += 1;
        let id = format!("mock{:012x}", state.next_id);
        let mut dirs = HashSet::new();
        add_dir_with_ancestors(&mut dirs, &spec.work_dir);
        for bind in &spec.binds {
            if let Some(target) = bind.split(':').nth(1) {
                add_dir_with_ancestors(&mut dirs, target);
            }
        }
        state.containers.insert(
            id.clone(),
            MockContainer {
                name: spec.name.clone(),
                running: false,
                dirs,
                files: HashMap::new(),
            },
        );
        state.specs.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        if self.failures.start {
            return Err(Error::execution_msg("OCI runtime create failed"));
        }
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| Self::no_such_container(id))?;
        container.running = true;
        Ok(())
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecResult> {
        let command = request.command.trim().to_string();
        {
            let mut state = self.lock();
            state.commands.push(command.clone());
            match state.containers.get(id) {
                Some(c) if c.running => {}
                Some(_) => return Err(Error::execution_msg("container is not running")),
                None => return Err(Self::no_such_container(id)),
            }
        }

        if self.failures.mkdir_timeout && command.starts_with("mkdir -p ") {
            return Err(Error::timeout(command, Duration::from_secs(30)));
        }

        if let Some(secs) = command.strip_prefix("sleep ") {
            let secs: f64 = secs.trim().parse().unwrap_or(0.0);
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            return Ok(ExecResult::default());
        }

        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| Self::no_such_container(id))?;

        let result = if let Some(dir) = command.strip_prefix("mkdir -p ") {
            let dir = dir.trim().trim_matches('\'');
            add_dir_with_ancestors(&mut container.dirs, dir);
            ExecResult::default()
        } else if let Some(path) = command.strip_prefix("cat ") {
            match container.files.get(path.trim()) {
                Some(content) => ExecResult {
                    exit_code: 0,
                    stdout: String::from_utf8_lossy(content).into_owned(),
                    stderr: String::new(),
                },
                None => ExecResult {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: format!("cat: {}: No such file or directory\n", path.trim()),
                },
            }
        } else if let Some(text) = command.strip_prefix("echo ") {
            ExecResult {
                exit_code: 0,
                stdout: format!("{}\n", text),
                stderr: String::new(),
            }
        } else if command == "pwd" {
            ExecResult {
                exit_code: 0,
                stdout: format!("{}\n", request.working_dir.as_deref().unwrap_or("/")),
                stderr: String::new(),
            }
        } else {
            ExecResult {
                exit_code: 0,
                stdout: "[mock] command executed\n".to_string(),
                stderr: String::new(),
            }
        };
        Ok(result)
    }

    async fn stop_container(&self, id: &str, _grace: Duration) -> Result<()> {
        if self.failures.stop {
            return Err(Error::execution_msg("container did not stop in time"));
        }
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| Self::no_such_container(id))?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        if self.failures.remove {
            return Err(Error::execution_msg("removal of container is already in progress"));
        }
        let mut state = self.lock();
        state
            .containers
            .remove(id)
            .ok_or_else(|| Self::no_such_container(id))?;
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>> {
        let content = {
            let state = self.lock();
            let container = state
                .containers
                .get(id)
                .ok_or_else(|| Self::no_such_container(id))?;
            container
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::not_found(path))?
        };
        let name = path.rsplit('/').next().unwrap_or(path);
        crate::archive::pack(name, &content)
    }

    async fn put_archive(&self, id: &str, dir: &str, archive: Vec<u8>) -> Result<()> {
        let dir = dir.trim_end_matches('/');
        let mut extracted = Vec::new();
        let mut reader = tar::Archive::new(&archive[..]);
        let entries = reader
            .entries()
            .map_err(|e| Error::execution("Failed to upload archive", e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| Error::execution("Failed to upload archive", e))?;
            let name = entry
                .path()
                .map_err(|e| Error::execution("Failed to upload archive", e))?
                .to_string_lossy()
                .into_owned();
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| Error::execution("Failed to upload archive", e))?;
            extracted.push((format!("{}/{}", dir, name), content));
        }

        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(id)
            .ok_or_else(|| Self::no_such_container(id))?;
        let dir_key = if dir.is_empty() { "/" } else { dir };
        if !container.dirs.contains(dir_key) {
            return Err(Error::execution_msg(format!(
                "Could not find the file {} in container",
                dir_key
            )));
        }
        container.files.extend(extracted);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
