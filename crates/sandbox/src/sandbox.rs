//! The sandbox instance: one backend, its command runner and the file
//! operations exposed to callers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Serialize;

use workbox_core::{
    CommandPayload, Error, EventEmitter, EventEnvelope, EventSeverity, EventType, FsPayload,
    LifecyclePayload, Result, SandboxConfig, VolumeBinding,
};

use crate::archive;
use crate::backend::{container_name, container_spec, Backend, BackendKind, ContainerBackend};
use crate::bridge::{shell_quote, WslBridge};
use crate::cleanup::{teardown, CleanupReport};
use crate::host::{allocate_private_dir, copy_dir, BindingOutcome, HostBackend};
use crate::path::{split_parent, PathResolver};
use crate::runner::CommandRunner;
use crate::runtime::{ContainerRuntime, DockerRuntime, ExecResult};
use crate::session::ContainerSession;

/// Grace period given to the container before it is killed on cleanup.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Timeout for the directory preparation run before uploads.
const PREPARE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Uninitialized,
    Ready,
    Destroyed,
}

/// An isolated execution environment.
///
/// The backend is chosen once at construction: a container when the
/// runtime answers, otherwise a private host directory. [`Sandbox::create`]
/// provisions it and [`Sandbox::cleanup`] releases everything, whatever
/// state the instance is in.
pub struct Sandbox {
    config: SandboxConfig,
    bindings: Vec<VolumeBinding>,
    resolver: PathResolver,
    kind: BackendKind,
    state: SandboxState,
    name: String,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    bridge: Option<WslBridge>,
    backend: Option<Backend>,
    runner: Option<CommandRunner>,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl Sandbox {
    /// Build a sandbox against the local Docker daemon, falling back to the
    /// host when it cannot be reached.
    pub async fn new(config: SandboxConfig, bindings: Vec<VolumeBinding>) -> Result<Self> {
        let runtime: Option<Arc<dyn ContainerRuntime>> = match DockerRuntime::connect() {
            Ok(runtime) => Some(Arc::new(runtime)),
            Err(e) => {
                tracing::debug!(error = %e, "Docker client unavailable");
                None
            }
        };
        Self::with_runtime(config, bindings, runtime).await
    }

    /// Build a sandbox against an explicit runtime (`None` forces the host
    /// fallback).
    pub async fn with_runtime(
        config: SandboxConfig,
        bindings: Vec<VolumeBinding>,
        runtime: Option<Arc<dyn ContainerRuntime>>,
    ) -> Result<Self> {
        config.validate()?;
        let kind = BackendKind::select(runtime.as_deref()).await;
        let resolver = PathResolver::new(&config.work_dir, &bindings);

        tracing::debug!(backend = %kind, image = %config.image, "Sandbox backend selected");

        Ok(Self {
            config,
            bindings,
            resolver,
            kind,
            state: SandboxState::Uninitialized,
            name: container_name(),
            runtime: match kind {
                BackendKind::Container => runtime,
                BackendKind::HostFallback => None,
            },
            bridge: WslBridge::detect(),
            backend: None,
            runner: None,
            event_emitter: None,
        })
    }

    /// Override the Linux bridge used by the host fallback.
    pub fn with_bridge(mut self, bridge: Option<WslBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Set an event emitter for auditing.
    pub fn with_event_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.event_emitter = Some(emitter);
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    /// Container name, or the private directory's name in host mode once
    /// created.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Host directory backing the working directory.
    pub fn host_root(&self) -> Option<&Path> {
        match &self.backend {
            Some(Backend::Container(container)) => container.workspace(),
            Some(Backend::Host(host)) => Some(host.root()),
            None => None,
        }
    }

    /// The private root as seen through the Linux bridge.
    pub fn bridge_root(&self) -> Option<&str> {
        match &self.backend {
            Some(Backend::Host(host)) => host.bridge_root(),
            _ => None,
        }
    }

    /// How each binding was realized. Empty in container mode, where the
    /// runtime mounts them.
    pub fn binding_outcomes(&self) -> &[(VolumeBinding, BindingOutcome)] {
        match &self.backend {
            Some(Backend::Host(host)) => host.binding_outcomes(),
            _ => &[],
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Provision the backend. On failure everything acquired so far is
    /// released and the instance is left destroyed.
    pub async fn create(&mut self) -> Result<()> {
        match self.state {
            SandboxState::Uninitialized => {}
            SandboxState::Ready => return Err(Error::invalid_state("sandbox already created")),
            SandboxState::Destroyed => {
                return Err(Error::invalid_state("sandbox has been destroyed"))
            }
        }

        let provisioned = match self.kind {
            BackendKind::Container => self.create_container().await,
            BackendKind::HostFallback => self.create_host().await,
        };

        if let Err(e) = provisioned {
            tracing::error!(sandbox = %self.name, backend = %self.kind, error = %e, "Sandbox creation failed");
            let report = teardown(self.runner.take(), self.backend.take(), STOP_GRACE).await;
            report.log(&self.name);
            self.state = SandboxState::Destroyed;
            return Err(Error::creation(
                format!("failed to create {} sandbox", self.kind),
                e,
            ));
        }

        self.state = SandboxState::Ready;
        tracing::info!(
            sandbox = %self.name,
            backend = %self.kind,
            host_root = ?self.host_root(),
            "Sandbox created"
        );
        self.emit(
            EventType::SandboxCreated,
            EventSeverity::Info,
            LifecyclePayload {
                backend: self.kind.to_string(),
                errors: Vec::new(),
            },
        )
        .await;
        Ok(())
    }

    async fn create_container(&mut self) -> Result<()> {
        let runtime = self
            .runtime
            .clone()
            .ok_or_else(|| Error::internal("container backend selected without a runtime"))?;

        let workspace = allocate_private_dir(&self.config.work_dir, None)?;
        let spec = container_spec(&self.config, &self.bindings, &self.name, workspace.path())?;

        let mut container = ContainerBackend::new(runtime.clone(), self.name.clone(), workspace);
        let launched = container.launch(&spec).await;
        let id = container.id.clone();
        self.backend = Some(Backend::Container(container));
        launched?;

        let id = id.ok_or_else(|| Error::internal("container launched without an id"))?;
        let session = ContainerSession::attach(runtime.clone(), &id, &self.config.work_dir).await?;
        self.runner = Some(CommandRunner::Container {
            runtime,
            container_id: id,
            work_dir: self.config.work_dir.clone(),
            session: Some(session),
        });
        Ok(())
    }

    async fn create_host(&mut self) -> Result<()> {
        let host = HostBackend::provision(&self.resolver, &self.bindings, self.bridge.clone()).await?;

        if let Some(name) = host.root().file_name() {
            self.name = name.to_string_lossy().into_owned();
        }
        let bridge = match (host.bridge(), host.bridge_root()) {
            (Some(bridge), Some(root)) => Some((bridge.clone(), root.to_string())),
            _ => None,
        };
        self.runner = Some(CommandRunner::Host {
            root: host.root().to_path_buf(),
            bridge,
        });
        self.backend = Some(Backend::Host(host));
        Ok(())
    }

    /// Release the backend. Never fails: step failures are logged and
    /// returned in the report. Calling it again is a no-op.
    pub async fn cleanup(&mut self) -> CleanupReport {
        if self.state == SandboxState::Destroyed {
            return CleanupReport::default();
        }
        let was_ready = self.state == SandboxState::Ready;

        let report = teardown(self.runner.take(), self.backend.take(), STOP_GRACE).await;
        report.log(&self.name);
        self.state = SandboxState::Destroyed;

        if was_ready {
            tracing::info!(
                sandbox = %self.name,
                backend = %self.kind,
                failures = report.errors.len(),
                "Sandbox destroyed"
            );
            let severity = if report.is_clean() {
                EventSeverity::Info
            } else {
                EventSeverity::Warning
            };
            self.emit(
                EventType::SandboxDestroyed,
                severity,
                LifecyclePayload {
                    backend: self.kind.to_string(),
                    errors: report
                        .errors
                        .iter()
                        .map(|f| format!("{}: {}", f.step, f.message))
                        .collect(),
                },
            )
            .await;
        }
        report
    }

    /// Create, run `body`, then clean up whatever happened. The body's
    /// result is returned; cleanup problems are only logged.
    pub async fn scoped<T, F>(&mut self, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Sandbox) -> BoxFuture<'a, Result<T>>,
    {
        let result = match self.create().await {
            Ok(()) => body(&mut *self).await,
            Err(e) => Err(e),
        };
        self.cleanup().await;
        result
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run a shell command, returning combined stdout and stderr regardless
    /// of the exit code.
    pub async fn run_command(&self, command: &str, timeout: Option<Duration>) -> Result<String> {
        Ok(self.exec(command, timeout).await?.output())
    }

    /// Run a shell command with `timeout` (default: the configured one).
    pub async fn exec(&self, command: &str, timeout: Option<Duration>) -> Result<ExecResult> {
        let runner = self.runner()?;
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        let exec_root = self.exec_root();
        let translated = self.resolver.rewrite(command, exec_root.as_deref());

        let started = Instant::now();
        let outcome = runner.run(&translated, timeout).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(mut result) => {
                result.stdout = self
                    .resolver
                    .restore(&result.stdout, exec_root.as_deref())
                    .into_owned();
                result.stderr = self
                    .resolver
                    .restore(&result.stderr, exec_root.as_deref())
                    .into_owned();
                tracing::debug!(
                    sandbox = %self.name,
                    command = %command,
                    exit_code = result.exit_code,
                    duration_ms,
                    "Sandbox command finished"
                );
                self.emit(
                    EventType::CommandExecuted,
                    EventSeverity::Info,
                    CommandPayload {
                        command: command.to_string(),
                        exit_code: Some(result.exit_code),
                        duration_ms,
                    },
                )
                .await;
                Ok(result)
            }
            Err(Error::Timeout { timeout, .. }) => {
                self.emit(
                    EventType::CommandTimedOut,
                    EventSeverity::Warning,
                    CommandPayload {
                        command: command.to_string(),
                        exit_code: None,
                        duration_ms,
                    },
                )
                .await;
                Err(Error::timeout(command, timeout))
            }
            Err(e) => Err(e.into_execution(&format!("command failed: {}", command))),
        }
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Read a text file from the sandbox.
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::execution(format!("{} is not valid UTF-8", path), e))?;
        let content = match self.exec_root() {
            Some(root) => self.resolver.restore(&content, Some(&root)).into_owned(),
            None => content,
        };

        self.emit_fs("read", path, content.len()).await;
        Ok(content)
    }

    /// Write a text file into the sandbox, creating parent directories.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let content = match self.exec_root() {
            Some(root) => self.resolver.rewrite(content, Some(&root)).into_owned(),
            None => content.to_string(),
        };
        self.write_bytes(path, content.as_bytes().to_vec()).await?;

        tracing::debug!(sandbox = %self.name, path = %path, size = content.len(), "File written");
        self.emit_fs("write", path, content.len()).await;
        Ok(())
    }

    /// Copy a sandbox file out to `host_path`. The host fallback also copies
    /// directory trees.
    pub async fn copy_from(&self, sandbox_path: &str, host_path: impl AsRef<Path>) -> Result<()> {
        let host_path = host_path.as_ref();
        let source_dir = match self.backend()? {
            Backend::Container(_) => None,
            Backend::Host(host) => {
                let source = self.resolver.host_path(host.root(), sandbox_path)?;
                let meta = tokio::fs::metadata(&source)
                    .await
                    .map_err(|_| Error::not_found(sandbox_path))?;
                meta.is_dir().then_some(source)
            }
        };

        match source_dir {
            // Trees are copied as-is; only single files get path restoring.
            Some(source) => copy_host(source, host_path.to_path_buf())
                .await
                .map_err(|e| e.into_execution("copy from sandbox"))?,
            None => {
                let bytes = self.restore_bytes(self.read_bytes(sandbox_path).await?);
                ensure_parent(host_path).await?;
                tokio::fs::write(host_path, &bytes)
                    .await
                    .map_err(|e| Error::from(e).into_execution("copy from sandbox"))?;
            }
        }

        tracing::debug!(sandbox = %self.name, from = %sandbox_path, to = %host_path.display(), "Copied out of sandbox");
        self.emit_fs("copy_from", sandbox_path, 0).await;
        Ok(())
    }

    /// Copy a host file into the sandbox at `sandbox_path`. Directories are
    /// accepted by the host fallback only.
    pub async fn copy_to(&self, host_path: impl AsRef<Path>, sandbox_path: &str) -> Result<()> {
        let host_path = host_path.as_ref();
        let meta = tokio::fs::metadata(host_path)
            .await
            .map_err(|_| Error::not_found(host_path.display().to_string()))?;

        match self.backend()? {
            Backend::Container(_) if meta.is_dir() => {
                return Err(Error::execution_msg(format!(
                    "{} is a directory; only single files can be copied into a container",
                    host_path.display()
                )));
            }
            Backend::Host(host) if meta.is_dir() => {
                let target = self.resolver.host_path(host.root(), sandbox_path)?;
                copy_host(host_path.to_path_buf(), target)
                    .await
                    .map_err(|e| e.into_execution("copy to sandbox"))?;
            }
            _ => {
                let bytes = tokio::fs::read(host_path)
                    .await
                    .map_err(|e| Error::from(e).into_execution("copy to sandbox"))?;
                self.write_bytes(sandbox_path, self.rewrite_bytes(bytes))
                    .await?;
            }
        }

        tracing::debug!(sandbox = %self.name, from = %host_path.display(), to = %sandbox_path, "Copied into sandbox");
        self.emit_fs("copy_to", sandbox_path, meta.len() as usize).await;
        Ok(())
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        match self.backend()? {
            Backend::Container(container) => {
                let target = self.resolver.container_path(path)?;
                let archive = container
                    .runtime()
                    .get_archive(container.id()?, &target)
                    .await
                    .map_err(|e| e.into_execution(&format!("read {}", target)))?;
                archive::unpack_blocking(archive).await
            }
            Backend::Host(host) => {
                let target = self.resolver.host_path(host.root(), path)?;
                match tokio::fs::read(&target).await {
                    Ok(bytes) => Ok(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(Error::not_found(path))
                    }
                    Err(e) => Err(Error::from(e).into_execution(&format!("read {}", path))),
                }
            }
        }
    }

    async fn write_bytes(&self, path: &str, content: Vec<u8>) -> Result<()> {
        match self.backend()? {
            Backend::Container(container) => {
                let target = self.resolver.container_path(path)?;
                let (parent, name) = split_parent(&target)?;

                let prepared = self
                    .runner()?
                    .run(&format!("mkdir -p {}", shell_quote(&parent)), PREPARE_TIMEOUT)
                    .await
                    .map_err(|e| Error::execution(format!("failed to create {}", parent), e))?;
                if !prepared.success() {
                    return Err(Error::execution_msg(format!(
                        "failed to create {}: {}",
                        parent,
                        prepared.output().trim()
                    )));
                }

                let archive = archive::pack_blocking(name, content).await?;
                container
                    .runtime()
                    .put_archive(container.id()?, &parent, archive)
                    .await
                    .map_err(|e| e.into_execution(&format!("write {}", target)))
            }
            Backend::Host(host) => {
                let target = self.resolver.host_path(host.root(), path)?;
                ensure_parent(&target).await?;
                tokio::fs::write(&target, content)
                    .await
                    .map_err(|e| Error::from(e).into_execution(&format!("write {}", path)))
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SandboxState::Ready => Ok(()),
            SandboxState::Uninitialized => Err(Error::invalid_state("sandbox not created")),
            SandboxState::Destroyed => Err(Error::invalid_state("sandbox has been destroyed")),
        }
    }

    fn backend(&self) -> Result<&Backend> {
        self.ensure_ready()?;
        self.backend
            .as_ref()
            .ok_or_else(|| Error::invalid_state("sandbox has no backend"))
    }

    fn runner(&self) -> Result<&CommandRunner> {
        self.ensure_ready()?;
        self.runner
            .as_ref()
            .ok_or_else(|| Error::invalid_state("sandbox has no command runner"))
    }

    /// Where host-run commands see the working directory. `None` in
    /// container mode, where paths need no translation.
    fn exec_root(&self) -> Option<String> {
        match &self.backend {
            Some(Backend::Host(host)) => Some(host.exec_root()),
            _ => None,
        }
    }

    /// Restore working-directory paths in UTF-8 file content leaving a
    /// host-executed sandbox. Binary content is returned untouched.
    fn restore_bytes(&self, bytes: Vec<u8>) -> Vec<u8> {
        let Some(root) = self.exec_root() else {
            return bytes;
        };
        match String::from_utf8(bytes) {
            Ok(text) => self.resolver.restore(&text, Some(&root)).into_owned().into_bytes(),
            Err(e) => e.into_bytes(),
        }
    }

    /// Counterpart of [`Sandbox::restore_bytes`] for content coming in.
    fn rewrite_bytes(&self, bytes: Vec<u8>) -> Vec<u8> {
        let Some(root) = self.exec_root() else {
            return bytes;
        };
        match String::from_utf8(bytes) {
            Ok(text) => self.resolver.rewrite(&text, Some(&root)).into_owned().into_bytes(),
            Err(e) => e.into_bytes(),
        }
    }

    async fn emit_fs(&self, operation: &str, path: &str, size: usize) {
        let event_type = match operation {
            "read" | "copy_from" => EventType::FsRead,
            _ => EventType::FsWrite,
        };
        self.emit(
            event_type,
            EventSeverity::Debug,
            FsPayload {
                path: path.to_string(),
                operation: operation.to_string(),
                size_bytes: Some(size as u64),
            },
        )
        .await;
    }

    async fn emit(&self, event_type: EventType, severity: EventSeverity, payload: impl Serialize) {
        if let Some(emitter) = &self.event_emitter {
            let event = EventEnvelope::new(
                event_type,
                serde_json::to_value(payload).unwrap_or_default(),
            )
            .with_sandbox(&self.name)
            .with_actor("workbox_sandbox")
            .with_severity(severity);
            emitter.emit(event).await;
        }
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("backend", &self.backend)
            .finish()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if let Some(Backend::Container(container)) = &self.backend {
            if container.id.is_some() {
                tracing::warn!(
                    sandbox = %self.name,
                    "Sandbox dropped without cleanup; its container is still running"
                );
            }
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Copy a file or directory tree between host locations.
async fn copy_host(source: PathBuf, target: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if source.is_dir() {
            copy_dir(&source, &target)
        } else {
            std::fs::copy(&source, &target).map(|_| ())
        }
    })
    .await
    .map_err(|e| Error::internal(format!("copy task failed: {}", e)))?
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockFailures, MockRuntime};

    async fn mock_sandbox() -> (Sandbox, Arc<MockRuntime>) {
        let runtime = Arc::new(MockRuntime::new());
        let sandbox = Sandbox::with_runtime(
            SandboxConfig::default(),
            Vec::new(),
            Some(runtime.clone() as Arc<dyn ContainerRuntime>),
        )
        .await
        .unwrap();
        (sandbox, runtime)
    }

    #[tokio::test]
    async fn test_operations_require_ready_state() {
        let (mut sandbox, _) = mock_sandbox().await;
        assert_eq!(sandbox.state(), SandboxState::Uninitialized);
        assert!(matches!(
            sandbox.read_file("a.txt").await,
            Err(Error::InvalidState(_))
        ));

        sandbox.create().await.unwrap();
        assert!(matches!(sandbox.create().await, Err(Error::InvalidState(_))));

        sandbox.cleanup().await;
        assert!(matches!(
            sandbox.run_command("ls", None).await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(sandbox.create().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_container_write_creates_parent_then_uploads() {
        let (mut sandbox, runtime) = mock_sandbox().await;
        sandbox.create().await.unwrap();

        sandbox
            .write_file("reports/out.txt", "done")
            .await
            .unwrap();

        let commands = runtime.commands();
        assert!(commands.contains(&"mkdir -p '/workspace/reports'".to_string()));
        let id = runtime.live_containers();
        assert_eq!(id.len(), 1);
        assert_eq!(sandbox.read_file("/workspace/reports/out.txt").await.unwrap(), "done");

        sandbox.cleanup().await;
    }

    #[tokio::test]
    async fn test_container_write_reports_parent_timeout_as_execution_failure() {
        let runtime = Arc::new(MockRuntime::new().with_failures(MockFailures {
            mkdir_timeout: true,
            ..Default::default()
        }));
        let mut sandbox = Sandbox::with_runtime(
            SandboxConfig::default(),
            Vec::new(),
            Some(runtime.clone() as Arc<dyn ContainerRuntime>),
        )
        .await
        .unwrap();
        sandbox.create().await.unwrap();

        let err = sandbox.write_file("deep/out.txt", "x").await.unwrap_err();
        assert!(matches!(err, Error::Execution { .. }), "{err}");
        assert!(err.to_string().contains("/workspace/deep"), "{err}");
        assert_eq!(
            runtime.commands().last().map(String::as_str),
            Some("mkdir -p '/workspace/deep'")
        );

        sandbox.cleanup().await;
    }

    #[tokio::test]
    async fn test_container_paths_outside_workspace_are_rejected() {
        let (mut sandbox, _) = mock_sandbox().await;
        sandbox.create().await.unwrap();

        let err = sandbox.read_file("/etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::SecurityViolation(_)), "{err}");
        let err = sandbox.write_file("../escape.txt", "x").await.unwrap_err();
        assert!(matches!(err, Error::SecurityViolation(_)), "{err}");

        sandbox.cleanup().await;
    }

    #[tokio::test]
    async fn test_container_spec_uses_instance_name() {
        let (mut sandbox, runtime) = mock_sandbox().await;
        sandbox.create().await.unwrap();

        let specs = runtime.created_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, sandbox.name());
        let workspace = sandbox.host_root().unwrap().to_path_buf();
        assert_eq!(
            specs[0].binds[0],
            format!("{}:/workspace:rw", workspace.display())
        );

        sandbox.cleanup().await;
        assert!(!workspace.exists());
    }
}
