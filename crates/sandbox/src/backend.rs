//! Backend selection and container provisioning.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use workbox_core::{Error, Result, SandboxConfig, VolumeBinding};

use crate::host::HostBackend;
use crate::runtime::{ContainerRuntime, ContainerSpec};

/// CFS scheduler period, in microseconds, used to express the CPU quota.
pub const CPU_PERIOD: i64 = 100_000;

/// Docker rejects quotas below 1ms.
const MIN_CPU_QUOTA: i64 = 1_000;

/// Which substrate realizes a sandbox. Fixed for the instance's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Container,
    HostFallback,
}

impl BackendKind {
    /// Probe the runtime once: reachable means Container.
    pub async fn select(runtime: Option<&dyn ContainerRuntime>) -> Self {
        match runtime {
            Some(runtime) if runtime.ping().await => BackendKind::Container,
            Some(_) => {
                tracing::info!("Container runtime not reachable, using host fallback sandbox");
                BackendKind::HostFallback
            }
            None => BackendKind::HostFallback,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Container => write!(f, "container"),
            BackendKind::HostFallback => write!(f, "host"),
        }
    }
}

/// A sandbox container and the private host directory bound at the
/// working directory.
pub struct ContainerBackend {
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) name: String,
    pub(crate) id: Option<String>,
    pub(crate) workspace: Option<TempDir>,
}

impl ContainerBackend {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, name: String, workspace: TempDir) -> Self {
        Self {
            runtime,
            name,
            id: None,
            workspace: Some(workspace),
        }
    }

    /// Container id, once created.
    pub fn id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| Error::invalid_state("container was never created"))
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_ref().map(TempDir::path)
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Create then start the container. The id is kept as soon as it exists
    /// so a failed start can still be cleaned up.
    pub async fn launch(&mut self, spec: &ContainerSpec) -> Result<()> {
        let id = self.runtime.create_container(spec).await?;
        self.id = Some(id.clone());
        self.runtime.start_container(&id).await?;
        tracing::info!(
            container = %self.name,
            id = %id,
            image = %spec.image,
            "Sandbox container created and started"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ContainerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBackend")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("workspace", &self.workspace())
            .finish()
    }
}

#[derive(Debug)]
pub enum Backend {
    Container(ContainerBackend),
    Host(HostBackend),
}

/// `sandbox_<uuid>`; unique per instance.
pub fn container_name() -> String {
    format!("sandbox_{}", uuid::Uuid::new_v4().simple())
}

/// Container parameters: resource limits, network mode and binds. The
/// working directory is always bound read-write from `workspace`; caller
/// bindings follow.
pub fn container_spec(
    config: &SandboxConfig,
    bindings: &[VolumeBinding],
    name: &str,
    workspace: &Path,
) -> Result<ContainerSpec> {
    let cpu_quota = ((CPU_PERIOD as f64) * config.cpu_limit).round() as i64;

    let mut binds = Vec::with_capacity(bindings.len() + 1);
    binds.push(VolumeBinding::new(workspace, config.work_dir.clone()).to_bind_spec());
    binds.extend(bindings.iter().map(VolumeBinding::to_bind_spec));

    Ok(ContainerSpec {
        name: name.to_string(),
        image: config.image.clone(),
        work_dir: config.work_dir.clone(),
        hostname: "sandbox".to_string(),
        memory_bytes: config.memory_bytes()?,
        cpu_period: CPU_PERIOD,
        cpu_quota: cpu_quota.max(MIN_CPU_QUOTA),
        network_mode: if config.network_enabled {
            "bridge".to_string()
        } else {
            "none".to_string()
        },
        binds,
    })
}
