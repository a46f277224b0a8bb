use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sandbox: SandboxConfig,
    /// Host path -> sandbox path.
    pub bindings: HashMap<String, String>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

/// Configuration for creating a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Container image to use (default: "python:3.12-slim").
    pub image: String,
    /// Logical working directory inside the sandbox.
    pub work_dir: String,
    /// Memory cap, either a byte count or a Docker-style size ("512m", "1g").
    pub memory_limit: String,
    /// CPU fraction (1.0 = one core).
    pub cpu_limit: f64,
    /// Attach a bridge network instead of `none`.
    pub network_enabled: bool,
    /// Default command timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "python:3.12-slim".to_string(),
            work_dir: "/workspace".to_string(),
            memory_limit: "512m".to_string(),
            cpu_limit: 1.0,
            network_enabled: false,
            timeout_secs: 300,
        }
    }
}

impl SandboxConfig {
    /// Check invariants the sandbox relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.work_dir.starts_with('/') {
            return Err(Error::internal(format!(
                "work_dir must be an absolute path, got '{}'",
                self.work_dir
            )));
        }
        if !(self.cpu_limit > 0.0) {
            return Err(Error::internal(format!(
                "cpu_limit must be positive, got {}",
                self.cpu_limit
            )));
        }
        self.memory_bytes()?;
        Ok(())
    }

    /// Memory cap in bytes.
    pub fn memory_bytes(&self) -> Result<i64> {
        parse_memory_limit(&self.memory_limit)
    }

    /// Default command timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parse a Docker-style memory size: `1024`, `512k`, `512m`, `1g`, `1gb`.
pub fn parse_memory_limit(raw: &str) -> Result<i64> {
    let s = raw.trim().to_ascii_lowercase();
    let s = s.strip_suffix('b').unwrap_or(&s);
    let (digits, multiplier) = match s.chars().last() {
        Some('k') => (&s[..s.len() - 1], 1024_i64),
        Some('m') => (&s[..s.len() - 1], 1024 * 1024),
        Some('g') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };
    let value: i64 = digits
        .trim()
        .parse()
        .map_err(|_| Error::internal(format!("invalid memory limit '{}'", raw)))?;
    if value <= 0 {
        return Err(Error::internal(format!("invalid memory limit '{}'", raw)));
    }
    value
        .checked_mul(multiplier)
        .ok_or_else(|| Error::internal(format!("memory limit '{}' overflows", raw)))
}

/// Mount mode for a volume binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    ReadWrite,
}

impl BindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindMode::ReadWrite => "rw",
        }
    }
}

/// Host path made visible at a logical path inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBinding {
    pub host_path: PathBuf,
    pub container_path: String,
    #[serde(default)]
    pub mode: BindMode,
}

impl VolumeBinding {
    pub fn new(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            mode: BindMode::ReadWrite,
        }
    }

    /// Docker `binds` entry: `host:container:mode`.
    pub fn to_bind_spec(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path.display(),
            self.container_path,
            self.mode.as_str()
        )
    }

    /// Build bindings from a `{host_path: sandbox_path}` mapping, sorted by
    /// host path so the order is stable.
    pub fn from_map(map: &HashMap<String, String>) -> Vec<Self> {
        let mut bindings: Vec<Self> = map
            .iter()
            .map(|(host, container)| Self::new(host, container.clone()))
            .collect();
        bindings.sort_by(|a, b| a.host_path.cmp(&b.host_path));
        bindings
    }
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("WORKBOX_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map WORKBOX__SANDBOX__IMAGE=alpine to sandbox.image
            .add_source(Environment::with_prefix("WORKBOX").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn volume_bindings(&self) -> Vec<VolumeBinding> {
        VolumeBinding::from_map(&self.bindings)
    }
}
