//! Host-backed fallback: a private temporary directory acting as the
//! sandbox filesystem, with volume bindings emulated by symlink or copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use walkdir::WalkDir;

use workbox_core::{Error, Result, VolumeBinding};

use crate::bridge::WslBridge;
use crate::path::PathResolver;

/// How a volume binding was realized under the private root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingOutcome {
    /// Symlink to the host path.
    Linked,
    /// Directory tree copied.
    CopiedDir,
    /// Single file copied.
    CopiedFile,
    /// Host path absent; an empty mount point was created.
    CreatedEmpty,
    /// Could not be realized at all.
    Skipped { reason: String },
}

impl BindingOutcome {
    pub fn is_visible(&self) -> bool {
        !matches!(self, BindingOutcome::Skipped { .. })
    }
}

/// A provisioned host fallback backend.
#[derive(Debug)]
pub struct HostBackend {
    dir: Option<TempDir>,
    root: PathBuf,
    bridge: Option<WslBridge>,
    bridge_root: Option<String>,
    bindings: Vec<(VolumeBinding, BindingOutcome)>,
}

impl HostBackend {
    /// Allocate the private root, resolve the bridge root and materialize
    /// bindings. Per-binding failures never fail provisioning.
    pub async fn provision(
        resolver: &PathResolver,
        bindings: &[VolumeBinding],
        bridge: Option<WslBridge>,
    ) -> Result<Self> {
        let dir = allocate_private_dir(resolver.work_dir(), None)?;
        let root = dir.path().to_path_buf();

        let bridge_root = match &bridge {
            Some(bridge) => bridge.resolve_root(&root).await,
            None => None,
        };

        let mut plan = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match resolver.host_path(&root, &binding.container_path) {
                Ok(mount_point) => plan.push((binding.clone(), Some(mount_point))),
                Err(e) => {
                    tracing::warn!(
                        host_path = %binding.host_path.display(),
                        container_path = %binding.container_path,
                        error = %e,
                        "skipping volume binding with invalid sandbox path"
                    );
                    plan.push((binding.clone(), None));
                }
            }
        }

        let outcomes = tokio::task::spawn_blocking(move || {
            plan.into_iter()
                .map(|(binding, mount_point)| {
                    let outcome = match mount_point {
                        Some(mount_point) => materialize_binding(&binding, &mount_point, true),
                        None => BindingOutcome::Skipped {
                            reason: "sandbox path escapes the sandbox root".to_string(),
                        },
                    };
                    (binding, outcome)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::internal(format!("binding task failed: {}", e)))?;

        tracing::info!(
            root = %root.display(),
            bridge_root = ?bridge_root,
            bindings = outcomes.len(),
            "Host sandbox directory provisioned"
        );

        Ok(Self {
            dir: Some(dir),
            root,
            bridge,
            bridge_root,
            bindings: outcomes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bridge(&self) -> Option<&WslBridge> {
        self.bridge.as_ref()
    }

    pub fn bridge_root(&self) -> Option<&str> {
        self.bridge_root.as_deref()
    }

    /// Where commands see the sandbox root: the bridge root when commands go
    /// through the bridge, else the private directory itself.
    pub fn exec_root(&self) -> String {
        match &self.bridge_root {
            Some(root) => root.clone(),
            None => self.root.to_string_lossy().into_owned(),
        }
    }

    pub fn binding_outcomes(&self) -> &[(VolumeBinding, BindingOutcome)] {
        &self.bindings
    }

    /// Hand over the private directory for removal.
    pub fn take_dir(&mut self) -> Option<TempDir> {
        self.dir.take()
    }
}

/// Create `sandbox_<basename(work_dir)>_<random>` under `base` (default:
/// the system temp directory).
pub fn allocate_private_dir(work_dir: &str, base: Option<&Path>) -> Result<TempDir> {
    let basename = work_dir
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root");
    let prefix = format!("sandbox_{}_", basename);

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).rand_bytes(8);
    let dir = match base {
        Some(base) => builder.tempdir_in(base),
        None => builder.tempdir(),
    };
    dir.map_err(|e| Error::creation("failed to allocate sandbox directory", e))
}

/// Realize one binding at `mount_point`. Prefers a symlink, then a copy of
/// the directory or file. Never writes into the host path.
pub(crate) fn materialize_binding(
    binding: &VolumeBinding,
    mount_point: &Path,
    try_link: bool,
) -> BindingOutcome {
    match try_materialize(binding, mount_point, try_link) {
        Ok(outcome) => {
            tracing::debug!(
                host_path = %binding.host_path.display(),
                mount_point = %mount_point.display(),
                outcome = ?outcome,
                "volume binding materialized"
            );
            outcome
        }
        Err(e) => {
            tracing::warn!(
                host_path = %binding.host_path.display(),
                container_path = %binding.container_path,
                error = %e,
                "skipping volume binding"
            );
            BindingOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    }
}

fn try_materialize(
    binding: &VolumeBinding,
    mount_point: &Path,
    try_link: bool,
) -> io::Result<BindingOutcome> {
    let source = std::path::absolute(&binding.host_path)?;
    if let Some(parent) = mount_point.parent() {
        fs::create_dir_all(parent)?;
    }

    if !source.exists() {
        fs::create_dir_all(mount_point)?;
        return Ok(BindingOutcome::CreatedEmpty);
    }

    // A stale file or link at the mount point is replaced; a directory is
    // merged into by the copy fallback.
    if let Ok(meta) = fs::symlink_metadata(mount_point) {
        if !meta.is_dir() {
            fs::remove_file(mount_point)?;
        }
    }

    if try_link {
        match symlink(&source, mount_point) {
            Ok(()) => return Ok(BindingOutcome::Linked),
            Err(e) => tracing::debug!(
                mount_point = %mount_point.display(),
                error = %e,
                "symlink failed, copying binding instead"
            ),
        }
    }

    if source.is_dir() {
        copy_dir(&source, mount_point)?;
        Ok(BindingOutcome::CopiedDir)
    } else {
        fs::copy(&source, mount_point)?;
        Ok(BindingOutcome::CopiedFile)
    }
}

#[cfg(unix)]
fn symlink(source: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink(source: &Path, link: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, link)
    } else {
        std::os::windows::fs::symlink_file(source, link)
    }
}

/// Recursively copy `src` into `dst`, merging with existing directories.
/// Symlinks inside the tree are copied as the files they point at;
/// symlinked directories are not followed.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() || entry.path().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        } else {
            tracing::debug!(path = %entry.path().display(), "not copying special file");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_dir_naming() {
        let base = tempfile::tempdir().unwrap();
        let a = allocate_private_dir("/workspace", Some(base.path())).unwrap();
        let b = allocate_private_dir("/workspace", Some(base.path())).unwrap();
        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sandbox_workspace_"), "{name}");

        let root = allocate_private_dir("/", Some(base.path())).unwrap();
        assert!(root
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sandbox_root_"));
    }

    #[test]
    fn test_bind_directory_by_link() {
        let host = tempfile::tempdir().unwrap();
        fs::write(host.path().join("input.csv"), "a,b\n1,2\n").unwrap();
        let sandbox = tempfile::tempdir().unwrap();
        let mount_point = sandbox.path().join("data");

        let binding = VolumeBinding::new(host.path(), "/data");
        let outcome = materialize_binding(&binding, &mount_point, true);

        assert!(outcome.is_visible());
        assert_eq!(
            fs::read_to_string(mount_point.join("input.csv")).unwrap(),
            "a,b\n1,2\n"
        );
    }

    #[test]
    fn test_bind_directory_by_copy() {
        let host = tempfile::tempdir().unwrap();
        fs::create_dir_all(host.path().join("nested")).unwrap();
        fs::write(host.path().join("nested/deep.txt"), "deep").unwrap();
        let sandbox = tempfile::tempdir().unwrap();
        let mount_point = sandbox.path().join("mnt").join("src");

        let binding = VolumeBinding::new(host.path(), "/mnt/src");
        let outcome = materialize_binding(&binding, &mount_point, false);

        assert_eq!(outcome, BindingOutcome::CopiedDir);
        assert!(!fs::symlink_metadata(&mount_point).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(mount_point.join("nested/deep.txt")).unwrap(),
            "deep"
        );

        // Writes to the copy never reach the host path.
        fs::write(mount_point.join("nested/deep.txt"), "changed").unwrap();
        assert_eq!(
            fs::read_to_string(host.path().join("nested/deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn test_bind_single_file_by_copy_replaces_stale_file() {
        let host = tempfile::tempdir().unwrap();
        let source = host.path().join("config.toml");
        fs::write(&source, "x = 1").unwrap();
        let sandbox = tempfile::tempdir().unwrap();
        let mount_point = sandbox.path().join("config.toml");
        fs::write(&mount_point, "stale").unwrap();

        let binding = VolumeBinding::new(&source, "/workspace/config.toml");
        let outcome = materialize_binding(&binding, &mount_point, false);

        assert_eq!(outcome, BindingOutcome::CopiedFile);
        assert_eq!(fs::read_to_string(&mount_point).unwrap(), "x = 1");
    }

    #[test]
    fn test_bind_missing_host_path_creates_empty_dir() {
        let sandbox = tempfile::tempdir().unwrap();
        let mount_point = sandbox.path().join("cache");
        let binding = VolumeBinding::new("/definitely/not/here/workbox", "/cache");

        let outcome = materialize_binding(&binding, &mount_point, true);

        assert_eq!(outcome, BindingOutcome::CreatedEmpty);
        assert!(mount_point.is_dir());
    }

    #[test]
    fn test_copy_dir_merges() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(dst.path().join("b.txt"), "b").unwrap();

        copy_dir(src.path(), dst.path()).unwrap();

        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.path().join("b.txt")).unwrap(), "b");
    }
}
