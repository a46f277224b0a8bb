//! Best-effort teardown of everything a sandbox acquired.

use std::time::Duration;

use serde::Serialize;
use tempfile::TempDir;

use workbox_core::{Error, Result};

use crate::backend::Backend;
use crate::runner::CommandRunner;

/// One teardown step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub step: &'static str,
    pub message: String,
}

/// Outcome of a cleanup pass. Failures are collected, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub errors: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn record(&mut self, step: &'static str, result: Result<()>) {
        if let Err(e) = result {
            self.errors.push(CleanupFailure {
                step,
                message: e.to_string(),
            });
        }
    }

    /// Warn about each failed step.
    pub fn log(&self, sandbox: &str) {
        for failure in &self.errors {
            tracing::warn!(
                sandbox = %sandbox,
                step = failure.step,
                error = %failure.message,
                "Sandbox cleanup step failed"
            );
        }
    }
}

/// Release runner, container and private directories, in that order.
/// Every step runs even when an earlier one fails.
pub async fn teardown(
    runner: Option<CommandRunner>,
    backend: Option<Backend>,
    grace: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    if let Some(mut runner) = runner {
        report.record("close_session", runner.close());
    }

    match backend {
        Some(Backend::Container(mut container)) => {
            if let Some(id) = container.id.take() {
                report.record(
                    "stop_container",
                    container.runtime.stop_container(&id, grace).await,
                );
                report.record(
                    "remove_container",
                    container.runtime.remove_container(&id).await,
                );
            }
            if let Some(dir) = container.workspace.take() {
                report.record("remove_workspace", remove_dir(dir).await);
            }
        }
        Some(Backend::Host(mut host)) => {
            if let Some(dir) = host.take_dir() {
                report.record("remove_host_root", remove_dir(dir).await);
            }
        }
        None => {}
    }

    report
}

async fn remove_dir(dir: TempDir) -> Result<()> {
    tokio::task::spawn_blocking(move || dir.close())
        .await
        .map_err(|e| Error::internal(format!("cleanup task failed: {}", e)))?
        .map_err(Error::from)
}
