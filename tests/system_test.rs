//! End-to-end checks from application config to a running sandbox.

use std::collections::HashMap;
use std::sync::Arc;

use workbox_core::{AppConfig, SandboxConfig};
use workbox_sandbox::{BackendKind, ContainerRuntime, MockRuntime, Sandbox, SandboxState};

fn app_config(bindings: HashMap<String, String>) -> AppConfig {
    AppConfig {
        sandbox: SandboxConfig {
            memory_limit: "256m".into(),
            cpu_limit: 0.5,
            ..Default::default()
        },
        bindings,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_config_bindings_reach_container_spec() {
    let data = tempfile::tempdir().unwrap();
    let mut bindings = HashMap::new();
    bindings.insert(
        data.path().to_string_lossy().into_owned(),
        "/mnt/data".to_string(),
    );
    let config = app_config(bindings);

    let runtime = Arc::new(MockRuntime::new());
    let mut sandbox = Sandbox::with_runtime(
        config.sandbox.clone(),
        config.volume_bindings(),
        Some(runtime.clone() as Arc<dyn ContainerRuntime>),
    )
    .await
    .unwrap();
    assert_eq!(sandbox.kind(), BackendKind::Container);
    assert_eq!(sandbox.config().memory_limit, "256m");
    sandbox.create().await.unwrap();

    let spec = &runtime.created_specs()[0];
    assert_eq!(spec.memory_bytes, 256 * 1024 * 1024);
    assert_eq!(spec.cpu_quota, 50_000);
    assert_eq!(spec.network_mode, "none");
    assert_eq!(
        spec.binds[1],
        format!("{}:/mnt/data:rw", data.path().display())
    );

    // Binding targets are addressable alongside the working directory.
    sandbox
        .write_file("/mnt/data/result.txt", "42")
        .await
        .unwrap();
    assert_eq!(sandbox.read_file("/mnt/data/result.txt").await.unwrap(), "42");

    assert!(sandbox.cleanup().await.is_clean());
}

#[tokio::test]
async fn test_config_bindings_in_host_fallback() {
    let data = tempfile::tempdir().unwrap();
    std::fs::write(data.path().join("model.txt"), "weights").unwrap();
    let mut bindings = HashMap::new();
    bindings.insert(
        data.path().to_string_lossy().into_owned(),
        "/workspace/inputs".to_string(),
    );
    let config = app_config(bindings);

    let mut sandbox = Sandbox::with_runtime(config.sandbox.clone(), config.volume_bindings(), None)
        .await
        .unwrap()
        .with_bridge(None);
    assert_eq!(sandbox.kind(), BackendKind::HostFallback);

    let content = sandbox
        .scoped(|sb| Box::pin(async move { sb.read_file("inputs/model.txt").await }))
        .await
        .unwrap();
    assert_eq!(content, "weights");
    assert_eq!(sandbox.state(), SandboxState::Destroyed);
    assert!(data.path().join("model.txt").is_file());
}
