#![deny(unused)]
//! Sandboxed execution for Workbox.
//!
//! A [`Sandbox`] gives callers a working directory they can run shell
//! commands in and move text files through, without touching the rest of
//! the host. It is backed by a Docker container when the daemon answers,
//! and by a private host directory otherwise.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │  Sandbox (create / exec / files /      │
//! │           cleanup)                     │
//! │    ↓ PathResolver maps logical paths   │
//! ├───────────────────┬────────────────────┤
//! │  Container        │  Host fallback     │
//! │  ContainerRuntime │  private tempdir   │
//! │  (bollard) +      │  + bindings by     │
//! │  tar archives     │  symlink or copy   │
//! │    ↓ session      │    ↓ sh / WSL      │
//! ├───────────────────┴────────────────────┤
//! │  CommandRunner (bounded by timeout)    │
//! ├────────────────────────────────────────┤
//! │  teardown → CleanupReport              │
//! └────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use workbox_core::SandboxConfig;
//! use workbox_sandbox::Sandbox;
//!
//! let mut sandbox = Sandbox::new(SandboxConfig::default(), Vec::new()).await?;
//! sandbox.create().await?;
//! sandbox.write_file("/workspace/test.txt", "Hello from sandbox!").await?;
//! let output = sandbox.run_command("cat test.txt", None).await?;
//! sandbox.cleanup().await;
//! ```

pub mod archive;
pub mod backend;
pub mod bridge;
pub mod cleanup;
pub mod host;
pub mod path;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod session;

pub use backend::BackendKind;
pub use bridge::WslBridge;
pub use cleanup::{CleanupFailure, CleanupReport};
pub use host::BindingOutcome;
pub use path::PathResolver;
pub use runtime::{
    ContainerRuntime, ContainerSpec, DockerRuntime, ExecRequest, ExecResult, MockFailures,
    MockRuntime,
};
pub use sandbox::{Sandbox, SandboxState};
