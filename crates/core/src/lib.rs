#![deny(unused)]
//! Core types and error definitions for Workbox.
//!
//! This crate provides the building blocks shared by the sandbox engine and
//! the `workbox` binary: the error type, sandbox configuration, path policy,
//! audit events and logging setup.

pub mod config;
pub mod error;
pub mod events;
pub mod fs_policy;
pub mod tracing_layer;

pub use config::{AppConfig, BindMode, SandboxConfig, VolumeBinding};
pub use error::{BoxError, Error, Result};
pub use events::*;
pub use tracing_layer::configure_tracing;
