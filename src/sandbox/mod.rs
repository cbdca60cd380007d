//! `SandboxedExecutor`: an ephemeral, network-denied execution environment
//! used solely during rule validation (spec.md §4.2).
//!
//! The trait is a capability, not a binding to a specific vendor — the HTTP
//! adapter in [`http`] talks to a Daytona-shaped control plane, and
//! [`fake`] is an in-memory double used by tests, matching the
//! "capability injection over concrete clients" design note in spec.md §9.

pub mod fake;
pub mod http;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle(pub String);

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox creation failed: {0}")]
    Create(String),
    #[error("sandbox run failed: {0}")]
    Run(String),
    #[error("sandbox destroy failed: {0}")]
    Destroy(String),
}

/// Create, run, destroy — the three suspension points spec.md §5 names.
/// Any adapter must guarantee the handle is destroyed on every exit path,
/// including cancellation and error returns from `run`.
#[async_trait]
pub trait SandboxedExecutor: Send + Sync {
    async fn create_ephemeral(&self) -> Result<SandboxHandle, SandboxError>;

    async fn run(
        &self,
        handle: &SandboxHandle,
        program: &str,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError>;

    async fn destroy(&self, handle: SandboxHandle) -> Result<(), SandboxError>;
}
