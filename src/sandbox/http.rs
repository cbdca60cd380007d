//! HTTP adapter over a Daytona-shaped sandbox control plane: create an
//! ephemeral, network-denied workspace, run a command in it, tear it down.

use super::{ExecOutput, SandboxError, SandboxHandle, SandboxedExecutor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct DaytonaSandbox {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    preserve: bool,
}

impl DaytonaSandbox {
    pub fn new(http: reqwest::Client, api_key: String, api_url: String, preserve: bool) -> Self {
        Self {
            http,
            api_key,
            api_url,
            preserve,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateWorkspaceRequest {
    network_access: &'static str,
    auto_stop_on_idle: bool,
}

#[derive(Debug, Deserialize)]
struct CreateWorkspaceResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct ExecRequest<'a> {
    command: &'a str,
    stdin: Option<&'a str>,
    timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct ExecResponse {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

#[async_trait]
impl SandboxedExecutor for DaytonaSandbox {
    async fn create_ephemeral(&self) -> Result<SandboxHandle, SandboxError> {
        let resp = self
            .http
            .post(format!("{}/workspaces", self.api_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&CreateWorkspaceRequest {
                network_access: "none",
                auto_stop_on_idle: true,
            })
            .send()
            .await
            .map_err(|e| SandboxError::Create(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SandboxError::Create(format!("{status}: {body}")));
        }

        let parsed: CreateWorkspaceResponse = resp
            .json()
            .await
            .map_err(|e| SandboxError::Create(format!("malformed create response: {e}")))?;

        Ok(SandboxHandle(parsed.id))
    }

    async fn run(
        &self,
        handle: &SandboxHandle,
        program: &str,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        let resp = self
            .http
            .post(format!("{}/workspaces/{}/exec", self.api_url, handle.0))
            .timeout(timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&ExecRequest {
                command: program,
                stdin,
                timeout_seconds: timeout.as_secs(),
            })
            .send()
            .await
            .map_err(|e| SandboxError::Run(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SandboxError::Run(format!("{status}: {body}")));
        }

        let parsed: ExecResponse = resp
            .json()
            .await
            .map_err(|e| SandboxError::Run(format!("malformed exec response: {e}")))?;

        Ok(ExecOutput {
            exit_code: parsed.exit_code,
            stdout: parsed.stdout,
            stderr: parsed.stderr,
        })
    }

    async fn destroy(&self, handle: SandboxHandle) -> Result<(), SandboxError> {
        if self.preserve {
            return Ok(());
        }
        let resp = self
            .http
            .delete(format!("{}/workspaces/{}", self.api_url, handle.0))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .send()
            .await
            .map_err(|e| SandboxError::Destroy(e.to_string()))?;

        if !resp.status().is_success() && resp.status().as_u16() != 404 {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SandboxError::Destroy(format!("{status}: {body}")));
        }
        Ok(())
    }
}
