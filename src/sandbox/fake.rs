//! In-memory `SandboxedExecutor` double for tests. Returns a scripted
//! sequence of `run` results; `create`/`destroy` always succeed and record
//! how many handles are outstanding so tests can assert every handle was
//! destroyed (spec.md §4.2's "never leak handles" requirement).

use super::{ExecOutput, SandboxError, SandboxHandle, SandboxedExecutor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct FakeSandbox {
    script: Mutex<VecDeque<Result<ExecOutput, SandboxError>>>,
    next_id: AtomicUsize,
    outstanding: AtomicUsize,
    pub run_calls: AtomicUsize,
}

impl FakeSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `run` call.
    pub fn push_run_result(&self, result: Result<ExecOutput, SandboxError>) {
        self.script.lock().push_back(result);
    }

    pub fn outstanding_handles(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

pub fn ok_output(stdout: impl Into<String>) -> ExecOutput {
    ExecOutput {
        exit_code: 0,
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

#[async_trait]
impl SandboxedExecutor for FakeSandbox {
    async fn create_ephemeral(&self) -> Result<SandboxHandle, SandboxError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(SandboxHandle(format!("fake-{id}")))
    }

    async fn run(
        &self,
        _handle: &SandboxHandle,
        _program: &str,
        _stdin: Option<&str>,
        _timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ok_output("")))
    }

    async fn destroy(&self, _handle: SandboxHandle) -> Result<(), SandboxError> {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub type SharedFakeSandbox = Arc<FakeSandbox>;
