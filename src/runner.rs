//! `LocalRunner`: a fast, non-isolated executor used for steady-state
//! evaluation (spec.md §4.10). Rules have already passed sandbox
//! validation, so this trades isolation for throughput.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no usable runtime binary found (tried {primary} and fallback {fallback})")]
    RuntimeNotFound { primary: String, fallback: String },
    #[error("runtime spawn failed: {0}")]
    Spawn(String),
    #[error("runtime timed out after {0:?}")]
    Timeout(Duration),
    #[error("rule exited non-zero: {0}")]
    NonZeroExit(String),
    #[error("rule produced non-JSON output: {0}")]
    MalformedOutput(String),
}

/// A small program that reads `{employee, security, trade_date}` as JSON on
/// stdin, execs `code` in a fresh namespace, locates the first callable
/// defined in it, invokes it, and writes the result as a single JSON line
/// on stdout. The rule body itself is still base64-embedded (same reasoning
/// as the sandbox harness: no shell/quoting pitfalls) — only the per-call
/// payload travels over stdin, since steady-state evaluation runs far more
/// often than validation and stdin avoids re-spawning per payload shape.
fn local_runner_program(code: &str) -> String {
    format!(
        r#"import base64, json, sys, textwrap
src = base64.b64decode("{code_b64}").decode("utf-8")
src = textwrap.dedent(src)
payload = json.loads(sys.stdin.read())
ns = {{}}
exec(src, ns)
fn = None
for name, value in ns.items():
    if name.startswith("__"):
        continue
    if callable(value):
        fn = value
        break
if fn is None:
    raise RuntimeError("no callable defined in rule code")
result = fn(payload["employee"], payload["security"], payload["trade_date"])
print(json.dumps(result))
"#,
        code_b64 = STANDARD.encode(code.as_bytes()),
    )
}

pub struct LocalRunner {
    primary_bin: String,
    fallback_bin: String,
    timeout: Duration,
}

impl LocalRunner {
    pub fn new(primary_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            primary_bin: primary_bin.into(),
            fallback_bin: "python".to_string(),
            timeout,
        }
    }

    pub async fn run(&self, code: &str, payload: &Value) -> Result<String, RunnerError> {
        let program = local_runner_program(code);
        let stdin_payload = payload.to_string();

        let bin = match self.spawn_with_fallback(&program).await {
            Ok(child_and_bin) => child_and_bin,
            Err(e) => return Err(e),
        };

        self.exec(bin, stdin_payload).await
    }

    async fn spawn_with_fallback(&self, program: &str) -> Result<tokio::process::Child, RunnerError> {
        match spawn_python(&self.primary_bin, program) {
            Ok(child) => Ok(child),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                spawn_python(&self.fallback_bin, program).map_err(|e| {
                    if e.kind() == ErrorKind::NotFound {
                        RunnerError::RuntimeNotFound {
                            primary: self.primary_bin.clone(),
                            fallback: self.fallback_bin.clone(),
                        }
                    } else {
                        RunnerError::Spawn(e.to_string())
                    }
                })
            }
            Err(e) => Err(RunnerError::Spawn(e.to_string())),
        }
    }

    async fn exec(
        &self,
        mut child: tokio::process::Child,
        stdin_payload: String,
    ) -> Result<String, RunnerError> {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(stdin_payload.as_bytes()).await;
            drop(stdin);
        }

        let wait = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        let output = match wait {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RunnerError::Spawn(e.to_string())),
            Err(_) => {
                return Err(RunnerError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            );
            return Err(RunnerError::NonZeroExit(combined));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(RunnerError::MalformedOutput("empty stdout".to_string()));
        }
        Ok(stdout)
    }
}

fn spawn_python(bin: &str, program: &str) -> std::io::Result<tokio::process::Child> {
    Command::new(bin)
        .arg("-c")
        .arg(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "employee": {"id": "e1", "role": "Analyst", "restricted_tickers": ["AAPL"]},
            "security": {"ticker": "AAPL", "requested_action": "buy"},
            "trade_date": "2026-07-31",
        })
    }

    #[tokio::test]
    async fn runs_a_simple_rule_via_python() {
        if which_python().is_none() {
            eprintln!("skipping: no python interpreter available in this environment");
            return;
        }
        let runner = LocalRunner::new("python3", Duration::from_secs(5));
        let code = "def rule(e, s, d):\n    return {'allowed': s['ticker'] not in e['restricted_tickers']}\n";
        let result = runner.run(code, &payload()).await.unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["allowed"], false);
    }

    #[tokio::test]
    async fn falls_back_when_primary_binary_missing() {
        if which_python().is_none() {
            eprintln!("skipping: no python interpreter available in this environment");
            return;
        }
        let runner = LocalRunner {
            primary_bin: "definitely-not-a-real-binary".to_string(),
            fallback_bin: "python3".to_string(),
            timeout: Duration::from_secs(5),
        };
        let code = "def rule(e, s, d):\n    return {'allowed': True}\n";
        let result = runner.run(code, &payload()).await.unwrap();
        assert!(result.contains("true") || result.contains("True"));
    }

    #[tokio::test]
    async fn unknown_binaries_report_runtime_not_found() {
        let runner = LocalRunner {
            primary_bin: "definitely-not-a-real-binary".to_string(),
            fallback_bin: "also-not-real".to_string(),
            timeout: Duration::from_secs(5),
        };
        let code = "def rule(e, s, d):\n    return {'allowed': True}\n";
        let err = runner.run(code, &payload()).await.unwrap_err();
        assert!(matches!(err, RunnerError::RuntimeNotFound { .. }));
    }

    fn which_python() -> Option<()> {
        for bin in ["python3", "python"] {
            if std::process::Command::new(bin)
                .arg("--version")
                .output()
                .is_ok()
            {
                return Some(());
            }
        }
        None
    }
}
