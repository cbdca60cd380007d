//! `RuleValidator`: two-phase validation (parse-check, then functional run
//! against the canonical fixture) of a candidate rule (spec.md §4.3).

use crate::models::{DraftRule, RuleExecutionResult, ValidationOutcome};
use crate::pyharness;
use crate::sandbox::{SandboxError, SandboxedExecutor};
use crate::screener::{ScreenResult, StaticScreener};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct RuleValidator {
    sandbox: Arc<dyn SandboxedExecutor>,
    syntax_timeout: Duration,
    functional_timeout: Duration,
}

impl RuleValidator {
    pub fn new(
        sandbox: Arc<dyn SandboxedExecutor>,
        syntax_timeout: Duration,
        functional_timeout: Duration,
    ) -> Self {
        Self {
            sandbox,
            syntax_timeout,
            functional_timeout,
        }
    }

    pub async fn validate(&self, draft: &DraftRule) -> ValidationOutcome {
        if let ScreenResult::Reject { pattern } = StaticScreener::screen(&draft.code) {
            warn!(rule_id = %draft.rule_id, pattern, "static screener rejected rule");
            return ValidationOutcome::SecurityRejected { pattern };
        }

        let handle = match self.sandbox.create_ephemeral().await {
            Ok(h) => h,
            Err(e) => return self.infra_error(e),
        };

        let outcome = self.run_phases(&handle, draft).await;

        if let Err(e) = self.sandbox.destroy(handle).await {
            warn!(rule_id = %draft.rule_id, error = %e, "sandbox destroy failed");
        }

        outcome
    }

    async fn run_phases(
        &self,
        handle: &crate::sandbox::SandboxHandle,
        draft: &DraftRule,
    ) -> ValidationOutcome {
        let syntax_program = pyharness::syntax_check_program(&draft.code);
        let syntax_result = self
            .sandbox
            .run(handle, &syntax_program, None, self.syntax_timeout)
            .await;

        let syntax_output = match syntax_result {
            Ok(output) => output,
            Err(e) => return self.infra_error(e),
        };

        if syntax_output.exit_code != 0 || !syntax_output.stdout.contains(pyharness::SYNTAX_OK) {
            return ValidationOutcome::SyntaxError {
                detail: format!("{}{}", syntax_output.stderr, syntax_output.stdout),
            };
        }

        let fixture = pyharness::canonical_fixture();
        let functional_program =
            pyharness::functional_check_program(&draft.code, &fixture.to_string());
        let functional_result = self
            .sandbox
            .run(handle, &functional_program, None, self.functional_timeout)
            .await;

        let output = match functional_result {
            Ok(output) => output,
            Err(e) => return self.infra_error(e),
        };

        if output.exit_code != 0 {
            return ValidationOutcome::RuntimeError {
                detail: format!("{}{}", output.stderr, output.stdout),
            };
        }

        let Some(json_text) = pyharness::extract_sentinel_json(&output.stdout) else {
            return ValidationOutcome::ContractViolation {
                detail: "rule output missing sentinel markers".to_string(),
            };
        };

        match serde_json::from_str::<RuleExecutionResult>(&json_text) {
            Ok(_) => {
                info!(rule_id = %draft.rule_id, "rule passed validation");
                ValidationOutcome::Passed {
                    test_output: json_text,
                }
            }
            Err(e) => ValidationOutcome::ContractViolation {
                detail: format!("rule output missing boolean `allowed`: {e}"),
            },
        }
    }

    fn infra_error(&self, e: SandboxError) -> ValidationOutcome {
        ValidationOutcome::InfrastructureError {
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::fake::{ok_output, FakeSandbox};
    use std::collections::HashSet;

    fn draft(code: &str) -> DraftRule {
        DraftRule {
            rule_id: "r1".into(),
            rule_name: "R1".into(),
            description: String::new(),
            policy_reference: "policy#1".into(),
            applies_to_roles: HashSet::new(),
            code: code.to_string(),
            generation_attempt: 1,
        }
    }

    #[tokio::test]
    async fn security_rejection_never_touches_sandbox() {
        let fake = Arc::new(FakeSandbox::new());
        let validator = RuleValidator::new(
            fake.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let outcome = validator.validate(&draft("import os\ndef rule(): pass")).await;
        assert!(matches!(outcome, ValidationOutcome::SecurityRejected { .. }));
        assert_eq!(fake.run_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(fake.outstanding_handles(), 0);
    }

    #[tokio::test]
    async fn syntax_error_short_circuits_functional_phase() {
        let fake = Arc::new(FakeSandbox::new());
        fake.push_run_result(Ok(crate::sandbox::ExecOutput {
            exit_code: 1,
            stdout: String::new(),
            stderr: "SyntaxError: invalid syntax".into(),
        }));
        let validator = RuleValidator::new(
            fake.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let outcome = validator.validate(&draft("def rule(:::")).await;
        assert!(matches!(outcome, ValidationOutcome::SyntaxError { .. }));
        assert_eq!(fake.run_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(fake.outstanding_handles(), 0);
    }

    #[tokio::test]
    async fn passes_when_contract_satisfied() {
        let fake = Arc::new(FakeSandbox::new());
        fake.push_run_result(Ok(ok_output(pyharness::SYNTAX_OK)));
        let body = format!(
            "{}\n{{\"allowed\": false, \"reason\": \"blocked\"}}\n{}",
            pyharness::OUTPUT_START,
            pyharness::OUTPUT_END
        );
        fake.push_run_result(Ok(ok_output(body)));
        let validator = RuleValidator::new(fake, Duration::from_secs(1), Duration::from_secs(1));
        let outcome = validator
            .validate(&draft("def rule(e, s, d):\n    return {'allowed': False}"))
            .await;
        assert!(outcome.passed());
    }

    #[tokio::test]
    async fn contract_violation_on_missing_allowed() {
        let fake = Arc::new(FakeSandbox::new());
        fake.push_run_result(Ok(ok_output(pyharness::SYNTAX_OK)));
        let body = format!(
            "{}\n{{\"not_allowed\": true}}\n{}",
            pyharness::OUTPUT_START,
            pyharness::OUTPUT_END
        );
        fake.push_run_result(Ok(ok_output(body)));
        let validator = RuleValidator::new(fake, Duration::from_secs(1), Duration::from_secs(1));
        let outcome = validator.validate(&draft("def rule(e, s, d): pass")).await;
        assert!(matches!(outcome, ValidationOutcome::ContractViolation { .. }));
    }
}
