//! `RefinementLoop`: bounded generate → validate → feedback → regenerate
//! iteration for a single draft rule (spec.md §4.6).

use crate::feedback::FeedbackComposer;
use crate::generator::RuleGenerator;
use crate::models::{DraftRule, GenerationRequest, PriorFailure, Rule, ValidationAttempt};
use crate::validator::RuleValidator;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct RefinementOutcome {
    pub validated: bool,
    pub rule: Rule,
    pub iterations: u32,
}

pub struct RefinementLoop {
    validator: Arc<RuleValidator>,
    generator: Arc<dyn RuleGenerator>,
    max_attempts: u32,
}

impl RefinementLoop {
    pub fn new(validator: Arc<RuleValidator>, generator: Arc<dyn RuleGenerator>, max_attempts: u32) -> Self {
        Self {
            validator,
            generator,
            max_attempts,
        }
    }

    pub async fn refine(
        &self,
        draft: DraftRule,
        policy_text: &str,
        firm_name: &str,
    ) -> RefinementOutcome {
        let rule_id = draft.rule_id.clone();
        let mut current = draft;
        let mut history: Vec<ValidationAttempt> = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            current.generation_attempt = attempt;

            let outcome = self.validator.validate(&current).await;
            let passed = outcome.passed();
            let test_output = outcome.test_output();
            let error = outcome.consolidated_error();
            let feedback_to_generator = if passed {
                None
            } else {
                Some(FeedbackComposer::compose(&outcome))
            };

            history.push(ValidationAttempt {
                attempt_number: attempt,
                passed,
                error,
                test_output,
                feedback_to_generator: feedback_to_generator.clone(),
                timestamp: Utc::now(),
            });

            if passed {
                info!(rule_id = %rule_id, attempts = attempt, "rule validated");
                return RefinementOutcome {
                    validated: true,
                    rule: into_rule(current, history),
                    iterations: attempt,
                };
            }

            if attempt >= self.max_attempts {
                break;
            }

            let last = history.last().expect("just pushed");
            let prior_failure = PriorFailure {
                code: current.code.clone(),
                error: last.error.clone().unwrap_or_default(),
                test_output: last.test_output.clone(),
            };

            let request = GenerationRequest {
                policy_text: policy_text.to_string(),
                firm_name: firm_name.to_string(),
                prior_failure: Some(prior_failure),
            };

            let regenerated = match self.generator.generate(&request).await {
                Ok(rules) => rules,
                Err(_) => break,
            };

            let Some(mut next) = regenerated.into_iter().next() else {
                break;
            };
            next.rule_id = rule_id.clone();
            current = next;
        }

        RefinementOutcome {
            validated: false,
            rule: into_rule(current, history),
            iterations: attempt,
        }
    }
}

fn into_rule(draft: DraftRule, validation_history: Vec<ValidationAttempt>) -> Rule {
    Rule {
        rule_id: draft.rule_id,
        rule_name: draft.rule_name,
        description: draft.description,
        policy_reference: draft.policy_reference,
        applies_to_roles: draft.applies_to_roles,
        code: draft.code,
        active: true,
        generation_attempt: draft.generation_attempt,
        validation_history,
    }
}
