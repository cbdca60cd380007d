//! `FeedbackComposer`: translates a `ValidationOutcome` into natural-language
//! guidance for the next generation attempt (spec.md §4.5). Pure function,
//! no classifier state.

use crate::models::ValidationOutcome;

pub struct FeedbackComposer;

impl FeedbackComposer {
    pub fn compose(outcome: &ValidationOutcome) -> String {
        let hint = match outcome {
            ValidationOutcome::SyntaxError { detail } => {
                format!("Fix syntax issues: {detail}")
            }
            ValidationOutcome::RuntimeError { detail } => {
                format!("Runtime failure: {detail}")
            }
            ValidationOutcome::ContractViolation { detail } => {
                format!("Logical/test failure: {detail}")
            }
            ValidationOutcome::SecurityRejected { pattern } => {
                format!("Security violation: forbidden pattern `{pattern}` detected")
            }
            ValidationOutcome::InfrastructureError { detail } => {
                format!("General validation error: {detail}")
            }
            ValidationOutcome::Passed { .. } => String::new(),
        };

        if hint.is_empty() {
            "Revise the rule and try again.".to_string()
        } else {
            hint
        }
    }
}
