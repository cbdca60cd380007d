//! Core data model shared across the ingestion pipeline and the evaluator.
//!
//! Mirrors the shapes in spec.md §3. Every type that crosses a process
//! boundary (persisted to disk, sent to a rule, or returned from the HTTP
//! API) derives `Serialize`/`Deserialize`, the same way the rest of the
//! codebase's model types do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A rule as emitted by the generator, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRule {
    pub rule_id: String,
    pub rule_name: String,
    pub description: String,
    pub policy_reference: String,
    #[serde(default)]
    pub applies_to_roles: HashSet<String>,
    pub code: String,
    /// How many generation attempts produced this draft (1 on first emission).
    #[serde(default = "default_attempt")]
    pub generation_attempt: u32,
}

fn default_attempt() -> u32 {
    1
}

impl DraftRule {
    /// `rule_id` non-empty and `code` non-empty, per spec.md §3.
    pub fn is_well_formed(&self) -> bool {
        !self.rule_id.trim().is_empty() && !self.code.trim().is_empty()
    }
}

/// Immutable record of one validation pass against a candidate rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAttempt {
    pub attempt_number: u32,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_to_generator: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A `DraftRule` that has completed the refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub rule_name: String,
    pub description: String,
    pub policy_reference: String,
    #[serde(default)]
    pub applies_to_roles: HashSet<String>,
    pub code: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub generation_attempt: u32,
    pub validation_history: Vec<ValidationAttempt>,
}

fn default_true() -> bool {
    true
}

impl Rule {
    /// Invariant: if stored, the last validation history entry passed.
    pub fn has_passed(&self) -> bool {
        self.validation_history
            .last()
            .map(|a| a.passed)
            .unwrap_or(false)
    }

    pub fn applies_to_role(&self, role: &str) -> bool {
        self.applies_to_roles.is_empty() || self.applies_to_roles.contains(role)
    }
}

/// Per-firm container of validated rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesBundle {
    pub firm_name: String,
    /// `YYYY-MM` stamp of the ingestion that produced this bundle.
    pub policy_version: String,
    pub last_updated: DateTime<Utc>,
    pub total_iterations: u32,
    pub rules: Vec<Rule>,
}

/// Discriminated outcome of one validation attempt. Exactly one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ValidationOutcome {
    Passed { test_output: String },
    SecurityRejected { pattern: String },
    SyntaxError { detail: String },
    RuntimeError { detail: String },
    ContractViolation { detail: String },
    InfrastructureError { detail: String },
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, ValidationOutcome::Passed { .. })
    }

    /// Single consolidated error message, or `None` when `Passed`.
    pub fn consolidated_error(&self) -> Option<String> {
        match self {
            ValidationOutcome::Passed { .. } => None,
            ValidationOutcome::SecurityRejected { pattern } => {
                Some(format!("forbidden pattern detected: {pattern}"))
            }
            ValidationOutcome::SyntaxError { detail }
            | ValidationOutcome::RuntimeError { detail }
            | ValidationOutcome::ContractViolation { detail }
            | ValidationOutcome::InfrastructureError { detail } => Some(detail.clone()),
        }
    }

    pub fn test_output(&self) -> Option<String> {
        match self {
            ValidationOutcome::Passed { test_output } => Some(test_output.clone()),
            _ => None,
        }
    }
}

/// An employee record. Open/extensible: unknown fields are preserved
/// verbatim so rule code that inspects firm-injected fields still sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    #[serde(default)]
    pub restricted_tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_trade: Option<bool>,
    #[serde(default)]
    pub coverage_stocks: Vec<String>,
    #[serde(default)]
    pub active_deals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm_restrictions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reference: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Requested action on a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Trade,
}

/// The security a trade question is about, plus optional market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub ticker: String,
    pub requested_action: TradeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_earnings_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_earnings_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_covered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_preapproval: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The return contract a rule's callable must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecutionResult {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_ref: Option<String>,
}

/// Aggregated allow/deny decision for one trade question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub policy_refs: Vec<String>,
    pub rules_checked: Vec<String>,
}

impl ComplianceVerdict {
    pub fn permit_all() -> Self {
        Self {
            allowed: true,
            ..Default::default()
        }
    }

    /// `reasons` and `policy_refs` are parallel arrays (spec.md §3): push
    /// both together, or neither, so index `i` always refers to the same
    /// denial in both lists.
    pub fn deny(&mut self, reason: Option<String>, policy_ref: Option<String>) {
        self.allowed = false;
        if let (Some(r), Some(p)) = (reason, policy_ref) {
            self.reasons.push(r);
            self.policy_refs.push(p);
        }
    }
}

/// A prior failure used to ask the generator to revise a single rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorFailure {
    pub code: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
}

/// Input to `RuleGenerator::generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub policy_text: String,
    pub firm_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_failure: Option<PriorFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rule_requires_id_and_code() {
        let mut d = DraftRule {
            rule_id: "x".into(),
            rule_name: "X".into(),
            description: String::new(),
            policy_reference: String::new(),
            applies_to_roles: HashSet::new(),
            code: "def rule(e,s,d): return {'allowed': True}".into(),
            generation_attempt: 1,
        };
        assert!(d.is_well_formed());
        d.code.clear();
        assert!(!d.is_well_formed());
    }

    #[test]
    fn rule_applies_to_role_universal_when_empty() {
        let rule = Rule {
            rule_id: "r".into(),
            rule_name: "R".into(),
            description: String::new(),
            policy_reference: String::new(),
            applies_to_roles: HashSet::new(),
            code: String::new(),
            active: true,
            generation_attempt: 1,
            validation_history: vec![],
        };
        assert!(rule.applies_to_role("Analyst"));
        assert!(rule.applies_to_role("anything"));
    }

    #[test]
    fn outcome_passed_has_no_consolidated_error() {
        let outcome = ValidationOutcome::Passed {
            test_output: "ok".into(),
        };
        assert!(outcome.passed());
        assert!(outcome.consolidated_error().is_none());
    }
}
