//! `RuleGenerator`: produces structured `DraftRule`s from policy prose
//! (spec.md §4.4). A capability, not a binding to a specific vendor.

pub mod anthropic;
pub mod fake;

use crate::models::{DraftRule, GenerationRequest};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator request failed: {0}")]
    Transport(String),
    #[error("generator returned malformed structured output: {0}")]
    MalformedOutput(String),
}

#[async_trait]
pub trait RuleGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<DraftRule>, GeneratorError>;
}

/// The system prompt shared by every generation call: the Employee/Security
/// schema, enforcement conventions, and the required callable shape
/// (spec.md §4.4, "Prompt contract").
pub const SYSTEM_PROMPT: &str = r#"You translate compliance policy text into executable Python rules.

Schema:
- employee: {id, role, division?, tier? (1 = most restricted), restricted_tickers,
  can_trade?, coverage_stocks, active_deals, firm_restrictions?, quick_reference?}
- security: {ticker, requested_action (buy|sell|trade), earnings_date?,
  next_earnings_date?, last_earnings_date?, market_cap?, is_covered?,
  requires_preapproval?}

Conventions:
- restricted_tickers is an absolute block, regardless of role or tier.
- coverage_stocks require pre-approval before trading.
- tier 1 is the most restricted tier; higher numbers are less restricted.

Each rule's `code` must define exactly one callable taking
(employee, security, trade_date) and returning a mapping
{allowed: bool, reason?: str, policy_ref?: str}, using only the standard
library. Emit a JSON array of rules matching the DraftRule schema."#;
