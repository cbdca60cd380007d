//! `ComplianceEvaluator`: applies a firm's validated rule bundle to one
//! employee/security/trade-date question (spec.md §4.9).

use crate::models::{ComplianceVerdict, Employee, RuleExecutionResult, Security};
use crate::runner::LocalRunner;
use crate::store::RulesStore;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub struct ComplianceEvaluator {
    store: Arc<RulesStore>,
    runner: Arc<LocalRunner>,
}

impl ComplianceEvaluator {
    pub fn new(store: Arc<RulesStore>, runner: Arc<LocalRunner>) -> Self {
        Self { store, runner }
    }

    /// No short-circuit: every active, role-applicable rule always runs, even
    /// after an earlier rule has already denied (spec.md §4.9's aggregation
    /// is AND-across-rules, and the caller gets every reason that applies).
    pub async fn evaluate(
        &self,
        firm_name: &str,
        employee: &Employee,
        security: &Security,
        trade_date: &str,
    ) -> Result<ComplianceVerdict, crate::store::StoreError> {
        let bundle = match self.store.load(firm_name).await? {
            Some(bundle) => bundle,
            None => return Ok(ComplianceVerdict::permit_all()),
        };

        let mut verdict = ComplianceVerdict::permit_all();
        let payload = json!({
            "employee": employee,
            "security": security,
            "trade_date": trade_date,
        });

        for rule in &bundle.rules {
            if !rule.active {
                continue;
            }
            if !rule.applies_to_role(&employee.role) {
                continue;
            }

            verdict.rules_checked.push(rule.rule_name.clone());

            match self.runner.run(&rule.code, &payload).await {
                Ok(stdout) => match serde_json::from_str::<RuleExecutionResult>(&stdout) {
                    Ok(result) if !result.allowed => {
                        let reason = result
                            .reason
                            .unwrap_or_else(|| format!("Denied by rule {}", rule.rule_name));
                        let policy_ref = result.policy_ref.unwrap_or_else(|| rule.policy_reference.clone());
                        verdict.deny(Some(reason), Some(policy_ref));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(rule = %rule.rule_name, error = %e, "rule produced unparseable output");
                        verdict.deny(
                            Some(format!(
                                "Rule {} execution failed: malformed output ({e})",
                                rule.rule_name
                            )),
                            Some(rule.policy_reference.clone()),
                        );
                    }
                },
                Err(e) => {
                    warn!(rule = %rule.rule_name, error = %e, "rule execution failed");
                    verdict.deny(
                        Some(format!("Rule {} execution failed: {e}", rule.rule_name)),
                        Some(rule.policy_reference.clone()),
                    );
                }
            }
        }

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rule, TradeAction};
    use serde_json::Map;
    use std::collections::HashSet;
    use std::time::Duration;

    fn employee() -> Employee {
        Employee {
            id: "EMP001".into(),
            role: "Analyst".into(),
            division: None,
            tier: Some(2),
            restricted_tickers: vec!["AAPL".into()],
            can_trade: Some(true),
            coverage_stocks: vec![],
            active_deals: vec![],
            firm_restrictions: None,
            quick_reference: None,
            extra: Map::new(),
        }
    }

    fn security(ticker: &str) -> Security {
        Security {
            ticker: ticker.into(),
            requested_action: TradeAction::Buy,
            earnings_date: None,
            next_earnings_date: None,
            last_earnings_date: None,
            market_cap: None,
            is_covered: None,
            requires_preapproval: None,
            extra: Map::new(),
        }
    }

    fn rule(name: &str, code: &str, roles: HashSet<String>) -> Rule {
        Rule {
            rule_id: name.to_string(),
            rule_name: name.to_string(),
            description: String::new(),
            policy_reference: format!("policy#{name}"),
            applies_to_roles: roles,
            code: code.to_string(),
            active: true,
            generation_attempt: 1,
            validation_history: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_firm_permits_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RulesStore::new(dir.path()));
        let runner = Arc::new(LocalRunner::new("python3", Duration::from_secs(5)));
        let evaluator = ComplianceEvaluator::new(store, runner);

        let verdict = evaluator
            .evaluate("Nobody Inc", &employee(), &security("AAPL"), "2026-07-31")
            .await
            .unwrap();

        assert!(verdict.allowed);
        assert!(verdict.rules_checked.is_empty());
    }

    #[tokio::test]
    async fn inactive_and_non_applicable_rules_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RulesStore::new(dir.path()));

        let mut inactive = rule("inactive", "def rule(e,s,d): return {'allowed': False}", HashSet::new());
        inactive.active = false;
        let mut trader_only = rule(
            "trader_only",
            "def rule(e,s,d): return {'allowed': False}",
            HashSet::new(),
        );
        trader_only.applies_to_roles = HashSet::from(["Trader".to_string()]);

        store
            .save("Acme", vec![inactive, trader_only], 1)
            .await
            .unwrap();

        let runner = Arc::new(LocalRunner::new("python3", Duration::from_secs(5)));
        let evaluator = ComplianceEvaluator::new(store, runner);
        let verdict = evaluator
            .evaluate("Acme", &employee(), &security("AAPL"), "2026-07-31")
            .await
            .unwrap();

        assert!(verdict.allowed);
        assert!(verdict.rules_checked.is_empty());
    }
}
