//! `IngestionPipeline`: orchestrates initial generation, refines every
//! draft, and persists the resulting `RulesBundle` (spec.md §4.7).

use crate::error::EngineError;
use crate::generator::RuleGenerator;
use crate::models::{GenerationRequest, Rule, RulesBundle};
use crate::refinement::RefinementLoop;
use crate::store::RulesStore;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Summary of one rule's journey through refinement, returned to the caller
/// alongside the persisted bundle so the HTTP layer can report per-rule
/// attempts/validated status without re-reading the store.
#[derive(Debug)]
pub struct IngestedRuleSummary {
    pub rule_name: String,
    pub description: String,
    pub attempts: u32,
    pub validated: bool,
}

pub struct IngestionPipeline {
    generator: Arc<dyn RuleGenerator>,
    refinement: Arc<RefinementLoop>,
    store: Arc<RulesStore>,
    /// Per-firm ingestion lock: concurrent ingestions of the *same* firm
    /// serialize rather than interleave (spec.md §5's single-writer-per-firm
    /// discipline). Different firms ingest fully in parallel.
    firm_locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl IngestionPipeline {
    pub fn new(
        generator: Arc<dyn RuleGenerator>,
        refinement: Arc<RefinementLoop>,
        store: Arc<RulesStore>,
    ) -> Self {
        Self {
            generator,
            refinement,
            store,
            firm_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, firm_name: &str) -> Arc<AsyncMutex<()>> {
        self.firm_locks
            .entry(RulesStore::normalize(firm_name))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn ingest(
        &self,
        policy_text: &str,
        firm_name: &str,
    ) -> Result<(RulesBundle, Vec<IngestedRuleSummary>), EngineError> {
        let lock = self.lock_for(firm_name);
        let _guard = lock.lock().await;

        let request = GenerationRequest {
            policy_text: policy_text.to_string(),
            firm_name: firm_name.to_string(),
            prior_failure: None,
        };

        let drafts = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| EngineError::GenerationError(e.to_string()))?;

        for draft in &drafts {
            if !draft.is_well_formed() {
                return Err(EngineError::GenerationError(format!(
                    "generator returned malformed structured output: draft {:?} has an empty rule_id or code",
                    draft.rule_id
                )));
            }
        }

        let mut accepted: Vec<Rule> = Vec::new();
        let mut summaries: Vec<IngestedRuleSummary> = Vec::new();
        let mut total_iterations = 0u32;

        for draft in drafts {
            let rule_name = draft.rule_name.clone();
            let description = draft.description.clone();

            let outcome = self.refinement.refine(draft, policy_text, firm_name).await;
            total_iterations += outcome.iterations;

            summaries.push(IngestedRuleSummary {
                rule_name: rule_name.clone(),
                description,
                attempts: outcome.iterations,
                validated: outcome.validated,
            });

            if outcome.validated {
                accepted.push(outcome.rule);
            } else {
                warn!(
                    firm = firm_name,
                    rule_name = %rule_name,
                    attempts = outcome.iterations,
                    "rule dropped from bundle: failed to validate within the attempt budget"
                );
            }
        }

        let bundle = self
            .store
            .save(firm_name, accepted, total_iterations)
            .await
            .map_err(|e| EngineError::StoreError(e.to_string()))?;

        info!(
            firm = firm_name,
            rules_deployed = bundle.rules.len(),
            total_iterations,
            "ingestion complete"
        );

        Ok((bundle, summaries))
    }
}
