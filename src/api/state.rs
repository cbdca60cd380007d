//! Shared application state injected into every handler via `State`.

use crate::employees::EmployeeDirectory;
use crate::evaluator::ComplianceEvaluator;
use crate::ingestion::IngestionPipeline;
use crate::store::RulesStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionPipeline>,
    pub evaluator: Arc<ComplianceEvaluator>,
    pub store: Arc<RulesStore>,
    pub employees: Arc<EmployeeDirectory>,
}
