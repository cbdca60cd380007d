//! In-memory `RuleGenerator` double for tests: returns a scripted sequence
//! of canned `DraftRule` lists, one per call to `generate`.

use super::{GeneratorError, RuleGenerator};
use crate::models::{DraftRule, GenerationRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Default)]
pub struct FakeRuleGenerator {
    script: Mutex<VecDeque<Result<Vec<DraftRule>, GeneratorError>>>,
    pub calls: Mutex<Vec<GenerationRequest>>,
}

impl FakeRuleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<Vec<DraftRule>, GeneratorError>) {
        self.script.lock().push_back(result);
    }
}

#[async_trait]
impl RuleGenerator for FakeRuleGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<DraftRule>, GeneratorError> {
        self.calls.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
