//! HTTP adapter over Anthropic's messages API, pinned to minimum
//! temperature for reproducibility (spec.md §4.4).

use super::{GeneratorError, RuleGenerator, SYSTEM_PROMPT};
use crate::models::{DraftRule, GenerationRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct AnthropicGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }

    fn user_prompt(request: &GenerationRequest) -> String {
        match &request.prior_failure {
            None => format!(
                "Firm: {}\n\nPolicy text:\n{}",
                request.firm_name, request.policy_text
            ),
            Some(failure) => format!(
                "Firm: {}\n\nPolicy text:\n{}\n\nThe following rule failed validation and must be revised while preserving its intent:\n\ncode:\n{}\n\nerror:\n{}\n\ntest_output:\n{}",
                request.firm_name,
                request.policy_text,
                failure.code,
                failure.error,
                failure.test_output.as_deref().unwrap_or(""),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl RuleGenerator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<DraftRule>, GeneratorError> {
        let body = MessagesRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Self::user_prompt(request),
            }],
            max_tokens: 4096,
            temperature: 0.0,
        };

        let resp = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .timeout(Duration::from_secs(60))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GeneratorError::Transport(format!("{status}: {text}")));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| GeneratorError::MalformedOutput(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        parse_draft_rules(&text)
    }
}

/// Parses the model's structured JSON array response into `DraftRule`s,
/// tolerating a fenced code block around the JSON.
fn parse_draft_rules(text: &str) -> Result<Vec<DraftRule>, GeneratorError> {
    let trimmed = text.trim();
    let json_slice = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    serde_json::from_str(json_slice)
        .map_err(|e| GeneratorError::MalformedOutput(format!("{e}: {json_slice}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_array() {
        let text = r#"[{"rule_id":"r1","rule_name":"R1","description":"d","policy_reference":"p","applies_to_roles":[],"code":"def rule(e,s,d): return {'allowed': True}"}]"#;
        let rules = parse_draft_rules(text).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_id, "r1");
    }

    #[test]
    fn parses_fenced_json_array() {
        let text = "```json\n[{\"rule_id\":\"r1\",\"rule_name\":\"R1\",\"description\":\"d\",\"policy_reference\":\"p\",\"applies_to_roles\":[],\"code\":\"pass\"}]\n```";
        let rules = parse_draft_rules(text).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn malformed_output_is_an_error() {
        assert!(parse_draft_rules("not json").is_err());
    }
}
