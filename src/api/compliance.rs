//! HTTP surface: policy ingestion and trade-question evaluation
//! (spec.md §6).

use crate::api::state::AppState;
use crate::error::{EngineError, EngineResult};
use crate::models::{Security, TradeAction};
use crate::query;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/policies/ingest", post(ingest_policy))
        .route("/api/compliance/check", post(check_compliance))
        .route("/api/rules/:firm_name", get(get_rules))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// All-optional request DTO: a missing required field must route through
/// `EngineError::InputError` (400/INVALID_REQUEST), not axum's own
/// `Json<T>` rejection (422), so every field is deserialized as `Option`
/// and checked for presence by hand.
#[derive(Debug, Deserialize)]
struct IngestRequest {
    firm_name: Option<String>,
    policy_text: Option<String>,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    status: &'static str,
    firm_name: String,
    policy_version: String,
    total_iterations: u32,
    rules_deployed: usize,
    rules: Vec<IngestedRuleSummaryDto>,
}

#[derive(Debug, Serialize)]
struct IngestedRuleSummaryDto {
    rule_name: String,
    description: String,
    attempts: u32,
    validated: bool,
}

fn require_field(value: Option<String>, field: &str) -> Result<String, EngineError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EngineError::InputError(format!("{field} must not be empty"))),
    }
}

async fn ingest_policy(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> EngineResult<Json<IngestResponse>> {
    let firm_name = require_field(req.firm_name, "firm_name")?;
    let policy_text = require_field(req.policy_text, "policy_text")?;

    let (bundle, summaries) = state.ingestion.ingest(&policy_text, &firm_name).await?;

    Ok(Json(IngestResponse {
        status: "SUCCESS",
        firm_name: bundle.firm_name,
        policy_version: bundle.policy_version,
        total_iterations: bundle.total_iterations,
        rules_deployed: bundle.rules.len(),
        rules: summaries
            .into_iter()
            .map(|s| IngestedRuleSummaryDto {
                rule_name: s.rule_name,
                description: s.description,
                attempts: s.attempts,
                validated: s.validated,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct CheckRequest {
    firm_name: Option<String>,
    employee_id: Option<String>,
    query: Option<String>,
    #[serde(default)]
    trade_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ParsedQueryDto {
    ticker: String,
    action: Option<String>,
    trade_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    status: &'static str,
    firm_name: String,
    employee_id: String,
    parsed_query: ParsedQueryDto,
    compliance: crate::models::ComplianceVerdict,
}

async fn check_compliance(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> EngineResult<Json<CheckResponse>> {
    let firm_name = require_field(req.firm_name, "firm_name")?;
    let employee_id = require_field(req.employee_id, "employee_id")?;
    let question = require_field(req.query, "query")?;

    let employee = state
        .employees
        .find(&employee_id)
        .ok_or_else(|| EngineError::NotFound(format!("no employee with id {employee_id}")))?;

    let parsed = query::parse(&question).map_err(|e| EngineError::ParseError(e.to_string()))?;

    let action = parsed
        .action
        .as_deref()
        .map(action_from_str)
        .unwrap_or(TradeAction::Trade);

    let trade_date = req
        .trade_date
        .or_else(|| parsed.trade_date.clone())
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());

    let security = Security {
        ticker: parsed.ticker.clone(),
        requested_action: action,
        earnings_date: None,
        next_earnings_date: None,
        last_earnings_date: None,
        market_cap: None,
        is_covered: None,
        requires_preapproval: None,
        extra: serde_json::Map::new(),
    };

    let compliance = state
        .evaluator
        .evaluate(&firm_name, employee, &security, &trade_date)
        .await
        .map_err(|e| EngineError::StoreError(e.to_string()))?;

    Ok(Json(CheckResponse {
        status: "SUCCESS",
        firm_name,
        employee_id,
        parsed_query: ParsedQueryDto {
            ticker: parsed.ticker,
            action: parsed.action,
            trade_date: Some(trade_date),
        },
        compliance,
    }))
}

fn action_from_str(s: &str) -> TradeAction {
    match s {
        "buy" => TradeAction::Buy,
        "sell" => TradeAction::Sell,
        _ => TradeAction::Trade,
    }
}

async fn get_rules(
    State(state): State<AppState>,
    Path(firm_name): Path<String>,
) -> EngineResult<Json<serde_json::Value>> {
    let bundle = state
        .store
        .load(&firm_name)
        .await
        .map_err(|e| EngineError::StoreError(e.to_string()))?
        .ok_or_else(|| EngineError::NotFound(format!("no rules deployed for firm {firm_name}")))?;

    Ok(Json(serde_json::to_value(bundle).expect("bundle serializes")))
}
