//! Compliance rule synthesis and evaluation engine.
//!
//! Ingests free-form policy text into sandbox-validated executable rules,
//! then evaluates natural-language trade questions against them.

use anyhow::{Context, Result};
use axum::Router;
use compliance_engine::api::{router, AppState};
use compliance_engine::config::Config;
use compliance_engine::employees::EmployeeDirectory;
use compliance_engine::evaluator::ComplianceEvaluator;
use compliance_engine::generator::anthropic::AnthropicGenerator;
use compliance_engine::generator::fake::FakeRuleGenerator;
use compliance_engine::generator::RuleGenerator;
use compliance_engine::ingestion::IngestionPipeline;
use compliance_engine::refinement::RefinementLoop;
use compliance_engine::runner::LocalRunner;
use compliance_engine::sandbox::fake::FakeSandbox;
use compliance_engine::sandbox::http::DaytonaSandbox;
use compliance_engine::sandbox::SandboxedExecutor;
use compliance_engine::store::RulesStore;
use compliance_engine::validator::RuleValidator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("loading configuration")?;

    let generator: Arc<dyn RuleGenerator> = if config.generator_api_key.is_empty() {
        info!("ANTHROPIC_API_KEY unset, running with an in-memory rule generator double");
        Arc::new(FakeRuleGenerator::new())
    } else {
        Arc::new(AnthropicGenerator::new(
            reqwest::Client::new(),
            config.generator_api_key.clone(),
            config.generator_model.clone(),
        ))
    };

    let sandbox: Arc<dyn SandboxedExecutor> = if config.sandbox_api_key.is_empty() {
        info!("DAYTONA_API_KEY unset, running with an in-memory sandbox double");
        Arc::new(FakeSandbox::new())
    } else {
        Arc::new(DaytonaSandbox::new(
            reqwest::Client::new(),
            config.sandbox_api_key.clone(),
            config.sandbox_api_url.clone(),
            config.sandbox_preserve,
        ))
    };

    let validator = Arc::new(RuleValidator::new(
        sandbox,
        config.sandbox_syntax_timeout,
        config.sandbox_functional_timeout,
    ));
    let refinement = Arc::new(RefinementLoop::new(
        validator,
        generator.clone(),
        config.max_refinement_attempts,
    ));
    let store = Arc::new(RulesStore::new(config.rules_dir.clone()));
    let ingestion = Arc::new(IngestionPipeline::new(generator, refinement, store.clone()));
    let runner = Arc::new(LocalRunner::new(
        config.local_runner_bin.clone(),
        config.local_runner_timeout,
    ));
    let evaluator = Arc::new(ComplianceEvaluator::new(store.clone(), runner));
    let employees = Arc::new(EmployeeDirectory::new());

    let state = AppState {
        ingestion,
        evaluator,
        store,
        employees,
    };

    let app: Router = router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("compliance engine listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compliance_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
