//! Process-wide configuration loaded once at startup.

use std::env;
use std::time::Duration;

/// Application configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rules_dir: String,
    pub generator_api_key: String,
    pub generator_model: String,
    pub sandbox_api_key: String,
    pub sandbox_api_url: String,
    pub sandbox_preserve: bool,
    pub local_runner_bin: String,
    pub max_refinement_attempts: u32,
    pub sandbox_syntax_timeout: Duration,
    pub sandbox_functional_timeout: Duration,
    pub local_runner_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let rules_dir = env::var("RULES_DIR").unwrap_or_else(|_| "./rules_data".to_string());

        let generator_api_key = env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        let generator_model = env::var("GENERATOR_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-5".to_string());

        let sandbox_api_key = env::var("DAYTONA_API_KEY").unwrap_or_default();
        let sandbox_api_url =
            env::var("DAYTONA_API_URL").unwrap_or_else(|_| "https://app.daytona.io/api".to_string());
        let sandbox_preserve = env::var("DAYTONA_PRESERVE_SANDBOXES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let local_runner_bin = env::var("PYTHON_BIN").unwrap_or_else(|_| "python3".to_string());

        let max_refinement_attempts = env::var("MAX_REFINEMENT_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(5);

        let sandbox_syntax_timeout = Duration::from_secs(
            env::var("SANDBOX_SYNTAX_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        );
        let sandbox_functional_timeout = Duration::from_secs(
            env::var("SANDBOX_FUNCTIONAL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(120),
        );
        let local_runner_timeout = Duration::from_secs(
            env::var("LOCAL_RUNNER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        );

        Ok(Self {
            port,
            rules_dir,
            generator_api_key,
            generator_model,
            sandbox_api_key,
            sandbox_api_url,
            sandbox_preserve,
            local_runner_bin,
            max_refinement_attempts,
            sandbox_syntax_timeout,
            sandbox_functional_timeout,
            local_runner_timeout,
        })
    }
}
