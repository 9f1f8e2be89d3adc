//! Configuration management for the report agent.
//!
//! Configuration is read from environment variables:
//! - `ANTHROPIC_API_KEY` - Required. API key for the model endpoint.
//! - `REPORT_LOCATION` - Optional. Location the report covers. Defaults to `Boston, MA`.
//! - `REPORT_TOPIC` - Optional. Survey topic under analysis. Defaults to `Ever marijuana use`.
//! - `REPORT_MODEL` - Optional. Model identifier. Defaults to `claude-sonnet-4-20250514`.
//! - `REPORT_OUTPUT` - Optional. Output document path. Defaults to `weekly_report.md`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `15`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration, built once at startup and immutable for the run.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the model endpoint
    pub api_key: String,

    /// Location the report covers (used in prompts and search queries)
    pub location: String,

    /// Survey topic under analysis
    pub topic: String,

    /// Model identifier
    pub model: String,

    /// Path the generated document is written to
    pub output_path: PathBuf,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let location =
            std::env::var("REPORT_LOCATION").unwrap_or_else(|_| "Boston, MA".to_string());

        let topic =
            std::env::var("REPORT_TOPIC").unwrap_or_else(|_| "Ever marijuana use".to_string());

        let model = std::env::var("REPORT_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());

        let output_path = std::env::var("REPORT_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("weekly_report.md"));

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            api_key,
            location,
            topic,
            model,
            output_path,
            max_iterations,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, location: String, topic: String, output_path: PathBuf) -> Self {
        Self {
            api_key,
            location,
            topic,
            model: "claude-sonnet-4-20250514".to_string(),
            output_path,
            max_iterations: 15,
        }
    }
}
