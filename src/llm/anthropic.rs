//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::Serialize;

use super::{Message, ModelClient, ModelRequest, ModelResponse, ToolDeclaration, TransportError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// HTTP client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("default reqwest client configuration is valid");

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    tools: &'a [ToolDeclaration],
    messages: &'a [Message],
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, TransportError> {
        let body = ApiRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            system: request.system,
            tools: request.tools,
            messages: request.messages,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api { status, body });
        }

        Ok(response.json::<ModelResponse>().await?)
    }
}
