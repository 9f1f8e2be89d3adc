//! Web search tools: policy context and national comparison.
//!
//! Both tools go through the [`SearchProvider`] seam so tests can script the
//! lookup. A failed search surfaces as an error result for that call only;
//! it never aborts the run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::Dataset;

use super::{data, Tool};

/// Free-text lookup returning a best-effort text summary.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

/// Key-less web search backed by DuckDuckGo's HTML endpoint.
pub struct WebSearchProvider {
    client: reqwest::Client,
}

impl WebSearchProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; SurveyReportAgent/1.0)")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("default reqwest client configuration is valid");
        Self { client }
    }
}

impl Default for WebSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for WebSearchProvider {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        let encoded_query = urlencoding::encode(query);
        let url = format!("https://html.duckduckgo.com/html/?q={}", encoded_query);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Search failed with HTTP status {}", status);
        }
        let html = response.text().await?;

        let results = extract_ddg_results(&html);
        if results.is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results.join("\n\n"))
        }
    }
}

/// Extract search results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str) -> Vec<String> {
    let mut results = Vec::new();

    for (i, chunk) in html.split("class=\"result__body\"").enumerate().skip(1) {
        if i > 5 {
            break;
        }

        let title = chunk
            .split("class=\"result__a\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("No title");

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("No snippet");

        if !title.is_empty() && title != "No title" {
            results.push(format!("**{}**\n{}", html_decode(title), html_decode(snippet)));
        }
    }

    results
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Policy changes that might explain trends, looked up for the configured
/// location.
pub struct PolicyContext {
    search: Arc<dyn SearchProvider>,
    location: String,
}

impl PolicyContext {
    pub fn new(search: Arc<dyn SearchProvider>, location: &str) -> Self {
        Self {
            search,
            location: location.to_string(),
        }
    }
}

#[async_trait]
impl Tool for PolicyContext {
    fn name(&self) -> &str {
        "get_policy_context"
    }

    fn description(&self) -> &str {
        "Get relevant policy changes that might explain trends in the data."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
        let query = format!(
            "marijuana cannabis legalization law history timeline {} state",
            self.location
        );
        let summary = self.search.search(&query).await?;

        Ok(json!({
            "source": "web_search",
            "location": self.location,
            "policy_summary": summary,
        }))
    }
}

/// Local rate next to a web-sourced national figure for one year.
pub struct NationalComparison {
    search: Arc<dyn SearchProvider>,
    dataset: Arc<Dataset>,
}

impl NationalComparison {
    pub fn new(search: Arc<dyn SearchProvider>, dataset: Arc<Dataset>) -> Self {
        Self { search, dataset }
    }
}

#[async_trait]
impl Tool for NationalComparison {
    fn name(&self) -> &str {
        "get_national_comparison"
    }

    fn description(&self) -> &str {
        "Compare local rates to national averages for context."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "year": {
                    "type": "string",
                    "description": "Year to compare"
                }
            },
            "required": ["year"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let year = data::require_str(&args, "year")?;

        let query = format!(
            "youth marijuana use rate national average United States {} YRBS CDC statistics",
            year
        );
        let national_data = self.search.search(&query).await?;

        // Years outside the local survey still get the national summary.
        let local_rate = self.dataset.overall_rate(year).map(|r| r.value);

        Ok(json!({
            "source": "web_search",
            "year": year,
            "local_rate": local_rate,
            "national_data": national_data,
        }))
    }
}
