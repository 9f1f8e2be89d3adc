//! Core agent loop implementation.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::config::Config;
use crate::data::Dataset;
use crate::llm::{
    AnthropicClient, ContentBlock, ModelClient, ModelRequest, TransportError,
};
use crate::report::{MarkdownRenderer, RenderError};
use crate::tools::search::WebSearchProvider;
use crate::tools::{self, RegistryError, ToolCall, ToolDispatcher, ToolRegistry};

use super::prompt::{build_system_prompt, opening_message};
use super::state::{Conversation, RunReport, RunState, RunStatus};
use super::termination::{TerminationPolicy, TurnFacts, Verdict};

const MAX_TOKENS: u32 = 4096;

/// Fatal run failures. Tool-level problems never appear here; they are fed
/// back into the conversation as error results instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("report rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// The autonomous report agent: one run, one conversation, one artifact.
pub struct Agent {
    config: Config,
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
}

impl Agent {
    /// Create an agent with the production collaborators: the live model
    /// endpoint, the built-in dataset, web search, and a Markdown renderer
    /// writing to the configured output path.
    pub fn new(config: Config) -> Result<Self, RegistryError> {
        let model = Arc::new(AnthropicClient::new(config.api_key.clone()));
        let dataset = Arc::new(Dataset::sample());
        let search = Arc::new(WebSearchProvider::new());
        let renderer = Arc::new(MarkdownRenderer::new(config.output_path.clone()));

        let registry = Arc::new(tools::standard_registry(
            dataset,
            search,
            renderer,
            &config.location,
            &config.topic,
        )?);

        Ok(Self::from_parts(config, model, registry))
    }

    /// Assemble an agent from explicit collaborators (used by tests to
    /// substitute a scripted model client or a custom tool set).
    pub fn from_parts(
        config: Config,
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(registry.clone(), tools::report::GENERATE_REPORT);
        Self {
            config,
            model,
            registry,
            dispatcher,
        }
    }

    /// Drive the conversation until the report is produced, the model stops,
    /// or the iteration budget runs out.
    pub async fn run(&self) -> Result<RunReport, AgentError> {
        let started = Instant::now();

        let system_prompt =
            build_system_prompt(&self.config.location, &self.config.topic, &self.registry);
        let declarations = self.registry.declarations();

        let mut conversation = Conversation::new();
        conversation.push_user_text(opening_message(&self.config.location));

        let mut state = RunState::new(self.config.max_iterations);
        let policy = TerminationPolicy;

        loop {
            tracing::debug!(iteration = state.iterations + 1, "agent iteration");

            let request = ModelRequest {
                model: &self.config.model,
                system: &system_prompt,
                tools: &declarations,
                messages: conversation.messages(),
                max_tokens: MAX_TOKENS,
            };
            let response = self.model.send(request).await?;
            let stop_reason = response.stop_reason;

            // Partition the turn: text is kept verbatim, tool_use blocks
            // become calls to dispatch.
            let mut calls = Vec::new();
            for block in &response.content {
                match block {
                    ContentBlock::Text { text } => {
                        tracing::debug!(text = %preview(text, 100), "model commentary");
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        calls.push(ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        });
                    }
                    ContentBlock::ToolResult { .. } => {
                        tracing::warn!("model emitted a tool_result block; ignoring");
                    }
                }
            }

            if response.content.is_empty() {
                return Err(AgentError::EmptyResponse);
            }
            conversation.push_assistant(response.content);

            let had_tool_calls = !calls.is_empty();
            if had_tool_calls {
                // Sequential, in arrival order; every result carries the id
                // of the call it answers.
                let mut results = Vec::with_capacity(calls.len());
                for call in &calls {
                    let result = self.dispatcher.dispatch(call, &mut state).await?;
                    results.push(result);
                }
                conversation.push_tool_results(results);
            }

            state.iterations += 1;
            let facts = TurnFacts {
                had_tool_calls,
                stop_reason,
            };

            let status = match policy.evaluate(&state, &facts) {
                Verdict::Continue => continue,
                Verdict::StopSuccess => RunStatus::ArtifactProduced,
                Verdict::StopIncomplete => RunStatus::EndedWithoutArtifact,
                Verdict::AbortBudget => RunStatus::BudgetExhausted,
            };

            tracing::info!(%status, iterations = state.iterations, "run finished");
            return Ok(RunReport {
                status,
                iterations: state.iterations,
                elapsed: started.elapsed(),
                output_path: self.config.output_path.clone(),
            });
        }
    }
}

/// Truncate a string for logging purposes.
fn preview(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... [truncated]", &s[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ModelResponse, StopReason};
    use crate::tools::search::SearchProvider;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<VecDeque<ModelResponse>>,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded_requests(&self) -> Vec<Vec<Message>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push(request.messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(TransportError::Api {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "script exhausted".to_string(),
                })
        }
    }

    struct ScriptedSearch;

    #[async_trait]
    impl SearchProvider for ScriptedSearch {
        async fn search(&self, _query: &str) -> anyhow::Result<String> {
            Ok("scripted summary".to_string())
        }
    }

    fn text_turn(text: &str, stop_reason: StopReason) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: Some(stop_reason),
        }
    }

    fn tool_turn(blocks: Vec<ContentBlock>) -> ModelResponse {
        ModelResponse {
            content: blocks,
            stop_reason: Some(StopReason::ToolUse),
        }
    }

    fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn report_input() -> Value {
        json!({
            "title": "Findings",
            "sections": [{"heading": "Trend", "content": "Rates rose."}]
        })
    }

    fn test_config(output_path: PathBuf, max_iterations: usize) -> Config {
        let mut config = Config::new(
            "test-key".to_string(),
            "Boston, MA".to_string(),
            "Ever marijuana use".to_string(),
            output_path,
        );
        config.max_iterations = max_iterations;
        config
    }

    fn agent_with_script(
        script: Vec<ModelResponse>,
        output_path: PathBuf,
        max_iterations: usize,
    ) -> (Agent, Arc<ScriptedClient>) {
        let config = test_config(output_path.clone(), max_iterations);
        let registry = tools::standard_registry(
            Arc::new(Dataset::sample()),
            Arc::new(ScriptedSearch),
            Arc::new(MarkdownRenderer::new(output_path)),
            &config.location,
            &config.topic,
        )
        .unwrap();
        let client = ScriptedClient::new(script);
        let agent = Agent::from_parts(config, client.clone(), Arc::new(registry));
        (agent, client)
    }

    fn tmp_output(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("report.md")
    }

    #[tokio::test]
    async fn text_only_end_turn_ends_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, _) = agent_with_script(
            vec![text_turn("Nothing more to analyze.", StopReason::EndTurn)],
            tmp_output(&dir),
            15,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::EndedWithoutArtifact);
        assert_eq!(report.iterations, 1);
    }

    #[tokio::test]
    async fn tool_roundtrip_then_report_produces_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = tmp_output(&dir);
        let (agent, client) = agent_with_script(
            vec![
                tool_turn(vec![tool_use(
                    "toolu_1",
                    "get_overall_rate",
                    json!({"year": "2017"}),
                )]),
                tool_turn(vec![tool_use("toolu_2", "generate_report", report_input())]),
            ],
            output.clone(),
            15,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::ArtifactProduced);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.output_path, output);
        assert!(output.exists());

        // The second request must carry the result matched to the first call
        // by id, and the history must have grown.
        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].len() > requests[0].len());

        let results = &requests[1].last().unwrap().content;
        assert_eq!(results.len(), 1);
        match &results[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(!is_error);
                assert!(content.contains("12.6"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn terminal_success_stops_after_dispatching_all_calls_in_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let output = tmp_output(&dir);

        struct Probe {
            hits: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Tool for Probe {
            fn name(&self) -> &str {
                "probe"
            }
            fn description(&self) -> &str {
                "counts invocations"
            }
            fn parameters_schema(&self) -> Value {
                json!({"type": "object", "properties": {}, "required": []})
            }
            async fn execute(&self, _args: Value) -> anyhow::Result<Value> {
                self.hits.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"ok": true}))
            }
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(Probe { hits: hits.clone() }))
            .unwrap();
        registry
            .register(Arc::new(tools::report::GenerateReport::new(Arc::new(
                MarkdownRenderer::new(output.clone()),
            ))))
            .unwrap();

        let client = ScriptedClient::new(vec![tool_turn(vec![
            tool_use("toolu_1", "probe", json!({})),
            tool_use("toolu_2", "generate_report", report_input()),
            tool_use("toolu_3", "probe", json!({})),
        ])]);
        let agent = Agent::from_parts(
            test_config(output.clone(), 15),
            client,
            Arc::new(registry),
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::ArtifactProduced);
        assert_eq!(report.iterations, 1);
        assert!(output.exists());
        // The call after the terminal one was still dispatched.
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn budget_exhaustion_reports_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, _) = agent_with_script(
            vec![
                tool_turn(vec![tool_use("toolu_1", "get_historical_trend", json!({}))]),
                tool_turn(vec![tool_use("toolu_2", "get_historical_trend", json!({}))]),
                tool_turn(vec![tool_use("toolu_3", "get_historical_trend", json!({}))]),
            ],
            tmp_output(&dir),
            2,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::BudgetExhausted);
        assert_eq!(report.iterations, 2);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, client) = agent_with_script(
            vec![
                tool_turn(vec![tool_use("toolu_1", "get_weather", json!({}))]),
                text_turn("I will stick to the survey data.", StopReason::EndTurn),
            ],
            tmp_output(&dir),
            15,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::EndedWithoutArtifact);
        assert_eq!(report.iterations, 2);

        let requests = client.recorded_requests();
        let results = &requests[1].last().unwrap().content;
        match &results[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(is_error);
                assert!(content.contains("unknown tool: get_weather"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_report_call_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let output = tmp_output(&dir);
        let (agent, client) = agent_with_script(
            vec![
                // Missing both required fields.
                tool_turn(vec![tool_use("toolu_1", "generate_report", json!({}))]),
                text_turn("Understood, giving up.", StopReason::EndTurn),
            ],
            output.clone(),
            15,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::EndedWithoutArtifact);
        assert!(!output.exists());

        let requests = client.recorded_requests();
        let results = &requests[1].last().unwrap().content;
        match &results[0] {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                assert!(is_error);
                assert!(content.contains("missing required field 'title'"));
                assert!(content.contains("missing required field 'sections'"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_error_result_advances_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, client) = agent_with_script(
            vec![
                tool_turn(vec![tool_use(
                    "toolu_1",
                    "get_overall_rate",
                    json!({"year": "2021"}),
                )]),
                text_turn("2021 is not surveyed.", StopReason::EndTurn),
            ],
            tmp_output(&dir),
            15,
        );

        let report = agent.run().await.unwrap();
        assert_eq!(report.status, RunStatus::EndedWithoutArtifact);
        assert_eq!(report.iterations, 2);

        let requests = client.recorded_requests();
        let results = &requests[1].last().unwrap().content;
        match &results[0] {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                assert!(is_error);
                assert!(content.contains("2011, 2013, 2015, 2017, 2019"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[tokio::test]
    async fn conversation_history_never_shrinks() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, client) = agent_with_script(
            vec![
                tool_turn(vec![tool_use("toolu_1", "get_available_data", json!({}))]),
                tool_turn(vec![tool_use(
                    "toolu_2",
                    "get_breakdown",
                    json!({"year": "2017", "dimension": "sex"}),
                )]),
                text_turn("Done looking.", StopReason::EndTurn),
            ],
            tmp_output(&dir),
            15,
        );

        agent.run().await.unwrap();

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 3);
        for pair in requests.windows(2) {
            assert!(pair[1].len() >= pair[0].len());
        }
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, _) = agent_with_script(vec![], tmp_output(&dir), 15);

        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
    }

    #[tokio::test]
    async fn render_failure_is_fatal() {
        let (agent, _) = agent_with_script(
            vec![tool_turn(vec![tool_use(
                "toolu_1",
                "generate_report",
                report_input(),
            )])],
            PathBuf::from("/nonexistent-dir/report.md"),
            15,
        );

        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, AgentError::Render(_)));
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(300);
        let shortened = preview(&long, 100);
        assert!(shortened.ends_with("[truncated]"));
        assert!(preview("short", 100) == "short");
    }
}
