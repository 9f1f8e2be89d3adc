//! Tool registration, validation, and dispatch.
//!
//! Tools implement the [`Tool`] trait and are registered once in a
//! [`ToolRegistry`] before the run starts. The registry owns schema
//! validation; the [`ToolDispatcher`] routes validated calls to handlers and
//! converts every handler-level failure into an error result block so the
//! model can adapt on its next turn. Only a report-rendering failure escapes
//! dispatch, because it means the run's one artifact cannot be produced.

pub mod data;
pub mod report;
pub mod search;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::agent::state::RunState;
use crate::data::Dataset;
use crate::llm::{ContentBlock, ToolDeclaration};
use crate::report::{DocumentRenderer, RenderError};
use search::SearchProvider;

/// A capability the model may invoke.
///
/// Handlers must not touch conversation state and must tolerate being called
/// more than once with identical input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments (`properties` + `required`).
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `Err` becomes an error result block; it never aborts
    /// the run unless it carries a [`RenderError`].
    async fn execute(&self, args: Value) -> anyhow::Result<Value>;
}

impl fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

/// One invocation request emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Registration-time schema problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("tool '{tool}': required field '{field}' is not declared in schema properties")]
    RequiredFieldUndeclared { tool: String, field: String },
}

/// A rejected tool call. This is data, not a control-flow error: it is
/// reported back to the model as an error result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    UnknownTool { name: String },
    InvalidArguments { tool: String, problems: Vec<String> },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::UnknownTool { name } => write!(f, "unknown tool: {}", name),
            ValidationFailure::InvalidArguments { tool, problems } => {
                write!(f, "invalid arguments for {}: {}", tool, problems.join("; "))
            }
        }
    }
}

/// The set of callable capabilities, fixed before the run starts.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, checking name uniqueness and schema completeness.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.get(&name).is_some() {
            return Err(RegistryError::DuplicateName(name));
        }

        let schema = tool.parameters_schema();
        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                let declared = properties.is_some_and(|p| p.contains_key(field));
                if !declared {
                    return Err(RegistryError::RequiredFieldUndeclared {
                        tool: name,
                        field: field.to_string(),
                    });
                }
            }
        }

        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// All registered tools, in registration order.
    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Tool declarations in the form sent with every model request.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|t| ToolDeclaration {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect()
    }

    /// Validate call arguments against the named tool's schema, returning
    /// the resolved tool and the normalized arguments, or a failure listing
    /// every offending field.
    pub fn validate(
        &self,
        name: &str,
        input: &Value,
    ) -> Result<(Arc<dyn Tool>, Value), ValidationFailure> {
        let Some(tool) = self.get(name) else {
            return Err(ValidationFailure::UnknownTool {
                name: name.to_string(),
            });
        };

        let normalized = match input {
            // Models occasionally omit the arguments object for no-arg tools.
            Value::Null => json!({}),
            Value::Object(_) => input.clone(),
            other => {
                return Err(ValidationFailure::InvalidArguments {
                    tool: name.to_string(),
                    problems: vec![format!(
                        "arguments must be a JSON object, got {}",
                        json_type_name(other)
                    )],
                })
            }
        };

        let schema = tool.parameters_schema();
        let problems = check_against_schema(&schema, &normalized);
        if problems.is_empty() {
            Ok((tool.clone(), normalized))
        } else {
            Err(ValidationFailure::InvalidArguments {
                tool: name.to_string(),
                problems,
            })
        }
    }
}

fn check_against_schema(schema: &Value, input: &Value) -> Vec<String> {
    let mut problems = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if input.get(field).map_or(true, Value::is_null) {
                problems.push(format!("missing required field '{}'", field));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, field_schema) in properties {
            let Some(value) = input.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            if let Some(expected) = field_schema.get("type").and_then(Value::as_str) {
                if !type_matches(expected, value) {
                    problems.push(format!(
                        "field '{}' must be of type {}, got {}",
                        field,
                        expected,
                        json_type_name(value)
                    ));
                }
            }

            if let Some(allowed) = field_schema.get("enum").and_then(Value::as_array) {
                if !allowed.contains(value) {
                    let options: Vec<String> =
                        allowed.iter().map(|v| v.to_string()).collect();
                    problems.push(format!(
                        "field '{}' must be one of: {}",
                        field,
                        options.join(", ")
                    ));
                }
            }
        }
    }

    problems
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Routes validated tool calls to their handlers.
///
/// Every outcome is a `tool_result` block answering the call by id. The one
/// exception is a failure from the terminal handler's renderer, which is
/// returned as a hard error because the artifact cannot be produced.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    terminal_tool: String,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, terminal_tool: impl Into<String>) -> Self {
        Self {
            registry,
            terminal_tool: terminal_tool.into(),
        }
    }

    pub async fn dispatch(
        &self,
        call: &ToolCall,
        state: &mut RunState,
    ) -> Result<ContentBlock, RenderError> {
        debug!(tool = %call.name, call_id = %call.id, "dispatching tool call");

        let (tool, args) = match self.registry.validate(&call.name, &call.input) {
            Ok(resolved) => resolved,
            Err(failure) => {
                warn!(tool = %call.name, %failure, "rejected tool call");
                return Ok(ContentBlock::tool_error(&call.id, failure.to_string()));
            }
        };

        match tool.execute(args).await {
            Ok(payload) => {
                if call.name == self.terminal_tool {
                    state.artifact_emitted = true;
                }
                Ok(ContentBlock::tool_result(&call.id, payload.to_string()))
            }
            Err(err) => match err.downcast::<RenderError>() {
                Ok(render_err) => Err(render_err),
                Err(err) => {
                    warn!(tool = %call.name, error = %err, "tool execution failed");
                    Ok(ContentBlock::tool_error(&call.id, format!("Error: {}", err)))
                }
            },
        }
    }
}

/// Build the registry with the full tool set wired to its collaborators.
pub fn standard_registry(
    dataset: Arc<Dataset>,
    search_provider: Arc<dyn SearchProvider>,
    renderer: Arc<dyn DocumentRenderer>,
    location: &str,
    topic: &str,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(data::AvailableData::new(
        dataset.clone(),
        location,
        topic,
    )))?;
    registry.register(Arc::new(data::OverallRate::new(dataset.clone())))?;
    registry.register(Arc::new(data::Breakdown::new(dataset.clone())))?;
    registry.register(Arc::new(data::HistoricalTrend::new(dataset.clone())))?;
    registry.register(Arc::new(data::SubgroupTrend::new(dataset.clone())))?;
    registry.register(Arc::new(search::PolicyContext::new(
        search_provider.clone(),
        location,
    )))?;
    registry.register(Arc::new(search::NationalComparison::new(
        search_provider,
        dataset,
    )))?;
    registry.register(Arc::new(report::GenerateReport::new(renderer)))?;

    Ok(registry)
}
