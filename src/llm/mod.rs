//! Model endpoint abstraction and wire types.
//!
//! The agent talks to the model through the [`ModelClient`] trait so the loop
//! can be driven by a scripted fake in tests. The wire types mirror the
//! messages-style API: role-tagged messages whose content is a list of typed
//! blocks (`text`, `tool_use`, `tool_result`).

mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One content block inside a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// A `tool_result` block answering the call with the given id.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// An error `tool_result` block answering the call with the given id.
    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// Message roles. The system prompt travels outside the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Why the model stopped emitting this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    #[serde(other)]
    Other,
}

/// A tool made available to the model for this request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Everything needed for one model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub tools: &'a [ToolDeclaration],
    pub messages: &'a [Message],
    pub max_tokens: u32,
}

/// One model turn: content blocks plus the signaled stop reason.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

/// Transport-level failure talking to the model endpoint. Always fatal for
/// the run.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// The model endpoint, as seen by the agent loop.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_block_wire_format_round_trips() {
        let blocks = vec![
            ContentBlock::Text {
                text: "thinking...".to_string(),
            },
            ContentBlock::ToolUse {
                id: "toolu_01".to_string(),
                name: "get_overall_rate".to_string(),
                input: json!({"year": "2017"}),
            },
            ContentBlock::tool_result("toolu_01", "{\"value\":12.6}"),
        ];

        let wire = serde_json::to_value(&blocks).unwrap();
        assert_eq!(wire[0]["type"], "text");
        assert_eq!(wire[1]["type"], "tool_use");
        assert_eq!(wire[2]["type"], "tool_result");
        assert_eq!(wire[2]["tool_use_id"], "toolu_01");

        let back: Vec<ContentBlock> = serde_json::from_value(wire).unwrap();
        assert_eq!(back, blocks);
    }

    #[test]
    fn unknown_stop_reason_parses_as_other() {
        let response: ModelResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "hi"}],
            "stop_reason": "pause_turn"
        }))
        .unwrap();
        assert_eq!(response.stop_reason, Some(StopReason::Other));
    }

    #[test]
    fn missing_stop_reason_is_none() {
        let response: ModelResponse = serde_json::from_value(json!({
            "content": [],
            "stop_reason": null
        }))
        .unwrap();
        assert!(response.stop_reason.is_none());
    }
}
