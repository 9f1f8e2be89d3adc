//! Conversation history and run-level bookkeeping.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::llm::{ContentBlock, Message, Role};

/// The append-only ordered history of turns exchanged with the model.
///
/// Turns can be appended and read, never mutated or removed, so the history
/// length is monotonically non-decreasing across loop iterations.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the opening user request.
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user_text(text));
    }

    /// Append one assistant turn exactly as the model produced it.
    pub fn push_assistant(&mut self, content: Vec<ContentBlock>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content,
        });
    }

    /// Append one user turn carrying tool results, each referencing the call
    /// id it answers.
    pub fn push_tool_results(&mut self, results: Vec<ContentBlock>) {
        self.messages.push(Message {
            role: Role::User,
            content: results,
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Run-level bookkeeping, owned by the agent loop for one run.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Completed loop iterations.
    pub iterations: usize,

    /// Configured iteration budget.
    pub max_iterations: usize,

    /// Set once by the dispatcher when the terminal handler succeeds.
    pub artifact_emitted: bool,
}

impl RunState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iterations: 0,
            max_iterations,
            artifact_emitted: false,
        }
    }
}

/// How the run ended. Fatal failures surface as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The terminal handler produced the artifact.
    ArtifactProduced,
    /// The model signaled completion without producing the artifact.
    EndedWithoutArtifact,
    /// The iteration budget was reached first.
    BudgetExhausted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunStatus::ArtifactProduced => "artifact produced",
            RunStatus::EndedWithoutArtifact => "ended without artifact",
            RunStatus::BudgetExhausted => "aborted at iteration budget",
        };
        f.write_str(text)
    }
}

/// Result of one agent run, surfaced to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub iterations: usize,
    pub elapsed: Duration,
    /// Where the artifact was (or would have been) written.
    pub output_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_only_grows() {
        let mut conversation = Conversation::new();
        assert!(conversation.is_empty());

        conversation.push_user_text("analyze the data");
        assert_eq!(conversation.len(), 1);

        conversation.push_assistant(vec![ContentBlock::Text {
            text: "on it".to_string(),
        }]);
        conversation.push_tool_results(vec![ContentBlock::tool_result("id-1", "{}")]);
        assert_eq!(conversation.len(), 3);

        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
        assert_eq!(conversation.messages()[2].role, Role::User);
    }

    #[test]
    fn run_status_display() {
        assert_eq!(RunStatus::ArtifactProduced.to_string(), "artifact produced");
        assert_eq!(
            RunStatus::BudgetExhausted.to_string(),
            "aborted at iteration budget"
        );
    }
}
