//! The core agent: conversation state machine, termination policy, prompts.
//!
//! One run is one conversation:
//! 1. Build a request from the system prompt, tool declarations, and history
//! 2. Call the model; partition its turn into text and tool calls
//! 3. Dispatch tool calls in arrival order, append results keyed by call id
//! 4. Ask the termination policy for a verdict; loop or stop

mod agent_loop;
mod prompt;
pub mod state;
pub mod termination;

pub use agent_loop::{Agent, AgentError};
pub use prompt::{build_system_prompt, opening_message};
pub use state::{Conversation, RunReport, RunState, RunStatus};
pub use termination::{TerminationPolicy, TurnFacts, Verdict};
