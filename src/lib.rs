//! # Survey Report Agent
//!
//! An agentic report generator: a language model explores a fixed survey
//! dataset through tool calls and produces one structured report document.
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Build context with the system prompt and available tools
//! 2. Call the model, parse its response, dispatch any tool calls
//! 3. Feed results back, keyed by call id, and repeat
//! 4. Stop when the report is generated, the model signals completion, or
//!    the iteration budget runs out
//!
//! Tool-level failures (bad arguments, unknown tools, unknown years) are
//! returned to the model as error results so it can adapt; only transport
//! and rendering failures abort a run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use survey_report_agent::{agent::Agent, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config)?;
//! let report = agent.run().await?;
//! println!("{}", report.status);
//! ```

pub mod agent;
pub mod config;
pub mod data;
pub mod llm;
pub mod report;
pub mod tools;

pub use config::Config;
