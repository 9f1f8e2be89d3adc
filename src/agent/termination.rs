//! Loop termination policy.
//!
//! Every exit condition lives here as one closed verdict set, evaluated once
//! per iteration after tool dispatch.

use crate::llm::StopReason;

use super::state::RunState;

/// Facts about the model turn just processed.
#[derive(Debug, Clone, Copy)]
pub struct TurnFacts {
    pub had_tool_calls: bool,
    pub stop_reason: Option<StopReason>,
}

/// The policy's decision for this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep looping.
    Continue,
    /// The terminal handler succeeded this iteration.
    StopSuccess,
    /// The model signaled completion without requesting anything further.
    StopIncomplete,
    /// The iteration budget has been reached.
    AbortBudget,
}

/// Pure function of the run state and the latest turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminationPolicy;

impl TerminationPolicy {
    pub fn evaluate(&self, state: &RunState, turn: &TurnFacts) -> Verdict {
        // Success wins even when the budget is reached on the same iteration.
        if state.artifact_emitted {
            return Verdict::StopSuccess;
        }
        if state.iterations >= state.max_iterations {
            return Verdict::AbortBudget;
        }
        if !turn.had_tool_calls && turn.stop_reason == Some(StopReason::EndTurn) {
            return Verdict::StopIncomplete;
        }
        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(iterations: usize, max: usize, artifact: bool) -> RunState {
        RunState {
            iterations,
            max_iterations: max,
            artifact_emitted: artifact,
        }
    }

    fn turn(had_tool_calls: bool, stop_reason: Option<StopReason>) -> TurnFacts {
        TurnFacts {
            had_tool_calls,
            stop_reason,
        }
    }

    #[test]
    fn continues_while_tools_are_requested() {
        let verdict = TerminationPolicy.evaluate(
            &state(3, 15, false),
            &turn(true, Some(StopReason::ToolUse)),
        );
        assert_eq!(verdict, Verdict::Continue);
    }

    #[test]
    fn stops_on_artifact_success() {
        let verdict = TerminationPolicy.evaluate(
            &state(5, 15, true),
            &turn(true, Some(StopReason::ToolUse)),
        );
        assert_eq!(verdict, Verdict::StopSuccess);
    }

    #[test]
    fn success_beats_budget_on_the_same_iteration() {
        let verdict = TerminationPolicy.evaluate(
            &state(15, 15, true),
            &turn(true, Some(StopReason::ToolUse)),
        );
        assert_eq!(verdict, Verdict::StopSuccess);
    }

    #[test]
    fn aborts_at_budget_without_success() {
        let verdict = TerminationPolicy.evaluate(
            &state(15, 15, false),
            &turn(true, Some(StopReason::ToolUse)),
        );
        assert_eq!(verdict, Verdict::AbortBudget);
    }

    #[test]
    fn stops_incomplete_on_end_turn_without_tool_calls() {
        let verdict = TerminationPolicy.evaluate(
            &state(2, 15, false),
            &turn(false, Some(StopReason::EndTurn)),
        );
        assert_eq!(verdict, Verdict::StopIncomplete);
    }

    #[test]
    fn text_only_turn_without_end_turn_continues() {
        let verdict = TerminationPolicy.evaluate(
            &state(2, 15, false),
            &turn(false, Some(StopReason::MaxTokens)),
        );
        assert_eq!(verdict, Verdict::Continue);
    }
}
