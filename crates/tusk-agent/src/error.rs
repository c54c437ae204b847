//! Engine-level failures worth telling apart from plain transport errors

use thiserror::Error;

/// Failures raised by the tool-calling engine itself. Provider transport
/// and parse errors stay `anyhow` with context; these two need to be
/// distinguishable by callers and tests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentError {
    /// The backend produced no text, no tool calls, and no evidence any
    /// tokens were processed
    #[error("received empty response from API (no content or tool calls)")]
    EmptyResponse,

    /// The backend kept issuing tool calls past the round limit
    #[error("tool-calling loop exceeded {0} rounds without a final answer")]
    ToolLoopOverflow(usize),
}
