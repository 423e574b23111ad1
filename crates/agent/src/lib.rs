//! The agent reasoning loop: the think, act, observe cycle.
//!
//! 1. **Prepare** the messages: system prompt, recent history, the task
//! 2. **Call** the model through the completion client
//! 3. **Parse** the reply into a [`Directive`]
//! 4. **If a tool call**: run the tool, fold the result back in as an
//!    observation, loop back to step 2
//! 5. **If an answer**: return it
//!
//! The loop stops at the first answer, the first failed model call, or
//! the configured iteration cap.

pub mod agent;
pub mod directive;
pub mod event;
pub mod log;
pub mod prompt;
pub mod runner;

#[cfg(test)]
mod test_helpers;

pub use agent::{Agent, AgentOutcome, AgentRun, MAX_ITERATIONS_MESSAGE};
pub use directive::{Directive, parse_directive};
pub use event::AgentEvent;
pub use log::{ExecutionLogEntry, LogKind};
pub use prompt::{build_system_prompt, tool_catalogue};
pub use runner::{AgentError, TaskRunner};
