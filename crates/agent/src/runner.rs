//! The sub-agent run boundary used by orchestrators.

use agentflow_core::agent::TaskContext;
use async_trait::async_trait;
use tracing::warn;

use crate::agent::{Agent, AgentOutcome};

/// Failure of one sub-agent run. An [`Agent`] never fails this way: its
/// model errors and iteration cap are ordinary result text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    Failed(String),
}

/// Anything an orchestrator can hand a task to.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Run `task` and return its final text.
    async fn execute(&self, task: &str, context: Option<&TaskContext>) -> Result<String, AgentError>;
}

#[async_trait]
impl TaskRunner for Agent {
    fn name(&self) -> &str {
        Agent::name(self)
    }

    /// Every terminal state is a result. A failed model call yields its
    /// `LLM API error: ...` text, the iteration cap yields the sentinel.
    async fn execute(&self, task: &str, context: Option<&TaskContext>) -> Result<String, AgentError> {
        let run = self.run(task, context).await;
        if let AgentOutcome::LlmError(message) = &run.outcome {
            warn!(agent = %self.name(), error = %message, "Sub-agent ended on a model error");
        }
        Ok(run.text().to_string())
    }
}
