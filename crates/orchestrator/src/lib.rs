//! Multi-agent orchestration.
//!
//! An orchestrator composes several [`TaskRunner`]s (usually agents)
//! under a fixed coordination policy:
//!
//! | orchestrator | policy | output |
//! |---|---|---|
//! | [`SequentialOrchestrator`] | one after another, each sees the previous result | last result |
//! | [`ParallelOrchestrator`] | all at once on the same task, bounded pool | name → result map |
//! | [`HierarchicalOrchestrator`] | manager plans, workers execute, manager synthesizes | synthesis |
//! | [`ConditionalOrchestrator`] | a router picks one agent | that agent's result |
//!
//! Every orchestrator appends an [`OrchestrationRecord`] after each
//! sub-run.

pub mod conditional;
pub mod hierarchical;
pub mod history;
pub mod parallel;
pub mod sequential;

#[cfg(test)]
mod test_helpers;

use agentflow_agent::AgentError;
use agentflow_core::agent::TaskContext;
use async_trait::async_trait;

pub use agentflow_agent::TaskRunner;
pub use conditional::ConditionalOrchestrator;
pub use hierarchical::HierarchicalOrchestrator;
pub use history::{ExecutionHistory, OrchestrationRecord};
pub use parallel::{DEFAULT_MAX_WORKERS, ParallelOrchestrator};
pub use sequential::{SequentialOrchestrator, TaskChaining};

/// Orchestration failures.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("agent '{name}' failed: {source}")]
    Agent {
        name: String,
        #[source]
        source: AgentError,
    },

    #[error("no agents to orchestrate")]
    NoAgents,

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
}

impl OrchestratorError {
    pub(crate) fn agent(runner: &dyn TaskRunner, source: AgentError) -> Self {
        Self::Agent {
            name: runner.name().to_string(),
            source,
        }
    }
}

/// A coordination policy over several runners.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    type Output: Send;

    async fn run(&self, task: &str, context: Option<&TaskContext>) -> Result<Self::Output, OrchestratorError>;

    /// Every sub-run recorded so far, oldest first.
    fn history(&self) -> Vec<OrchestrationRecord>;

    fn clear_history(&self);
}
