//! Conditional orchestration: a router picks exactly one agent.
//!
//! The router is asked which candidate should handle the task and must
//! reply with a bare agent name. An unrecognized reply falls back to the
//! configured default, or to the first candidate.

use std::sync::Arc;

use agentflow_core::agent::TaskContext;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::history::{ExecutionHistory, OrchestrationRecord};
use crate::{Orchestrator, OrchestratorError, TaskRunner};

pub struct ConditionalOrchestrator {
    router: Arc<dyn TaskRunner>,
    candidates: Vec<Arc<dyn TaskRunner>>,
    default_agent: Option<String>,
    history: ExecutionHistory,
}

impl ConditionalOrchestrator {
    pub fn new(router: Arc<dyn TaskRunner>, candidates: Vec<Arc<dyn TaskRunner>>) -> Self {
        Self {
            router,
            candidates,
            default_agent: None,
            history: ExecutionHistory::new(),
        }
    }

    /// Agent to use when the router names no known candidate.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default_agent = Some(name.into());
        self
    }

    fn candidate(&self, name: &str) -> Option<&Arc<dyn TaskRunner>> {
        self.candidates.iter().find(|c| c.name() == name)
    }

    fn routing_prompt(&self, task: &str) -> String {
        let names: Vec<&str> = self.candidates.iter().map(|c| c.name()).collect();
        format!(
            "Task: {task}\n\n\
             Available agents: {}\n\n\
             Which agent should handle this task? Respond with just the agent name.\n",
            names.join(", ")
        )
    }

    fn fallback(&self) -> Result<&Arc<dyn TaskRunner>, OrchestratorError> {
        match &self.default_agent {
            Some(name) => self
                .candidate(name)
                .ok_or_else(|| OrchestratorError::UnknownAgent(name.clone())),
            None => self.candidates.first().ok_or(OrchestratorError::NoAgents),
        }
    }
}

#[async_trait]
impl Orchestrator for ConditionalOrchestrator {
    type Output = String;

    async fn run(&self, task: &str, context: Option<&TaskContext>) -> Result<String, OrchestratorError> {
        if self.candidates.is_empty() {
            return Err(OrchestratorError::NoAgents);
        }

        let reply = self
            .router
            .execute(&self.routing_prompt(task), context)
            .await
            .map_err(|e| OrchestratorError::agent(self.router.as_ref(), e))?;
        let selected = reply.trim();
        self.history.record(self.router.name(), format!("Selected: {selected}"));

        let agent = match self.candidate(selected) {
            Some(agent) => agent,
            None => {
                let fallback = self.fallback()?;
                warn!(reply = %selected, fallback = %fallback.name(), "Router named no known agent");
                fallback
            }
        };

        info!(router = %self.router.name(), agent = %agent.name(), "Routed task");
        let result = agent
            .execute(task, context)
            .await
            .map_err(|e| OrchestratorError::agent(agent.as_ref(), e))?;
        self.history.record(agent.name(), result.as_str());
        Ok(result)
    }

    fn history(&self) -> Vec<OrchestrationRecord> {
        self.history.snapshot()
    }

    fn clear_history(&self) {
        self.history.clear();
    }
}
