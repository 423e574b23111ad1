//! Parallel orchestration: every runner gets the same task at once.
//!
//! A semaphore bounds how many runners are in flight. A runner that fails
//! or panics yields `"Error: ..."` as its result; the others are
//! unaffected.

use std::collections::HashMap;
use std::sync::Arc;

use agentflow_core::agent::TaskContext;
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::history::{ExecutionHistory, OrchestrationRecord};
use crate::{Orchestrator, OrchestratorError, TaskRunner};

pub const DEFAULT_MAX_WORKERS: usize = 3;

pub struct ParallelOrchestrator {
    agents: Vec<Arc<dyn TaskRunner>>,
    max_workers: usize,
    history: Arc<ExecutionHistory>,
}

impl ParallelOrchestrator {
    pub fn new(agents: Vec<Arc<dyn TaskRunner>>) -> Self {
        Self {
            agents,
            max_workers: DEFAULT_MAX_WORKERS,
            history: Arc::new(ExecutionHistory::new()),
        }
    }

    /// Cap concurrent runners (at least 1).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

#[async_trait]
impl Orchestrator for ParallelOrchestrator {
    /// Agent name to result. Agents sharing a name overwrite each other.
    type Output = HashMap<String, String>;

    async fn run(&self, task: &str, context: Option<&TaskContext>) -> Result<Self::Output, OrchestratorError> {
        info!(agents = self.agents.len(), max_workers = self.max_workers, "Parallel run starting");

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let context = context.cloned();
        let mut handles = Vec::with_capacity(self.agents.len());

        for agent in &self.agents {
            let agent = Arc::clone(agent);
            let semaphore = Arc::clone(&semaphore);
            let history = Arc::clone(&self.history);
            let task = task.to_string();
            let context = context.clone();
            let name = agent.name().to_string();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = match agent.execute(&task, context.as_ref()).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(agent = %agent.name(), error = %e, "Parallel agent failed");
                        format!("Error: {e}")
                    }
                };
                history.record(agent.name(), result.as_str());
                info!(agent = %agent.name(), "Parallel agent completed");
                result
            });
            handles.push((name, handle));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(agent = %name, error = %e, "Parallel agent aborted");
                    let message = format!("Error: {e}");
                    self.history.record(name.as_str(), message.as_str());
                    message
                }
            };
            results.insert(name, result);
        }

        Ok(results)
    }

    fn history(&self) -> Vec<OrchestrationRecord> {
        self.history.snapshot()
    }

    fn clear_history(&self) {
        self.history.clear();
    }
}
