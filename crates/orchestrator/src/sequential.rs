//! Sequential orchestration: a pipeline of runners.
//!
//! Runner *i+1* sees runner *i*'s result as `context["previous_result"]`.
//! A failing runner stops the pipeline and its error is returned as is;
//! there is no partial-failure recovery here.

use std::sync::Arc;

use agentflow_core::agent::TaskContext;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::history::{ExecutionHistory, OrchestrationRecord};
use crate::{Orchestrator, OrchestratorError, TaskRunner};

/// What task text runners after the first receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskChaining {
    /// `Based on the previous result, continue with: {task}`
    #[default]
    FollowUp,
    /// The original task, unchanged. Only the context advances.
    Repeat,
}

impl TaskChaining {
    fn next_task(self, task: &str) -> String {
        match self {
            TaskChaining::FollowUp => format!("Based on the previous result, continue with: {task}"),
            TaskChaining::Repeat => task.to_string(),
        }
    }
}

pub struct SequentialOrchestrator {
    agents: Vec<Arc<dyn TaskRunner>>,
    chaining: TaskChaining,
    history: ExecutionHistory,
}

impl SequentialOrchestrator {
    pub fn new(agents: Vec<Arc<dyn TaskRunner>>) -> Self {
        Self {
            agents,
            chaining: TaskChaining::default(),
            history: ExecutionHistory::new(),
        }
    }

    pub fn with_chaining(mut self, chaining: TaskChaining) -> Self {
        self.chaining = chaining;
        self
    }
}

#[async_trait]
impl Orchestrator for SequentialOrchestrator {
    type Output = String;

    async fn run(&self, task: &str, context: Option<&TaskContext>) -> Result<String, OrchestratorError> {
        if self.agents.is_empty() {
            return Err(OrchestratorError::NoAgents);
        }

        let mut context = context.cloned().unwrap_or_default();
        let mut current_task = task.to_string();
        let mut result = String::new();

        for (step, agent) in self.agents.iter().enumerate() {
            info!(agent = %agent.name(), step = step + 1, total = self.agents.len(), "Sequential step");
            result = agent
                .execute(&current_task, Some(&context))
                .await
                .map_err(|e| OrchestratorError::agent(agent.as_ref(), e))?;

            self.history.record(agent.name(), result.as_str());
            context.insert("previous_result".into(), Value::String(result.clone()));
            current_task = self.chaining.next_task(task);
        }

        Ok(result)
    }

    fn history(&self) -> Vec<OrchestrationRecord> {
        self.history.snapshot()
    }

    fn clear_history(&self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Script, ScriptedRunner};
    use serde_json::json;

    fn runners(list: &[&Arc<ScriptedRunner>]) -> Vec<Arc<dyn TaskRunner>> {
        list.iter().map(|r| Arc::clone(r) as Arc<dyn TaskRunner>).collect()
    }

    #[tokio::test]
    async fn chains_results_through_context() {
        let researcher = Arc::new(ScriptedRunner::replying("researcher", &["facts"]));
        let writer = Arc::new(ScriptedRunner::replying("writer", &["article"]));
        let orchestrator = SequentialOrchestrator::new(runners(&[&researcher, &writer]));

        let mut context = TaskContext::new();
        context.insert("audience".into(), json!("kids"));
        let result = orchestrator.run("Explain tides", Some(&context)).await.unwrap();

        assert_eq!(result, "article");
        assert_eq!(researcher.tasks(), vec!["Explain tides"]);
        assert!(researcher.contexts()[0].get("previous_result").is_none());
        assert_eq!(
            writer.tasks(),
            vec!["Based on the previous result, continue with: Explain tides"]
        );
        assert_eq!(writer.contexts()[0]["previous_result"], "facts");
        assert_eq!(writer.contexts()[0]["audience"], "kids");

        // The caller's context is not modified.
        assert!(context.get("previous_result").is_none());

        let history = orchestrator.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].agent, "researcher");
        assert_eq!(history[1].result, "article");
    }

    #[tokio::test]
    async fn repeat_chaining_keeps_original_task() {
        let a = Arc::new(ScriptedRunner::replying("a", &["one"]));
        let b = Arc::new(ScriptedRunner::replying("b", &["two"]));
        let orchestrator = SequentialOrchestrator::new(runners(&[&a, &b])).with_chaining(TaskChaining::Repeat);

        orchestrator.run("same task", None).await.unwrap();
        assert_eq!(b.tasks(), vec!["same task"]);
        assert_eq!(b.contexts()[0]["previous_result"], "one");
    }

    #[tokio::test]
    async fn failure_propagates_and_stops_the_pipeline() {
        let a = Arc::new(ScriptedRunner::new("a", vec![Script::Fail("runner crashed".into())]));
        let b = Arc::new(ScriptedRunner::echo("b"));
        let orchestrator = SequentialOrchestrator::new(runners(&[&a, &b]));

        let err = orchestrator.run("task", None).await.unwrap_err();
        match err {
            OrchestratorError::Agent { name, source } => {
                assert_eq!(name, "a");
                assert_eq!(source.to_string(), "runner crashed");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(b.tasks().is_empty());
        assert!(orchestrator.history().is_empty());
    }

    #[tokio::test]
    async fn empty_pipeline_is_an_error() {
        let orchestrator = SequentialOrchestrator::new(Vec::new());
        assert!(matches!(
            orchestrator.run("task", None).await,
            Err(OrchestratorError::NoAgents)
        ));
    }

    #[tokio::test]
    async fn clear_history() {
        let a = Arc::new(ScriptedRunner::echo("a"));
        let orchestrator = SequentialOrchestrator::new(runners(&[&a]));
        orchestrator.run("x", None).await.unwrap();
        assert_eq!(orchestrator.history().len(), 1);
        orchestrator.clear_history();
        assert!(orchestrator.history().is_empty());
    }
}
