//! Hierarchical orchestration: a manager plans, workers execute, the
//! manager synthesizes.
//!
//! ```text
//!            manager (plan)
//!           /      |      \
//!     worker-1  worker-2  worker-3
//!           \      |      /
//!           manager (synthesis)
//! ```
//!
//! Workers run one after another, each seeing the full plan. Any failure
//! aborts the run.

use std::fmt::Write;
use std::sync::Arc;

use agentflow_core::agent::TaskContext;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::history::{ExecutionHistory, OrchestrationRecord};
use crate::{Orchestrator, OrchestratorError, TaskRunner};

pub struct HierarchicalOrchestrator {
    manager: Arc<dyn TaskRunner>,
    workers: Vec<Arc<dyn TaskRunner>>,
    history: ExecutionHistory,
}

impl HierarchicalOrchestrator {
    pub fn new(manager: Arc<dyn TaskRunner>, workers: Vec<Arc<dyn TaskRunner>>) -> Self {
        Self {
            manager,
            workers,
            history: ExecutionHistory::new(),
        }
    }

    fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }
}

fn planning_prompt(task: &str, workers: &[&str]) -> String {
    format!(
        "Task: {task}\n\n\
         Available workers: {}\n\n\
         As the manager, plan how to break down this task and delegate to workers.\n\
         Respond with your plan and the subtask for each worker.\n",
        workers.join(", ")
    )
}

fn worker_prompt(plan: &str, task: &str) -> String {
    format!("Based on the manager's plan:\n{plan}\n\nComplete your part of the task: {task}")
}

fn synthesis_prompt(task: &str, plan: &str, results: &[(String, String)]) -> String {
    let mut formatted = String::new();
    for (index, (worker, result)) in results.iter().enumerate() {
        if index > 0 {
            formatted.push('\n');
        }
        let _ = writeln!(formatted, "{worker}:\n{result}");
    }
    format!(
        "Original task: {task}\n\n\
         Your plan: {plan}\n\n\
         Worker results:\n{formatted}\n\n\
         Synthesize the final response based on all worker outputs.\n"
    )
}

#[async_trait]
impl Orchestrator for HierarchicalOrchestrator {
    type Output = String;

    async fn run(&self, task: &str, context: Option<&TaskContext>) -> Result<String, OrchestratorError> {
        let names = self.worker_names();
        let mut context = context.cloned().unwrap_or_default();
        context.insert(
            "available_workers".into(),
            Value::Array(names.iter().map(|n| Value::String(n.to_string())).collect()),
        );

        info!(manager = %self.manager.name(), workers = names.len(), "Manager planning");
        let plan = self
            .manager
            .execute(&planning_prompt(task, &names), Some(&context))
            .await
            .map_err(|e| OrchestratorError::agent(self.manager.as_ref(), e))?;
        self.history.record(self.manager.name(), plan.as_str());

        let mut results = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            info!(worker = %worker.name(), "Worker executing");
            let result = worker
                .execute(&worker_prompt(&plan, task), Some(&context))
                .await
                .map_err(|e| OrchestratorError::agent(worker.as_ref(), e))?;
            self.history.record(worker.name(), result.as_str());
            results.push((worker.name().to_string(), result));
        }

        info!(manager = %self.manager.name(), "Manager synthesizing");
        let final_result = self
            .manager
            .execute(&synthesis_prompt(task, &plan, &results), Some(&context))
            .await
            .map_err(|e| OrchestratorError::agent(self.manager.as_ref(), e))?;
        self.history
            .record(format!("{} (final)", self.manager.name()), final_result.as_str());

        Ok(final_result)
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

    #[tokio::test]
    async fn plan_delegate_synthesize() {
        let manager = Arc::new(ScriptedRunner::replying("lead", &["split it", "final report"]));
        let coder = Arc::new(ScriptedRunner::replying("coder", &["code done"]));
        let tester = Arc::new(ScriptedRunner::replying("tester", &["tests pass"]));
        let orchestrator = HierarchicalOrchestrator::new(
            manager.clone(),
            vec![coder.clone() as Arc<dyn TaskRunner>, tester.clone() as Arc<dyn TaskRunner>],
        );

        let result = orchestrator.run("Ship feature", None).await.unwrap();
        assert_eq!(result, "final report");

        let manager_tasks = manager.tasks();
        assert_eq!(manager_tasks.len(), 2);
        assert_eq!(
            manager_tasks[0],
            "Task: Ship feature\n\nAvailable workers: coder, tester\n\n\
             As the manager, plan how to break down this task and delegate to workers.\n\
             Respond with your plan and the subtask for each worker.\n"
        );
        assert_eq!(
            manager_tasks[1],
            "Original task: Ship feature\n\nYour plan: split it\n\n\
             Worker results:\ncoder:\ncode done\n\ntester:\ntests pass\n\n\n\
             Synthesize the final response based on all worker outputs.\n"
        );
        assert_eq!(
            coder.tasks(),
            vec!["Based on the manager's plan:\nsplit it\n\nComplete your part of the task: Ship feature"]
        );
        assert_eq!(manager.contexts()[0]["available_workers"], json!(["coder", "tester"]));
        assert_eq!(tester.contexts()[0]["available_workers"], json!(["coder", "tester"]));

        let agents: Vec<String> = orchestrator.history().into_iter().map(|r| r.agent).collect();
        assert_eq!(agents, vec!["lead", "coder", "tester", "lead (final)"]);
    }

    #[tokio::test]
    async fn worker_failure_aborts() {
        let manager = Arc::new(ScriptedRunner::replying("lead", &["plan"]));
        let worker = Arc::new(ScriptedRunner::new("w", vec![Script::Fail("boom".into())]));
        let orchestrator = HierarchicalOrchestrator::new(manager.clone(), vec![worker as Arc<dyn TaskRunner>]);

        let err = orchestrator.run("task", None).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Agent { ref name, .. } if name == "w"));
        assert_eq!(manager.tasks().len(), 1);
    }

    #[tokio::test]
    async fn no_workers_still_plans_and_synthesizes() {
        let manager = Arc::new(ScriptedRunner::replying("lead", &["plan", "answer"]));
        let orchestrator = HierarchicalOrchestrator::new(manager.clone(), Vec::new());

        assert_eq!(orchestrator.run("task", None).await.unwrap(), "answer");
        assert!(manager.tasks()[0].contains("Available workers: \n"));
    }
}
