//! Scripted runners for orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use agentflow_agent::{AgentError, TaskRunner};
use agentflow_core::agent::TaskContext;
use async_trait::async_trait;

/// What a scripted runner does on each call.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail(String),
    Panic,
}

/// A runner that replays a script and records every task it receives.
///
/// An exhausted script echoes `"{name}: {task}"`.
pub struct ScriptedRunner {
    name: String,
    script: Mutex<VecDeque<Script>>,
    delay: Duration,
    calls: Mutex<Vec<(String, TaskContext)>>,
}

impl ScriptedRunner {
    pub fn new(name: &str, script: Vec<Script>) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(name: &str, replies: &[&str]) -> Self {
        Self::new(name, replies.iter().map(|r| Script::Reply(r.to_string())).collect())
    }

    pub fn echo(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn tasks(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(task, _)| task.clone()).collect()
    }

    pub fn contexts(&self) -> Vec<TaskContext> {
        self.calls.lock().unwrap().iter().map(|(_, ctx)| ctx.clone()).collect()
    }
}

#[async_trait]
impl TaskRunner for ScriptedRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &str, context: Option<&TaskContext>) -> Result<String, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((task.to_string(), context.cloned().unwrap_or_default()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Fail(message)) => Err(AgentError::Failed(message)),
            Some(Script::Panic) => panic!("{} blew up", self.name),
            None => Ok(format!("{}: {task}", self.name)),
        }
    }
}
