//! `agentflow orchestrate`: several agents under one coordination policy.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use agentflow_core::AgentConfig;
use agentflow_orchestrator::{
    ConditionalOrchestrator, HierarchicalOrchestrator, Orchestrator, ParallelOrchestrator, SequentialOrchestrator,
    TaskRunner,
};
use agentflow_providers::CompletionClient;
use clap::ValueEnum;

use super::{CommandResult, build_agent, load_config, log_usage, parse_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Sequential,
    Parallel,
    Hierarchical,
    Conditional,
}

/// `name=role` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    pub role: String,
}

impl FromStr for AgentSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, role) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=ROLE, got '{s}'"))?;
        let (name, role) = (name.trim(), role.trim());
        if name.is_empty() || role.is_empty() {
            return Err(format!("expected NAME=ROLE, got '{s}'"));
        }
        Ok(Self {
            name: name.to_string(),
            role: role.to_string(),
        })
    }
}

pub struct Plan {
    pub mode: Mode,
    pub agents: Vec<AgentSpec>,
    pub manager: Option<AgentSpec>,
    pub router: Option<AgentSpec>,
    pub default: Option<String>,
    pub context: Option<String>,
}

pub async fn run(config_path: Option<&Path>, task: &str, plan: Plan) -> CommandResult {
    let app = load_config(config_path)?;
    let context = parse_context(plan.context.as_deref())?;
    let client = Arc::new(CompletionClient::from_config(&app.llm));

    let runner = |spec: &AgentSpec| -> Arc<dyn TaskRunner> {
        let config = AgentConfig {
            name: spec.name.clone(),
            role: spec.role.clone(),
            ..app.agent.clone()
        };
        Arc::new(build_agent(&app, config, &client))
    };
    let agents: Vec<Arc<dyn TaskRunner>> = plan.agents.iter().map(&runner).collect();
    tracing::info!(mode = ?plan.mode, agents = agents.len(), "Starting orchestration");

    match plan.mode {
        Mode::Sequential => {
            let result = SequentialOrchestrator::new(agents).run(task, context.as_ref()).await?;
            println!("{result}");
        }
        Mode::Parallel => {
            let orchestrator = ParallelOrchestrator::new(agents).with_max_workers(app.orchestrator.max_workers);
            let mut results: Vec<_> = orchestrator.run(task, context.as_ref()).await?.into_iter().collect();
            results.sort();
            for (name, result) in results {
                println!("== {name} ==\n{result}\n");
            }
        }
        Mode::Hierarchical => {
            let manager = plan.manager.as_ref().ok_or("hierarchical mode needs --manager NAME=ROLE")?;
            let result = HierarchicalOrchestrator::new(runner(manager), agents)
                .run(task, context.as_ref())
                .await?;
            println!("{result}");
        }
        Mode::Conditional => {
            let router = plan.router.as_ref().ok_or("conditional mode needs --router NAME=ROLE")?;
            let mut orchestrator = ConditionalOrchestrator::new(runner(router), agents);
            if let Some(default) = plan.default {
                orchestrator = orchestrator.with_default(default);
            }
            let result = orchestrator.run(task, context.as_ref()).await?;
            println!("{result}");
        }
    }

    log_usage(&client);
    Ok(())
}
