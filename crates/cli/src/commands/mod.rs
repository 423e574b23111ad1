//! CLI subcommand implementations.

pub mod config_cmd;
pub mod orchestrate;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use agentflow_agent::Agent;
use agentflow_config::AppConfig;
use agentflow_core::{AgentConfig, TaskContext};
use agentflow_providers::{CompletionClient, GenerationParams};
use agentflow_tools::default_registry;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config at `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, agentflow_config::ConfigError> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    if !config.has_api_key() {
        tracing::warn!("No API key configured (set LLM_API_KEY); requests may be rejected");
    }
    Ok(config)
}

/// Parse `--context` as a JSON object.
pub fn parse_context(raw: Option<&str>) -> Result<Option<TaskContext>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err("--context must be a JSON object".into()),
        Err(e) => Err(format!("--context is not valid JSON: {e}")),
    }
}

/// Build an agent with the calculator tool and the config's sampling settings.
pub fn build_agent(app: &AppConfig, agent: AgentConfig, client: &Arc<CompletionClient>) -> Agent {
    let params = GenerationParams {
        temperature: app.llm.temperature,
        max_tokens: app.llm.max_tokens,
    };
    Agent::new(agent, Arc::clone(client))
        .with_tools(default_registry())
        .with_generation(params)
}

pub fn log_usage(client: &CompletionClient) {
    let stats = client.stats();
    tracing::debug!(
        provider = %stats.provider,
        model = %stats.model,
        requests = stats.request_count,
        tokens = stats.total_tokens,
        "Client usage"
    );
}
