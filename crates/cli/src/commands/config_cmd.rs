//! `agentflow config`: show or initialise configuration.

use std::path::Path;

use agentflow_config::AppConfig;

use super::{CommandResult, load_config};

pub fn run(config_path: Option<&Path>, init: bool) -> CommandResult {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if init {
        return write_default(&path);
    }

    let config = load_config(config_path)?;
    println!("Config file: {}", path.display());
    println!("  Dialect:     {:?}", config.llm.dialect);
    println!("  Endpoint:    {}", config.llm.api_url.as_deref().unwrap_or("(dialect default)"));
    println!("  Model:       {}", config.llm.model);
    println!("  API key:     {}", if config.has_api_key() { "set" } else { "not set" });
    println!("  Timeout:     {}s", config.llm.timeout_secs);
    println!("  Attempts:    {}", config.llm.max_retries);
    println!("  Agent:       {} ({})", config.agent.name, config.agent.role);
    println!("  Iterations:  {}", config.agent.max_iterations);
    println!("  Memory:      {}", config.agent.memory_enabled);
    println!("  Max workers: {}", config.orchestrator.max_workers);
    Ok(())
}

fn write_default(path: &Path) -> CommandResult {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
