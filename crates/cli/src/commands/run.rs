//! `agentflow run`: one agent, one task.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use agentflow_agent::AgentEvent;
use agentflow_core::ReasoningStyle;
use agentflow_providers::CompletionClient;

use super::{CommandResult, build_agent, load_config, log_usage, parse_context};

pub struct RunOptions {
    pub context: Option<String>,
    pub stream: bool,
    pub max_iterations: Option<usize>,
    pub no_memory: bool,
    pub plain: bool,
}

pub async fn run(config_path: Option<&Path>, task: &str, options: RunOptions) -> CommandResult {
    let app = load_config(config_path)?;
    let context = parse_context(options.context.as_deref())?;

    let mut agent_config = app.agent.clone();
    if let Some(max) = options.max_iterations {
        agent_config.max_iterations = max.max(1);
    }
    if options.no_memory {
        agent_config.memory_enabled = false;
    }
    if options.plain {
        agent_config.reasoning = ReasoningStyle::Plain;
    }

    let client = Arc::new(CompletionClient::from_config(&app.llm));
    let agent = Arc::new(build_agent(&app, agent_config, &client));
    tracing::info!(agent = %agent.name(), model = %client.model(), "Running task");

    let failed = if options.stream {
        stream_events(&agent, task, context).await
    } else {
        let run = agent.run(task, context.as_ref()).await;
        tracing::debug!(iterations = run.iterations, tool_calls = run.tool_calls_made, "Run finished");
        println!("{}", run.text());
        run.outcome.is_error()
    };

    log_usage(&client);
    if failed {
        return Err("agent run failed".into());
    }
    Ok(())
}

/// Print events as they arrive. Returns true when the run ended in an error.
async fn stream_events(
    agent: &Arc<agentflow_agent::Agent>,
    task: &str,
    context: Option<agentflow_core::TaskContext>,
) -> bool {
    let mut events = agent.run_stream(task, context);
    let mut stdout = std::io::stdout();
    let mut failed = false;

    while let Some(event) = events.recv().await {
        match event {
            AgentEvent::Iteration { iteration, max_iterations } => {
                eprintln!("[iteration {iteration}/{max_iterations}]");
            }
            AgentEvent::ThoughtChunk { content } => {
                let _ = write!(stdout, "{content}");
                let _ = stdout.flush();
            }
            AgentEvent::ThoughtEnd => println!(),
            AgentEvent::ToolCall { tool, arguments } => {
                eprintln!("-> {tool} {}", serde_json::Value::Object(arguments));
            }
            AgentEvent::ToolResult { tool, result } => {
                let shown = serde_json::to_string(&result).unwrap_or_default();
                eprintln!("<- {tool} {shown}");
            }
            AgentEvent::FinalAnswer { content }
            | AgentEvent::Response { content }
            | AgentEvent::MaxIterations { content } => {
                println!("\n{content}");
            }
            AgentEvent::Error { content } => {
                eprintln!("{content}");
                failed = true;
            }
            AgentEvent::ThoughtStart | AgentEvent::Thought { .. } => {}
        }
    }
    failed
}
