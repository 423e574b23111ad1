//! agentflow CLI, the main entry point.
//!
//! Commands:
//! - `run`          Run one agent on a task
//! - `orchestrate`  Run several agents under a coordination policy
//! - `config`       Print or write the default configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::orchestrate::{AgentSpec, Mode};

#[derive(Parser)]
#[command(
    name = "agentflow",
    about = "agentflow: LLM agents with tools and multi-agent orchestration",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.agentflow/config.toml
    #[arg(short, long, global = true, env = "AGENTFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single agent on a task
    Run {
        /// The task to perform
        task: String,

        /// Extra context as a JSON object
        #[arg(long)]
        context: Option<String>,

        /// Print model output as it arrives
        #[arg(short, long)]
        stream: bool,

        /// Override the configured iteration cap
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Do not carry conversation history
        #[arg(long)]
        no_memory: bool,

        /// Use the plain tool/parameters prompt instead of structured reasoning
        #[arg(long)]
        plain: bool,
    },

    /// Run several agents together
    Orchestrate {
        #[arg(value_enum)]
        mode: Mode,

        /// The task to perform
        task: String,

        /// A participating agent as `name=role` (repeatable)
        #[arg(short, long = "agent", value_name = "NAME=ROLE")]
        agents: Vec<AgentSpec>,

        /// Manager agent for hierarchical mode
        #[arg(long, value_name = "NAME=ROLE")]
        manager: Option<AgentSpec>,

        /// Router agent for conditional mode
        #[arg(long, value_name = "NAME=ROLE")]
        router: Option<AgentSpec>,

        /// Fallback agent name for conditional mode
        #[arg(long)]
        default: Option<String>,

        /// Extra context as a JSON object
        #[arg(long)]
        context: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            task,
            context,
            stream,
            max_iterations,
            no_memory,
            plain,
        } => {
            let options = commands::run::RunOptions {
                context,
                stream,
                max_iterations,
                no_memory,
                plain,
            };
            commands::run::run(config_path, &task, options).await?
        }
        Commands::Orchestrate {
            mode,
            task,
            agents,
            manager,
            router,
            default,
            context,
        } => {
            let plan = commands::orchestrate::Plan {
                mode,
                agents,
                manager,
                router,
                default,
                context,
            };
            commands::orchestrate::run(config_path, &task, plan).await?
        }
        Commands::Config { init } => commands::config_cmd::run(config_path, init)?,
    }

    Ok(())
}
