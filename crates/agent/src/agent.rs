//! The agent reasoning loop.
//!
//! One [`Agent`] binds a completion client, a tool registry and a system
//! prompt. A run walks the loop below until the model gives an answer, the
//! model call fails, or the iteration cap is hit:
//!
//! ```text
//! Init -> Iterating -> (ToolDispatch -> Iterating)* -> FinalAnswer | Response | LlmError | MaxIterationsReached
//! ```
//!
//! [`Agent::run`] returns only the terminal outcome. [`Agent::run_with_events`]
//! and [`Agent::run_stream`] drive the same loop with streamed model output
//! and emit an [`AgentEvent`] at each step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agentflow_core::agent::{AgentConfig, HISTORY_WINDOW, TaskContext};
use agentflow_core::error::ProviderError;
use agentflow_core::message::{self, Message};
use agentflow_core::tool::{Tool, ToolInvocation, ToolRegistry, ToolResult};
use agentflow_providers::{CompletionClient, GenerationParams};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::directive::{Directive, parse_directive};
use crate::event::AgentEvent;
use crate::log::{ExecutionLogEntry, LogKind};
use crate::prompt::build_system_prompt;

/// Returned when the loop runs out of iterations.
pub const MAX_ITERATIONS_MESSAGE: &str = "Maximum iterations reached. Task may be incomplete.";

const EVENT_BUFFER: usize = 128;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The model returned a structured final answer.
    FinalAnswer(String),
    /// The model answered in plain text.
    Response(String),
    /// The iteration cap was reached without an answer.
    MaxIterationsReached,
    /// A model call failed. Carries `LLM API error: ...`.
    LlmError(String),
}

impl AgentOutcome {
    /// The text handed back to the caller.
    pub fn text(&self) -> &str {
        match self {
            AgentOutcome::FinalAnswer(text) | AgentOutcome::Response(text) | AgentOutcome::LlmError(text) => text,
            AgentOutcome::MaxIterationsReached => MAX_ITERATIONS_MESSAGE,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentOutcome::LlmError(_))
    }
}

/// The result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    pub outcome: AgentOutcome,
    /// Model calls made
    pub iterations: usize,
    pub tool_calls_made: usize,
}

impl AgentRun {
    pub fn text(&self) -> &str {
        self.outcome.text()
    }
}

#[derive(Debug, Default)]
struct AgentState {
    history: Vec<Message>,
    log: Vec<ExecutionLogEntry>,
}

/// A single reasoning agent.
pub struct Agent {
    config: AgentConfig,
    client: Arc<CompletionClient>,
    tools: ToolRegistry,
    system_prompt: String,
    params: GenerationParams,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Create an agent with no tools.
    pub fn new(config: AgentConfig, client: Arc<CompletionClient>) -> Self {
        let system_prompt = build_system_prompt(&config, &[]);
        Self {
            config,
            client,
            tools: ToolRegistry::new(),
            system_prompt,
            params: GenerationParams::default(),
            state: Mutex::new(AgentState::default()),
        }
    }

    /// Replace the tool set.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self.rebuild_prompt();
        self
    }

    /// Set sampling parameters for every model call.
    pub fn with_generation(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        if let Some(previous) = self.tools.insert(tool) {
            debug!(agent = %self.config.name, tool = %previous.name(), "Replaced tool");
        }
        self.rebuild_prompt();
    }

    /// Remove a tool by name. Returns whether it was registered.
    pub fn remove_tool(&mut self, name: &str) -> bool {
        let removed = self.tools.remove(name).is_some();
        if removed {
            self.rebuild_prompt();
        }
        removed
    }

    fn rebuild_prompt(&mut self) {
        self.system_prompt = build_system_prompt(&self.config, &self.tools.descriptors());
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<CompletionClient> {
        &self.client
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Conversation history carried across runs (empty when memory is off).
    pub fn history(&self) -> Vec<Message> {
        self.state().history.clone()
    }

    pub fn clear_memory(&self) {
        self.state().history.clear();
    }

    pub fn execution_log(&self) -> Vec<ExecutionLogEntry> {
        self.state().log.clone()
    }

    pub fn clear_execution_log(&self) {
        self.state().log.clear();
    }

    /// Run `task` to completion.
    pub async fn run(&self, task: &str, context: Option<&TaskContext>) -> AgentRun {
        self.drive(task, context, None).await
    }

    /// Run `task` with streamed model output, sending an event for every
    /// step to `events`. The run continues if the receiver goes away.
    pub async fn run_with_events(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        events: &mpsc::Sender<AgentEvent>,
    ) -> AgentRun {
        self.drive(task, context, Some(events)).await
    }

    /// Spawn [`run_with_events`](Self::run_with_events) and return the
    /// event receiver. The last event received is always terminal.
    pub fn run_stream(self: &Arc<Self>, task: impl Into<String>, context: Option<TaskContext>) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = Arc::clone(self);
        let task = task.into();

        tokio::spawn(async move {
            agent.run_with_events(&task, context.as_ref(), &tx).await;
        });

        rx
    }

    async fn drive(
        &self,
        task: &str,
        context: Option<&TaskContext>,
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> AgentRun {
        let max_iterations = self.config.max_iterations;
        let mut messages = self.prepare_messages(task, context);
        self.remember([Message::user(task)]);

        info!(
            agent = %self.config.name,
            max_iterations,
            streaming = events.is_some(),
            "Agent run starting"
        );

        let mut tool_calls_made = 0;
        for iteration in 1..=max_iterations {
            emit(events, AgentEvent::Iteration { iteration, max_iterations }).await;
            debug!(agent = %self.config.name, iteration, "Calling model");

            let content = match self.call_model(&messages, events).await {
                Ok(content) => content,
                Err(e) => {
                    let text = format!("LLM API error: {e}");
                    error!(agent = %self.config.name, iteration, error = %e, "Model call failed");
                    self.log(LogKind::Error, Value::String(text.clone()));
                    emit(events, AgentEvent::Error { content: text.clone() }).await;
                    return AgentRun {
                        outcome: AgentOutcome::LlmError(text),
                        iterations: iteration,
                        tool_calls_made,
                    };
                }
            };
            self.log(LogKind::LlmResponse, Value::String(content.clone()));

            let directive = parse_directive(&content);
            if let Some(thought) = directive.thought() {
                emit(events, AgentEvent::Thought { content: thought.to_string() }).await;
            }

            let outcome = match directive {
                Directive::FinalAnswer { answer, .. } => {
                    emit(events, AgentEvent::FinalAnswer { content: answer.clone() }).await;
                    AgentOutcome::FinalAnswer(answer)
                }
                Directive::Plain => {
                    emit(events, AgentEvent::Response { content: content.clone() }).await;
                    AgentOutcome::Response(content.clone())
                }
                Directive::ToolCall { invocation, .. } => {
                    tool_calls_made += 1;
                    emit(
                        events,
                        AgentEvent::ToolCall {
                            tool: invocation.tool_name.clone(),
                            arguments: invocation.arguments.clone(),
                        },
                    )
                    .await;

                    let result = self.dispatch(&invocation).await;
                    let observation = format!("Tool result: {}", result.to_json());
                    emit(
                        events,
                        AgentEvent::ToolResult {
                            tool: invocation.tool_name,
                            result,
                        },
                    )
                    .await;

                    let step = [Message::assistant(content), Message::user(observation)];
                    messages.extend(step.iter().cloned());
                    self.remember(step);
                    continue;
                }
            };

            self.remember([Message::assistant(content)]);
            info!(agent = %self.config.name, iterations = iteration, tool_calls = tool_calls_made, "Agent run finished");
            return AgentRun {
                outcome,
                iterations: iteration,
                tool_calls_made,
            };
        }

        warn!(agent = %self.config.name, max_iterations, "Max iterations reached");
        emit(
            events,
            AgentEvent::MaxIterations {
                content: MAX_ITERATIONS_MESSAGE.to_string(),
            },
        )
        .await;
        AgentRun {
            outcome: AgentOutcome::MaxIterationsReached,
            iterations: max_iterations,
            tool_calls_made,
        }
    }

    /// `[system prompt, recent history, task]`, with the context serialized
    /// in front of the task when one is given.
    fn prepare_messages(&self, task: &str, context: Option<&TaskContext>) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt.as_str())];

        if self.config.memory_enabled {
            let state = self.state();
            messages.extend_from_slice(message::recent(&state.history, HISTORY_WINDOW));
        }

        let task = match context.filter(|ctx| !ctx.is_empty()) {
            Some(ctx) => format!("Additional context: {}\n\n{task}", Value::Object(ctx.clone())),
            None => task.to_string(),
        };
        messages.push(Message::user(task));
        messages
    }

    /// One model call. With an event sink the response is streamed and
    /// forwarded chunk by chunk.
    async fn call_model(
        &self,
        messages: &[Message],
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<String, ProviderError> {
        let Some(tx) = events else {
            let completion = self.client.complete(messages, &self.params).await?;
            return Ok(completion.content);
        };

        let mut stream = self.client.stream(messages, &self.params).await?;
        emit(Some(tx), AgentEvent::ThoughtStart).await;

        let mut content = String::new();
        let mut failure = None;
        while let Some(chunk) = stream.next_chunk().await {
            match chunk {
                Ok(text) => {
                    content.push_str(&text);
                    emit(Some(tx), AgentEvent::ThoughtChunk { content: text }).await;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        emit(Some(tx), AgentEvent::ThoughtEnd).await;
        match failure {
            Some(e) => Err(e),
            None => Ok(content),
        }
    }

    /// Run one tool call. Never fails: every error becomes a failed result.
    async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        self.log(
            LogKind::ToolCall,
            json!({ "tool": invocation.tool_name, "parameters": invocation.arguments }),
        );
        debug!(agent = %self.config.name, tool = %invocation.tool_name, "Dispatching tool");

        match self.tools.invoke(invocation).await {
            Ok(result) => {
                self.log(LogKind::ToolResult, result.to_json());
                result
            }
            Err(e) => {
                warn!(agent = %self.config.name, tool = %invocation.tool_name, error = %e, "Tool call failed");
                let result = ToolResult::from(e);
                self.log(LogKind::ToolError, result.to_json());
                result
            }
        }
    }

    fn remember(&self, messages: impl IntoIterator<Item = Message>) {
        if self.config.memory_enabled {
            self.state().history.extend(messages);
        }
    }

    fn log(&self, kind: LogKind, payload: Value) {
        self.state().log.push(ExecutionLogEntry::new(kind, payload));
    }

    fn state(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("role", &self.config.role)
            .field("tools", &self.tools.names())
            .field("client", &self.client)
            .finish()
    }
}

async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
