//! A starting point for new tools.
//!
//! ```toml
//! [TestTool]
//! factory = "template"
//! command = "template_tool_command1"   # optional
//! iterations = 5                       # optional
//! interval_secs = 10                   # optional
//! ```
//!
//! The tool runs a background task that posts `Task! <n>` to the developer
//! channel `iterations` times, then `END!`. It echoes every message written
//! by a person and answers its command with `Accept`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use concord_core::{Cog, CommandSpec, ConcordError, IncomingMessage, Result};
use concord_tools::{Capability, CapabilitySet, ToolDefinition, ToolFactory};

use crate::agent::Agent;

pub const TEMPLATE_FACTORY: &str = "template";
const DEFAULT_COMMAND: &str = "template_tool_command";
const DEFAULT_ITERATIONS: u32 = 5;
const DEFAULT_INTERVAL_SECS: u64 = 10;

pub struct TemplateToolFactory;

impl ToolFactory<Agent> for TemplateToolFactory {
    fn name(&self) -> &str {
        TEMPLATE_FACTORY
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([
            Capability::Cog,
            Capability::Listener,
            Capability::Command,
            Capability::Task,
        ])
    }

    fn construct(&self, definition: &ToolDefinition, agent: Arc<Agent>) -> Result<Arc<dyn Cog>> {
        let command = definition
            .setting::<String>("command")?
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        let iterations = definition
            .setting::<u32>("iterations")?
            .unwrap_or(DEFAULT_ITERATIONS);
        let interval_secs = definition
            .setting::<u64>("interval_secs")?
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConcordError::Extension {
                name: definition.name.clone(),
                reason: "interval_secs must be positive".into(),
            });
        }

        let tool = TemplateTool {
            name: definition.name.clone(),
            command,
            agent: Arc::clone(&agent),
            task: Mutex::new(None),
        };
        tool.start_task(iterations, Duration::from_secs(interval_secs));
        Ok(Arc::new(tool))
    }
}

pub struct TemplateTool {
    name: String,
    command: String,
    agent: Arc<Agent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TemplateTool {
    fn start_task(&self, iterations: u32, period: Duration) {
        let agent = Arc::clone(&self.agent);
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = run_task(&agent, iterations, period).await {
                error!(tool = %name, error = %e, "template task failed");
            }
        });
        *self.task.lock() = Some(handle);
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_task_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

/// First tick fires immediately, like a loop started at construction.
async fn run_task(agent: &Agent, iterations: u32, period: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    for n in 0..iterations {
        ticker.tick().await;
        agent.send_to_dev(&format!("Task! {n}")).await?;
    }
    agent.send_to_dev("END!").await
}

#[async_trait]
impl Cog for TemplateTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new(&self.command, "Template command")]
    }

    async fn on_message(&self, message: &IncomingMessage) -> Result<()> {
        if message.is_system || message.author_is_bot {
            return Ok(());
        }
        if message.content.is_empty() {
            debug!(tool = %self.name, "nothing to echo");
            return Ok(());
        }
        self.agent.client().reply(message, &message.content).await
    }

    async fn on_command(&self, command: &str, message: &IncomingMessage) -> Result<()> {
        if command != self.command {
            return Ok(());
        }
        info!(tool = %self.name, command, "command accepted");
        self.agent
            .client()
            .send_message(message.channel_id, "Accept")
            .await
    }

    async fn unload(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!(tool = %self.name, "template task stopped");
        }
    }
}
