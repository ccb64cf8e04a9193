use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use concord_channels::ChannelResolver;
use concord_config::BotConfig;
use concord_core::{ChatClient, ClientEvent, Cog, ConcordError, IncomingMessage, Result};
use concord_tools::{
    CapabilityFilter, DEFAULT_ARTIFACT_NAME, ExtensionCatalog, FactoryRegistry, LoadedExtension,
};

use crate::builtin::{OnConnecting, OnReady};
use crate::log_relay::LogRelay;
use crate::tools;

/// Prefix that turns a message into a command.
pub const COMMAND_PREFIX: &str = "/";

const GREETING: &str = "Good morning, Master.\nGood work today.";
const NO_COMMANDS: &str = "No commands available";

/// A running bot: the client, its configuration, its channels and its tools.
///
/// Tools are discovered and registered when the client first becomes ready.
/// Each tool is constructed with the agent itself as its only dependency.
pub struct Agent {
    client: Arc<dyn ChatClient>,
    config: BotConfig,
    channels: ChannelResolver,
    catalog: ExtensionCatalog<Agent>,
    tool_directory_paths: Vec<PathBuf>,
    log_relay: LogRelay,
    started: AtomicBool,
    loaded_tools: Mutex<Vec<String>>,
}

impl Agent {
    pub fn new(
        client: Arc<dyn ChatClient>,
        config: BotConfig,
        tool_directory_paths: Vec<PathBuf>,
    ) -> Result<Self> {
        let channels = ChannelResolver::new(Arc::clone(&client), config.channel_settings()?);
        Ok(Self {
            client,
            config,
            channels,
            catalog: ExtensionCatalog::new(tools::default_registry()),
            tool_directory_paths,
            log_relay: LogRelay::new(),
            started: AtomicBool::new(false),
            loaded_tools: Mutex::new(Vec::new()),
        })
    }

    /// Replace the factories tools can be built from.
    pub fn with_registry(mut self, registry: FactoryRegistry<Agent>) -> Self {
        self.catalog = ExtensionCatalog::new(registry);
        self
    }

    /// Use a relay whose layer is already installed in the subscriber.
    pub fn with_log_relay(mut self, relay: LogRelay) -> Self {
        self.log_relay = relay;
        self
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn channels(&self) -> &ChannelResolver {
        &self.channels
    }

    pub fn log_relay(&self) -> &LogRelay {
        &self.log_relay
    }

    pub fn tool_directory_paths(&self) -> &[PathBuf] {
        &self.tool_directory_paths
    }

    /// Names of the tools registered at start-up.
    pub fn loaded_tools(&self) -> Vec<String> {
        self.loaded_tools.lock().clone()
    }

    /// Post to the developer channel.
    pub async fn send_to_dev(&self, content: &str) -> Result<()> {
        let channel = self.channels.dev_channel()?;
        self.client.send_message(channel.id, content).await
    }

    /// Connect and process events until the connection ends or start-up fails.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let name = self.config.name().unwrap_or_else(|_| "unnamed".into());
        info!(bot = %name, "starting agent");
        let mut events = self.client.start().await?;

        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Connected => {
                    debug!("gateway connected");
                    for cog in self.client.cogs() {
                        if let Err(e) = cog.on_connect().await {
                            error!(cog = cog.name(), error = %e, "on_connect failed");
                        }
                    }
                }
                ClientEvent::Ready => {
                    if !self.started.swap(true, Ordering::SeqCst)
                        && let Err(e) = self.on_ready().await
                    {
                        error!(error = %e, "start-up failed");
                        self.unload_all().await;
                        self.client.stop().await?;
                        return Err(e);
                    }
                    for cog in self.client.cogs() {
                        if let Err(e) = cog.on_ready().await {
                            error!(cog = cog.name(), error = %e, "on_ready failed");
                        }
                    }
                }
                ClientEvent::Message(message) => self.dispatch(&message).await,
                ClientEvent::Disconnected(reason) => {
                    warn!(?reason, "gateway disconnected");
                }
            }
        }

        info!("event stream closed, unloading tools");
        self.unload_all().await;
        Ok(())
    }

    /// Start-up sequence, run once on the first ready event.
    async fn on_ready(self: &Arc<Self>) -> Result<()> {
        info!("function `on_ready` called");

        let loaded = self.register_cogs().await?;
        info!(tools = ?loaded, "load extension from `tool_directory_paths`");
        *self.loaded_tools.lock() = loaded.clone();

        info!("{}", self.greetings()?);

        let log_channel = self.channels.log_channel()?;
        self.log_relay
            .attach(Arc::clone(&self.client), log_channel.id)?;
        info!("Enabled logging to discord");

        self.send_to_dev(GREETING).await?;
        if loaded.is_empty() {
            self.send_to_dev(NO_COMMANDS).await?;
        } else {
            self.send_to_dev(&format!("Available commands:\n{loaded:#?}"))
                .await?;
        }
        info!("Sent message to dev channel");
        Ok(())
    }

    pub fn greetings(&self) -> Result<String> {
        let user = self.client.current_user().ok_or_else(|| {
            error!("client has no logged-in user");
            ConcordError::Other(anyhow::anyhow!("user is None"))
        })?;
        Ok(format!(
            "Logged in as {} ({}) | Guilds: {} | Channels: {}",
            user.name,
            user.id,
            self.client.guild_count(),
            self.client.all_channels().len()
        ))
    }

    /// Register the built-in cogs and every discovered tool as one batch.
    ///
    /// On failure every cog registered by this call is removed and unloaded
    /// before the error is returned.
    async fn register_cogs(self: &Arc<Self>) -> Result<Vec<String>> {
        let mut batch: Vec<Arc<dyn Cog>> = Vec::new();
        match self.register_into(&mut batch).await {
            Ok(loaded) => Ok(loaded),
            Err(e) => {
                error!(error = %e, registered = batch.len(), "registration failed, rolling back");
                for cog in batch.iter().rev() {
                    self.client.remove_cog(cog.name()).await;
                    cog.unload().await;
                }
                Err(e)
            }
        }
    }

    async fn register_into(self: &Arc<Self>, batch: &mut Vec<Arc<dyn Cog>>) -> Result<Vec<String>> {
        let builtins: [Arc<dyn Cog>; 2] = [
            Arc::new(OnConnecting),
            Arc::new(OnReady::new(Arc::clone(&self.client))),
        ];
        for cog in builtins {
            self.client.add_cog(Arc::clone(&cog)).await?;
            batch.push(cog);
        }
        info!("add cog `OnConnecting` and `OnReady`");

        let include = [DEFAULT_ARTIFACT_NAME.to_string()];
        let extensions = self.catalog.discover(
            &self.tool_directory_paths,
            Some(&include),
            Some(&CapabilityFilter::cog()),
        )?;

        let exclusions = self.config.tool_exclusions();
        let mut loaded = Vec::new();
        for extension in &extensions {
            if exclusions.iter().any(|name| name == extension.name()) {
                info!(tool = extension.name(), origin = %extension.origin, "tool excluded by configuration");
                continue;
            }
            let cog = self.construct(extension)?;
            if let Err(e) = self.client.add_cog(Arc::clone(&cog)).await {
                error!(tool = extension.name(), error = %e, "failed to register tool");
                cog.unload().await;
                return Err(e);
            }
            batch.push(cog);
            loaded.push(extension.name().to_string());
        }
        Ok(loaded)
    }

    fn construct(self: &Arc<Self>, extension: &LoadedExtension<Agent>) -> Result<Arc<dyn Cog>> {
        extension.construct(Arc::clone(self)).map_err(|e| {
            error!(
                tool = extension.name(),
                origin = %extension.origin,
                error = ?e,
                "failed to construct tool"
            );
            ConcordError::Extension {
                name: extension.name().to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Every cog sees every message; prefixed commands also reach the cogs declaring them.
    async fn dispatch(&self, message: &IncomingMessage) {
        let command = message.command_name(COMMAND_PREFIX);
        for cog in self.client.cogs() {
            if let Err(e) = cog.on_message(message).await {
                error!(cog = cog.name(), error = %e, "on_message failed");
            }
            let Some(command) = command else { continue };
            if cog.commands().iter().any(|c| c.name == command)
                && let Err(e) = cog.on_command(command, message).await
            {
                error!(cog = cog.name(), command, error = %e, "command failed");
            }
        }
    }

    async fn unload_all(&self) {
        for cog in self.client.cogs().iter().rev() {
            self.client.remove_cog(cog.name()).await;
            cog.unload().await;
        }
        self.log_relay.detach();
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("tool_directory_paths", &self.tool_directory_paths)
            .field("channels", &self.channels)
            .field("loaded_tools", &self.loaded_tools.lock())
            .finish()
    }
}
