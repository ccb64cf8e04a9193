use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelId, GuildId};

/// A message received from the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: u64,
    pub channel_id: ChannelId,
    /// None for direct messages.
    pub guild_id: Option<GuildId>,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    /// Join notices, pins and other messages generated by Discord itself.
    pub is_system: bool,
    pub content: String,
}

impl IncomingMessage {
    /// Extract the command name when the content starts with `prefix`.
    pub fn command_name(&self, prefix: &str) -> Option<&str> {
        self.content
            .strip_prefix(prefix)?
            .split_whitespace()
            .next()
            .filter(|name| !name.is_empty())
    }
}

/// A command a cog answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A unit of bot behaviour registered with the client.
///
/// Every hook has a no-op default so a cog implements only what it listens to.
#[async_trait]
pub trait Cog: Send + Sync {
    /// Unique name; the client rejects a second cog with the same name.
    fn name(&self) -> &str;

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    async fn on_connect(&self) -> crate::Result<()> {
        Ok(())
    }

    async fn on_ready(&self) -> crate::Result<()> {
        Ok(())
    }

    async fn on_message(&self, _message: &IncomingMessage) -> crate::Result<()> {
        Ok(())
    }

    async fn on_command(&self, _command: &str, _message: &IncomingMessage) -> crate::Result<()> {
        Ok(())
    }

    /// Called when the cog is removed from the client. Background tasks stop here.
    async fn unload(&self) {}
}
