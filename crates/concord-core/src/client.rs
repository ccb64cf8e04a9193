use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::channel::{BotUser, ChannelHandle, ChannelId};
use crate::cog::{Cog, IncomingMessage};

/// Events emitted by a running client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transport connected and identified.
    Connected,
    /// Every guild announced at login has been received; channel lookups are usable.
    Ready,
    /// A new message arrived.
    Message(IncomingMessage),
    /// The transport disconnected.
    Disconnected(Option<String>),
}

/// The chat-network client the framework drives.
///
/// Lookups are served from the client's own state and never hit the network;
/// sends and registration are suspend points.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Connect and start receiving events.
    async fn start(&self) -> crate::Result<mpsc::Receiver<ClientEvent>>;

    /// Disconnect gracefully.
    async fn stop(&self) -> crate::Result<()>;

    /// Look up any channel or thread the client can see.
    fn get_channel(&self, id: ChannelId) -> Option<ChannelHandle>;

    /// All guild channels the client can see (threads are not included).
    fn all_channels(&self) -> Vec<ChannelHandle>;

    fn current_user(&self) -> Option<BotUser>;

    fn guild_count(&self) -> usize;

    /// Register a cog. Fails if a cog with the same name is already registered.
    async fn add_cog(&self, cog: Arc<dyn Cog>) -> crate::Result<()>;

    /// Remove a cog by name, returning it if it was registered.
    async fn remove_cog(&self, name: &str) -> Option<Arc<dyn Cog>>;

    /// Registered cogs in registration order.
    fn cogs(&self) -> Vec<Arc<dyn Cog>>;

    async fn send_message(&self, channel: ChannelId, content: &str) -> crate::Result<()>;

    async fn reply(&self, message: &IncomingMessage, content: &str) -> crate::Result<()>;
}
