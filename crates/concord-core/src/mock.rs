//! Scripted chat client for deterministic testing.
//!
//! Serves channels from memory, counts lookups, and records every message
//! instead of sending it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::channel::{BotUser, Channel, ChannelHandle, ChannelId};
use crate::client::{ChatClient, ClientEvent};
use crate::cog::{Cog, IncomingMessage};
use crate::error::{ConcordError, Result};

/// A message recorded by [`MockChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub content: String,
    /// Set when the message was sent as a reply.
    pub reply_to: Option<u64>,
}

/// An in-memory [`ChatClient`].
///
/// # Example
/// ```
/// use concord_core::mock::MockChatClient;
/// use concord_core::{Channel, ChannelKind, ChatClient};
///
/// let client = MockChatClient::new()
///     .with_channel(Channel::new(1, "general", ChannelKind::Text).in_guild(9));
/// assert!(client.get_channel(1).is_some());
/// assert_eq!(client.lookup_count(1), 1);
/// ```
pub struct MockChatClient {
    channels: Mutex<Vec<Channel>>,
    user: Option<BotUser>,
    guilds: usize,
    events: Mutex<Vec<ClientEvent>>,
    lookups: Mutex<HashMap<ChannelId, usize>>,
    scans: AtomicUsize,
    cogs: Mutex<Vec<Arc<dyn Cog>>>,
    rejected_cogs: HashSet<String>,
    failing_channels: HashSet<ChannelId>,
    /// Every message sent or replied, in order.
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(Vec::new()),
            user: Some(BotUser {
                id: 4242,
                name: "mock-bot".into(),
            }),
            guilds: 1,
            events: Mutex::new(Vec::new()),
            lookups: Mutex::new(HashMap::new()),
            scans: AtomicUsize::new(0),
            cogs: Mutex::new(Vec::new()),
            rejected_cogs: HashSet::new(),
            failing_channels: HashSet::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_channel(self, channel: Channel) -> Self {
        self.channels.lock().push(channel);
        self
    }

    pub fn with_user(mut self, user: Option<BotUser>) -> Self {
        self.user = user;
        self
    }

    /// Events returned by `start()`, in order. The stream ends after the last one.
    pub fn with_events(self, events: Vec<ClientEvent>) -> Self {
        *self.events.lock() = events;
        self
    }

    /// Make `add_cog` fail for a cog with this name.
    pub fn rejecting_cog(mut self, name: &str) -> Self {
        self.rejected_cogs.insert(name.to_string());
        self
    }

    /// Make every send to this channel fail.
    pub fn failing_channel(mut self, id: ChannelId) -> Self {
        self.failing_channels.insert(id);
        self
    }

    /// How many times `get_channel` was called for this id.
    pub fn lookup_count(&self, id: ChannelId) -> usize {
        self.lookups.lock().get(&id).copied().unwrap_or(0)
    }

    /// How many times `all_channels` was called.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn cog_names(&self) -> Vec<String> {
        self.cogs.lock().iter().map(|c| c.name().to_string()).collect()
    }

    fn record(&self, channel: ChannelId, content: &str, reply_to: Option<u64>) -> Result<()> {
        if self.failing_channels.contains(&channel) {
            return Err(ConcordError::Channel {
                channel: channel.to_string(),
                reason: "send rejected by mock".into(),
            });
        }
        self.sent.lock().push(SentMessage {
            channel,
            content: content.to_string(),
            reply_to,
        });
        Ok(())
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn start(&self) -> Result<mpsc::Receiver<ClientEvent>> {
        let events: Vec<ClientEvent> = std::mem::take(&mut *self.events.lock());
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every scripted event.
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn get_channel(&self, id: ChannelId) -> Option<ChannelHandle> {
        *self.lookups.lock().entry(id).or_insert(0) += 1;
        // A fresh allocation per call, like a client rebuilding its view.
        self.channels
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .map(Arc::new)
    }

    fn all_channels(&self) -> Vec<ChannelHandle> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.channels
            .lock()
            .iter()
            .filter(|c| c.is_guild_channel())
            .cloned()
            .map(Arc::new)
            .collect()
    }

    fn current_user(&self) -> Option<BotUser> {
        self.user.clone()
    }

    fn guild_count(&self) -> usize {
        self.guilds
    }

    async fn add_cog(&self, cog: Arc<dyn Cog>) -> Result<()> {
        let name = cog.name().to_string();
        if self.rejected_cogs.contains(&name) {
            return Err(ConcordError::Extension {
                name,
                reason: "registration rejected by mock".into(),
            });
        }
        let mut cogs = self.cogs.lock();
        if cogs.iter().any(|c| c.name() == name) {
            return Err(ConcordError::Extension {
                name,
                reason: "cog already loaded".into(),
            });
        }
        cogs.push(cog);
        Ok(())
    }

    async fn remove_cog(&self, name: &str) -> Option<Arc<dyn Cog>> {
        let mut cogs = self.cogs.lock();
        let index = cogs.iter().position(|c| c.name() == name)?;
        Some(cogs.remove(index))
    }

    fn cogs(&self) -> Vec<Arc<dyn Cog>> {
        self.cogs.lock().clone()
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<()> {
        self.record(channel, content, None)
    }

    async fn reply(&self, message: &IncomingMessage, content: &str) -> Result<()> {
        self.record(message.channel_id, content, Some(message.id))
    }
}
