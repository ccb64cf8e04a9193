use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use concord_config::ChannelSettings;
use concord_core::{ChannelHandle, ChannelId, ChatClient, ConcordError, Result};

/// What [`ChannelResolver::resolve_by_id_or_name`] does when both keys are given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupPriority {
    /// Use the id and ignore the name.
    #[default]
    IdFirst,
    /// Refuse the call.
    RejectBoth,
}

/// Resolves configured channel names and ids to live handles.
///
/// Handles resolved by id are cached for the life of the resolver. The
/// developer and log channels are resolved on first access and memoized.
pub struct ChannelResolver {
    client: Arc<dyn ChatClient>,
    priority: LookupPriority,
    name_to_id: HashMap<String, ChannelId>,
    id_to_name: HashMap<ChannelId, String>,
    dev_channel_id: ChannelId,
    log_channel_id: ChannelId,
    by_id: Mutex<HashMap<ChannelId, ChannelHandle>>,
    dev_channel: Mutex<Option<ChannelHandle>>,
    log_channel: Mutex<Option<ChannelHandle>>,
}

impl ChannelResolver {
    pub fn new(client: Arc<dyn ChatClient>, settings: ChannelSettings) -> Self {
        Self {
            client,
            priority: LookupPriority::default(),
            name_to_id: settings.name_to_id,
            id_to_name: settings.id_to_name,
            dev_channel_id: settings.dev_channel_id,
            log_channel_id: settings.log_channel_id,
            by_id: Mutex::new(HashMap::new()),
            dev_channel: Mutex::new(None),
            log_channel: Mutex::new(None),
        }
    }

    pub fn with_priority(mut self, priority: LookupPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn priority(&self) -> LookupPriority {
        self.priority
    }

    pub fn name_to_id(&self) -> &HashMap<String, ChannelId> {
        &self.name_to_id
    }

    pub fn id_to_name(&self) -> &HashMap<ChannelId, String> {
        &self.id_to_name
    }

    /// A text channel or thread by id, cached after the first successful lookup.
    pub fn resolve_by_id(&self, id: ChannelId) -> Result<ChannelHandle> {
        if let Some(handle) = self.by_id.lock().get(&id) {
            return Ok(Arc::clone(handle));
        }

        let Some(channel) = self.client.get_channel(id) else {
            error!(channel_id = id, "no match channel from channel id");
            return Err(ConcordError::ChannelNotFound(id.to_string()));
        };
        if !channel.is_text_or_thread() {
            error!(channel_id = id, kind = %channel.kind, "not a text channel or thread");
            return Err(ConcordError::WrongChannelKind {
                id,
                kind: channel.kind,
            });
        }

        // A concurrent resolver of the same id may have won; keep its handle.
        let handle = Arc::clone(self.by_id.lock().entry(id).or_insert(channel));
        debug!(channel_id = id, name = %handle.name, "channel cached");
        Ok(handle)
    }

    /// A guild channel by id or by display name. Nothing on this path is cached.
    pub fn resolve_by_id_or_name(
        &self,
        id: Option<ChannelId>,
        name: Option<&str>,
    ) -> Result<ChannelHandle> {
        match (id, name) {
            (None, None) => {
                error!("neither a channel id nor a channel name was given");
                Err(ConcordError::InvalidArguments(
                    "both of `id` and `channel_name` are None".into(),
                ))
            }
            (Some(_), Some(_)) if self.priority == LookupPriority::RejectBoth => {
                error!("both a channel id and a channel name were given");
                Err(ConcordError::InvalidArguments(
                    "both of `id` and `channel_name` are set".into(),
                ))
            }
            (Some(id), _) => self.guild_channel_by_id(id),
            (None, Some(name)) => self.guild_channel_by_name(name),
        }
    }

    fn guild_channel_by_id(&self, id: ChannelId) -> Result<ChannelHandle> {
        let Some(channel) = self.client.get_channel(id) else {
            error!(channel_id = id, "no match");
            return Err(ConcordError::ChannelNotFound(id.to_string()));
        };
        if !channel.is_guild_channel() {
            error!(channel_id = id, "not a channel in this server");
            return Err(ConcordError::NotInGuild {
                id,
                kind: channel.kind,
            });
        }
        Ok(channel)
    }

    fn guild_channel_by_name(&self, name: &str) -> Result<ChannelHandle> {
        let mut matches: Vec<ChannelHandle> = self
            .client
            .all_channels()
            .into_iter()
            .filter(|c| c.name == name)
            .collect();
        match matches.len() {
            0 => {
                error!(name, "no match");
                Err(ConcordError::ChannelNotFound(name.to_string()))
            }
            1 => Ok(matches.remove(0)),
            count => {
                error!(name, count, "too many channels match the name");
                Err(ConcordError::AmbiguousChannelName {
                    name: name.to_string(),
                    count,
                })
            }
        }
    }

    /// The channel configured under `key` in the channel list.
    pub fn get_channel_from_key(&self, key: &str) -> Result<ChannelHandle> {
        let Some(&id) = self.name_to_id.get(key) else {
            error!(key, "no configured channel for key");
            return Err(ConcordError::ChannelNotFound(key.to_string()));
        };
        self.resolve_by_id(id)
    }

    pub fn dev_channel(&self) -> Result<ChannelHandle> {
        Self::memoized(&self.dev_channel, || self.resolve_by_id(self.dev_channel_id))
    }

    pub fn log_channel(&self) -> Result<ChannelHandle> {
        Self::memoized(&self.log_channel, || self.resolve_by_id(self.log_channel_id))
    }

    fn memoized(
        slot: &Mutex<Option<ChannelHandle>>,
        resolve: impl FnOnce() -> Result<ChannelHandle>,
    ) -> Result<ChannelHandle> {
        let mut slot = slot.lock();
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = resolve()?;
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }
}

impl std::fmt::Debug for ChannelResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelResolver")
            .field("priority", &self.priority)
            .field("dev_channel_id", &self.dev_channel_id)
            .field("log_channel_id", &self.log_channel_id)
            .field("cached", &self.by_id.lock().len())
            .finish()
    }
}
