use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Discord snowflake of a channel or thread.
pub type ChannelId = u64;

/// Discord snowflake of a guild (server).
pub type GuildId = u64;

/// Shared, immutable reference to a channel known to the client.
///
/// Handles are compared by identity in the resolver cache: the same `Arc` is
/// returned for every lookup of an already-resolved id.
pub type ChannelHandle = Arc<Channel>;

/// The kind of a Discord channel, mapped from the gateway `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Announcement,
    Voice,
    Category,
    Stage,
    Forum,
    Media,
    Dm,
    GroupDm,
    AnnouncementThread,
    PublicThread,
    PrivateThread,
    Unknown(u64),
}

impl ChannelKind {
    /// Map a Discord API channel type number.
    pub fn from_discord(code: u64) -> Self {
        match code {
            0 => Self::Text,
            1 => Self::Dm,
            2 => Self::Voice,
            3 => Self::GroupDm,
            4 => Self::Category,
            5 => Self::Announcement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::Stage,
            15 => Self::Forum,
            16 => Self::Media,
            other => Self::Unknown(other),
        }
    }

    /// A persistent channel that accepts text messages.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Announcement)
    }

    pub fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }

    pub fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Announcement => f.write_str("announcement"),
            Self::Voice => f.write_str("voice"),
            Self::Category => f.write_str("category"),
            Self::Stage => f.write_str("stage"),
            Self::Forum => f.write_str("forum"),
            Self::Media => f.write_str("media"),
            Self::Dm => f.write_str("dm"),
            Self::GroupDm => f.write_str("group_dm"),
            Self::AnnouncementThread => f.write_str("announcement_thread"),
            Self::PublicThread => f.write_str("public_thread"),
            Self::PrivateThread => f.write_str("private_thread"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// A destination in the chat network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// Owning guild (None for direct messages).
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Parent category for channels, parent channel for threads.
    #[serde(default)]
    pub parent_id: Option<ChannelId>,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            guild_id: None,
            parent_id: None,
        }
    }

    pub fn in_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn with_parent(mut self, parent_id: ChannelId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// A text channel or a thread: the two kinds a message can be posted to
    /// by the framework.
    pub fn is_text_or_thread(&self) -> bool {
        self.kind.is_text() || self.kind.is_thread()
    }

    /// A channel that belongs to a guild and is not a thread.
    pub fn is_guild_channel(&self) -> bool {
        self.guild_id.is_some() && !self.kind.is_thread() && !self.kind.is_private()
    }
}

/// The account the client is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    pub id: u64,
    pub name: String,
}
