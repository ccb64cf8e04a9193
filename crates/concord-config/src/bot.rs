use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{error, info, warn};

use concord_core::{ChannelId, ConcordError, Result};

use crate::store::ConfigStore;

pub const BOT_SECTION: &str = "Discord.Bot";
pub const API_SECTION: &str = "Discord.API";
pub const DEFAULT_CHANNEL_SECTION: &str = "Discord.DefaultChannel";
pub const TOOL_SECTION: &str = "Discord.Tool";
pub const DEFAULT_CHANNEL_LIST_SECTION: &str = "Discord.Channel";

/// Environment fallback for the bot token when the config file has none.
pub const TOKEN_ENV: &str = "CONCORD_DISCORD_TOKEN";

/// The two channels every bot is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultChannel {
    Dev,
    Log,
}

impl DefaultChannel {
    pub fn option(self) -> &'static str {
        match self {
            Self::Dev => "dev_channel",
            Self::Log => "log_channel",
        }
    }
}

impl fmt::Display for DefaultChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option())
    }
}

/// Everything the channel resolver reads from configuration, resolved once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSettings {
    pub name_to_id: HashMap<String, ChannelId>,
    pub id_to_name: HashMap<ChannelId, String>,
    pub dev_channel_id: ChannelId,
    pub log_channel_id: ChannelId,
}

/// Per-bot configuration, read from `<config dir>/<bot name>.toml`.
///
/// ```toml
/// [Discord.Bot]
/// name = "testbot"
/// description = "A helpful bot"
///
/// [Discord.API]
/// token = "..."
///
/// [Discord.DefaultChannel]
/// dev_channel = 111
/// log_channel = 222
///
/// [Discord.Channel]
/// general = 333
///
/// [Discord.Tool]
/// exclusions = ["TestTool2"]
/// ```
#[derive(Debug, Clone)]
pub struct BotConfig {
    store: ConfigStore,
    channel_list_section: String,
}

impl BotConfig {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            channel_list_section: DEFAULT_CHANNEL_LIST_SECTION.to_string(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(ConfigStore::open(path, true)?))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    fn required(&self, section: &str, option: &str) -> Result<String> {
        self.store.get(section, option).inspect_err(|e| {
            error!(error = %e, "required config value is missing");
        })
    }

    pub fn name(&self) -> Result<String> {
        self.required(BOT_SECTION, "name")
    }

    pub fn description(&self) -> Result<String> {
        self.required(BOT_SECTION, "description")
    }

    /// Bot token: the config file takes priority, the environment is the fallback.
    pub fn discord_token(&self) -> Result<String> {
        match self.store.get(API_SECTION, "token") {
            Ok(token) => Ok(token),
            Err(e) => match std::env::var(TOKEN_ENV) {
                Ok(token) if !token.is_empty() => Ok(token),
                _ => {
                    error!(error = %e, env = TOKEN_ENV, "discord token not configured");
                    Err(e)
                }
            },
        }
    }

    /// Names of tools that must not be loaded. A missing option is not an error.
    pub fn tool_exclusions(&self) -> Vec<String> {
        let raw = match self.store.get(TOOL_SECTION, "exclusions") {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "no tool exclusions configured");
                return Vec::new();
            }
        };
        let exclusions = parse_name_list(&raw);
        info!(excluded = ?exclusions, "excluded tools");
        exclusions
    }

    pub fn default_channel_id(&self, channel: DefaultChannel) -> Result<ChannelId> {
        let raw = self.required(DEFAULT_CHANNEL_SECTION, channel.option())?;
        raw.trim().parse::<ChannelId>().map_err(|e| {
            error!(option = channel.option(), value = %raw, "default channel id is not an integer");
            ConcordError::ConfigValue {
                section: DEFAULT_CHANNEL_SECTION.to_string(),
                option: channel.option().to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub fn channel_list_section(&self) -> &str {
        &self.channel_list_section
    }

    /// Point the name/id tables at another section. The section must exist.
    pub fn set_channel_list_section(&mut self, section: &str) -> Result<()> {
        if !self.store.has_section(section) {
            error!(section, "channel list section not found");
            return Err(ConcordError::ConfigSectionMissing {
                section: section.to_string(),
            });
        }
        self.channel_list_section = section.to_string();
        Ok(())
    }

    /// `(name, id)` pairs of the channel list; entries that are not integers are skipped.
    fn channel_entries(&self, section: Option<&str>) -> Vec<(String, ChannelId)> {
        let section = section.unwrap_or(self.channel_list_section.as_str());
        if !self.store.has_section(section) {
            warn!(section, "no discord channel can be read");
            return Vec::new();
        }
        self.store
            .options(section)
            .into_iter()
            .filter_map(|option| {
                let value = self.store.get(section, &option).ok()?;
                match value.trim().parse::<ChannelId>() {
                    Ok(id) => Some((option, id)),
                    Err(_) => {
                        error!(option = %option, value = %value, "invalid channel id, skipping");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn channel_name_to_id(&self, section: Option<&str>) -> HashMap<String, ChannelId> {
        self.channel_entries(section).into_iter().collect()
    }

    pub fn channel_id_to_name(&self, section: Option<&str>) -> HashMap<ChannelId, String> {
        self.channel_entries(section)
            .into_iter()
            .map(|(name, id)| (id, name))
            .collect()
    }

    /// Resolve the tables and default ids the channel resolver needs.
    pub fn channel_settings(&self) -> Result<ChannelSettings> {
        Ok(ChannelSettings {
            name_to_id: self.channel_name_to_id(None),
            id_to_name: self.channel_id_to_name(None),
            dev_channel_id: self.default_channel_id(DefaultChannel::Dev)?,
            log_channel_id: self.default_channel_id(DefaultChannel::Log)?,
        })
    }
}

/// Third-party API credentials, read from `<config dir>/API.toml`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    store: ConfigStore,
}

impl ApiConfig {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(ConfigStore::open(path, false)?))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Token stored under `[<developer>] <key> = "..."`.
    pub fn api_token(&self, developer: &str, key: &str) -> Result<String> {
        self.store.get(developer, key)
    }
}

/// Split `"[a, b c]"` style lists on any non-word character.
fn parse_name_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
