//! # concord-config
//!
//! Configuration system for Concord. Each bot reads `<bot name>.toml` and a shared
//! `API.toml` from one configuration directory. Values are addressed by
//! section and option, the way the bot and its tools look them up.

pub mod bot;
pub mod loader;
pub mod store;

pub use bot::{ApiConfig, BotConfig, ChannelSettings, DefaultChannel};
pub use loader::ConfigArgs;
pub use store::{ConfigStore, WriteMode};
