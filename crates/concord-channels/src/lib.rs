//! # concord-channels
//!
//! The Discord side of Concord: a [`DiscordClient`] that implements
//! [`concord_core::ChatClient`] over the Gateway WebSocket and REST API, and a
//! [`ChannelResolver`] that turns configured channel names and ids into
//! cached channel handles.

pub mod discord;
pub mod resolver;

pub use discord::{DISCORD_API_VERSION, DiscordClient};
pub use resolver::{ChannelResolver, LookupPriority};
