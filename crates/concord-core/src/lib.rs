//! # concord-core
//!
//! Core types, traits, and primitives for the Concord bot framework.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! the error taxonomy, the channel model, the [`ChatClient`] boundary and the [`Cog`]
//! extension trait.

pub mod channel;
pub mod client;
pub mod cog;
pub mod error;
pub mod mock;

pub use channel::{BotUser, Channel, ChannelHandle, ChannelId, ChannelKind, GuildId};
pub use client::{ChatClient, ClientEvent};
pub use cog::{Cog, CommandSpec, IncomingMessage};
pub use error::{ConcordError, Result};
