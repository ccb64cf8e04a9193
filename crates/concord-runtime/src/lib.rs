//! # concord-runtime
//!
//! The bot lifecycle. An [`Agent`] drives a [`concord_core::ChatClient`]:
//!
//! ```text
//!   client.start() ──▶ Connected ──▶ Ready (first time only)
//!                                       │
//!                                       ├─ register OnConnecting / OnReady
//!                                       ├─ discover tools ──▶ construct(agent) ──▶ add_cog
//!                                       ├─ attach the log relay to the log channel
//!                                       └─ greet the developer channel
//!
//!   Message ──▶ every cog's on_message, and on_command for `/<command>`
//! ```

pub mod agent;
pub mod builtin;
pub mod log_relay;
pub mod tools;

pub use agent::{Agent, COMMAND_PREFIX};
pub use builtin::{OnConnecting, OnReady};
pub use log_relay::{LogRelay, LogRelayLayer};
pub use tools::default_registry;
