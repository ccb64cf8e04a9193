use std::path::PathBuf;

use thiserror::Error;

use crate::channel::{ChannelId, ChannelKind};

/// Unified error type for the whole Concord framework.
#[derive(Error, Debug)]
pub enum ConcordError {
    // ── Discovery errors ───────────────────────────────────────
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to import module: {artifact}: {reason}")]
    ImportFailure { artifact: String, reason: String },

    // ── Channel resolution errors ──────────────────────────────
    #[error("no match: {0}")]
    ChannelNotFound(String),

    #[error("channel {id} is a {kind} channel, expected a text channel or thread")]
    WrongChannelKind { id: ChannelId, kind: ChannelKind },

    #[error("channel {id} ({kind}) is not a channel in this server")]
    NotInGuild { id: ChannelId, kind: ChannelKind },

    #[error("too many match: {count} channels has the name `{name}`")]
    AmbiguousChannelName { name: String, count: usize },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config key missing: section={section}, option={option}")]
    ConfigKeyMissing { section: String, option: String },

    #[error("config section missing: {section}")]
    ConfigSectionMissing { section: String },

    #[error("invalid config value: section={section}, option={option}: {reason}")]
    ConfigValue {
        section: String,
        option: String,
        reason: String,
    },

    #[error("config error: {0}")]
    Config(String),

    // ── Extension errors ───────────────────────────────────────
    #[error("extension error: {name}: {reason}")]
    Extension { name: String, reason: String },

    // ── Network errors ─────────────────────────────────────────
    #[error("channel error: {channel}: {reason}")]
    Channel { channel: String, reason: String },

    #[error("failed to forward log record: {0}")]
    LogRelay(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ConcordError>;
