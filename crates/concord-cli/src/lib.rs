//! # concord-cli
//!
//! Command-line entry point for Concord bots.
//!
//! ```text
//! concord --bot-name testbot --tool-directory-paths "tools more_tools" --is-debug
//! ```
//!
//! `--utils-dir` (or `CONCORD_UTILS_DIR`) points at the directory holding
//! `configs/` and `logs/`; it defaults to the current directory.

pub mod commands;
pub mod logging;

pub use commands::{Cli, parse_tool_directory_paths};
