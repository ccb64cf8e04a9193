//! # concord-tools
//!
//! Tool extensions discovered from directories at start-up.
//!
//! A tool directory holds artifact files (by default `__tool__.toml`). Each
//! top-level table of an artifact that names a `factory` is one definition:
//!
//! ```toml
//! [TemplateTool]
//! factory = "template"
//! description = "Example tool"
//! ```
//!
//! Factories are compiled into the binary and registered by name in a
//! [`FactoryRegistry`]; an artifact only selects which of them to build.

pub mod catalog;
pub mod factory;
pub mod loader;
pub mod scanner;

pub use catalog::{ExtensionCatalog, LoadedExtension};
pub use factory::{Capability, CapabilitySet, FactoryRegistry, ToolDefinition, ToolFactory};
pub use loader::{ArtifactLoader, CapabilityFilter};
pub use scanner::ArtifactScanner;

/// File name every tool directory is searched for by default.
pub const DEFAULT_ARTIFACT_NAME: &str = "__tool__.toml";
