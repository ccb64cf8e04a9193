//! Tool factories compiled into the bot.

use std::sync::Arc;

use concord_tools::FactoryRegistry;

use crate::agent::Agent;

pub mod template;

pub use template::{TemplateTool, TemplateToolFactory};

/// Every factory the bot ships with.
pub fn default_registry() -> FactoryRegistry<Agent> {
    FactoryRegistry::new().with(Arc::new(TemplateToolFactory))
}
