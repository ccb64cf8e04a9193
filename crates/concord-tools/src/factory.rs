use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use concord_core::{Cog, Result};

/// Something a tool can do once registered with the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Can be registered as a cog.
    Cog,
    /// Listens to incoming messages.
    Listener,
    /// Answers prefixed commands.
    Command,
    /// Runs a background task.
    Task,
}

pub type CapabilitySet = BTreeSet<Capability>;

/// One definition read from an artifact: its table key and the rest of its table.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub settings: toml::Table,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, settings: toml::Table) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// A typed setting, or `None` when the key is absent.
    pub fn setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.settings
            .get(key)
            .cloned()
            .map(|value| value.try_into::<T>())
            .transpose()
            .map_err(Into::into)
    }
}

/// Builds one kind of tool.
///
/// `A` is the dependency handed to every tool at construction, usually the
/// running agent.
pub trait ToolFactory<A: ?Sized>: Send + Sync {
    /// Name artifacts refer to in their `factory` key.
    fn name(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet;

    /// Build the tool described by `definition`. The cog should be named after the definition.
    fn construct(&self, definition: &ToolDefinition, deps: Arc<A>) -> Result<Arc<dyn Cog>>;
}

/// Load-time table of every factory compiled into the binary, keyed by name.
pub struct FactoryRegistry<A: ?Sized> {
    factories: HashMap<String, Arc<dyn ToolFactory<A>>>,
}

impl<A: ?Sized> FactoryRegistry<A> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory. A second factory with the same name replaces the first.
    pub fn register(&mut self, factory: Arc<dyn ToolFactory<A>>) {
        let name = factory.name().to_string();
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(factory = %name, "factory registered twice, keeping the latest");
        }
    }

    pub fn with(mut self, factory: Arc<dyn ToolFactory<A>>) -> Self {
        self.register(factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolFactory<A>>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered factory names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<A: ?Sized> Default for FactoryRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> Clone for FactoryRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<A: ?Sized> fmt::Debug for FactoryRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
