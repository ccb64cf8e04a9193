use std::path::Path;

use tracing::{debug, info, trace};

use concord_core::{ConcordError, Result};

use crate::catalog::LoadedExtension;
use crate::factory::{Capability, CapabilitySet, FactoryRegistry, ToolDefinition, ToolFactory};

/// Selects which definitions an artifact contributes.
///
/// A definition qualifies when its factory provides every `required`
/// capability. A definition whose factory is the `marker` itself is never
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFilter {
    pub marker: String,
    pub required: CapabilitySet,
}

impl CapabilityFilter {
    pub fn new(marker: impl Into<String>, required: CapabilitySet) -> Self {
        Self {
            marker: marker.into(),
            required,
        }
    }

    /// Anything that can be registered as a cog.
    pub fn cog() -> Self {
        Self::new("cog", CapabilitySet::from([Capability::Cog]))
    }

    pub fn is_marker(&self, factory: &str) -> bool {
        self.marker == factory
    }

    pub fn admits<A: ?Sized>(&self, factory: &dyn ToolFactory<A>) -> bool {
        factory.capabilities().is_superset(&self.required)
    }
}

/// Reads one artifact and resolves its definitions against a registry.
pub struct ArtifactLoader<'a, A: ?Sized> {
    registry: &'a FactoryRegistry<A>,
    filter: Option<&'a CapabilityFilter>,
}

impl<'a, A: ?Sized> ArtifactLoader<'a, A> {
    pub fn new(registry: &'a FactoryRegistry<A>, filter: Option<&'a CapabilityFilter>) -> Self {
        Self { registry, filter }
    }

    /// Load the artifact at `path`, naming its definitions after `origin`.
    ///
    /// Any failure is reported as one [`ConcordError::ImportFailure`] for the
    /// whole artifact.
    pub fn load(&self, path: &Path, origin: &str) -> Result<Vec<LoadedExtension<A>>> {
        info!(artifact = %origin, "import");
        let import_failure = |reason: String| ConcordError::ImportFailure {
            artifact: origin.to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| import_failure(e.to_string()))?;
        let table: toml::Table = raw
            .parse()
            .map_err(|e: toml::de::Error| import_failure(e.to_string()))?;

        let mut loaded = Vec::new();
        for (name, value) in table {
            let Some(settings) = value.as_table() else {
                trace!(artifact = %origin, name = %name, "not a tool definition, skipping");
                continue;
            };
            let Some(factory_name) = settings.get("factory").and_then(toml::Value::as_str) else {
                trace!(artifact = %origin, name = %name, "not a tool definition, skipping");
                continue;
            };

            if self.filter.is_some_and(|f| f.is_marker(factory_name)) {
                debug!(artifact = %origin, name = %name, "marker definition, skipping");
                continue;
            }

            let factory = self
                .registry
                .get(factory_name)
                .ok_or_else(|| import_failure(format!("unknown factory `{factory_name}` for `{name}`")))?;

            if let Some(filter) = self.filter
                && !filter.admits(factory.as_ref())
            {
                debug!(
                    artifact = %origin,
                    name = %name,
                    factory = factory_name,
                    "factory lacks required capabilities, skipping"
                );
                continue;
            }

            info!(artifact = %origin, name = %name, "loaded tool definition");
            let mut settings = settings.clone();
            settings.remove("factory");
            loaded.push(LoadedExtension::new(
                origin,
                ToolDefinition::new(name, settings),
                factory,
            ));
        }
        Ok(loaded)
    }
}
