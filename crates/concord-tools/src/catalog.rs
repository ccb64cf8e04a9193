use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use concord_core::{Cog, Result};

use crate::factory::{FactoryRegistry, ToolDefinition, ToolFactory};
use crate::loader::{ArtifactLoader, CapabilityFilter};
use crate::scanner::ArtifactScanner;

/// A tool definition found during discovery, ready to be constructed.
pub struct LoadedExtension<A: ?Sized> {
    /// Artifact path relative to its tool directory, `/`-separated.
    pub origin: String,
    pub definition: ToolDefinition,
    pub constructible: Arc<dyn ToolFactory<A>>,
}

impl<A: ?Sized> LoadedExtension<A> {
    pub fn new(
        origin: &str,
        definition: ToolDefinition,
        constructible: Arc<dyn ToolFactory<A>>,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            definition,
            constructible,
        }
    }

    /// Definition name, the table key in the artifact.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn construct(&self, deps: Arc<A>) -> Result<Arc<dyn Cog>> {
        self.constructible.construct(&self.definition, deps)
    }
}

impl<A: ?Sized> Clone for LoadedExtension<A> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            definition: self.definition.clone(),
            constructible: Arc::clone(&self.constructible),
        }
    }
}

impl<A: ?Sized> fmt::Debug for LoadedExtension<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedExtension")
            .field("origin", &self.origin)
            .field("name", &self.definition.name)
            .field("factory", &self.constructible.name())
            .finish()
    }
}

/// Discovers tool definitions across tool directories.
pub struct ExtensionCatalog<A: ?Sized> {
    registry: FactoryRegistry<A>,
}

impl<A: ?Sized> ExtensionCatalog<A> {
    pub fn new(registry: FactoryRegistry<A>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FactoryRegistry<A> {
        &self.registry
    }

    /// Scan every root and load every matching artifact.
    ///
    /// All roots are checked before any artifact is read. The first artifact
    /// that fails to load aborts the whole call; no partial result is returned.
    pub fn discover(
        &self,
        roots: &[PathBuf],
        include: Option<&[String]>,
        filter: Option<&CapabilityFilter>,
    ) -> Result<Vec<LoadedExtension<A>>> {
        let scanners = roots
            .iter()
            .map(|root| ArtifactScanner::new(root, include))
            .collect::<Result<Vec<_>>>()?;

        let loader = ArtifactLoader::new(&self.registry, filter);
        let mut extensions = Vec::new();
        for scanner in &scanners {
            for artifact in scanner.scan() {
                let artifact = artifact?;
                let origin = origin_of(scanner.root(), &artifact);
                let loaded = loader.load(&artifact, &origin).inspect_err(|e| {
                    error!(artifact = %origin, error = %e, "failed to import tool artifact");
                })?;
                extensions.extend(loaded);
            }
        }
        info!(
            roots = roots.len(),
            extensions = extensions.len(),
            "tool discovery complete"
        );
        Ok(extensions)
    }
}

/// Root-relative, `/`-separated identifier of an artifact.
fn origin_of(root: &Path, artifact: &Path) -> String {
    let relative = artifact.strip_prefix(root).unwrap_or(artifact);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
