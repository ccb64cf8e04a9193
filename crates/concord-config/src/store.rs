use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, TableLike, Value};
use tracing::{debug, info, warn};

use concord_core::{ConcordError, Result};

/// How [`ConfigStore::write`] opens the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file contents.
    Overwrite,
    /// Append the rendered document to the end of the file.
    Append,
}

/// A section/option string store backed by a TOML document.
///
/// Sections are addressed by dotted paths: `Discord.DefaultChannel` names the
/// table written as `[Discord.DefaultChannel]`. Options are the scalar keys of a
/// section; nested tables are sections of their own, not options.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    doc: DocumentMut,
}

impl ConfigStore {
    /// Open a store from disk.
    ///
    /// With `required`, the file must exist, be a regular file and carry the
    /// `.toml` extension. Without it a missing file yields an empty store.
    pub fn open(path: &Path, required: bool) -> Result<Self> {
        if required {
            Self::check_existence(path)?;
        }
        let doc = if path.is_file() {
            info!(?path, "loading configuration");
            Self::read_document(path)?
        } else {
            warn!(?path, "config file not found, using an empty store");
            DocumentMut::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            doc,
        })
    }

    /// Build a store from TOML text with no backing file.
    pub fn parse(raw: &str) -> Result<Self> {
        let doc = raw
            .parse::<DocumentMut>()
            .map_err(|e| ConcordError::Config(format!("failed to parse config: {e}")))?;
        Ok(Self { path: None, doc })
    }

    fn check_existence(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConcordError::Config(format!(
                "not found: {}",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(ConcordError::Config(format!(
                "not a file: {}",
                path.display()
            )));
        }
        if path.extension().is_none_or(|ext| ext != "toml") {
            return Err(ConcordError::Config(format!(
                "not a toml file: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn read_document(path: &Path) -> Result<DocumentMut> {
        let raw = std::fs::read_to_string(path)?;
        raw.parse::<DocumentMut>().map_err(|e| {
            ConcordError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Backing file, if the store was opened from disk.
    pub fn path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| ConcordError::Config("filepath is not set".into()))
    }

    /// Re-read the backing file, discarding unsaved changes.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.path()?.to_path_buf();
        if !path.is_file() {
            return Err(ConcordError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        self.doc = Self::read_document(&path)?;
        info!(?path, "configuration reloaded");
        Ok(())
    }

    fn section(&self, section: &str) -> Option<&dyn TableLike> {
        let mut current: &dyn TableLike = self.doc.as_table();
        for segment in section.split('.') {
            current = current.get(segment)?.as_table_like()?;
        }
        Some(current)
    }

    fn section_mut(&mut self, section: &str) -> Option<&mut dyn TableLike> {
        let mut current: &mut dyn TableLike = self.doc.as_table_mut();
        for segment in section.split('.') {
            current = current.get_mut(segment)?.as_table_like_mut()?;
        }
        Some(current)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.section(section)
            .and_then(|table| table.get(option))
            .is_some_and(Item::is_value)
    }

    /// Scalar option names of a section, in document order.
    pub fn options(&self, section: &str) -> Vec<String> {
        self.section(section)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, item)| item.is_value())
                    .map(|(key, _)| key.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read an option as a string. Non-string scalars are rendered as written.
    pub fn get(&self, section: &str, option: &str) -> Result<String> {
        self.section(section)
            .and_then(|table| table.get(option))
            .and_then(Item::as_value)
            .map(render_value)
            .ok_or_else(|| ConcordError::ConfigKeyMissing {
                section: section.to_string(),
                option: option.to_string(),
            })
    }

    /// Set an option in an existing section. The value is stored as a string.
    pub fn set_value(&mut self, section: &str, option: &str, value: &str) -> Result<()> {
        let table = self
            .section_mut(section)
            .ok_or_else(|| ConcordError::ConfigSectionMissing {
                section: section.to_string(),
            })?;
        table.insert(option, toml_edit::value(value));
        debug!(section, option, "config value set");
        Ok(())
    }

    /// Write the document back to its backing file.
    pub fn write(&self, mode: WriteMode) -> Result<()> {
        let path = self.path()?;
        let mut file = match mode {
            WriteMode::Overwrite => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            WriteMode::Append => OpenOptions::new().append(true).create(true).open(path)?,
        };
        file.write_all(self.doc.to_string().as_bytes())?;
        info!(?path, ?mode, "configuration written");
        Ok(())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.value().clone(),
        Value::Integer(i) => i.value().to_string(),
        Value::Float(f) => f.value().to_string(),
        Value::Boolean(b) => b.value().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
