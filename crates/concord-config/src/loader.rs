use std::path::{Path, PathBuf};

use tracing::info;

use concord_core::Result;

use crate::bot::{ApiConfig, BotConfig};
use crate::store::ConfigStore;

/// Environment override for the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CONCORD_CONFIG_DIR";

/// Loads the API and bot configuration files from one directory.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    dir: PathBuf,
    pub api: ApiConfig,
    pub bot: BotConfig,
}

impl ConfigArgs {
    /// Resolve the config directory: explicit path > CONCORD_CONFIG_DIR env > ./configs
    pub fn resolve_dir(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var(CONFIG_DIR_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from("configs")
    }

    /// Load `API.toml` (optional) and `<bot_name>.toml` (required).
    pub fn load(bot_name: &str, dir: Option<&Path>) -> Result<Self> {
        let dir = Self::resolve_dir(dir);
        info!(?dir, bot = bot_name, "loading bot configuration");
        let api = ApiConfig::open(&dir.join("API.toml"))?;
        let bot = BotConfig::open(&dir.join(format!("{bot_name}.toml")))?;
        Ok(Self { dir, api, bot })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open any other `<file_stem>.toml` from the same directory.
    pub fn load_config_from(&self, file_stem: &str) -> Result<ConfigStore> {
        ConfigStore::open(&self.dir.join(format!("{file_stem}.toml")), false)
    }
}
