use clap::Parser;
use std::path::{Path, PathBuf};

use concord_core::{ConcordError, Result};

mod start;

/// Run a Discord bot with tools discovered from directories
#[derive(Parser, Debug)]
#[command(name = "concord", version, about, long_about = None)]
pub struct Cli {
    /// Bot name; selects `configs/<bot-name>.toml`
    #[arg(long)]
    pub bot_name: String,

    /// Space-separated directories to discover tools in
    #[arg(long, default_value = "")]
    pub tool_directory_paths: String,

    /// Enable debug logging to the terminal and `logs/<bot-name>.log`
    #[arg(long)]
    pub is_debug: bool,

    /// Directory holding `configs/` and `logs/`
    #[arg(long, env = "CONCORD_UTILS_DIR", default_value = ".")]
    pub utils_dir: PathBuf,
}

impl Cli {
    pub fn configs_dir(&self) -> PathBuf {
        self.utils_dir.join("configs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.utils_dir.join("logs")
    }

    /// The raw `--tool-directory-paths` entries; runs of whitespace separate them.
    pub fn tool_directories(&self) -> Vec<PathBuf> {
        self.tool_directory_paths
            .split_whitespace()
            .map(PathBuf::from)
            .collect()
    }

    pub async fn run(self) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let tool_directory_paths = parse_tool_directory_paths(&self.tool_directories(), &cwd)?;
        start::cmd_start(self, tool_directory_paths).await
    }
}

/// Resolve tool directories against `base`, requiring each to be an existing
/// directory. Duplicates (after canonicalisation) keep their first position.
pub fn parse_tool_directory_paths(raw: &[PathBuf], base: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::with_capacity(raw.len());
    for path in raw {
        let joined = base.join(path);
        let resolved = joined
            .canonicalize()
            .map_err(|_| ConcordError::DirectoryNotFound {
                path: joined.clone(),
            })?;
        if !resolved.is_dir() {
            return Err(ConcordError::DirectoryNotFound { path: resolved });
        }
        if !paths.contains(&resolved) {
            paths.push(resolved);
        }
    }
    Ok(paths)
}
