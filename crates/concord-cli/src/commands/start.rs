use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use concord_channels::DiscordClient;
use concord_config::ConfigArgs;
use concord_core::Result;
use concord_runtime::{Agent, LogRelay};

use super::Cli;
use crate::logging;

pub(super) async fn cmd_start(cli: Cli, tool_directory_paths: Vec<PathBuf>) -> Result<()> {
    let relay = LogRelay::new();
    let _guards = logging::init(&cli.logs_dir(), &cli.bot_name, cli.is_debug, &relay)?;
    info!(
        bot = %cli.bot_name,
        tools = ?tool_directory_paths,
        debug = cli.is_debug,
        "concord v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = ConfigArgs::load(&cli.bot_name, Some(&cli.configs_dir()))?;
    let token = config.bot.discord_token()?;
    let client = Arc::new(DiscordClient::new(token));

    let agent = Agent::new(client, config.bot, tool_directory_paths)?.with_log_relay(relay);
    let result = Arc::new(agent).run().await;
    if let Err(e) = &result {
        error!(error = %e, "bot stopped with an error");
    }
    result
}
