//! Cogs every bot registers before its tools.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use tracing::info;

use concord_channels::DISCORD_API_VERSION;
use concord_core::{ChatClient, Cog, Result};

const JST_OFFSET_SECS: i32 = 9 * 3600;
const RULE: &str = "--------------------------------------";

/// Logs every gateway (re)connection.
pub struct OnConnecting;

#[async_trait]
impl Cog for OnConnecting {
    fn name(&self) -> &str {
        "OnConnecting"
    }

    async fn on_connect(&self) -> Result<()> {
        info!("Connecting to Discord");
        Ok(())
    }
}

/// Logs a login status block whenever the client becomes ready.
pub struct OnReady {
    client: Arc<dyn ChatClient>,
}

impl OnReady {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub fn status(&self) -> String {
        let mut status = format!("{RULE} LOG IN STATUS");
        if let Some(user) = self.client.current_user() {
            status.push_str(&format!("\n\tUser name: {}", user.name));
            status.push_str(&format!("\n\tUser id  : {}", user.id));
        }
        status.push_str(&format!("\n\tTime     : {}", jst_now()));
        status.push_str(&format!(
            "\n\tDiscord  API v{DISCORD_API_VERSION} (concord {})",
            env!("CARGO_PKG_VERSION")
        ));
        status.push('\n');
        status.push_str(RULE);
        status
    }
}

#[async_trait]
impl Cog for OnReady {
    fn name(&self) -> &str {
        "OnReady"
    }

    async fn on_ready(&self) -> Result<()> {
        info!("{}", self.status());
        Ok(())
    }
}

fn jst_now() -> String {
    let now = Utc::now();
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(jst) => now.with_timezone(&jst).format("%Y/%m/%d %H:%M:%S").to_string(),
        None => now.format("%Y/%m/%d %H:%M:%S UTC").to_string(),
    }
}
