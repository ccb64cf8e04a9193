use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use concord_core::{
    BotUser, Channel, ChannelHandle, ChannelId, ChannelKind, ChatClient, ClientEvent, Cog,
    ConcordError, GuildId, IncomingMessage, Result,
};

/// Discord Gateway opcodes.
const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
const GATEWAY_INTENTS: u64 = 33281;

/// Message types a user can author: default, chat input command, thread starter, context menu command.
const USER_MESSAGE_TYPES: [u64; 4] = [0, 19, 20, 23];

pub const DISCORD_API_VERSION: u8 = 10;
const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord client using the Gateway WebSocket for events and the REST API for sending.
///
/// The client keeps its own directory of every channel and thread it has seen
/// in `GUILD_CREATE`, `CHANNEL_*` and `THREAD_*` dispatches. Lookups are served
/// from that directory and never hit the network.
///
/// ## Setup
///
/// 1. Go to <https://discord.com/developers/applications> → Create application
/// 2. Bot section → Copy token
/// 3. Enable "Message Content Intent" under Privileged Gateway Intents
/// 4. OAuth2 URL Generator → bot scope → Send Messages permission → invite to server
/// 5. Put the token in the bot config:
///    ```toml
///    [Discord.API]
///    token = "YOUR_BOT_TOKEN"
///    ```
pub struct DiscordClient {
    token: String,
    http: reqwest::Client,
    state: Arc<GatewayState>,
    cogs: RwLock<Vec<Arc<dyn Cog>>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl DiscordClient {
    pub fn new(token: String) -> Self {
        Self {
            token,
            http: reqwest::Client::new(),
            state: Arc::new(GatewayState::default()),
            cogs: RwLock::new(Vec::new()),
            shutdown_tx: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn post_message(&self, channel: ChannelId, body: Value) -> Result<()> {
        let url = format!("{DISCORD_API_BASE}/channels/{channel}/messages");

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConcordError::Channel {
                channel: channel.to_string(),
                reason: format!("HTTP error: {e}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Discord API error sending message");
            return Err(ConcordError::Channel {
                channel: channel.to_string(),
                reason: format!("Discord API {status}: {text}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn start(&self) -> Result<mpsc::Receiver<ClientEvent>> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if let Some(previous) = self.shutdown_tx.lock().replace(shutdown_tx) {
            let _ = previous.send(true);
        }

        let token = self.token.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            gateway_loop(token, state, event_tx, shutdown_rx).await;
        });

        Ok(event_rx)
    }

    async fn stop(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(true);
        }
        self.state.connected.store(false, Ordering::SeqCst);
        info!("Discord client stopped");
        Ok(())
    }

    fn get_channel(&self, id: ChannelId) -> Option<ChannelHandle> {
        self.state.channels.read().get(&id).cloned()
    }

    fn all_channels(&self) -> Vec<ChannelHandle> {
        let mut channels: Vec<ChannelHandle> = self
            .state
            .channels
            .read()
            .values()
            .filter(|c| c.is_guild_channel())
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    fn current_user(&self) -> Option<BotUser> {
        self.state.user.read().clone()
    }

    fn guild_count(&self) -> usize {
        self.state.guilds.read().len()
    }

    async fn add_cog(&self, cog: Arc<dyn Cog>) -> Result<()> {
        let mut cogs = self.cogs.write();
        if cogs.iter().any(|c| c.name() == cog.name()) {
            return Err(ConcordError::Extension {
                name: cog.name().to_string(),
                reason: "cog already loaded".into(),
            });
        }
        debug!(cog = cog.name(), "cog added");
        cogs.push(cog);
        Ok(())
    }

    async fn remove_cog(&self, name: &str) -> Option<Arc<dyn Cog>> {
        let mut cogs = self.cogs.write();
        let index = cogs.iter().position(|c| c.name() == name)?;
        debug!(cog = name, "cog removed");
        Some(cogs.remove(index))
    }

    fn cogs(&self) -> Vec<Arc<dyn Cog>> {
        self.cogs.read().clone()
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<()> {
        self.post_message(channel, json!({ "content": content }))
            .await
    }

    async fn reply(&self, message: &IncomingMessage, content: &str) -> Result<()> {
        self.post_message(
            message.channel_id,
            json!({
                "content": content,
                "message_reference": {
                    "message_id": message.id.to_string(),
                    "channel_id": message.channel_id.to_string(),
                    "fail_if_not_exists": false,
                },
            }),
        )
        .await
    }
}

/// What the gateway task has learned about the account and its guilds.
#[derive(Default)]
struct GatewayState {
    connected: AtomicBool,
    user: RwLock<Option<BotUser>>,
    channels: RwLock<HashMap<ChannelId, ChannelHandle>>,
    guilds: RwLock<HashSet<GuildId>>,
    /// Guilds announced in READY that have not arrived yet.
    pending_guilds: Mutex<HashSet<GuildId>>,
    awaiting_ready: AtomicBool,
}

impl GatewayState {
    /// Apply one dispatch and return the event it produces, if any.
    fn handle_dispatch(&self, event_name: &str, data: &Value) -> Option<ClientEvent> {
        match event_name {
            "READY" => self.on_ready(data),
            "GUILD_CREATE" => self.on_guild_create(data),
            "GUILD_DELETE" => {
                if let Some(guild_id) = snowflake(&data["id"]) {
                    self.guilds.write().remove(&guild_id);
                    self.channels
                        .write()
                        .retain(|_, c| c.guild_id != Some(guild_id));
                    info!(guild_id, "Discord: guild removed");
                }
                None
            }
            "CHANNEL_CREATE" | "CHANNEL_UPDATE" | "THREAD_CREATE" | "THREAD_UPDATE" => {
                if let Some(channel) = parse_channel(data, None) {
                    debug!(channel_id = channel.id, name = %channel.name, "Discord: channel updated");
                    self.channels.write().insert(channel.id, Arc::new(channel));
                }
                None
            }
            "CHANNEL_DELETE" | "THREAD_DELETE" => {
                if let Some(id) = snowflake(&data["id"]) {
                    self.channels.write().remove(&id);
                    debug!(channel_id = id, "Discord: channel deleted");
                }
                None
            }
            "MESSAGE_CREATE" => self.on_message(data).map(ClientEvent::Message),
            _ => {
                debug!(event = %event_name, "Discord: unhandled dispatch event");
                None
            }
        }
    }

    fn on_ready(&self, data: &Value) -> Option<ClientEvent> {
        if let Some(id) = snowflake(&data["user"]["id"]) {
            let name = data["user"]["username"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            info!(bot_id = id, bot = %name, "Discord: logged in");
            *self.user.write() = Some(BotUser { id, name });
        }

        let announced: HashSet<GuildId> = data["guilds"]
            .as_array()
            .map(|guilds| guilds.iter().filter_map(|g| snowflake(&g["id"])).collect())
            .unwrap_or_default();
        let waiting = {
            let mut pending = self.pending_guilds.lock();
            *pending = announced;
            pending.len()
        };

        if waiting == 0 {
            self.awaiting_ready.store(false, Ordering::SeqCst);
            return Some(ClientEvent::Ready);
        }
        debug!(guilds = waiting, "Discord: waiting for guilds");
        self.awaiting_ready.store(true, Ordering::SeqCst);
        None
    }

    fn on_guild_create(&self, data: &Value) -> Option<ClientEvent> {
        let guild_id = snowflake(&data["id"])?;
        let mut added = 0usize;
        {
            let mut channels = self.channels.write();
            for list in ["channels", "threads"] {
                for raw in data[list].as_array().into_iter().flatten() {
                    if let Some(channel) = parse_channel(raw, Some(guild_id)) {
                        channels.insert(channel.id, Arc::new(channel));
                        added += 1;
                    }
                }
            }
        }
        self.guilds.write().insert(guild_id);
        debug!(guild_id, channels = added, "Discord: guild available");

        let remaining = {
            let mut pending = self.pending_guilds.lock();
            pending.remove(&guild_id);
            pending.len()
        };
        if remaining == 0 && self.awaiting_ready.swap(false, Ordering::SeqCst) {
            return Some(ClientEvent::Ready);
        }
        None
    }

    fn on_message(&self, data: &Value) -> Option<IncomingMessage> {
        let author_id = snowflake(&data["author"]["id"])?;
        if self.user.read().as_ref().is_some_and(|me| me.id == author_id) {
            return None;
        }

        let message = IncomingMessage {
            id: snowflake(&data["id"])?,
            channel_id: snowflake(&data["channel_id"])?,
            guild_id: snowflake(&data["guild_id"]),
            author_id,
            author_name: data["author"]["username"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            author_is_bot: data["author"]["bot"].as_bool().unwrap_or(false),
            is_system: !USER_MESSAGE_TYPES.contains(&data["type"].as_u64().unwrap_or(0)),
            content: data["content"].as_str().unwrap_or("").to_string(),
        };
        debug!(
            sender = %message.author_name,
            channel_id = message.channel_id,
            dm = message.guild_id.is_none(),
            "Discord message received"
        );
        Some(message)
    }
}

/// Discord sends snowflakes as strings.
fn snowflake(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_channel(data: &Value, guild_id: Option<GuildId>) -> Option<Channel> {
    let id = snowflake(&data["id"])?;
    let kind = ChannelKind::from_discord(data["type"].as_u64()?);
    let name = data["name"].as_str().unwrap_or_default();
    let mut channel = Channel::new(id, name, kind);
    if let Some(guild_id) = snowflake(&data["guild_id"]).or(guild_id) {
        channel = channel.in_guild(guild_id);
    }
    if let Some(parent_id) = snowflake(&data["parent_id"]) {
        channel = channel.with_parent(parent_id);
    }
    Some(channel)
}

/// Main gateway loop: connects to Discord WebSocket, handles heartbeats, dispatches events.
async fn gateway_loop(
    token: String,
    state: Arc<GatewayState>,
    event_tx: mpsc::Sender<ClientEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff = 1u64;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        info!("Discord: connecting to Gateway...");

        let ws_stream = match tokio_tungstenite::connect_async(DISCORD_GATEWAY_URL).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(error = %e, "Discord Gateway connection failed");
                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        backoff = 1;
        let (mut write, mut read) = ws_stream.split();

        // Wait for HELLO to get heartbeat interval
        let heartbeat_interval = match read.next().await {
            Some(Ok(msg)) => {
                let payload: Value = msg
                    .to_text()
                    .ok()
                    .and_then(|t| serde_json::from_str(t).ok())
                    .unwrap_or_default();
                if payload["op"].as_u64() == Some(OP_HELLO) {
                    payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41250)
                } else {
                    warn!(op = %payload["op"], "Discord: expected HELLO");
                    41250
                }
            }
            _ => {
                error!("Discord: no HELLO received");
                tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(60);
                continue;
            }
        };

        let identify = json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "concord",
                    "device": "concord"
                }
            }
        });

        if let Err(e) = write
            .send(tokio_tungstenite::tungstenite::Message::Text(
                identify.to_string().into(),
            ))
            .await
        {
            error!(error = %e, "Discord: failed to send IDENTIFY");
            continue;
        }

        state.connected.store(true, Ordering::SeqCst);
        if event_tx.send(ClientEvent::Connected).await.is_err() {
            warn!("Discord: event channel closed");
            return;
        }
        info!(heartbeat_ms = heartbeat_interval, "Discord Gateway connected");

        let mut sequence: Option<u64> = None;
        let mut heartbeat_timer =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
        heartbeat_timer.tick().await; // consume initial tick

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Discord: shutdown signal received");
                        let _ = write.close().await;
                        return;
                    }
                }
                _ = heartbeat_timer.tick() => {
                    let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                    if let Err(e) = write.send(
                        tokio_tungstenite::tungstenite::Message::Text(hb.to_string().into())
                    ).await {
                        warn!(error = %e, "Discord: heartbeat send failed");
                        break;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(ws_msg)) => {
                            if ws_msg.is_close() {
                                info!("Discord: server closed connection");
                                break;
                            }
                            let Ok(text) = ws_msg.to_text() else { continue };
                            let Ok(payload) = serde_json::from_str::<Value>(text) else { continue };

                            if let Some(s) = payload["s"].as_u64() {
                                sequence = Some(s);
                            }

                            match payload["op"].as_u64().unwrap_or(u64::MAX) {
                                OP_DISPATCH => {
                                    let event_name = payload["t"].as_str().unwrap_or("");
                                    if let Some(event) = state.handle_dispatch(event_name, &payload["d"])
                                        && event_tx.send(event).await.is_err()
                                    {
                                        warn!("Discord: event channel closed");
                                        return;
                                    }
                                }
                                OP_HEARTBEAT_ACK => {
                                    debug!("Discord: heartbeat ACK");
                                }
                                OP_HEARTBEAT => {
                                    let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                                    let _ = write.send(
                                        tokio_tungstenite::tungstenite::Message::Text(hb.to_string().into())
                                    ).await;
                                }
                                OP_RECONNECT | OP_INVALID_SESSION => {
                                    info!("Discord: gateway asked for a new session");
                                    break;
                                }
                                op => {
                                    debug!(op, "Discord: unhandled opcode");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Discord WebSocket error");
                            break;
                        }
                        None => {
                            info!("Discord: WebSocket stream ended");
                            break;
                        }
                    }
                }
            }
        }

        state.connected.store(false, Ordering::SeqCst);
        if event_tx
            .send(ClientEvent::Disconnected(Some("Gateway connection lost".into())))
            .await
            .is_err()
        {
            return;
        }

        if *shutdown_rx.borrow() {
            break;
        }

        info!(retry_in = backoff, "Discord: reconnecting...");
        tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(60);
    }
}
