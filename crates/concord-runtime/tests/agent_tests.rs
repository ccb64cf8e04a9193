#[cfg(test)]
mod tests {
    use concord_config::{BotConfig, ConfigStore};
    use concord_core::mock::MockChatClient;
    use concord_core::{Channel, ChannelKind, ClientEvent, Cog, ConcordError, IncomingMessage};
    use concord_runtime::tools::TemplateToolFactory;
    use concord_runtime::{Agent, LogRelay};
    use concord_tools::{ToolDefinition, ToolFactory};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    const DEV: u64 = 111;
    const LOG: u64 = 222;
    const GENERAL: u64 = 333;

    fn config(exclusions: &[&str]) -> BotConfig {
        let exclusions = exclusions
            .iter()
            .map(|e| format!("\"{e}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let raw = format!(
            r#"
[Discord.Bot]
name = "testbot"
description = "A test bot"

[Discord.DefaultChannel]
dev_channel = {DEV}
log_channel = {LOG}

[Discord.Channel]
general = {GENERAL}

[Discord.Tool]
exclusions = [{exclusions}]
"#
        );
        BotConfig::new(ConfigStore::parse(&raw).unwrap())
    }

    fn client(events: Vec<ClientEvent>) -> MockChatClient {
        MockChatClient::new()
            .with_channel(Channel::new(DEV, "dev", ChannelKind::Text).in_guild(1))
            .with_channel(Channel::new(LOG, "log", ChannelKind::Text).in_guild(1))
            .with_channel(Channel::new(GENERAL, "general", ChannelKind::Text).in_guild(1))
            .with_events(events)
    }

    fn message(id: u64, content: &str) -> IncomingMessage {
        IncomingMessage {
            id,
            channel_id: GENERAL,
            guild_id: Some(1),
            author_id: 7,
            author_name: "alice".into(),
            author_is_bot: false,
            is_system: false,
            content: content.into(),
        }
    }

    /// A template tool whose task posts nothing but `END!`.
    fn quiet_tool(name: &str) -> String {
        format!("[{name}]\nfactory = \"template\"\niterations = 0\ninterval_secs = 3600\n")
    }

    fn write_tool(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn agent(client: &Arc<MockChatClient>, config: BotConfig, dirs: Vec<PathBuf>) -> Arc<Agent> {
        Arc::new(Agent::new(client.clone(), config, dirs).unwrap())
    }

    // ── Start-up ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_startup_without_tools() {
        let client = Arc::new(client(vec![ClientEvent::Connected, ClientEvent::Ready]));
        let agent = agent(&client, config(&[]), vec![]);
        agent.clone().run().await.unwrap();

        assert_eq!(
            client.sent_to(DEV),
            vec!["Good morning, Master.\nGood work today.", "No commands available"]
        );
        assert!(agent.loaded_tools().is_empty());
        // Everything is unloaded once the event stream ends.
        assert!(client.cog_names().is_empty());
    }

    #[tokio::test]
    async fn test_startup_registers_discovered_tools() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(dir.path(), "a/__tool__.toml", &quiet_tool("TestTool"));
        write_tool(dir.path(), "b/__tool__.toml", &quiet_tool("TestTool2"));
        write_tool(dir.path(), "b/helper.toml", "[Helper]\nfactory = \"missing\"\n");

        let client = Arc::new(client(vec![ClientEvent::Ready]));
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        agent.clone().run().await.unwrap();

        assert_eq!(agent.loaded_tools(), vec!["TestTool", "TestTool2"]);
        let sent = client.sent_to(DEV);
        assert!(sent.contains(&"Good morning, Master.\nGood work today.".to_string()));
        assert!(sent.iter().any(|m| m.starts_with("Available commands:")
            && m.contains("TestTool")
            && m.contains("TestTool2")));
    }

    #[tokio::test]
    async fn test_greeting_line() {
        let client = Arc::new(client(vec![]));
        let agent = agent(&client, config(&[]), vec![]);
        assert_eq!(
            agent.greetings().unwrap(),
            "Logged in as mock-bot (4242) | Guilds: 1 | Channels: 3"
        );
    }

    #[tokio::test]
    async fn test_greeting_requires_user() {
        let client = Arc::new(client(vec![]).with_user(None));
        let agent = agent(&client, config(&[]), vec![]);
        assert!(agent.greetings().is_err());
    }

    #[tokio::test]
    async fn test_excluded_tools_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(
            dir.path(),
            "__tool__.toml",
            &format!("{}{}", quiet_tool("Kept"), quiet_tool("Skipped")),
        );

        let client = Arc::new(client(vec![ClientEvent::Ready]));
        let agent = agent(&client, config(&["Skipped"]), vec![dir.path().to_path_buf()]);
        agent.clone().run().await.unwrap();
        assert_eq!(agent.loaded_tools(), vec!["Kept"]);
    }

    #[tokio::test]
    async fn test_ready_runs_start_up_once() {
        let client = Arc::new(client(vec![
            ClientEvent::Connected,
            ClientEvent::Ready,
            ClientEvent::Disconnected(Some("lost".into())),
            ClientEvent::Connected,
            ClientEvent::Ready,
        ]));
        let agent = agent(&client, config(&[]), vec![]);
        agent.run().await.unwrap();
        let greetings = client
            .sent_to(DEV)
            .iter()
            .filter(|m| m.starts_with("Good morning"))
            .count();
        assert_eq!(greetings, 1);
    }

    // ── Failure handling ───────────────────────────────────────

    #[tokio::test]
    async fn test_registration_failure_rolls_back_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(
            dir.path(),
            "__tool__.toml",
            &format!("{}{}", quiet_tool("First"), quiet_tool("Second")),
        );

        let client = Arc::new(client(vec![ClientEvent::Ready]).rejecting_cog("Second"));
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, ConcordError::Extension { ref name, .. } if name == "Second"));
        assert!(client.cog_names().is_empty());
        assert!(!client.sent_to(DEV).iter().any(|m| m.starts_with("Good morning")));
    }

    #[tokio::test]
    async fn test_import_failure_aborts_start_up() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(dir.path(), "a/__tool__.toml", &quiet_tool("Good"));
        write_tool(dir.path(), "b/__tool__.toml", "[Bad]\nfactory = \"unknown\"\n");

        let client = Arc::new(client(vec![ClientEvent::Ready]));
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, ConcordError::ImportFailure { .. }));
        assert!(client.cog_names().is_empty());
        assert!(!client.sent_to(DEV).iter().any(|m| m.starts_with("Good morning")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_start_up_failure_unloads_registered_tools() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(
            dir.path(),
            "__tool__.toml",
            "[T]\nfactory = \"template\"\ninterval_secs = 1\n",
        );

        // The log channel is a voice channel, so start-up fails after registration.
        let client = Arc::new(
            MockChatClient::new()
                .with_channel(Channel::new(DEV, "dev", ChannelKind::Text).in_guild(1))
                .with_channel(Channel::new(LOG, "log", ChannelKind::Voice).in_guild(1))
                .with_events(vec![ClientEvent::Ready]),
        );
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, ConcordError::WrongChannelKind { id: LOG, .. }));
        assert!(client.cog_names().is_empty());

        let before = client.sent_to(DEV);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.sent_to(DEV), before);
        assert!(!before.iter().any(|m| m.starts_with("Good morning")));
    }

    #[tokio::test]
    async fn test_missing_tool_directory_aborts_start_up() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(client(vec![ClientEvent::Ready]));
        let agent = agent(&client, config(&[]), vec![dir.path().join("missing")]);
        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, ConcordError::DirectoryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_default_channel_fails_construction() {
        let store = ConfigStore::parse("[Discord.Bot]\nname = \"x\"\n").unwrap();
        let client: Arc<MockChatClient> = Arc::new(client(vec![]));
        let err = Agent::new(client, BotConfig::new(store), vec![]).unwrap_err();
        assert!(matches!(err, ConcordError::ConfigKeyMissing { .. }));
    }

    // ── Message dispatch ───────────────────────────────────────

    #[tokio::test]
    async fn test_template_echoes_and_answers_commands() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(dir.path(), "__tool__.toml", &quiet_tool("TestTool"));

        let mut bot_message = message(3, "from a bot");
        bot_message.author_is_bot = true;
        let mut system_message = message(4, "joined");
        system_message.is_system = true;

        let client = Arc::new(client(vec![
            ClientEvent::Ready,
            ClientEvent::Message(message(1, "hello")),
            ClientEvent::Message(message(2, "/template_tool_command")),
            ClientEvent::Message(bot_message),
            ClientEvent::Message(system_message),
            ClientEvent::Message(message(5, "/unknown_command")),
        ]));
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        agent.run().await.unwrap();

        assert_eq!(
            client.sent_to(GENERAL),
            vec!["hello", "/template_tool_command", "Accept", "/unknown_command"]
        );
        let replies: Vec<_> = client
            .sent
            .lock()
            .iter()
            .filter(|m| m.channel == GENERAL)
            .map(|m| m.reply_to)
            .collect();
        assert_eq!(replies, vec![Some(1), Some(2), None, Some(5)]);
    }

    #[tokio::test]
    async fn test_configured_command_name() {
        let dir = tempfile::tempdir().unwrap();
        write_tool(
            dir.path(),
            "__tool__.toml",
            "[T]\nfactory = \"template\"\ncommand = \"go\"\niterations = 0\ninterval_secs = 3600\n",
        );
        let client = Arc::new(client(vec![
            ClientEvent::Ready,
            ClientEvent::Message(message(1, "/go now")),
        ]));
        let agent = agent(&client, config(&[]), vec![dir.path().to_path_buf()]);
        agent.run().await.unwrap();
        assert!(client.sent_to(GENERAL).contains(&"Accept".to_string()));
    }

    // ── Template task ──────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_template_task_posts_to_dev_channel() {
        let client = Arc::new(client(vec![]));
        let agent = agent(&client, config(&[]), vec![]);
        let settings: toml::Table = toml::from_str("iterations = 2\ninterval_secs = 10").unwrap();
        let cog = TemplateToolFactory
            .construct(&ToolDefinition::new("TestTool", settings), agent.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(client.sent_to(DEV), vec!["Task! 0", "Task! 1", "END!"]);
        cog.unload().await;
    }

    #[tokio::test]
    async fn test_template_rejects_zero_interval() {
        let client = Arc::new(client(vec![]));
        let agent = agent(&client, config(&[]), vec![]);
        let settings: toml::Table = toml::from_str("interval_secs = 0").unwrap();
        let result = TemplateToolFactory.construct(&ToolDefinition::new("T", settings), agent);
        assert!(result.is_err());
    }

    // ── Log relay ──────────────────────────────────────────────

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_log_relay_forwards_info_records() {
        let relay = LogRelay::new();
        let subscriber = tracing_subscriber::registry().with(relay.layer());
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Arc::new(client(vec![]));
        tracing::info!(target: "bot", "before attach");
        relay.attach(client.clone(), LOG).unwrap();
        assert!(relay.is_attached());

        tracing::debug!(target: "bot", "too verbose");
        tracing::info!(target: "concord_channels::discord", "gateway chatter");
        tracing::info!(target: "bot", user = "alice", "hello relay");

        wait_until(|| !client.sent_to(LOG).is_empty()).await;
        let sent = client.sent_to(LOG);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("```bash\n"));
        assert!(sent[0].contains(" - bot - INFO - hello relay user=alice (module: "));
        assert!(sent[0].ends_with("\n```"));

        // Only one destination is ever attached.
        assert!(relay.attach(client.clone(), DEV).is_err());
    }

    #[tokio::test]
    async fn test_log_relay_failure_detaches() {
        let relay = LogRelay::new();
        let subscriber = tracing_subscriber::registry().with(relay.layer());
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Arc::new(client(vec![]).failing_channel(LOG));
        relay.attach(client.clone(), LOG).unwrap();
        tracing::warn!(target: "bot", "cannot be delivered");

        wait_until(|| !relay.is_healthy()).await;
        assert!(!relay.is_healthy());
        assert!(!relay.is_attached());
    }
}
