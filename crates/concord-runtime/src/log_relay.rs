//! Forwards application log records to a Discord channel.
//!
//! [`LogRelayLayer`] is installed in the subscriber at start-up and queues
//! records from then on; nothing is forwarded (and nothing is queued) until
//! [`LogRelay::attach`] names a destination once the client is ready.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::{Level, error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use concord_core::{ChannelId, ChatClient, ConcordError, Result};

/// Discord rejects messages longer than this.
const MESSAGE_LIMIT: usize = 2000;
const FENCE_OPEN: &str = "```bash\n";
const FENCE_CLOSE: &str = "\n```";

/// Targets never relayed: the relay itself, the Discord client and the HTTP/websocket stack.
const IGNORED_TARGETS: &[&str] = &[
    "concord_runtime::log_relay",
    "concord_channels::discord",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tungstenite",
    "tokio_tungstenite",
];

#[derive(Default)]
struct Shared {
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    unhealthy: AtomicBool,
}

impl Shared {
    fn detach(&self) {
        self.sender.lock().take();
    }
}

/// Handle to the relay: attach a destination, check its health.
#[derive(Clone, Default)]
pub struct LogRelay {
    shared: Arc<Shared>,
}

impl LogRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscriber layer feeding this relay.
    pub fn layer(&self) -> LogRelayLayer {
        LogRelayLayer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start forwarding to `channel`. Only one destination is ever attached.
    pub fn attach(&self, client: Arc<dyn ChatClient>, channel: ChannelId) -> Result<()> {
        let mut worker = self.shared.worker.lock();
        if worker.is_some() {
            warn!(channel_id = channel, "log relay already attached");
            return Err(ConcordError::LogRelay("already attached".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.sender.lock() = Some(tx);
        self.shared.unhealthy.store(false, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        *worker = Some(tokio::spawn(forward(shared, client, channel, rx)));
        info!(channel_id = channel, "log relay attached");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.shared.sender.lock().is_some()
    }

    /// False once a forward has failed; the relay stays detached afterwards.
    pub fn is_healthy(&self) -> bool {
        !self.shared.unhealthy.load(Ordering::SeqCst)
    }

    /// Stop forwarding. Records already queued are still sent.
    pub fn detach(&self) {
        self.shared.detach();
    }
}

async fn forward(
    shared: Arc<Shared>,
    client: Arc<dyn ChatClient>,
    channel: ChannelId,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = client.send_message(channel, &fence(&entry)).await {
            shared.unhealthy.store(true, Ordering::SeqCst);
            shared.detach();
            let err = ConcordError::LogRelay(e.to_string());
            error!(channel_id = channel, error = %err, "log relay stopped");
            return;
        }
    }
}

/// Wrap an entry in a code block that fits one message.
fn fence(entry: &str) -> String {
    let budget = MESSAGE_LIMIT - FENCE_OPEN.len() - FENCE_CLOSE.len();
    let body: String = if entry.chars().count() > budget {
        let mut cut: String = entry.chars().take(budget - 3).collect();
        cut.push_str("...");
        cut
    } else {
        entry.to_string()
    };
    format!("{FENCE_OPEN}{body}{FENCE_CLOSE}")
}

/// `tracing` layer that queues INFO-and-above records for the relay.
pub struct LogRelayLayer {
    shared: Arc<Shared>,
}

impl<S: tracing::Subscriber> Layer<S> for LogRelayLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::INFO || is_ignored(meta.target()) {
            return;
        }
        let Some(tx) = self.shared.sender.lock().clone() else {
            return;
        };

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);
        let entry = format!(
            "{} - {} - {} - {}{} (module: {})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            meta.target(),
            meta.level(),
            visitor.message,
            visitor.fields,
            meta.module_path().unwrap_or("unknown"),
        );
        // A closed queue means the worker is gone; the next forward failure already detached us.
        let _ = tx.send(entry);
    }
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target == *ignored
            || target
                .strip_prefix(ignored)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: String,
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
