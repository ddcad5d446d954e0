//! Supabase Realtime push feed (Phoenix channel protocol, JSON v1).
//!
//! The feed only says "table T changed"; listeners re-fetch on their own.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{RemoteError, RemoteResult};
use crate::models::Collection;
use crate::sync::{ChangeBus, Listener, ListenerId};

const CHANNEL_TOPIC: &str = "realtime:cabana";

#[derive(Clone)]
pub struct RealtimeConfig {
    /// Full websocket URL including the api key and protocol version
    pub socket_url: String,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl RealtimeConfig {
    /// Derive the realtime endpoint from a normalized project URL.
    pub fn for_project(project_url: &str, anon_key: &str) -> Self {
        let ws_base = project_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                project_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| project_url.to_string());

        Self {
            socket_url: format!("{ws_base}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0"),
            heartbeat_interval: Duration::from_secs(25),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    fn redacted_url(&self) -> &str {
        self.socket_url
            .split_once('?')
            .map_or(self.socket_url.as_str(), |(base, _)| base)
    }
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("socket_url", &self.redacted_url())
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

/// Websocket connection fanning out change signals per collection.
///
/// The socket is opened on the first listener and kept alive (with
/// reconnects) until the feed is dropped.
pub struct RealtimeFeed {
    config: RealtimeConfig,
    bus: Arc<ChangeBus>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeFeed {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            config,
            bus: Arc::new(ChangeBus::new()),
            task: Mutex::new(None),
        }
    }

    pub fn listen(&self, collection: Collection, listener: Listener) -> ListenerId {
        let id = self.bus.listen(collection, listener);
        self.ensure_started();
        id
    }

    pub fn forget(&self, collection: Collection, id: ListenerId) {
        self.bus.forget(collection, id);
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn ensure_started(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let config = self.config.clone();
                let bus = Arc::clone(&self.bus);
                *task = Some(handle.spawn(run(config, bus)));
            }
            Err(error) => {
                tracing::warn!("Realtime feed not started, no async runtime: {error}");
            }
        }
    }
}

impl Drop for RealtimeFeed {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn run(config: RealtimeConfig, bus: Arc<ChangeBus>) {
    let mut attempt = 0u32;
    loop {
        tracing::info!("Connecting realtime feed at {}", config.redacted_url());

        match connect_and_listen(&config, &bus, attempt > 0).await {
            Ok(()) => {
                tracing::info!("Realtime feed closed by server");
                attempt = 0;
            }
            Err(error) => {
                tracing::warn!("{error}");
            }
        }

        attempt = attempt.saturating_add(1);
        tracing::info!(
            "Reconnecting realtime feed in {:?} (attempt {attempt})",
            config.reconnect_delay
        );
        sleep(config.reconnect_delay).await;
    }
}

async fn connect_and_listen(
    config: &RealtimeConfig,
    bus: &ChangeBus,
    resumed: bool,
) -> RemoteResult<()> {
    let (stream, _) = connect_async(config.socket_url.as_str())
        .await
        .map_err(|error| RemoteError::Realtime(format!("connect failed: {error}")))?;
    let (mut write, mut read) = stream.split();

    let mut next_ref = 1u64;
    write
        .send(Message::Text(join_message(next_ref).to_string()))
        .await
        .map_err(|error| RemoteError::Realtime(format!("join failed: {error}")))?;

    if resumed {
        // Changes made while disconnected were never pushed
        for collection in Collection::ALL {
            bus.publish(collection);
        }
    }

    let period = config.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                next_ref += 1;
                write
                    .send(Message::Text(heartbeat_message(next_ref).to_string()))
                    .await
                    .map_err(|error| RemoteError::Realtime(format!("heartbeat failed: {error}")))?;
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_text(&text, bus),
                    Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Err(error)) => {
                        return Err(RemoteError::Realtime(format!("socket error: {error}")));
                    }
                    None => return Err(RemoteError::Realtime("socket stream ended".to_string())),
                    _ => {}
                }
            }
        }
    }
}

fn join_message(reference: u64) -> Value {
    let changes: Vec<Value> = Collection::ALL
        .iter()
        .map(|collection| {
            json!({
                "event": "*",
                "schema": "public",
                "table": collection.table(),
            })
        })
        .collect();

    json!({
        "topic": CHANNEL_TOPIC,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": changes,
            }
        },
        "ref": reference.to_string(),
    })
}

fn heartbeat_message(reference: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string(),
    })
}

fn handle_text(text: &str, bus: &ChangeBus) {
    let Ok(message) = serde_json::from_str::<Value>(text) else {
        tracing::debug!("Ignoring non-JSON realtime frame");
        return;
    };

    let event = message.get("event").and_then(Value::as_str).unwrap_or_default();
    match event {
        "phx_reply" => {
            let status = message
                .pointer("/payload/status")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if status != "ok" {
                tracing::warn!("Realtime reply not ok: {}", message["payload"]);
            }
        }
        "phx_error" | "phx_close" => {
            tracing::warn!("Realtime channel {event}");
        }
        _ => {
            if let Some(collection) = changed_collection(&message) {
                tracing::debug!("Realtime change on {collection}");
                bus.publish(collection);
            }
        }
    }
}

/// Extract the changed table from a `postgres_changes` (or legacy
/// INSERT/UPDATE/DELETE) frame.
fn changed_collection(message: &Value) -> Option<Collection> {
    let event = message.get("event")?.as_str()?;
    let table = match event {
        "postgres_changes" => message
            .pointer("/payload/data/table")
            .or_else(|| message.pointer("/payload/table")),
        "INSERT" | "UPDATE" | "DELETE" => message.pointer("/payload/table"),
        _ => None,
    }?;
    Collection::from_table(table.as_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn config_switches_to_websocket_scheme() {
        let config = RealtimeConfig::for_project("https://abc.supabase.co", "key");
        assert_eq!(
            config.socket_url,
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );
        assert_eq!(config.heartbeat_interval, Duration::from_secs(25));

        let local = RealtimeConfig::for_project("http://localhost:54321", "key");
        assert!(local.socket_url.starts_with("ws://localhost:54321/realtime/v1/websocket"));
    }

    #[test]
    fn debug_hides_api_key() {
        let config = RealtimeConfig::for_project("https://abc.supabase.co", "secret-key");
        assert!(!format!("{config:?}").contains("secret-key"));
    }

    #[test]
    fn join_subscribes_to_every_table() {
        let message = join_message(1);
        let tables: Vec<&str> = message["payload"]["config"]["postgres_changes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["table"].as_str().unwrap())
            .collect();
        assert_eq!(tables, vec!["users", "votes", "quotes", "complaints"]);
        assert_eq!(message["ref"], "1");
    }

    #[test]
    fn change_frames_map_to_collections() {
        let current = json!({
            "topic": CHANNEL_TOPIC,
            "event": "postgres_changes",
            "payload": { "data": { "table": "votes", "type": "INSERT" } }
        });
        assert_eq!(changed_collection(&current), Some(Collection::Votes));

        let legacy = json!({ "event": "DELETE", "payload": { "table": "users" } });
        assert_eq!(changed_collection(&legacy), Some(Collection::Participants));

        let unknown = json!({ "event": "postgres_changes", "payload": { "data": { "table": "other" } } });
        assert_eq!(changed_collection(&unknown), None);

        let reply = json!({ "event": "phx_reply", "payload": { "status": "ok" } });
        assert_eq!(changed_collection(&reply), None);
    }

    #[test]
    fn handle_text_publishes_changes() {
        let bus = ChangeBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener_hits = Arc::clone(&hits);
        bus.listen(
            Collection::Quotes,
            Arc::new(move || {
                listener_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle_text(
            r#"{"event":"postgres_changes","payload":{"data":{"table":"quotes"}}}"#,
            &bus,
        );
        handle_text("not json", &bus);
        handle_text(r#"{"event":"phx_reply","payload":{"status":"error"}}"#, &bus);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listen_without_runtime_does_not_start() {
        let feed = RealtimeFeed::new(RealtimeConfig::for_project("https://abc.supabase.co", "k"));
        let id = feed.listen(Collection::Votes, Arc::new(|| {}));
        assert!(!feed.is_running());
        feed.forget(Collection::Votes, id);
    }
}
