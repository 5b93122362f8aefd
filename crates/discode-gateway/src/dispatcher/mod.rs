//! Event dispatcher
//!
//! Every DISPATCH frame goes through three stages, in order:
//! 1. cache side effects (see `handlers`)
//! 2. registered listeners and one-shot waiters, keyed by lower-cased event name
//! 3. the broadcast event stream
//!
//! Listeners run on their own tokio task, so a slow or failing listener never
//! holds up the read loop.

mod handlers;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use crate::session::SessionContext;

/// Capacity of the broadcast event stream; slow subscribers see `Lagged`
const EVENT_BUFFER: usize = 256;

/// Async callback registered with [`EventDispatcher::on`]
pub type Listener = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A dispatched event as published on the broadcast stream
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    /// Wire name, e.g. `GUILD_CREATE`
    pub name: String,
    pub sequence: Option<u64>,
    pub data: Value,
}

pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    waiters: Mutex<HashMap<String, Vec<oneshot::Sender<Value>>>>,
    events: broadcast::Sender<GatewayEvent>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            listeners: RwLock::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Register a listener for `event` (case-insensitive)
    pub fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let listener: Listener = Arc::new(move |data| listener(data).boxed());
        self.listeners
            .write()
            .entry(event.to_lowercase())
            .or_default()
            .push(listener);
    }

    /// Resolve once with the payload of the next `event`
    pub fn wait_for(&self, event: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock();
        let pending = waiters.entry(event.to_lowercase()).or_default();
        pending.retain(|waiter| !waiter.is_closed());
        pending.push(tx);
        rx
    }

    /// Waiters still registered for `event`
    pub fn waiter_count(&self, event: &str) -> usize {
        self.waiters
            .lock()
            .get(&event.to_lowercase())
            .map_or(0, Vec::len)
    }

    /// Receive every dispatched event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .get(&event.to_lowercase())
            .map_or(0, Vec::len)
    }

    /// Apply cache effects, then notify listeners, waiters and subscribers
    pub(crate) fn dispatch(&self, ctx: &SessionContext, name: &str, sequence: Option<u64>, data: Value) {
        tracing::debug!(event = name, seq = ?sequence, "Dispatching event");

        handlers::apply(ctx, name, &data);
        self.notify(name, &data);

        // No subscribers is not an error
        let _ = self.events.send(GatewayEvent {
            name: name.to_string(),
            sequence,
            data,
        });
    }

    fn notify(&self, name: &str, data: &Value) {
        let key = name.to_lowercase();

        let listeners = self.listeners.read().get(&key).cloned().unwrap_or_default();
        for listener in listeners {
            let call = listener(data.clone());
            let event = key.clone();
            tokio::spawn(async move {
                if let Err(e) = call.await {
                    tracing::warn!(event = %event, error = ?e, "Listener failed");
                }
            });
        }

        let waiters = self.waiters.lock().remove(&key).unwrap_or_default();
        for waiter in waiters {
            // Receiver dropped means the caller stopped waiting
            let _ = waiter.send(data.clone());
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.read().len())
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discode_common::GatewayConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn context() -> Arc<SessionContext> {
        let config = GatewayConfig::new("token").with_chunk_guilds_at_startup(false);
        SessionContext::new(config).0
    }

    #[tokio::test]
    async fn test_listener_keyed_case_insensitively() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        ctx.dispatcher.on("Message_Create", move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(ctx.dispatcher.listener_count("MESSAGE_CREATE"), 1);

        ctx.dispatcher.dispatch(&ctx, "MESSAGE_CREATE", Some(1), json!({}));
        tokio::time::timeout(Duration::from_secs(1), async {
            while calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_failing_listener_is_isolated() {
        let ctx = context();
        ctx.dispatcher.on("typing_start", |_| async { Err::<(), _>(anyhow::anyhow!("boom")) });
        ctx.dispatcher.on("typing_start", |data: Value| async move {
            assert!(data.is_null(), "listener panic");
            Ok(())
        });

        let waiter = ctx.dispatcher.wait_for("TYPING_START");
        ctx.dispatcher.dispatch(&ctx, "TYPING_START", Some(2), json!({"user_id": "1"}));

        assert_eq!(waiter.await.unwrap()["user_id"], "1");
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_later_dispatches() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));

        ctx.dispatcher.on("message_create", |data: Value| async move {
            assert!(data.is_null(), "listener panic");
            Ok(())
        });
        let counter = Arc::clone(&calls);
        ctx.dispatcher.on("message_create", move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        ctx.dispatcher.dispatch(&ctx, "MESSAGE_CREATE", Some(1), json!({}));
        ctx.dispatcher.dispatch(&ctx, "MESSAGE_CREATE", Some(2), json!({}));

        tokio::time::timeout(Duration::from_secs(1), async {
            while calls.load(Ordering::SeqCst) < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_waiters_are_pruned() {
        let ctx = context();
        for _ in 0..10 {
            drop(ctx.dispatcher.wait_for("guild_ban_add"));
        }
        let live = ctx.dispatcher.wait_for("GUILD_BAN_ADD");
        assert_eq!(ctx.dispatcher.waiter_count("guild_ban_add"), 1);

        ctx.dispatcher.dispatch(&ctx, "GUILD_BAN_ADD", Some(1), json!({"n": 1}));
        assert_eq!(live.await.unwrap()["n"], 1);
        assert_eq!(ctx.dispatcher.waiter_count("guild_ban_add"), 0);
    }

    #[tokio::test]
    async fn test_waiter_consumed_once() {
        let ctx = context();
        let first = ctx.dispatcher.wait_for("guild_update");

        ctx.dispatcher.dispatch(&ctx, "GUILD_UPDATE", Some(1), json!({"n": 1}));
        ctx.dispatcher.dispatch(&ctx, "GUILD_UPDATE", Some(2), json!({"n": 2}));

        assert_eq!(first.await.unwrap()["n"], 1);

        let second = ctx.dispatcher.wait_for("guild_update");
        ctx.dispatcher.dispatch(&ctx, "GUILD_UPDATE", Some(3), json!({"n": 3}));
        assert_eq!(second.await.unwrap()["n"], 3);
    }

    #[tokio::test]
    async fn test_broadcast_stream() {
        let ctx = context();
        let mut events = ctx.dispatcher.subscribe();

        ctx.dispatcher.dispatch(&ctx, "PRESENCE_UPDATE", Some(9), json!({"status": "idle"}));

        let event = events.recv().await.unwrap();
        assert_eq!(event.name, "PRESENCE_UPDATE");
        assert_eq!(event.sequence, Some(9));
        assert_eq!(event.data["status"], "idle");
    }
}
