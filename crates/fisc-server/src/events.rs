//! Live-event fan-out to WebSocket subscribers
//!
//! The hub is an explicit registry owned by `AppState`, not a global.
//! Delivery is best-effort at-most-once: there is no replay, and a
//! subscriber that disconnected mid-broadcast is pruned, never surfaced
//! as an error to the HTTP request that triggered the broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use fisc_core::db::Database;
use fisc_core::models::NodeKind;

/// One event on the live channel, serialized as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            payload,
        }
    }

    /// Entity lifecycle event, e.g. `transaction_created`.
    pub fn entity(kind: NodeKind, action: &str, payload: serde_json::Value) -> Self {
        Self::new(&format!("{}_{}", kind, action), payload)
    }
}

/// Registry of live WebSocket subscribers.
#[derive(Clone)]
pub struct EventHub {
    subscribers: Arc<Mutex<HashMap<u64, UnboundedSender<String>>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a subscriber; the caller forwards the receiver side to
    /// its WebSocket and must call [`unsubscribe`](Self::unsubscribe)
    /// with the returned id on disconnect.
    pub fn subscribe(&self) -> (u64, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("event hub lock poisoned")
            .insert(id, tx);
        debug!(subscriber = id, "Event subscriber registered");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .expect("event hub lock poisoned")
            .remove(&id);
        debug!(subscriber = id, "Event subscriber removed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("event hub lock poisoned")
            .len()
    }

    /// Send one event to every live subscriber. Closed channels are
    /// logged and pruned.
    pub fn broadcast(&self, event: &Event) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, event_type = %event.event_type, "Failed to serialize event");
                return;
            }
        };

        let mut subscribers = self.subscribers.lock().expect("event hub lock poisoned");
        let mut stale = Vec::new();
        for (&id, tx) in subscribers.iter() {
            if tx.send(text.clone()).is_err() {
                warn!(subscriber = id, "Dropping closed event subscriber");
                stale.push(id);
            }
        }
        for id in stale {
            subscribers.remove(&id);
        }
    }
}

/// Recompute per-budget totals and push them as `dashboard_summary_updated`.
///
/// The aggregate sums every descendant transaction on each call, so the
/// cost grows with total transaction count. Failures are logged and
/// swallowed; fan-out never breaks the mutation that triggered it.
pub fn broadcast_dashboard_summary(hub: &EventHub, db: &Database) {
    match db.budget_totals() {
        Ok(totals) => match serde_json::to_value(&totals) {
            Ok(payload) => {
                hub.broadcast(&Event::new("dashboard_summary_updated", payload));
            }
            Err(e) => warn!(error = %e, "Failed to serialize dashboard summary"),
        },
        Err(e) => warn!(error = %e, "Failed to compute dashboard summary"),
    }
}
