//! Bounded in-memory debug log.
//!
//! An explicitly owned sink: build one in `app::run`, hand the same handle to the tracing
//! layer and to `AppState`. Oldest entries are evicted once capacity is reached, and every
//! push is fanned out to subscribers through a `tokio::sync::broadcast` channel.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugEntry {
    pub at: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl DebugEntry {
    pub fn new(level: impl Into<String>, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            level: level.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    entries: RwLock<VecDeque<DebugEntry>>,
    capacity: usize,
    notify: broadcast::Sender<DebugEntry>,
}

/// Cheap to clone; all clones share one buffer.
#[derive(Debug, Clone)]
pub struct DebugLog {
    inner: Arc<Inner>,
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (notify, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify,
            }),
        }
    }

    pub fn push(&self, entry: DebugEntry) {
        {
            let mut entries = self.inner.entries.write();
            if entries.len() == self.inner.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        // No subscribers is fine.
        let _ = self.inner.notify.send(entry);
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.inner.entries.read().iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DebugEntry> {
        self.inner.notify.subscribe()
    }

    pub fn clear(&self) {
        self.inner.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

/// Records every event that passes the global filter into a [`DebugLog`].
pub struct DebugLogLayer {
    log: DebugLog,
}

impl DebugLogLayer {
    pub fn new(log: DebugLog) -> Self {
        Self { log }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for DebugLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.log.push(DebugEntry::new(
            meta.level().as_str(),
            meta.target(),
            visitor.finish(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn evicts_oldest_when_full() {
        let log = DebugLog::new(3);
        for i in 0..5 {
            log.push(DebugEntry::new("INFO", "test", format!("m{i}")));
        }

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["m2", "m3", "m4"]);
        assert_eq!(log.len(), log.capacity());

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn default_capacity_is_fifty() {
        let log = DebugLog::default();
        for i in 0..60 {
            log.push(DebugEntry::new("DEBUG", "test", i.to_string()));
        }
        assert_eq!(log.len(), 50);
        assert_eq!(log.entries()[0].message, "10");
    }

    #[tokio::test]
    async fn subscribers_see_new_entries() {
        let log = DebugLog::new(4);
        let mut rx = log.subscribe();
        let clone = log.clone();

        clone.push(DebugEntry::new("WARN", "gate", "hello"));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.message, "hello");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn layer_captures_tracing_events() {
        let log = DebugLog::new(8);
        let subscriber = tracing_subscriber::registry().with(DebugLogLayer::new(log.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(path = "/projects", "redirecting to login");
        });

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "WARN");
        assert_eq!(entries[0].message, "redirecting to login path=/projects");
    }
}
