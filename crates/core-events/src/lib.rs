//! Typed events exchanged between the host, the snapshot registry and its
//! subscribers.
//!
//! The host delivers document lifecycle and edit notifications as
//! [`DocumentEvent`]s, serially per document. The registry announces its own
//! mutations as [`RegistryEvent`]s through an [`EventBus`], an explicit
//! subscription list of channels notified after every mutation.

use core_text::ChangeSet;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, inspected by tests and logged by the binary on exit.
pub static EVENTS_PUBLISHED: AtomicU64 = AtomicU64::new(0);
pub static EVENTS_DELIVERED: AtomicU64 = AtomicU64::new(0);
pub static SUBSCRIBERS_PRUNED: AtomicU64 = AtomicU64::new(0); // receivers dropped by their owner

/// Notifications from the host editor for a single document.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// Document observed for the first time. `saved` is `None` for documents
    /// that have never been written to disk.
    Opened { key: String, saved: Option<String> },
    /// One edit transaction plus the full document text after it.
    Changed {
        key: String,
        changes: ChangeSet,
        content: String,
    },
    Closed { key: String },
}

impl DocumentEvent {
    pub fn key(&self) -> &str {
        match self {
            DocumentEvent::Opened { key, .. }
            | DocumentEvent::Changed { key, .. }
            | DocumentEvent::Closed { key } => key,
        }
    }
}

/// Mutations of the snapshot registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A snapshot was inserted or replaced.
    Set { key: String },
    /// A snapshot absorbed an edit transaction.
    Updated { key: String },
    Deleted { key: String },
    Cleared,
}

/// Fan-out subscription list.
///
/// Each subscriber owns an unbounded receiver; publishing never blocks. A
/// subscriber whose receiver has been dropped is pruned on the next publish.
pub struct EventBus<E> {
    subscribers: Vec<Sender<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<E: Clone + std::fmt::Debug> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events published afterwards are delivered
    /// in publish order.
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every live subscriber; returns the delivered count.
    pub fn publish(&mut self, event: E) -> usize {
        EVENTS_PUBLISHED.fetch_add(1, Ordering::Relaxed);
        let before = self.subscribers.len();
        self.subscribers
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Disconnected(_)) => false,
                // Unbounded channels never report Full.
                Err(TrySendError::Full(_)) => true,
            });
        let delivered = self.subscribers.len();
        let pruned = before - delivered;
        if pruned > 0 {
            SUBSCRIBERS_PRUNED.fetch_add(pruned as u64, Ordering::Relaxed);
        }
        EVENTS_DELIVERED.fetch_add(delivered as u64, Ordering::Relaxed);
        trace!(target: "events", ?event, delivered, pruned, "publish");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_every_subscriber_in_order() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_eq!(bus.publish(RegistryEvent::Set { key: "x".into() }), 2);
        assert_eq!(bus.publish(RegistryEvent::Cleared), 2);
        for rx in [&a, &b] {
            assert_eq!(rx.try_recv().unwrap(), RegistryEvent::Set { key: "x".into() });
            assert_eq!(rx.try_recv().unwrap(), RegistryEvent::Cleared);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        let pruned_before = SUBSCRIBERS_PRUNED.load(Ordering::Relaxed);
        assert_eq!(bus.publish(RegistryEvent::Deleted { key: "k".into() }), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(SUBSCRIBERS_PRUNED.load(Ordering::Relaxed) > pruned_before);
        assert!(keep.try_recv().is_ok());
    }

    #[test]
    fn publish_without_subscribers_is_counted() {
        let mut bus: EventBus<RegistryEvent> = EventBus::new();
        let before = EVENTS_PUBLISHED.load(Ordering::Relaxed);
        assert_eq!(bus.publish(RegistryEvent::Cleared), 0);
        assert!(EVENTS_PUBLISHED.load(Ordering::Relaxed) > before);
    }

    #[test]
    fn document_event_key() {
        let ev = DocumentEvent::Changed {
            key: "doc".into(),
            changes: ChangeSet::new(),
            content: String::new(),
        };
        assert_eq!(ev.key(), "doc");
        assert_eq!(DocumentEvent::Closed { key: "c".into() }.key(), "c");
    }
}
