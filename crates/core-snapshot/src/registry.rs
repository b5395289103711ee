//! Document-keyed snapshot registry.
//!
//! Every mutation is announced on the registry's [`EventBus`] after it has
//! been applied. Documents are independent; nothing is shared between
//! entries.

use crate::apply::ApplyOutcome;
use crate::snapshot::Snapshot;
use core_events::{DocumentEvent, EventBus, RegistryEvent};
use core_text::{ChangeSet, LineIndex};
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use tracing::{debug, info};

/// What happens to a snapshot when its document closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Forget the snapshot.
    #[default]
    Discard,
    /// Keep tracking against the same baseline.
    Keep,
    /// Start over with the closing content as the new baseline.
    Reset,
}

/// Registry behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    pub line_break: String,
    pub retention: RetentionPolicy,
    /// Run the structural self-test after every applied transaction.
    pub self_test: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            line_break: "\n".to_string(),
            retention: RetentionPolicy::default(),
            self_test: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    snapshots: HashMap<String, Snapshot>,
    events: EventBus<RegistryEvent>,
    options: RegistryOptions,
}

impl SnapshotRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            snapshots: HashMap::new(),
            events: EventBus::new(),
            options,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Receive every subsequent registry mutation.
    pub fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.snapshots.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        self.snapshots.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Snapshot> {
        self.snapshots.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.snapshots.keys().map(String::as_str)
    }

    /// Start tracking a document with saved content.
    ///
    /// Unsaved documents (`saved == None`) are never tracked. An already
    /// tracked document keeps its existing snapshot.
    pub fn open(&mut self, key: &str, saved: Option<&str>) -> Option<&Snapshot> {
        let Some(saved) = saved else {
            debug!(target: "registry", key, "unsaved document, not tracked");
            return None;
        };
        if !self.snapshots.contains_key(key) {
            let snapshot = Snapshot::new(saved, self.options.line_break.as_str());
            self.insert(key, snapshot);
        }
        self.snapshots.get(key)
    }

    /// Insert or replace the snapshot for `key`, returning the previous one.
    pub fn insert(&mut self, key: &str, snapshot: Snapshot) -> Option<Snapshot> {
        info!(target: "registry", key, id = %snapshot.id(), "snapshot set");
        let previous = self.snapshots.insert(key.to_string(), snapshot);
        self.events.publish(RegistryEvent::Set {
            key: key.to_string(),
        });
        previous
    }

    pub fn remove(&mut self, key: &str) -> Option<Snapshot> {
        let removed = self.snapshots.remove(key)?;
        info!(target: "registry", key, id = %removed.id(), "snapshot deleted");
        self.events.publish(RegistryEvent::Deleted {
            key: key.to_string(),
        });
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.events.publish(RegistryEvent::Cleared);
    }

    /// Route one transaction to the document's snapshot.
    ///
    /// Returns `None` for untracked documents.
    pub fn apply(
        &mut self,
        key: &str,
        changes: &ChangeSet,
        before: &impl LineIndex,
        after: &impl LineIndex,
        content: &str,
    ) -> Option<ApplyOutcome> {
        let snapshot = self.snapshots.get_mut(key)?;
        let outcome = snapshot.apply_changes(changes, before, after, content);
        Some(self.applied(key, outcome))
    }

    /// Like [`apply`](Self::apply), with offsets mapped on the snapshot's own
    /// line break against its current content.
    pub fn apply_transaction(
        &mut self,
        key: &str,
        changes: &ChangeSet,
        content: &str,
    ) -> Option<ApplyOutcome> {
        let snapshot = self.snapshots.get_mut(key)?;
        let outcome = snapshot.apply_transaction(changes, content);
        Some(self.applied(key, outcome))
    }

    fn applied(&mut self, key: &str, outcome: ApplyOutcome) -> ApplyOutcome {
        if outcome.skipped {
            return outcome;
        }
        if self.options.self_test
            && let Some(snapshot) = self.snapshots.get(key)
        {
            // Failures are logged by the self-test itself.
            snapshot.self_test();
        }
        self.events.publish(RegistryEvent::Updated {
            key: key.to_string(),
        });
        outcome
    }

    /// Apply the retention policy for a closing document. Reset re-baselines
    /// on `saved`, or on the current content when nothing was saved.
    pub fn close(&mut self, key: &str, policy: RetentionPolicy, saved: Option<&str>) {
        match policy {
            RetentionPolicy::Discard => {
                self.remove(key);
            }
            RetentionPolicy::Keep => {
                debug!(target: "registry", key, "snapshot kept on close");
            }
            RetentionPolicy::Reset => {
                let Some(content) = saved
                    .map(str::to_string)
                    .or_else(|| self.snapshots.get(key).map(Snapshot::current_content))
                else {
                    return;
                };
                let snapshot = Snapshot::new(&content, self.options.line_break.as_str());
                self.insert(key, snapshot);
            }
        }
    }

    /// Dispatch a host notification.
    ///
    /// Offsets of a `Changed` event are mapped against the snapshot's own
    /// current content (pre-edit) and the delivered content (post-edit), with
    /// lines broken on the snapshot's line break only.
    pub fn handle(&mut self, event: DocumentEvent) -> Option<ApplyOutcome> {
        match event {
            DocumentEvent::Opened { key, saved } => {
                self.open(&key, saved.as_deref());
                None
            }
            DocumentEvent::Changed {
                key,
                changes,
                content,
            } => self.apply_transaction(&key, &changes, &content),
            DocumentEvent::Closed { key } => {
                self.close(&key, self.options.retention, None);
                None
            }
        }
    }
}
