//! Baseline snapshots of tracked documents and the incremental change applier.
//!
//! A [`Snapshot`] holds the immutable baseline lines of one document, its
//! current lines, and the [`LineCollection`](core_tracker::LineCollection)
//! aligning the two. Edit transactions are absorbed incrementally through
//! [`Snapshot::apply_changes`]; the display [`ChangeMap`] is rebuilt from
//! tracker state after each one. [`SnapshotRegistry`] keys snapshots by
//! document and announces its mutations on an event bus.

pub mod apply;
pub mod change_map;
pub mod diagnostics;
pub mod registry;
pub mod snapshot;

pub use apply::ApplyOutcome;
pub use change_map::{ChangeFilter, ChangeLine, ChangeMap, ChangeType};
pub use diagnostics::{SelfTestReport, StateCounts};
pub use registry::{RegistryOptions, RetentionPolicy, SnapshotRegistry};
pub use snapshot::{Snapshot, SnapshotId};
