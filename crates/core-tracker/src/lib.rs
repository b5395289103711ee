//! Per-line identity tracking between a baseline document and its live edits.
//!
//! Every logical line that ever existed in a tracked document owns one
//! [`TrackerLine`]. Trackers remember where the line sat in the original
//! document, where it sits now, and where it was removed, so the diff against
//! the baseline can be reconstructed at any time without re-diffing content.
//!
//! [`LineCollection`] owns the trackers of one document and keeps their
//! coordinates aligned as lines are inserted or removed: instead of
//! recomputing positions, insertions and removals shift every affected tracker
//! by a fixed offset.
//!
//! Invariants:
//! * Original positions are immutable once assigned.
//! * No two trackers present in the current document share a current position
//!   (asserted in debug builds after every shifting mutation).
//! * Trackers for lines that never existed in the original are dropped on
//!   removal; trackers for original lines are retained as removal records.

pub mod clock;
pub mod collection;
pub mod line;

pub use clock::Stamp;
pub use collection::{LineCollection, Placement, Removal, Target};
pub use line::{LineState, TrackerId, TrackerLine, content_hash};
