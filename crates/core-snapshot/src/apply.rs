//! Incremental change applier.
//!
//! Each edit transaction arrives as a [`ChangeSet`] of replacement tuples. For
//! every tuple the line spans on both sides are compared: a net loss of lines
//! removes trackers, a net gain restores removal records or adds trackers,
//! and every line the inserted text now covers has its content refreshed.
//! Lines outside the tuple keep their trackers and are moved only by the
//! collection's shifting.
//!
//! Tuples are processed in document order. While tuple `i` is handled, every
//! earlier tuple is already reflected in the trackers, so the start of tuple
//! `i` is addressed by its post-edit line number. Tuples touching a common
//! pre-edit line are merged first, so no line break is counted twice.
//!
//! Line numbers must come from an index that breaks lines exactly where the
//! snapshot's `line_break` does; [`Snapshot::apply_transaction`] builds such
//! indexes itself.

use crate::snapshot::{Snapshot, split_lines};
use core_text::{ChangeSet, LineIndex, LineStarts, TextChange};
use core_tracker::{Placement, Removal, Target};
use serde::Serialize;
use tracing::{debug, trace};

/// Counts of tracker operations performed by one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// Content matched the last recorded state; nothing was touched.
    pub skipped: bool,
    pub removed: usize,
    pub dropped: usize,
    pub restored: usize,
    pub added: usize,
    pub changed: usize,
}

impl ApplyOutcome {
    fn record_removal(&mut self, removal: Removal) {
        match removal {
            Removal::Retained(_) => self.removed += 1,
            Removal::Dropped(_) => self.dropped += 1,
        }
    }

    fn record_placement(&mut self, placement: Placement) {
        match placement {
            Placement::Restored(_) => self.restored += 1,
            Placement::Added(_) => self.added += 1,
        }
    }

    /// True when at least one tracker was modified.
    pub fn touched(&self) -> bool {
        self.removed + self.dropped + self.restored + self.added + self.changed > 0
    }
}

/// Replaced range in both coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    from_a: usize,
    to_a: usize,
    from_b: usize,
    to_b: usize,
}

impl From<&TextChange> for Region {
    fn from(change: &TextChange) -> Self {
        Self {
            from_a: change.from_a,
            to_a: change.to_a,
            from_b: change.from_b,
            to_b: change.to_b,
        }
    }
}

/// Merge tuples whose pre-edit line ranges meet. The text between two merged
/// tuples is unchanged, so the union describes the same edit.
fn coalesce(changes: &ChangeSet, before: &impl LineIndex) -> Vec<Region> {
    let mut regions: Vec<Region> = Vec::with_capacity(changes.len());
    for change in changes {
        let next = Region::from(change);
        if let Some(last) = regions.last_mut() {
            let (_, last_end) = before.line_range(last.from_a, last.to_a);
            let (next_start, _) = before.line_range(next.from_a, next.to_a);
            if next_start <= last_end {
                last.to_a = next.to_a;
                last.to_b = next.to_b;
                continue;
            }
        }
        regions.push(next);
    }
    regions
}

/// Line geometry of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    new_start: usize,
    new_end: usize,
    /// Net line delta: positive when lines were added.
    delta: isize,
    /// First line index touched by whole-line insertion or removal.
    anchor: usize,
}

impl Span {
    fn of(region: &Region, before: &impl LineIndex, after: &impl LineIndex) -> Self {
        let (old_start, old_end) = before.line_range(region.from_a, region.to_a);
        let (new_start, new_end) = after.line_range(region.from_b, region.to_b);
        let delta = (new_end - new_start) as isize - (old_end - old_start) as isize;
        // Whole lines were replaced when the range begins and ends on line
        // starts; otherwise the first line keeps its tracker.
        let aligned = after.starts_line(region.from_b)
            && after.starts_line(region.to_b)
            && before.starts_line(region.to_a);
        let anchor = if aligned { new_start } else { new_start + 1 };
        Self {
            new_start,
            new_end,
            delta,
            anchor,
        }
    }
}

impl Snapshot {
    /// Absorb one edit transaction, mapping offsets to lines on this
    /// snapshot's own line break.
    ///
    /// The pre-edit document is taken to be the current content.
    pub fn apply_transaction(&mut self, changes: &ChangeSet, content: &str) -> ApplyOutcome {
        let before = LineStarts::new(&self.current_content(), self.line_break());
        let after = LineStarts::new(content, self.line_break());
        self.apply_changes(changes, &before, &after, content)
    }

    /// Absorb one edit transaction.
    ///
    /// `before` and `after` map offsets to lines in the pre- and post-edit
    /// document and must break lines only on this snapshot's `line_break`;
    /// `content` is the full post-edit text.
    pub fn apply_changes(
        &mut self,
        changes: &ChangeSet,
        before: &impl LineIndex,
        after: &impl LineIndex,
        content: &str,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        if !self.needs_update(content) {
            trace!(target: "snapshot.apply", id = %self.id(), "content unchanged, skipping");
            outcome.skipped = true;
            return outcome;
        }
        let current = split_lines(content, self.line_break());
        debug_assert_eq!(
            after.line_count(),
            current.len(),
            "line index disagrees with the snapshot line break"
        );

        let regions = coalesce(changes, before);
        for region in &regions {
            let span = Span::of(region, before, after);
            trace!(target: "snapshot.apply", ?region, ?span, "tuple");
            let tracker = self.tracker_mut();
            if span.delta < 0 {
                // Bottom-up so earlier removals keep later indices valid.
                for k in (0..span.delta.unsigned_abs()).rev() {
                    if let Some(removal) =
                        tracker.remove_tracker_or_line(Target::Line(span.anchor + k), true)
                    {
                        outcome.record_removal(removal);
                    }
                }
            } else if span.delta > 0 {
                for k in 0..span.delta.unsigned_abs() {
                    if let Some(placement) =
                        tracker.restore_or_add_tracker(Target::Line(span.anchor + k), true)
                    {
                        outcome.record_placement(placement);
                    }
                }
            }
            for line in span.new_start..=span.new_end {
                let Some(text) = current.get(line) else {
                    continue;
                };
                if tracker
                    .current_line_mut(line)
                    .is_some_and(|t| t.change(text, Some(line)))
                {
                    outcome.changed += 1;
                }
            }
        }

        self.update_state(current);
        self.update_changes();
        debug!(
            target: "snapshot.apply",
            id = %self.id(),
            tuples = changes.len(),
            regions = regions.len(),
            removed = outcome.removed,
            dropped = outcome.dropped,
            restored = outcome.restored,
            added = outcome.added,
            changed = outcome.changed,
            "transaction applied"
        );
        outcome
    }
}
