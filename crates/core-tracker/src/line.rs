//! A single tracked line and its classification.

use crate::clock::{self, Stamp};
use ahash::AHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque tracker identity, stable for the tracker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackerId(pub(crate) u64);

impl TrackerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Content hash used for cheap line equality (not cryptographic).
pub fn content_hash(content: &str) -> u64 {
    let mut hasher = AHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Primary display classification of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineState {
    /// Added and removed again without ever being part of the original.
    Ghost,
    Removed,
    Added,
    Changed,
    Original,
    /// Back to its original content after an explicit change.
    Restored,
}

impl LineState {
    pub const ALL: [LineState; 6] = [
        LineState::Ghost,
        LineState::Removed,
        LineState::Added,
        LineState::Changed,
        LineState::Original,
        LineState::Restored,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            LineState::Ghost => "ghost",
            LineState::Removed => "removed",
            LineState::Added => "added",
            LineState::Changed => "changed",
            LineState::Original => "original",
            LineState::Restored => "restored",
        }
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn in_range(pos: Option<usize>, from: usize, to: Option<usize>) -> bool {
    match pos {
        Some(p) => p >= from && to.is_none_or(|t| p <= t),
        None => false,
    }
}

/// Position history and content state of one logical line.
///
/// Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct TrackerLine {
    id: TrackerId,
    original_position: Option<usize>,
    current_position: Option<usize>,
    removed_at_position: Option<usize>,
    change_at_position: Option<usize>,
    content_same_original: bool,
    original_hash: u64,
    hash: u64,
    content: String,
    added_stamp: Option<Stamp>,
    changed_stamp: Option<Stamp>,
    removed_stamp: Option<Stamp>,
}

impl PartialEq for TrackerLine {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackerLine {}

impl Hash for TrackerLine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl TrackerLine {
    /// Tracker for a line of the baseline document.
    pub fn original(id: TrackerId, position: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = content_hash(&content);
        Self {
            id,
            original_position: Some(position),
            current_position: Some(position),
            removed_at_position: None,
            change_at_position: None,
            content_same_original: true,
            original_hash: hash,
            hash,
            content,
            added_stamp: None,
            changed_stamp: None,
            removed_stamp: None,
        }
    }

    /// Tracker for a line that did not exist in the baseline.
    pub fn added(id: TrackerId, position: usize, content: impl Into<String>) -> Self {
        let mut line = Self::original(id, position, content);
        line.original_position = None;
        line.added_stamp = Some(clock::tick());
        line
    }

    pub fn id(&self) -> TrackerId {
        self.id
    }
    pub fn original_position(&self) -> Option<usize> {
        self.original_position
    }
    pub fn current_position(&self) -> Option<usize> {
        self.current_position
    }
    pub fn removed_at_position(&self) -> Option<usize> {
        self.removed_at_position
    }
    pub fn change_at_position(&self) -> Option<usize> {
        self.change_at_position
    }
    pub fn content_same_original(&self) -> bool {
        self.content_same_original
    }
    pub fn hash(&self) -> u64 {
        self.hash
    }
    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn added_stamp(&self) -> Option<Stamp> {
        self.added_stamp
    }
    pub fn changed_stamp(&self) -> Option<Stamp> {
        self.changed_stamp
    }
    pub fn removed_stamp(&self) -> Option<Stamp> {
        self.removed_stamp
    }

    /// Slot this tracker is displayed at: removal slot if removed, else current line.
    pub fn display_position(&self) -> Option<usize> {
        self.removed_at_position.or(self.current_position)
    }

    // ---- derived state -------------------------------------------------------------------------

    pub fn existed_in_original(&self) -> bool {
        self.original_position.is_some()
    }
    pub fn existed_in_current(&self) -> bool {
        self.current_position.is_some()
    }
    pub fn was_explicitly_removed(&self) -> bool {
        self.removed_at_position.is_some()
    }
    pub fn was_explicitly_changed(&self) -> bool {
        self.change_at_position.is_some()
    }

    pub fn is_ghost(&self) -> bool {
        !self.existed_in_original() && !self.existed_in_current() && self.was_explicitly_removed()
    }

    pub fn is_removed(&self) -> bool {
        self.existed_in_original() && !self.existed_in_current() && self.was_explicitly_removed()
    }

    pub fn is_added(&self) -> bool {
        !self.existed_in_original() && !self.was_explicitly_removed() && self.existed_in_current()
    }

    pub fn is_changed(&self) -> bool {
        self.existed_in_original()
            && self.existed_in_current()
            && !self.content_same_original
            && !self.was_explicitly_removed()
            && self.was_explicitly_changed()
    }

    pub fn is_original(&self) -> bool {
        self.existed_in_original()
            && self.content_same_original
            && !self.was_explicitly_removed()
            && !self.was_explicitly_changed()
    }

    pub fn is_restored(&self) -> bool {
        self.existed_in_original()
            && self.content_same_original
            && !self.was_explicitly_removed()
            && self.was_explicitly_changed()
    }

    /// Every classification predicate that currently holds.
    pub fn matching_states(&self) -> impl Iterator<Item = LineState> + '_ {
        LineState::ALL.into_iter().filter(|s| match s {
            LineState::Ghost => self.is_ghost(),
            LineState::Removed => self.is_removed(),
            LineState::Added => self.is_added(),
            LineState::Changed => self.is_changed(),
            LineState::Original => self.is_original(),
            LineState::Restored => self.is_restored(),
        })
    }

    /// Primary classification, `None` only for states no mutation sequence produces.
    pub fn state(&self) -> Option<LineState> {
        let mut states = self.matching_states();
        let first = states.next();
        debug_assert!(
            states.next().is_none(),
            "tracker {} matches more than one classification",
            self.id
        );
        first
    }

    // ---- position predicates -------------------------------------------------------------------

    pub fn is_current_at(&self, line: usize) -> bool {
        self.current_position == Some(line)
    }
    pub fn is_origin_at(&self, line: usize) -> bool {
        self.original_position == Some(line)
    }
    pub fn is_removed_at(&self, line: usize) -> bool {
        self.removed_at_position == Some(line)
    }
    /// `from` inclusive; `to` inclusive when given, unbounded otherwise.
    pub fn is_current_in_range(&self, from: usize, to: Option<usize>) -> bool {
        in_range(self.current_position, from, to)
    }
    pub fn is_original_in_range(&self, from: usize, to: Option<usize>) -> bool {
        in_range(self.original_position, from, to)
    }
    pub fn is_remove_in_range(&self, from: usize, to: Option<usize>) -> bool {
        in_range(self.removed_at_position, from, to)
    }
    pub fn is_current_before(&self, line: usize) -> bool {
        self.current_position.is_some_and(|p| p < line)
    }
    pub fn is_current_after(&self, line: usize) -> bool {
        self.current_position.is_some_and(|p| p > line)
    }

    // ---- transitions ---------------------------------------------------------------------------

    /// Relocate a present line. Returns false when the line is not in the current document.
    pub fn move_to(&mut self, position: usize) -> bool {
        if self.current_position.is_none() {
            return false;
        }
        self.current_position = Some(position);
        self.change_at_position = Some(position);
        true
    }

    /// Bring an original line back at `position` (default: its removal slot).
    ///
    /// No-op for lines that never existed in the original or are not removed.
    pub fn restore(&mut self, position: Option<usize>) -> bool {
        if !self.existed_in_original() {
            return false;
        }
        let Some(at) = position.or(self.removed_at_position) else {
            return false;
        };
        if self.current_position.is_some() && self.removed_at_position.is_none() {
            return false;
        }
        self.current_position = Some(at);
        self.removed_at_position = None;
        self.removed_stamp = None;
        self.change_at_position = Some(at);
        self.changed_stamp = Some(clock::tick());
        true
    }

    /// Mark the line removed at `position` (default: its current line). Idempotent.
    pub fn remove(&mut self, position: Option<usize>) -> bool {
        let Some(current) = self.current_position else {
            return false;
        };
        self.removed_at_position = Some(position.unwrap_or(current));
        self.current_position = None;
        self.removed_stamp = Some(clock::tick());
        true
    }

    /// Record new content for a present line.
    ///
    /// No-op when the content hash is unchanged, so re-applying identical text
    /// never stamps a phantom change.
    pub fn change(&mut self, content: &str, position: Option<usize>) -> bool {
        let Some(current) = self.current_position else {
            return false;
        };
        let hash = content_hash(content);
        if hash == self.hash {
            return false;
        }
        self.content.clear();
        self.content.push_str(content);
        self.hash = hash;
        self.content_same_original = hash == self.original_hash;
        self.change_at_position = Some(position.unwrap_or(current));
        self.changed_stamp = Some(clock::tick());
        true
    }

    /// Move toward the end of the document by `offset`.
    pub fn shift_up(&mut self, offset: usize) {
        if let Some(p) = self.current_position.as_mut() {
            *p += offset;
        } else if let Some(p) = self.removed_at_position.as_mut() {
            *p += offset;
        }
    }

    /// Move toward the start of the document by `offset` (saturating at 0).
    pub fn shift_down(&mut self, offset: usize) {
        if let Some(p) = self.current_position.as_mut() {
            *p = p.saturating_sub(offset);
        } else if let Some(p) = self.removed_at_position.as_mut() {
            *p = p.saturating_sub(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orig(pos: usize, content: &str) -> TrackerLine {
        TrackerLine::original(TrackerId(pos as u64), pos, content)
    }

    #[test]
    fn fresh_original_line_is_original() {
        let t = orig(3, "a");
        assert_eq!(t.state(), Some(LineState::Original));
        assert_eq!(t.display_position(), Some(3));
    }

    #[test]
    fn edit_and_revert_is_restored() {
        let mut t = orig(0, "a");
        assert!(t.change("A", None));
        assert_eq!(t.state(), Some(LineState::Changed));
        assert!(t.change("a", None));
        assert_eq!(t.state(), Some(LineState::Restored));
        assert_eq!(t.change_at_position(), Some(0));
    }

    #[test]
    fn identical_content_is_noop() {
        let mut t = orig(0, "a");
        assert!(!t.change("a", Some(4)));
        assert_eq!(t.change_at_position(), None);
        assert!(t.changed_stamp().is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut t = orig(2, "x");
        assert!(t.remove(None));
        let stamp = t.removed_stamp();
        assert!(!t.remove(Some(7)));
        assert_eq!(t.removed_at_position(), Some(2));
        assert_eq!(t.removed_stamp(), stamp);
        assert_eq!(t.state(), Some(LineState::Removed));
        assert!(!t.change("y", None), "removed lines ignore content changes");
    }

    #[test]
    fn restore_defaults_to_removed_slot() {
        let mut t = orig(2, "x");
        t.remove(Some(1));
        assert!(t.restore(None));
        assert_eq!(t.current_position(), Some(1));
        assert_eq!(t.removed_at_position(), None);
        assert_eq!(t.state(), Some(LineState::Restored));
        assert!(!t.restore(None), "present line has nothing to restore");
    }

    #[test]
    fn added_line_never_restores_and_becomes_ghost() {
        let mut t = TrackerLine::added(TrackerId(9), 1, "");
        assert_eq!(t.state(), Some(LineState::Added));
        assert!(t.change("typed", None));
        assert_eq!(t.state(), Some(LineState::Added));
        assert!(t.remove(None));
        assert_eq!(t.state(), Some(LineState::Ghost));
        assert!(!t.restore(Some(1)));
    }

    #[test]
    fn shifts_touch_current_or_removed_never_original() {
        let mut t = orig(4, "x");
        t.shift_up(2);
        assert_eq!(t.current_position(), Some(6));
        t.shift_down(10);
        assert_eq!(t.current_position(), Some(0));
        t.remove(None);
        t.shift_up(3);
        assert_eq!(t.removed_at_position(), Some(3));
        assert_eq!(t.original_position(), Some(4));
    }

    #[test]
    fn move_marks_change_position() {
        let mut t = orig(1, "x");
        assert!(t.move_to(5));
        assert_eq!(t.current_position(), Some(5));
        assert_eq!(t.change_at_position(), Some(5));
        t.remove(None);
        assert!(!t.move_to(0));
    }

    #[test]
    fn range_predicates_treat_missing_upper_bound_as_open() {
        let t = orig(7, "x");
        assert!(t.is_current_in_range(7, None));
        assert!(t.is_current_in_range(0, Some(7)));
        assert!(!t.is_current_in_range(8, None));
        assert!(t.is_original_in_range(5, Some(9)));
        assert!(!t.is_remove_in_range(0, None));
        assert!(t.is_current_before(8) && t.is_current_after(6));
    }

    #[test]
    fn equality_is_by_id() {
        let a = orig(1, "x");
        let mut b = a.clone();
        b.change("different", None);
        assert_eq!(a, b);
        assert_ne!(a, orig(2, "x"));
    }
}
