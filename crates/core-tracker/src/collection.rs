//! Tracker collection with position queries and the shifting engine.
//!
//! Inserting a line at `p` shifts every present tracker at `>= p` and every
//! removal record at `>= p` one slot toward the end; removing the line at `p`
//! shifts everything at `> p` one slot back. Nothing is ever re-derived from
//! content, so a line that merely moved because of edits elsewhere keeps its
//! identity and original-position provenance.
//!
//! Ranges: `from` is inclusive, `to` is inclusive when given and unbounded
//! when `None`.

use crate::line::{TrackerId, TrackerLine};
use tracing::trace;

/// Addressing for collection operations: a current line or a specific tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Line(usize),
    Tracker(TrackerId),
}

/// Outcome of [`LineCollection::restore_or_add_tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A removal record was brought back.
    Restored(TrackerId),
    /// A brand-new tracker was created.
    Added(TrackerId),
}

impl Placement {
    pub fn id(self) -> TrackerId {
        match self {
            Placement::Restored(id) | Placement::Added(id) => id,
        }
    }
}

/// Outcome of [`LineCollection::remove_tracker_or_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Original line kept as a removal record.
    Retained(TrackerId),
    /// Line that never existed originally, deleted outright.
    Dropped(TrackerId),
}

impl Removal {
    pub fn id(self) -> TrackerId {
        match self {
            Removal::Retained(id) | Removal::Dropped(id) => id,
        }
    }
}

/// Insertion-ordered set of trackers for one document.
#[derive(Debug, Clone, Default)]
pub struct LineCollection {
    lines: Vec<TrackerLine>,
    next_id: u64,
}

impl LineCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// One original tracker per baseline line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut collection = Self::new();
        for (position, content) in lines.iter().enumerate() {
            let id = collection.allocate_id();
            collection
                .lines
                .push(TrackerLine::original(id, position, content.as_ref()));
        }
        collection
    }

    fn allocate_id(&mut self) -> TrackerId {
        let id = TrackerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackerLine> {
        self.lines.iter()
    }

    pub fn get(&self, id: TrackerId) -> Option<&TrackerLine> {
        self.lines.iter().find(|t| t.id() == id)
    }

    fn get_mut(&mut self, id: TrackerId) -> Option<&mut TrackerLine> {
        self.lines.iter_mut().find(|t| t.id() == id)
    }

    fn index_of_current(&self, line: usize, to: Option<usize>) -> Option<usize> {
        self.lines.iter().position(|t| {
            t.is_current_at(line) && (to.is_none() || t.is_original_in_range(0, to))
        })
    }

    // ---- queries -------------------------------------------------------------------------------

    /// Tracker currently at `line`; with `to`, only trackers whose original
    /// position lies in `[0, to]` qualify.
    pub fn find_current_line(&self, line: usize, to: Option<usize>) -> Option<&TrackerLine> {
        self.index_of_current(line, to).map(|i| &self.lines[i])
    }

    /// Mutable access to the tracker currently at `line`.
    pub fn current_line_mut(&mut self, line: usize) -> Option<&mut TrackerLine> {
        let idx = self.index_of_current(line, None)?;
        Some(&mut self.lines[idx])
    }

    /// Original tracker at `line`, matched by current position when `visible`
    /// and by original position otherwise, limited to original range `[0, to]`.
    pub fn find_original_line(
        &self,
        line: usize,
        to: Option<usize>,
        visible: bool,
    ) -> Option<&TrackerLine> {
        self.lines.iter().find(|t| {
            let at = if visible {
                t.is_current_at(line)
            } else {
                t.is_origin_at(line)
            };
            at && t.existed_in_original() && t.is_original_in_range(0, to)
        })
    }

    /// Most recently removed tracker whose removal slot is `line`.
    pub fn find_removed_at(&self, line: usize) -> Option<&TrackerLine> {
        self.lines
            .iter()
            .filter(|t| t.is_removed_at(line))
            .max_by_key(|t| t.removed_stamp())
    }

    /// Current positions claimed by more than one present tracker (sorted).
    pub fn duplicate_positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .lines
            .iter()
            .filter_map(TrackerLine::current_position)
            .collect();
        positions.sort_unstable();
        let mut dups: Vec<usize> = positions
            .windows(2)
            .filter(|w| w[0] == w[1])
            .map(|w| w[0])
            .collect();
        dups.dedup();
        dups
    }

    /// Number of trackers present in the current document.
    pub fn current_count(&self) -> usize {
        self.lines.iter().filter(|t| t.existed_in_current()).count()
    }

    // ---- shifting ------------------------------------------------------------------------------

    fn shift_where<S, A>(&mut self, skip: Option<TrackerId>, select: S, apply: A) -> usize
    where
        S: Fn(&TrackerLine) -> bool,
        A: Fn(&mut TrackerLine),
    {
        let mut shifted = 0;
        for t in self.lines.iter_mut() {
            if Some(t.id()) != skip && select(t) {
                apply(t);
                shifted += 1;
            }
        }
        shifted
    }

    /// Add `offset` to every current position in `[from, to]`.
    pub fn shift_up(&mut self, from: usize, to: Option<usize>, offset: usize) -> usize {
        self.shift_where(None, |t| t.is_current_in_range(from, to), |t| t.shift_up(offset))
    }

    /// Subtract `offset` from every current position in `[from, to]`.
    pub fn shift_down(&mut self, from: usize, to: Option<usize>, offset: usize) -> usize {
        self.shift_where(None, |t| t.is_current_in_range(from, to), |t| {
            t.shift_down(offset)
        })
    }

    /// Add `offset` to every removal slot in `[from, to]`.
    pub fn shift_up_removed(&mut self, from: usize, to: Option<usize>, offset: usize) -> usize {
        self.shift_where(None, |t| t.is_remove_in_range(from, to), |t| t.shift_up(offset))
    }

    /// Subtract `offset` from every removal slot in `[from, to]`.
    pub fn shift_down_removed(&mut self, from: usize, to: Option<usize>, offset: usize) -> usize {
        self.shift_where(None, |t| t.is_remove_in_range(from, to), |t| {
            t.shift_down(offset)
        })
    }

    fn open_slot(&mut self, at: usize, keep: Option<TrackerId>) {
        self.shift_where(keep, |t| t.is_current_in_range(at, None), |t| t.shift_up(1));
        self.shift_where(keep, |t| t.is_remove_in_range(at, None), |t| t.shift_up(1));
    }

    fn close_slot(&mut self, at: usize) {
        self.shift_down(at + 1, None, 1);
        self.shift_down_removed(at + 1, None, 1);
    }

    fn debug_check(&self, op: &str) {
        debug_assert!(
            self.duplicate_positions().is_empty(),
            "{op} left duplicate current positions: {:?}",
            self.duplicate_positions()
        );
    }

    // ---- structural mutations ------------------------------------------------------------------

    /// Relocate the tracker at `line` to `position`, shifting the trackers in
    /// between by one so no slot is duplicated or left empty.
    ///
    /// Removal records in the shifted range move with the lines they precede;
    /// a record at `line` itself stays at its slot.
    pub fn move_to(&mut self, line: usize, position: usize) -> Option<TrackerId> {
        let idx = self.index_of_current(line, None)?;
        let id = self.lines[idx].id();
        if position > line {
            let (from, to) = (line + 1, Some(position));
            self.shift_where(
                Some(id),
                |t| t.is_current_in_range(from, to) || t.is_remove_in_range(from, to),
                |t| t.shift_down(1),
            );
        } else if position < line {
            let (from, to) = (position, Some(line - 1));
            self.shift_where(
                Some(id),
                |t| t.is_current_in_range(from, to) || t.is_remove_in_range(from, to),
                |t| t.shift_up(1),
            );
        }
        self.lines[idx].move_to(position);
        trace!(target: "tracker.collection", %id, from = line, to = position, "move_to");
        self.debug_check("move_to");
        Some(id)
    }

    /// Bring back the removal record at the target slot or create a new tracker there.
    ///
    /// With `shift`, present trackers and removal records at or after the slot
    /// move one line down first, so the placed tracker never collides.
    pub fn restore_or_add_tracker(&mut self, target: Target, shift: bool) -> Option<Placement> {
        let (at, candidate) = match target {
            Target::Line(line) => (line, self.find_removed_at(line).map(TrackerLine::id)),
            Target::Tracker(id) => {
                let t = self.get(id)?;
                let at = t.removed_at_position()?;
                if !t.existed_in_original() {
                    return None;
                }
                (at, Some(id))
            }
        };
        if shift {
            self.open_slot(at, candidate);
        }
        let placement = match candidate {
            Some(id) => {
                let restored = self.get_mut(id).is_some_and(|t| t.restore(Some(at)));
                debug_assert!(restored, "removal record {id} failed to restore");
                Placement::Restored(id)
            }
            None => {
                let id = self.allocate_id();
                self.lines.push(TrackerLine::added(id, at, ""));
                Placement::Added(id)
            }
        };
        trace!(target: "tracker.collection", line = at, ?placement, shift, "restore_or_add");
        if shift {
            self.debug_check("restore_or_add_tracker");
        }
        Some(placement)
    }

    /// Remove the target line from the current document.
    ///
    /// Original lines are kept as removal records; lines that never existed in
    /// the original are deleted. With `shift`, everything after the removed
    /// slot moves one line up to close the gap.
    pub fn remove_tracker_or_line(&mut self, target: Target, shift: bool) -> Option<Removal> {
        let idx = match target {
            Target::Line(line) => self.index_of_current(line, None)?,
            Target::Tracker(id) => self
                .lines
                .iter()
                .position(|t| t.id() == id && t.existed_in_current())?,
        };
        let at = self.lines[idx].current_position()?;
        let removal = if self.lines[idx].existed_in_original() {
            self.lines[idx].remove(Some(at));
            Removal::Retained(self.lines[idx].id())
        } else {
            Removal::Dropped(self.lines.remove(idx).id())
        };
        if shift {
            self.close_slot(at);
        }
        trace!(target: "tracker.collection", line = at, ?removal, shift, "remove");
        if shift {
            self.debug_check("remove_tracker_or_line");
        }
        Some(removal)
    }
}

impl<'a> IntoIterator for &'a LineCollection {
    type Item = &'a TrackerLine;
    type IntoIter = std::slice::Iter<'a, TrackerLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineState;
    use pretty_assertions::assert_eq;

    fn abc() -> LineCollection {
        LineCollection::from_lines(&["a", "b", "c"])
    }

    fn current_contents(c: &LineCollection) -> Vec<(usize, String)> {
        let mut v: Vec<_> = c
            .iter()
            .filter_map(|t| t.current_position().map(|p| (p, t.content().to_string())))
            .collect();
        v.sort();
        v
    }

    #[test]
    fn from_lines_assigns_positions() {
        let c = abc();
        assert_eq!(c.len(), 3);
        for (i, t) in c.iter().enumerate() {
            assert_eq!(t.original_position(), Some(i));
            assert_eq!(t.current_position(), Some(i));
        }
    }

    #[test]
    fn find_current_respects_original_bound() {
        let mut c = abc();
        c.restore_or_add_tracker(Target::Line(0), true);
        // Line 1 is now the original "a" (original position 0).
        assert_eq!(c.find_current_line(1, None).unwrap().content(), "a");
        assert!(c.find_current_line(0, Some(5)).is_none(), "added line has no origin");
        assert!(c.find_current_line(3, Some(1)).is_none(), "\"c\" has origin 2");
        assert!(c.find_current_line(9, None).is_none());
    }

    #[test]
    fn find_original_by_visible_or_origin() {
        let mut c = abc();
        c.remove_tracker_or_line(Target::Line(0), true);
        let visible = c.find_original_line(0, None, true).unwrap();
        assert_eq!(visible.content(), "b");
        let by_origin = c.find_original_line(0, None, false).unwrap();
        assert_eq!(by_origin.content(), "a");
    }

    #[test]
    fn remove_original_line_keeps_record_and_shifts() {
        let mut c = abc();
        let r = c.remove_tracker_or_line(Target::Line(1), true).unwrap();
        assert!(matches!(r, Removal::Retained(_)));
        let b = c.get(r.id()).unwrap();
        assert_eq!(b.state(), Some(LineState::Removed));
        assert_eq!(b.removed_at_position(), Some(1));
        assert_eq!(current_contents(&c), vec![(0, "a".into()), (1, "c".into())]);
    }

    #[test]
    fn removed_then_restored_reuses_tracker() {
        let mut c = abc();
        let removed = c.remove_tracker_or_line(Target::Line(1), true).unwrap();
        let placed = c.restore_or_add_tracker(Target::Line(1), true).unwrap();
        assert_eq!(placed, Placement::Restored(removed.id()));
        let b = c.get(removed.id()).unwrap();
        assert_eq!(b.removed_at_position(), None);
        assert_eq!(b.current_position(), Some(1));
        assert_eq!(b.state(), Some(LineState::Restored));
        assert_eq!(
            current_contents(&c),
            vec![(0, "a".into()), (1, "b".into()), (2, "c".into())]
        );
    }

    #[test]
    fn added_then_removed_line_is_dropped() {
        let mut c = abc();
        let placed = c.restore_or_add_tracker(Target::Line(3), true).unwrap();
        assert!(matches!(placed, Placement::Added(_)));
        assert_eq!(c.len(), 4);
        let removal = c.remove_tracker_or_line(Target::Line(3), true).unwrap();
        assert_eq!(removal, Removal::Dropped(placed.id()));
        assert_eq!(c.len(), 3);
        assert!(c.get(placed.id()).is_none());
    }

    #[test]
    fn find_removed_at_prefers_latest_removal() {
        let mut c = abc();
        // Remove "c" then "b": both records collapse onto slot 1.
        c.remove_tracker_or_line(Target::Line(2), true);
        let b = c.remove_tracker_or_line(Target::Line(1), true).unwrap();
        let c_rec = c.iter().find(|t| t.content() == "c").unwrap();
        assert_eq!(c_rec.removed_at_position(), Some(1));
        assert_eq!(c.find_removed_at(1).unwrap().id(), b.id());
    }

    #[test]
    fn stacked_removals_restore_in_reverse_order() {
        let mut c = LineCollection::from_lines(&["a", "b", "c", "d"]);
        for line in (1..=2).rev() {
            c.remove_tracker_or_line(Target::Line(line), true);
        }
        assert_eq!(c.find_removed_at(1).unwrap().content(), "b");
        for line in 1..=2 {
            let p = c.restore_or_add_tracker(Target::Line(line), true).unwrap();
            assert!(matches!(p, Placement::Restored(_)));
        }
        assert_eq!(
            current_contents(&c),
            vec![
                (0, "a".into()),
                (1, "b".into()),
                (2, "c".into()),
                (3, "d".into())
            ]
        );
    }

    #[test]
    fn restore_specific_tracker() {
        let mut c = abc();
        let r = c.remove_tracker_or_line(Target::Line(0), true).unwrap();
        let p = c
            .restore_or_add_tracker(Target::Tracker(r.id()), true)
            .unwrap();
        assert_eq!(p, Placement::Restored(r.id()));
        assert_eq!(c.get(r.id()).unwrap().current_position(), Some(0));
        assert!(
            c.restore_or_add_tracker(Target::Tracker(r.id()), true)
                .is_none()
        );
    }

    #[test]
    fn shift_ranges_are_inclusive() {
        let mut c = LineCollection::from_lines(&["0", "1", "2", "3", "4"]);
        assert_eq!(c.shift_up(1, Some(3), 10), 3);
        let positions: Vec<_> = c.iter().map(|t| t.current_position().unwrap()).collect();
        assert_eq!(positions, vec![0, 11, 12, 13, 4]);
        assert_eq!(c.shift_down(11, None, 10), 3);
        assert!(c.duplicate_positions().is_empty());
    }

    #[test]
    fn removed_shifts_only_touch_removal_records() {
        let mut c = abc();
        c.remove_tracker_or_line(Target::Line(2), false);
        assert_eq!(c.shift_up_removed(0, None, 4), 1);
        let rec = c.iter().find(|t| t.content() == "c").unwrap();
        assert_eq!(rec.removed_at_position(), Some(6));
        assert_eq!(c.shift_down_removed(6, Some(6), 6), 1);
        assert_eq!(c.find_removed_at(0).unwrap().content(), "c");
        assert_eq!(c.find_current_line(1, None).unwrap().content(), "b");
    }

    #[test]
    fn move_forward_and_back() {
        let mut c = LineCollection::from_lines(&["a", "b", "c", "d"]);
        c.move_to(0, 2).unwrap();
        assert_eq!(
            current_contents(&c),
            vec![
                (0, "b".into()),
                (1, "c".into()),
                (2, "a".into()),
                (3, "d".into())
            ]
        );
        c.move_to(3, 0).unwrap();
        assert_eq!(
            current_contents(&c),
            vec![
                (0, "d".into()),
                (1, "b".into()),
                (2, "c".into()),
                (3, "a".into())
            ]
        );
        assert!(c.move_to(9, 0).is_none());
    }

    #[test]
    fn move_carries_removal_records_in_range() {
        let mut c = LineCollection::from_lines(&["a", "b", "c", "d", "e"]);
        // Records before "c" (slot 1) and before "e" (slot 3).
        c.remove_tracker_or_line(Target::Line(1), true);
        c.remove_tracker_or_line(Target::Line(3), true);
        assert_eq!(
            current_contents(&c),
            vec![(0, "a".into()), (1, "c".into()), (2, "d".into())]
        );

        c.move_to(0, 2).unwrap();
        assert_eq!(
            current_contents(&c),
            vec![(0, "c".into()), (1, "d".into()), (2, "a".into())]
        );
        let slot = |c: &LineCollection, content: &str| {
            c.iter()
                .find(|t| t.content() == content)
                .unwrap()
                .removed_at_position()
        };
        assert_eq!(slot(&c, "b"), Some(0), "still precedes \"c\"");
        assert_eq!(slot(&c, "e"), Some(3), "outside the moved range");

        c.move_to(2, 0).unwrap();
        assert_eq!(slot(&c, "b"), Some(1));
        assert_eq!(c.find_current_line(1, None).unwrap().content(), "c");
        assert!(c.duplicate_positions().is_empty());
    }

    #[test]
    fn missing_targets_return_none() {
        let mut c = abc();
        assert!(c.remove_tracker_or_line(Target::Line(7), true).is_none());
        assert!(
            c.restore_or_add_tracker(Target::Tracker(TrackerId(99)), true)
                .is_none()
        );
        assert_eq!(c.len(), 3);
    }
}
