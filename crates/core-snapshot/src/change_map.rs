//! Display-oriented change map derived from tracker state.
//!
//! Invariants:
//! * Keys are display positions: removal slot for removed trackers, current
//!   line otherwise.
//! * Tags within one [`ChangeLine`] keep insertion order and never repeat.
//! * Ghost and original trackers contribute nothing.

use bitflags::bitflags;
use core_tracker::{LineCollection, LineState, TrackerLine};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Tag rendered for a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Removed,
    Added,
    Restored,
    Changed,
}

impl ChangeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ChangeType::Removed => "removed",
            ChangeType::Added => "added",
            ChangeType::Restored => "restored",
            ChangeType::Changed => "changed",
        }
    }

    /// Tag for a tracker classification; ghost and original map to nothing.
    pub fn from_state(state: LineState) -> Option<Self> {
        match state {
            LineState::Removed => Some(ChangeType::Removed),
            LineState::Added => Some(ChangeType::Added),
            LineState::Restored => Some(ChangeType::Restored),
            LineState::Changed => Some(ChangeType::Changed),
            LineState::Ghost | LineState::Original => None,
        }
    }

    fn flag(self) -> ChangeFilter {
        match self {
            ChangeType::Removed => ChangeFilter::REMOVED,
            ChangeType::Added => ChangeFilter::ADDED,
            ChangeType::Restored => ChangeFilter::RESTORED,
            ChangeType::Changed => ChangeFilter::CHANGED,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Selects a subset of change tags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChangeFilter: u8 {
        const REMOVED  = 0b0001;
        const ADDED    = 0b0010;
        const RESTORED = 0b0100;
        const CHANGED  = 0b1000;
        // tags counted as "changed lines" in summaries
        const LINES = Self::REMOVED.bits() | Self::ADDED.bits() | Self::CHANGED.bits();
    }
}

impl ChangeFilter {
    pub fn accepts(self, tag: ChangeType) -> bool {
        self.contains(tag.flag())
    }
}

/// One display line and the tags accumulated on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeLine {
    pub line: usize,
    pub types: Vec<ChangeType>,
}

impl ChangeLine {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            types: Vec::new(),
        }
    }

    /// Add `tag` unless already present.
    pub fn push(&mut self, tag: ChangeType) {
        if !self.types.contains(&tag) {
            self.types.push(tag);
        }
    }

    pub fn has(&self, tag: ChangeType) -> bool {
        self.types.contains(&tag)
    }

    pub fn matches(&self, filter: ChangeFilter) -> bool {
        self.types.iter().any(|t| filter.accepts(*t))
    }
}

/// Position to tag-set map, ordered by display position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeMap {
    lines: BTreeMap<usize, ChangeLine>,
}

impl ChangeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single linear pass over the trackers.
    pub fn rebuild(tracker: &LineCollection) -> Self {
        let mut map = Self::new();
        for t in tracker {
            map.record(t);
        }
        map
    }

    fn record(&mut self, t: &TrackerLine) {
        let Some(tag) = t.state().and_then(ChangeType::from_state) else {
            return;
        };
        let Some(at) = t.display_position() else {
            return;
        };
        self.lines
            .entry(at)
            .or_insert_with(|| ChangeLine::new(at))
            .push(tag);
    }

    pub fn get(&self, line: usize) -> Option<&ChangeLine> {
        self.lines.get(&line)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeLine> + '_ {
        self.lines.values()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sub-map keeping only tags accepted by `filter`; lines left without tags are dropped.
    pub fn filter(&self, filter: ChangeFilter) -> ChangeMap {
        let lines = self
            .lines
            .iter()
            .filter_map(|(at, cl)| {
                let types: Vec<ChangeType> =
                    cl.types.iter().copied().filter(|t| filter.accepts(*t)).collect();
                (!types.is_empty()).then(|| (*at, ChangeLine { line: *at, types }))
            })
            .collect();
        ChangeMap { lines }
    }

    /// Number of display lines carrying at least one tag accepted by `filter`.
    pub fn count(&self, filter: ChangeFilter) -> usize {
        self.lines.values().filter(|cl| cl.matches(filter)).count()
    }

    /// Number of tag occurrences of `tag`.
    pub fn count_tag(&self, tag: ChangeType) -> usize {
        self.lines.values().filter(|cl| cl.has(tag)).count()
    }
}

impl<'a> IntoIterator for &'a ChangeMap {
    type Item = &'a ChangeLine;
    type IntoIter = std::collections::btree_map::Values<'a, usize, ChangeLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_tracker::Target;
    use pretty_assertions::assert_eq;

    #[test]
    fn tags_are_unique_and_ordered() {
        let mut cl = ChangeLine::new(3);
        cl.push(ChangeType::Removed);
        cl.push(ChangeType::Added);
        cl.push(ChangeType::Removed);
        assert_eq!(cl.types, vec![ChangeType::Removed, ChangeType::Added]);
        assert!(cl.matches(ChangeFilter::ADDED));
        assert!(!cl.matches(ChangeFilter::RESTORED));
    }

    #[test]
    fn removed_and_added_share_a_slot() {
        let mut c = LineCollection::from_lines(&["a", "b", "c"]);
        c.remove_tracker_or_line(Target::Line(1), true);
        c.restore_or_add_tracker(Target::Line(2), true);
        let map = ChangeMap::rebuild(&c);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(1).unwrap().types, vec![ChangeType::Removed]);
        assert_eq!(map.get(2).unwrap().types, vec![ChangeType::Added]);

        // Replacing the occupant of the removal slot stacks both tags.
        let mut c = LineCollection::from_lines(&["a", "b"]);
        c.remove_tracker_or_line(Target::Line(1), false);
        c.restore_or_add_tracker(Target::Line(2), false);
        c.move_to(2, 1);
        let map = ChangeMap::rebuild(&c);
        assert_eq!(
            map.get(1).unwrap().types,
            vec![ChangeType::Removed, ChangeType::Added]
        );
    }

    #[test]
    fn original_lines_carry_no_tags() {
        let c = LineCollection::from_lines(&["a", "b"]);
        assert!(ChangeMap::rebuild(&c).is_empty());
    }

    #[test]
    fn filter_and_count() {
        let mut c = LineCollection::from_lines(&["a", "b", "c"]);
        c.current_line_mut(0).unwrap().change("A", None);
        c.current_line_mut(1).unwrap().change("B", None);
        c.current_line_mut(1).unwrap().change("b", None);
        c.remove_tracker_or_line(Target::Line(2), true);
        let map = ChangeMap::rebuild(&c);
        assert_eq!(map.count(ChangeFilter::all()), 3);
        assert_eq!(map.count(ChangeFilter::LINES), 2);
        let restored = map.filter(ChangeFilter::RESTORED);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get(1).unwrap().types, vec![ChangeType::Restored]);
        assert_eq!(map.count_tag(ChangeType::Changed), 1);
    }

    #[test]
    fn serializes_lowercase_tags() {
        let mut c = LineCollection::from_lines(&["a"]);
        c.current_line_mut(0).unwrap().change("z", None);
        let json = serde_json::to_string(&ChangeMap::rebuild(&c)).unwrap();
        assert_eq!(json, r#"{"0":{"line":0,"types":["changed"]}}"#);
    }
}
