//! Structural self-test of a snapshot, for debugging and test assertions.

use crate::snapshot::Snapshot;
use core_tracker::{LineState, content_hash};
use serde::Serialize;
use tracing::warn;

/// Number of trackers per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub ghost: usize,
    pub removed: usize,
    pub added: usize,
    pub changed: usize,
    pub original: usize,
    pub restored: usize,
    /// Trackers matching no classification.
    pub unclassified: usize,
}

impl StateCounts {
    fn bump(&mut self, state: Option<LineState>) {
        let slot = match state {
            Some(LineState::Ghost) => &mut self.ghost,
            Some(LineState::Removed) => &mut self.removed,
            Some(LineState::Added) => &mut self.added,
            Some(LineState::Changed) => &mut self.changed,
            Some(LineState::Original) => &mut self.original,
            Some(LineState::Restored) => &mut self.restored,
            None => &mut self.unclassified,
        };
        *slot += 1;
    }
}

/// Result of [`Snapshot::self_test`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestReport {
    /// Current lines rebuilt from trackers equal the recorded state.
    pub equal: bool,
    pub original_lines: usize,
    pub current_lines: usize,
    /// State lines with no tracker at that current position.
    pub missing_state: Vec<usize>,
    /// Baseline lines with no tracker carrying that original position.
    pub missing_origin: Vec<usize>,
    /// Current positions claimed more than once.
    pub duplicates: Vec<usize>,
    /// Current positions whose tracker hash disagrees with the state line.
    pub stale_content: Vec<usize>,
    pub counts: StateCounts,
}

impl SelfTestReport {
    pub fn is_consistent(&self) -> bool {
        self.equal
            && self.missing_state.is_empty()
            && self.missing_origin.is_empty()
            && self.duplicates.is_empty()
            && self.stale_content.is_empty()
            && self.counts.unclassified == 0
    }
}

impl Snapshot {
    /// Cross-check trackers against the baseline and current lines.
    pub fn self_test(&self) -> SelfTestReport {
        let state = self.state();
        let mut counts = StateCounts::default();
        let mut by_current: Vec<Option<&str>> = vec![None; state.len()];
        let mut has_origin = vec![false; self.lines().len()];
        let mut stale_content = Vec::new();
        let mut overflow = false;

        for t in self.tracker() {
            counts.bump(t.state());
            if let Some(origin) = t.original_position() {
                if let Some(slot) = has_origin.get_mut(origin) {
                    *slot = true;
                }
            }
            let Some(pos) = t.current_position() else {
                continue;
            };
            match state.get(pos) {
                Some(line) => {
                    if content_hash(line) != t.hash() {
                        stale_content.push(pos);
                    }
                    by_current[pos] = Some(t.content());
                }
                None => overflow = true,
            }
        }

        let missing_state: Vec<usize> = by_current
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_none().then_some(i))
            .collect();
        let missing_origin: Vec<usize> = has_origin
            .iter()
            .enumerate()
            .filter_map(|(i, seen)| (!seen).then_some(i))
            .collect();
        let equal = !overflow
            && missing_state.is_empty()
            && by_current
                .iter()
                .zip(state)
                .all(|(c, line)| *c == Some(line.as_str()));
        stale_content.sort_unstable();

        let report = SelfTestReport {
            equal,
            original_lines: self.lines().len(),
            current_lines: state.len(),
            missing_state,
            missing_origin,
            duplicates: self.tracker().duplicate_positions(),
            stale_content,
            counts,
        };
        if !report.is_consistent() {
            warn!(target: "snapshot", id = %self.id(), ?report, "self-test failed");
        }
        report
    }
}
