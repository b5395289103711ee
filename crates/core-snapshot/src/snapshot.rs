//! Per-document baseline plus live tracker state.

use crate::change_map::{ChangeFilter, ChangeMap};
use core_tracker::{LineCollection, TrackerLine, content_hash};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::debug;

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

/// Opaque snapshot identity, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Baseline lines of one document, its current lines and the trackers
/// aligning the two.
#[derive(Debug, Clone)]
pub struct Snapshot {
    id: SnapshotId,
    created_at: SystemTime,
    line_break: String,
    lines: Box<[String]>,
    state: Vec<String>,
    tracker: LineCollection,
    changes: ChangeMap,
    last_hash: u64,
}

pub(crate) fn split_lines(content: &str, line_break: &str) -> Vec<String> {
    if line_break.is_empty() {
        return vec![content.to_string()];
    }
    content.split(line_break).map(str::to_string).collect()
}

impl Snapshot {
    /// Capture `content` as the baseline, split on `line_break`.
    pub fn new(content: &str, line_break: impl Into<String>) -> Self {
        let line_break = line_break.into();
        let lines = split_lines(content, &line_break);
        let tracker = LineCollection::from_lines(&lines);
        let id = SnapshotId(NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed));
        debug!(target: "snapshot", %id, lines = lines.len(), "snapshot created");
        Self {
            id,
            created_at: SystemTime::now(),
            line_break,
            state: lines.clone(),
            lines: lines.into_boxed_slice(),
            tracker,
            changes: ChangeMap::new(),
            last_hash: content_hash(content),
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn line_break(&self) -> &str {
        &self.line_break
    }

    /// Baseline lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Current lines.
    pub fn state(&self) -> &[String] {
        &self.state
    }

    pub fn tracker(&self) -> &LineCollection {
        &self.tracker
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut LineCollection {
        &mut self.tracker
    }

    pub fn last_hash(&self) -> u64 {
        self.last_hash
    }

    pub fn original_content(&self) -> String {
        self.lines.join(&self.line_break)
    }

    pub fn current_content(&self) -> String {
        self.state.join(&self.line_break)
    }

    /// True when `content` differs from the last recorded state.
    pub fn needs_update(&self, content: &str) -> bool {
        content_hash(content) != self.last_hash
    }

    /// Replace the current lines wholesale and refresh the state hash.
    pub fn update_state(&mut self, state: Vec<String>) {
        self.state = state;
        self.last_hash = content_hash(&self.current_content());
    }

    /// Rebuild the change map from tracker state.
    pub fn update_changes(&mut self) -> &ChangeMap {
        self.changes = ChangeMap::rebuild(&self.tracker);
        &self.changes
    }

    /// Change map as of the last [`update_changes`](Self::update_changes).
    pub fn changes(&self) -> &ChangeMap {
        &self.changes
    }

    pub fn changes_of(&self, filter: ChangeFilter) -> ChangeMap {
        self.changes.filter(filter)
    }

    /// Distinct display lines tagged changed, added or removed.
    ///
    /// Removal markers keyed past the last current line are shown on the last
    /// line, so the count never exceeds the larger of the two documents.
    pub fn changes_lines_count(&self) -> usize {
        let last = self.state.len().saturating_sub(1);
        let mut lines: Vec<usize> = self
            .changes
            .iter()
            .filter(|cl| cl.matches(ChangeFilter::LINES))
            .map(|cl| cl.line.min(last))
            .collect();
        lines.dedup();
        lines.len()
    }

    /// Tracker of the original line now displayed at `current_line`.
    pub fn original_line(&self, current_line: usize) -> Option<&TrackerLine> {
        self.tracker.find_original_line(current_line, None, true)
    }

    /// Baseline text of the line now displayed at `current_line`.
    pub fn original_text(&self, current_line: usize) -> Option<&str> {
        let origin = self.original_line(current_line)?.original_position()?;
        self.lines.get(origin).map(String::as_str)
    }
}
