//! Edit transactions in host coordinates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One replacement inside a transaction.
///
/// `from_a..to_a` is the replaced range in the pre-edit document,
/// `from_b..to_b` the range now occupied by `inserted` in the post-edit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub from_a: usize,
    pub to_a: usize,
    pub from_b: usize,
    pub to_b: usize,
    pub inserted: String,
}

impl TextChange {
    /// Literal number of line breaks in the inserted text.
    pub fn inserted_line_breaks(&self) -> usize {
        self.inserted.matches('\n').count()
    }

    /// True when the change neither removes nor inserts anything.
    pub fn is_empty(&self) -> bool {
        self.from_a == self.to_a && self.inserted.is_empty()
    }
}

/// Ordered list of changes produced by a single edit transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<TextChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: TextChange) {
        self.changes.push(change);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a TextChange;
    type IntoIter = std::slice::Iter<'a, TextChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl FromIterator<TextChange> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = TextChange>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// A requested edit in pre-edit character offsets (transcript / host input form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub insert: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            from: at,
            to: at,
            insert: text.into(),
        }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            insert: String::new(),
        }
    }

    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: text.into(),
        }
    }
}

/// Malformed transaction rejected by the buffer before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit range is inverted ({from} > {to})")]
    Inverted { from: usize, to: usize },
    #[error("edit offset {offset} is past the end of the document ({len} chars)")]
    OutOfRange { offset: usize, len: usize },
    #[error("edit #{index} overlaps the previous edit or is out of order")]
    Overlapping { index: usize },
}
