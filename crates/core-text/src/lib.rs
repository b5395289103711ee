//! Rope-based text buffer and the host-side text abstractions consumed by the
//! line tracker.
//!
//! The tracker never maps character offsets to lines itself. Everything it needs
//! from a document goes through [`LineIndex`]. `Buffer` implements it on top of
//! `ropey`, which is built with LF as its only line break. [`LineStarts`]
//! implements it for any line-break string. Edit transactions are expressed as a [`ChangeSet`] of
//! `(from_a, to_a, from_b, to_b, inserted)` tuples: `*_a` offsets address the
//! pre-edit document, `*_b` offsets the post-edit document.
//!
//! Invariants:
//! * Offsets are character (not byte) offsets.
//! * `line_at` clamps offsets past the end to the end of the document.
//! * `Buffer::lines()` yields exactly `line_count()` entries, each without its
//!   trailing line break (a trailing newline yields a final empty line).

use anyhow::Result;
use ropey::{Rope, RopeSlice};

pub mod change;
pub mod line_ending;
pub mod line_starts;

pub use change::{ChangeSet, Edit, EditError, TextChange};
pub use line_ending::{LineEnding, NormalizedText, normalize_line_endings};
pub use line_starts::LineStarts;

/// Location of a single line within a document (character offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAt {
    /// Zero-based line number.
    pub number: usize,
    /// Offset of the first character of the line.
    pub start: usize,
    /// Offset just past the last character, excluding the line break.
    pub end: usize,
}

/// Offset to line mapping supplied by the host text buffer.
pub trait LineIndex {
    /// Line containing `offset`.
    fn line_at(&self, offset: usize) -> LineAt;
    /// Total number of lines (always >= 1).
    fn line_count(&self) -> usize;
    /// True when `offset` sits at the first column of its line.
    fn starts_line(&self, offset: usize) -> bool {
        self.line_at(offset).start == offset
    }
    /// First and last line touched by the range `from..to`.
    fn line_range(&self, from: usize, to: usize) -> (usize, usize) {
        (self.line_at(from).number, self.line_at(to).number)
    }
}

impl<T: LineIndex + ?Sized> LineIndex for &T {
    fn line_at(&self, offset: usize) -> LineAt {
        (**self).line_at(offset)
    }
    fn line_count(&self) -> usize {
        (**self).line_count()
    }
    fn line_range(&self, from: usize, to: usize) -> (usize, usize) {
        (**self).line_range(from, to)
    }
}

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("chars", &self.rope.len_chars())
            .field("lines", &self.rope.len_lines())
            .finish()
    }
}

/// Number of characters in a rope line, excluding a trailing `\n` or `\r\n`.
fn content_len(line: RopeSlice<'_>) -> usize {
    let n = line.len_chars();
    if n == 0 || line.char(n - 1) != '\n' {
        return n;
    }
    if n > 1 && line.char(n - 2) == '\r' {
        n - 2
    } else {
        n - 1
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Return the requested line without its trailing line break.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(idx);
        Some(line.slice(..content_len(line)).to_string())
    }

    /// All lines, line breaks stripped.
    pub fn lines(&self) -> Vec<String> {
        self.rope
            .lines()
            .map(|line| line.slice(..content_len(line)).to_string())
            .collect()
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Apply a transaction of edits expressed in pre-edit coordinates.
    ///
    /// Edits must be sorted and non-overlapping (touching ranges are allowed).
    /// The whole transaction is validated before the rope is touched, so a
    /// rejected transaction leaves the buffer unchanged. Returns the change set
    /// describing the transaction in both coordinate spaces.
    pub fn apply_edits(&mut self, edits: &[Edit]) -> Result<ChangeSet, EditError> {
        let len = self.rope.len_chars();
        let mut prev_end = 0usize;
        for (index, edit) in edits.iter().enumerate() {
            if edit.from > edit.to {
                return Err(EditError::Inverted {
                    from: edit.from,
                    to: edit.to,
                });
            }
            if edit.to > len {
                return Err(EditError::OutOfRange {
                    offset: edit.to,
                    len,
                });
            }
            if index > 0 && edit.from < prev_end {
                return Err(EditError::Overlapping { index });
            }
            prev_end = edit.to;
        }

        let mut changes = ChangeSet::new();
        let mut grown = 0usize;
        let mut shrunk = 0usize;
        for edit in edits {
            let from_b = edit.from + grown - shrunk;
            let removed = edit.to - edit.from;
            let inserted = edit.insert.chars().count();
            if removed > 0 {
                self.rope.remove(from_b..from_b + removed);
            }
            if inserted > 0 {
                self.rope.insert(from_b, &edit.insert);
            }
            changes.push(TextChange {
                from_a: edit.from,
                to_a: edit.to,
                from_b,
                to_b: from_b + inserted,
                inserted: edit.insert.clone(),
            });
            grown += inserted;
            shrunk += removed;
        }
        Ok(changes)
    }
}

impl LineIndex for Buffer {
    fn line_at(&self, offset: usize) -> LineAt {
        let offset = offset.min(self.rope.len_chars());
        let number = self.rope.char_to_line(offset);
        let start = self.rope.line_to_char(number);
        let end = start + content_len(self.rope.line(number));
        LineAt { number, start, end }
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_buffer_and_read_line() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0).unwrap(), "hello");
        assert_eq!(b.line(1).unwrap(), "world");
        assert!(b.line(2).is_none());
    }

    #[test]
    fn lines_keep_trailing_empty_line() {
        let b = Buffer::from_str("t", "a\nb\n").unwrap();
        assert_eq!(b.lines(), vec!["a", "b", ""]);
        let empty = Buffer::from_str("t", "").unwrap();
        assert_eq!(empty.lines(), vec![""]);
    }

    #[test]
    fn line_at_reports_bounds() {
        let b = Buffer::from_str("t", "ab\ncde\n").unwrap();
        assert_eq!(
            b.line_at(0),
            LineAt {
                number: 0,
                start: 0,
                end: 2
            }
        );
        // Offset of the newline itself still belongs to line 0.
        assert_eq!(b.line_at(2).number, 0);
        assert_eq!(
            b.line_at(4),
            LineAt {
                number: 1,
                start: 3,
                end: 6
            }
        );
        // End of document (after trailing newline) is the empty last line.
        assert_eq!(b.line_at(7).number, 2);
        assert_eq!(b.line_at(99).number, 2, "offsets clamp to the end");
        assert!(b.starts_line(3));
        assert!(!b.starts_line(4));
    }

    #[test]
    fn crlf_is_excluded_from_line_end() {
        let b = Buffer::from_str("t", "ab\r\ncd").unwrap();
        assert_eq!(b.line(0).unwrap(), "ab");
        assert_eq!(b.line_at(0).end, 2);
    }

    #[test]
    fn only_lf_breaks_rope_lines() {
        let b = Buffer::from_str("t", "x\u{c}y\nz\u{2028}w\u{85}\rv\n").unwrap();
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.lines(), vec!["x\u{c}y", "z\u{2028}w\u{85}\rv", ""]);
        assert_eq!(b.line_at(5).number, 1);
        assert!(!b.starts_line(6));
        let lone_cr = Buffer::from_str("t", "a\r").unwrap();
        assert_eq!(lone_cr.line(0).unwrap(), "a\r");
    }

    #[test]
    fn rope_lines_match_lf_line_starts() {
        let text = "é\u{2028}\r\n\u{b}\n\rq\u{c}";
        let b = Buffer::from_str("t", text).unwrap();
        let idx = LineStarts::new(text, "\n");
        assert_eq!(b.line_count(), idx.line_count());
        for offset in 0..=b.len_chars() {
            assert_eq!(b.line_at(offset).number, idx.line_at(offset).number);
            assert_eq!(b.starts_line(offset), idx.starts_line(offset));
        }
    }

    #[test]
    fn apply_single_insert_reports_both_coordinates() {
        let mut b = Buffer::from_str("t", "a\nb").unwrap();
        let cs = b.apply_edits(&[Edit::insert(1, "\nx")]).unwrap();
        assert_eq!(b.text(), "a\nx\nb");
        let change = cs.iter().next().unwrap();
        assert_eq!((change.from_a, change.to_a), (1, 1));
        assert_eq!((change.from_b, change.to_b), (1, 3));
        assert_eq!(change.inserted_line_breaks(), 1);
    }

    #[test]
    fn apply_multiple_edits_shifts_new_side() {
        let mut b = Buffer::from_str("t", "one\ntwo\nthree").unwrap();
        let cs = b
            .apply_edits(&[Edit::delete(0, 4), Edit::replace(8, 13, "3\n3")])
            .unwrap();
        assert_eq!(b.text(), "two\n3\n3");
        let v: Vec<_> = cs.iter().cloned().collect();
        assert_eq!((v[0].from_b, v[0].to_b), (0, 0));
        // Second edit starts at old offset 8, shifted left by the 4 removed chars.
        assert_eq!((v[1].from_b, v[1].to_b), (4, 7));
    }

    #[test]
    fn rejected_transaction_leaves_buffer_untouched() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        let err = b
            .apply_edits(&[Edit::insert(1, "x"), Edit::delete(0, 2)])
            .unwrap_err();
        assert_eq!(err, EditError::Overlapping { index: 1 });
        assert_eq!(b.text(), "abc");
        assert_eq!(
            b.apply_edits(&[Edit::delete(2, 9)]).unwrap_err(),
            EditError::OutOfRange { offset: 9, len: 3 }
        );
        assert_eq!(
            b.apply_edits(&[Edit::delete(2, 1)]).unwrap_err(),
            EditError::Inverted { from: 2, to: 1 }
        );
    }

    #[test]
    fn multibyte_offsets_are_chars() {
        let mut b = Buffer::from_str("t", "é\nü").unwrap();
        assert_eq!(b.line_at(2).number, 1);
        b.apply_edits(&[Edit::insert(1, "!")]).unwrap();
        assert_eq!(b.lines(), vec!["é!", "ü"]);
    }
}
