//! Offset to line mapping for an explicit line-break string.
//!
//! Lines are exactly the pieces `str::split(line_break)` yields, so the
//! mapping agrees with any consumer that splits text on the same delimiter.
//! No other character ends a line.

use crate::{LineAt, LineIndex};

/// Character offsets of every line start in one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStarts {
    /// Always begins with `0`; one entry per line.
    starts: Vec<usize>,
    break_len: usize,
    len: usize,
}

impl LineStarts {
    /// Index `text` split on `line_break`. An empty delimiter yields one line.
    pub fn new(text: &str, line_break: &str) -> Self {
        let break_len = line_break.chars().count();
        let mut starts = vec![0];
        let mut chars = 0usize;
        let mut last_byte = 0usize;
        if !line_break.is_empty() {
            for (byte, _) in text.match_indices(line_break) {
                chars += text[last_byte..byte].chars().count();
                last_byte = byte;
                starts.push(chars + break_len);
            }
        }
        let len = chars + text[last_byte..].chars().count();
        Self {
            starts,
            break_len,
            len,
        }
    }

    /// Total number of characters in the indexed text.
    pub fn len_chars(&self) -> usize {
        self.len
    }
}

impl LineIndex for LineStarts {
    fn line_at(&self, offset: usize) -> LineAt {
        let offset = offset.min(self.len);
        // An offset inside a line break belongs to the line the break ends.
        let number = self.starts.partition_point(|&s| s <= offset) - 1;
        let start = self.starts[number];
        let end = match self.starts.get(number + 1) {
            Some(next) => next - self.break_len,
            None => self.len,
        };
        LineAt { number, start, end }
    }

    fn line_count(&self) -> usize {
        self.starts.len()
    }

    fn line_range(&self, from: usize, to: usize) -> (usize, usize) {
        let first = self.line_at(from).number;
        if self.break_len == 0 {
            return (first, first);
        }
        // Every break beginning before `to` is touched, including one the
        // range ends inside of.
        let to = to.min(self.len);
        let last = self.starts.partition_point(|&s| s < to + self.break_len) - 1;
        (first, last.max(first))
    }
}
