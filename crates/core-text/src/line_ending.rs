//! Line-ending detection and LF normalization.
//!
//! Buffers handed to the tracker are LF-only; the detected style is kept so the
//! original and current content can be emitted with the document's own line
//! breaks for an external diff tool.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Rewrite LF-only `text` using this line ending.
    pub fn apply(self, text: &str) -> String {
        match self {
            LineEnding::Lf => text.to_string(),
            other => text.replace('\n', other.as_str()),
        }
    }
}

/// Result of normalizing line endings.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub normalized: String,         // LF-only content
    pub original: LineEnding,       // majority/origin style
    pub had_trailing_newline: bool, // original trailing newline presence
    pub mixed: bool,                // true if multiple styles encountered
}

/// Detect and normalize line endings of `input` to LF-only internal representation.
/// Counts CRLF, LF, and CR occurrences; picks the majority (ties resolved by precedence CRLF > LF > CR).
/// Mixed flag is true if more than one style observed and at least one count differs from majority.
pub fn normalize_line_endings(input: &str) -> NormalizedText {
    let bytes = input.as_bytes();
    let (mut crlf, mut lf, mut cr) = (0usize, 0usize, 0usize);
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                crlf += 1;
                i += 2;
            }
            b'\r' => {
                cr += 1;
                i += 1;
            }
            b'\n' => {
                lf += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    let had_trailing_newline = input.ends_with('\n') || input.ends_with('\r');

    let mut original = LineEnding::Lf;
    let mut max = 0usize;
    for (style, count) in [
        (LineEnding::Crlf, crlf),
        (LineEnding::Lf, lf),
        (LineEnding::Cr, cr),
    ] {
        if count > max {
            max = count;
            original = style;
        }
    }
    let counts = [crlf, lf, cr];
    let mixed = counts.iter().filter(|c| **c > 0).count() > 1
        && counts.iter().any(|c| *c > 0 && *c != max);

    if crlf == 0 && cr == 0 {
        return NormalizedText {
            normalized: input.to_string(),
            original,
            had_trailing_newline,
            mixed,
        };
    }
    // Only slice at '\r' boundaries so multi-byte sequences stay intact.
    let mut out = String::with_capacity(input.len());
    let mut seg_start = 0usize;
    let mut j = 0usize;
    while j < bytes.len() {
        if bytes[j] == b'\r' {
            out.push_str(&input[seg_start..j]);
            out.push('\n');
            j += if bytes.get(j + 1) == Some(&b'\n') { 2 } else { 1 };
            seg_start = j;
        } else {
            j += 1;
        }
    }
    out.push_str(&input[seg_start..]);
    debug_assert!(!out.contains('\r'));
    NormalizedText {
        normalized: out,
        original,
        had_trailing_newline,
        mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_crlf() {
        let n = normalize_line_endings("a\r\nb\r\n");
        assert_eq!(n.normalized, "a\nb\n");
        assert_eq!(n.original, LineEnding::Crlf);
        assert!(n.had_trailing_newline);
        assert!(!n.mixed);
    }

    #[test]
    fn normalize_cr() {
        let n = normalize_line_endings("a\rb\r");
        assert_eq!(n.normalized, "a\nb\n");
        assert_eq!(n.original, LineEnding::Cr);
    }

    #[test]
    fn normalize_mixed_majority() {
        let n = normalize_line_endings("a\r\nb\nc\r\n");
        assert_eq!(n.normalized, "a\nb\nc\n");
        assert_eq!(n.original, LineEnding::Crlf);
        assert!(n.mixed);
    }

    #[test]
    fn lf_only_is_untouched() {
        let n = normalize_line_endings("x\ny");
        assert_eq!(n.normalized, "x\ny");
        assert_eq!(n.original, LineEnding::Lf);
        assert!(!n.had_trailing_newline);
    }

    #[test]
    fn apply_restores_style() {
        assert_eq!(LineEnding::Crlf.apply("a\nb"), "a\r\nb");
        assert_eq!(LineEnding::Lf.apply("a\nb"), "a\nb");
    }

    #[test]
    fn multibyte_survives_normalization() {
        let n = normalize_line_endings("⚙️ Gear\r\nNext\r\n");
        assert_eq!(n.normalized, "⚙️ Gear\nNext\n");
    }
}
