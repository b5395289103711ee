//! Replay harness behind the `linetrack` binary.
//!
//! A [`Session`] plays the host editor: it owns the document buffer, turns
//! each transaction of [`Edit`]s into a [`DocumentEvent`], and routes it to a
//! [`SnapshotRegistry`]. Reports summarize the resulting change map.

use anyhow::{Context, Result};
use core_config::{Config, LineBreakSetting, OnClose};
use core_events::{DocumentEvent, RegistryEvent};
use core_snapshot::{
    ApplyOutcome, ChangeFilter, ChangeMap, ChangeType, RegistryOptions, RetentionPolicy,
    SelfTestReport, Snapshot, SnapshotRegistry,
};
use core_text::{Buffer, Edit, LineEnding, normalize_line_endings};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// One edit transaction, in pre-edit character offsets.
pub type Transaction = Vec<Edit>;

/// Parse a JSON transcript: an array of transactions, each an array of
/// `{ "from", "to", "insert" }` objects.
pub fn parse_transcript(json: &str) -> Result<Vec<Transaction>> {
    serde_json::from_str(json).context("invalid edit transcript")
}

pub fn retention_for(on_close: OnClose) -> RetentionPolicy {
    match on_close {
        OnClose::Discard => RetentionPolicy::Discard,
        OnClose::Keep => RetentionPolicy::Keep,
        OnClose::Reset => RetentionPolicy::Reset,
    }
}

/// Output line ending for a configured setting; `Auto` keeps the detected style.
pub fn line_ending_for(setting: LineBreakSetting, detected: LineEnding) -> LineEnding {
    match setting {
        LineBreakSetting::Auto => detected,
        LineBreakSetting::Lf => LineEnding::Lf,
        LineBreakSetting::Crlf => LineEnding::Crlf,
        LineBreakSetting::Cr => LineEnding::Cr,
    }
}

/// Per-tag line counts of a change map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub removed: usize,
    pub added: usize,
    pub restored: usize,
    pub changed: usize,
}

impl TagCounts {
    fn of(map: &ChangeMap) -> Self {
        Self {
            removed: map.count_tag(ChangeType::Removed),
            added: map.count_tag(ChangeType::Added),
            restored: map.count_tag(ChangeType::Restored),
            changed: map.count_tag(ChangeType::Changed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub document: String,
    pub original_lines: usize,
    pub current_lines: usize,
    pub transactions: usize,
    pub changed_lines: usize,
    pub tags: TagCounts,
    pub changes: ChangeMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_test: Option<SelfTestReport>,
}

impl Report {
    /// Plain-text rendering: one `<line> <tags>` row per display line, then totals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for cl in &self.changes {
            let tags: Vec<&str> = cl.types.iter().map(|t| t.as_str()).collect();
            let _ = writeln!(out, "{:>5} {}", cl.line + 1, tags.join(","));
        }
        let _ = writeln!(
            out,
            "{}: {} changed line(s) [{} removed, {} added, {} changed, {} restored] after {} transaction(s)",
            self.document,
            self.changed_lines,
            self.tags.removed,
            self.tags.added,
            self.tags.changed,
            self.tags.restored,
            self.transactions
        );
        if let Some(report) = &self.self_test {
            let verdict = if report.is_consistent() { "ok" } else { "FAILED" };
            let _ = writeln!(
                out,
                "self-test {verdict}: equal={} missing_state={:?} missing_origin={:?} duplicates={:?} stale={:?}",
                report.equal,
                report.missing_state,
                report.missing_origin,
                report.duplicates,
                report.stale_content
            );
        }
        out
    }
}

/// Host-side replay of one tracked document.
pub struct Session {
    key: String,
    buffer: Buffer,
    registry: SnapshotRegistry,
    registry_events: Receiver<RegistryEvent>,
    detected: LineEnding,
    output_line_break: LineBreakSetting,
    transactions: usize,
}

impl Session {
    /// Normalize `content` to LF and start tracking it as the baseline.
    pub fn open(key: &str, content: &str, config: &Config) -> Result<Self> {
        let norm = normalize_line_endings(content);
        if norm.mixed {
            warn!(target: "io", key, "mixed_line_endings_detected");
        }
        let mut registry = SnapshotRegistry::new(RegistryOptions {
            line_break: LineEnding::Lf.as_str().to_string(),
            retention: retention_for(config.on_close()),
            self_test: config.self_test(),
        });
        let registry_events = registry.subscribe();
        registry.handle(DocumentEvent::Opened {
            key: key.to_string(),
            saved: Some(norm.normalized.clone()),
        });
        let buffer = Buffer::from_str(key, &norm.normalized)?;
        info!(target: "runtime", key, lines = buffer.line_count(), line_ending = ?norm.original, "document_opened");
        Ok(Self {
            key: key.to_string(),
            buffer,
            registry,
            registry_events,
            detected: norm.original,
            output_line_break: config.line_break(),
            transactions: 0,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn snapshot(&self) -> Result<&Snapshot> {
        self.registry
            .get(&self.key)
            .with_context(|| format!("document {} is not tracked", self.key))
    }

    /// Apply one transaction to the buffer and deliver it to the registry.
    pub fn apply(&mut self, edits: &[Edit]) -> Result<ApplyOutcome> {
        let changes = self
            .buffer
            .apply_edits(edits)
            .with_context(|| format!("transaction {} rejected", self.transactions + 1))?;
        self.transactions += 1;
        let outcome = self
            .registry
            .handle(DocumentEvent::Changed {
                key: self.key.clone(),
                changes,
                content: self.buffer.text(),
            })
            .with_context(|| format!("document {} is not tracked", self.key))?;
        debug!(target: "runtime", transaction = self.transactions, ?outcome, "transaction_delivered");
        Ok(outcome)
    }

    /// Registry notifications received since the last call.
    pub fn drain_registry_events(&self) -> Vec<RegistryEvent> {
        self.registry_events.try_iter().collect()
    }

    pub fn report(&self, self_test: bool) -> Result<Report> {
        let snapshot = self.snapshot()?;
        let changes = snapshot.changes_of(ChangeFilter::all());
        Ok(Report {
            document: self.key.clone(),
            original_lines: snapshot.lines().len(),
            current_lines: snapshot.state().len(),
            transactions: self.transactions,
            changed_lines: snapshot.changes_lines_count(),
            tags: TagCounts::of(&changes),
            changes,
            self_test: self_test.then(|| snapshot.self_test()),
        })
    }

    /// Original and current text with the output line ending applied, ready
    /// for an external diff tool.
    pub fn diff_texts(&self) -> Result<(String, String)> {
        let snapshot = self.snapshot()?;
        let ending = line_ending_for(self.output_line_break, self.detected);
        Ok((
            ending.apply(&snapshot.original_content()),
            ending.apply(&snapshot.current_content()),
        ))
    }

    /// Close the document, applying the configured retention policy.
    pub fn close(mut self) -> Result<SnapshotRegistry> {
        self.registry.handle(DocumentEvent::Closed {
            key: self.key.clone(),
        });
        Ok(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transcript_defaults_missing_insert() {
        let txs = parse_transcript(r#"[[{"from":0,"to":2}],[{"from":1,"to":1,"insert":"x"}]]"#)
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0][0], Edit::delete(0, 2));
        assert_eq!(txs[1][0], Edit::insert(1, "x"));
    }

    #[test]
    fn malformed_transcript_is_an_error() {
        let err = parse_transcript("{").unwrap_err();
        assert!(err.to_string().contains("invalid edit transcript"));
    }

    #[test]
    fn auto_line_break_uses_detected_style() {
        assert_eq!(
            line_ending_for(LineBreakSetting::Auto, LineEnding::Crlf),
            LineEnding::Crlf
        );
        assert_eq!(
            line_ending_for(LineBreakSetting::Lf, LineEnding::Crlf),
            LineEnding::Lf
        );
    }

    #[test]
    fn render_text_lists_tags() {
        let mut session = Session::open("doc", "a\nb\nc", &Config::default()).unwrap();
        session.apply(&[Edit::delete(2, 4)]).unwrap();
        let text = session.report(false).unwrap().render_text();
        assert!(text.starts_with("    2 removed\n"), "{text}");
        assert!(text.contains("doc: 1 changed line(s)"));
    }
}
