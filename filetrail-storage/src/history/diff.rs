// Copyright 2025 Filetrail Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Diff Engine - structural and textual differences
//!
//! Structural diffs compare two JSON-like values and report every differing
//! location as a dotted path (`a.b`, `list[2]`). Mapping keys are compared
//! regardless of order; sequences are compared index by index. Changed
//! strings additionally get a line-level delta computed with the patience
//! algorithm.

use super::checkout::MaterializedTree;
use filetrail_core::{CancelCheck, CancellationToken, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use similar::{Algorithm, ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet};

/// Path used for a change at the root of the compared values
pub const ROOT_PATH: &str = "@";

/// Kind of change at one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// Change descriptor for one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub kind: ChangeKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
    /// Line delta, present when both sides are strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<BlobDiff>,
}

impl ValueChange {
    pub fn old_str(&self) -> Option<&str> {
        self.old.as_ref().and_then(Value::as_str)
    }

    pub fn new_str(&self) -> Option<&str> {
        self.new.as_ref().and_then(Value::as_str)
    }
}

/// Result of comparing two values or two trees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralDelta {
    pub changes: BTreeMap<String, ValueChange>,
    pub stats: DiffStats,
}

impl StructuralDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, path: &str) -> Option<&ValueChange> {
        self.changes.get(path)
    }

    /// Paths with the given kind of change, in sorted order
    pub fn paths(&self, kind: ChangeKind) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|(_, change)| change.kind == kind)
            .map(|(path, _)| path.as_str())
            .collect()
    }

    fn record(&mut self, path: String, change: ValueChange) {
        match change.kind {
            ChangeKind::Added => self.stats.added += 1,
            ChangeKind::Removed => self.stats.removed += 1,
            ChangeKind::Modified => self.stats.modified += 1,
        }
        if let Some(ref text) = change.text {
            let (added, removed) = text.line_counts();
            self.stats.lines_added += added;
            self.stats.lines_removed += removed;
        }
        let path = if path.is_empty() {
            ROOT_PATH.to_string()
        } else {
            path
        };
        self.changes.insert(path, change);
    }
}

/// Aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    /// Net lines changed
    pub fn net_change(&self) -> i64 {
        self.lines_added as i64 - self.lines_removed as i64
    }
}

/// Line-level diff between two texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobDiff {
    pub hunks: Vec<DiffHunk>,
    /// Similarity ratio (0.0 - 1.0)
    pub similarity: f64,
}

/// A contiguous group of changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Starting line in old content (1-indexed)
    pub old_start: usize,
    pub old_count: usize,
    /// Starting line in new content (1-indexed)
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
    pub header: String,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub change: LineChange,
    /// Line content (without newline)
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineChange {
    Context,
    Added,
    Removed,
}

impl BlobDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// (added, removed) line counts
    pub fn line_counts(&self) -> (usize, usize) {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .fold((0, 0), |(added, removed), line| match line.change {
                LineChange::Added => (added + 1, removed),
                LineChange::Removed => (added, removed + 1),
                LineChange::Context => (added, removed),
            })
    }

    /// Format as unified diff string
    pub fn to_unified(&self, old_path: &str, new_path: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("--- {}\n", old_path));
        output.push_str(&format!("+++ {}\n", new_path));

        for hunk in &self.hunks {
            output.push_str(&hunk.header);
            output.push('\n');

            for line in &hunk.lines {
                let prefix = match line.change {
                    LineChange::Context => ' ',
                    LineChange::Added => '+',
                    LineChange::Removed => '-',
                };
                output.push(prefix);
                output.push_str(&line.content);
                output.push('\n');
            }
        }

        output
    }
}

/// Configuration for the diff engine
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Number of context lines around changes
    pub context_lines: usize,
    /// Attach line deltas to changed strings
    pub text_deltas: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            text_deltas: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Compare two arbitrary values
    pub fn diff_values(&self, old: &Value, new: &Value) -> StructuralDelta {
        // a fresh token is never cancelled
        self.diff_values_with(old, new, &CancellationToken::new())
            .unwrap_or_default()
    }

    /// Compare two values, checking `token` at every visited path
    pub fn diff_values_with(
        &self,
        old: &Value,
        new: &Value,
        token: &CancellationToken,
    ) -> Result<StructuralDelta> {
        let mut delta = StructuralDelta::default();
        self.walk(String::new(), old, new, &mut delta, token)?;
        Ok(delta)
    }

    /// Compare the contents of two materialized trees, path by path
    pub fn diff_trees(
        &self,
        old: &MaterializedTree,
        new: &MaterializedTree,
        token: &CancellationToken,
    ) -> Result<StructuralDelta> {
        self.diff_values_with(&contents_value(old), &contents_value(new), token)
    }

    fn walk(
        &self,
        path: String,
        old: &Value,
        new: &Value,
        delta: &mut StructuralDelta,
        token: &CancellationToken,
    ) -> Result<()> {
        token.check()?;

        match (old, new) {
            (Value::Object(a), Value::Object(b)) => {
                let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
                for key in keys {
                    let child = join_key(&path, key);
                    match (a.get(key), b.get(key)) {
                        (Some(x), Some(y)) => self.walk(child, x, y, delta, token)?,
                        (Some(x), None) => delta.record(child, removed(x)),
                        (None, Some(y)) => delta.record(child, added(y)),
                        (None, None) => {}
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                for idx in 0..a.len().max(b.len()) {
                    let child = format!("{}[{}]", path, idx);
                    match (a.get(idx), b.get(idx)) {
                        (Some(x), Some(y)) => self.walk(child, x, y, delta, token)?,
                        (Some(x), None) => delta.record(child, removed(x)),
                        (None, Some(y)) => delta.record(child, added(y)),
                        (None, None) => {}
                    }
                }
            }
            (a, b) if a == b => {}
            (a, b) => {
                let text = match (a, b) {
                    (Value::String(x), Value::String(y)) if self.config.text_deltas => {
                        Some(self.diff_text(x, y))
                    }
                    _ => None,
                };
                delta.record(
                    path,
                    ValueChange {
                        kind: ChangeKind::Modified,
                        old: Some(a.clone()),
                        new: Some(b.clone()),
                        text,
                    },
                );
            }
        }
        Ok(())
    }

    /// Diff two text strings
    pub fn diff_text(&self, old_text: &str, new_text: &str) -> BlobDiff {
        let diff = TextDiff::configure()
            .algorithm(Algorithm::Patience)
            .diff_lines(old_text, new_text);

        let mut hunks = Vec::new();
        for group in diff.grouped_ops(self.config.context_lines) {
            let mut lines = Vec::new();
            for op in &group {
                for change in diff.iter_changes(op) {
                    let kind = match change.tag() {
                        ChangeTag::Equal => LineChange::Context,
                        ChangeTag::Insert => LineChange::Added,
                        ChangeTag::Delete => LineChange::Removed,
                    };
                    lines.push(DiffLine {
                        change: kind,
                        content: change.value().trim_end_matches('\n').to_string(),
                        old_line: change.old_index().map(|i| i + 1),
                        new_line: change.new_index().map(|i| i + 1),
                    });
                }
            }

            let (old_start, new_start) = group
                .first()
                .map(|op| (op.old_range().start + 1, op.new_range().start + 1))
                .unwrap_or((1, 1));
            let old_count = lines.iter().filter(|l| l.old_line.is_some()).count();
            let new_count = lines.iter().filter(|l| l.new_line.is_some()).count();

            hunks.push(DiffHunk {
                old_start,
                old_count,
                new_start,
                new_count,
                header: format!(
                    "@@ -{},{} +{},{} @@",
                    old_start, old_count, new_start, new_count
                ),
                lines,
            });
        }

        BlobDiff {
            hunks,
            similarity: diff.ratio() as f64,
        }
    }
}

fn contents_value(tree: &MaterializedTree) -> Value {
    let map: Map<String, Value> = tree
        .files
        .iter()
        .map(|(path, file)| (path.clone(), Value::String(file.content.clone())))
        .collect();
    Value::Object(map)
}

fn join_key(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn added(value: &Value) -> ValueChange {
    ValueChange {
        kind: ChangeKind::Added,
        old: None,
        new: Some(value.clone()),
        text: None,
    }
}

fn removed(value: &Value) -> ValueChange {
    ValueChange {
        kind: ChangeKind::Removed,
        old: Some(value.clone()),
        new: None,
        text: None,
    }
}
