// Copyright 2025 Filetrail Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Normalized file operations
//!
//! A `FileOperation` is one write/edit event lifted out of a tool-use log by
//! the recorder. The history engine replays them in order; it never parses
//! raw recorder output itself.
//!
//! # Replay policy
//!
//! - `Write` replaces the whole file (empty content when none was recorded)
//! - `Edit` / `MultiEdit` replace the **first** occurrence of each
//!   `old_string`, in order, on the accumulated text
//! - operations without a usable path are skipped by the applier

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Operation Kind
// ============================================================================

/// The kind of file mutation recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Full-content write (create or overwrite)
    Write,
    /// Single string replacement
    Edit,
    /// Ordered batch of string replacements
    MultiEdit,
}

impl OperationKind {
    /// Parse from a recorder tool name (common spellings accepted)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "write" | "write_file" | "create" | "create_file" => Some(OperationKind::Write),
            "edit" | "edit_file" | "str_replace" | "str_replace_editor" => {
                Some(OperationKind::Edit)
            }
            "multiedit" | "multi_edit" | "multi-edit" => Some(OperationKind::MultiEdit),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Write => "Write",
            OperationKind::Edit => "Edit",
            OperationKind::MultiEdit => "MultiEdit",
        }
    }

    /// Whether this kind carries edit pairs rather than full content
    pub fn is_edit(&self) -> bool {
        matches!(self, OperationKind::Edit | OperationKind::MultiEdit)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Edit Pair
// ============================================================================

/// One `(old_string, new_string)` replacement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditPair {
    pub old_string: String,
    pub new_string: String,
}

impl EditPair {
    pub fn new(old_string: impl Into<String>, new_string: impl Into<String>) -> Self {
        Self {
            old_string: old_string.into(),
            new_string: new_string.into(),
        }
    }
}

// ============================================================================
// File Operation
// ============================================================================

/// A normalized write/edit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    /// What kind of mutation this is
    pub kind: OperationKind,
    /// Path relative to the tracked root; `None` marks a path-less event
    #[serde(default)]
    pub path: Option<String>,
    /// Full content (meaningful for `Write` only)
    #[serde(default)]
    pub content: Option<String>,
    /// Replacements (meaningful for `Edit` / `MultiEdit` only)
    #[serde(default)]
    pub edits: Vec<EditPair>,
    /// Event time reported by the recorder (microseconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_us: Option<u64>,
    /// Recorder's identifier for the originating event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl FileOperation {
    /// Full-content write
    pub fn write(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Write,
            path: Some(path.into()),
            content: Some(content.into()),
            edits: Vec::new(),
            timestamp_us: None,
            source_id: None,
        }
    }

    /// Single replacement
    pub fn edit(
        path: impl Into<String>,
        old_string: impl Into<String>,
        new_string: impl Into<String>,
    ) -> Self {
        Self {
            kind: OperationKind::Edit,
            path: Some(path.into()),
            content: None,
            edits: vec![EditPair::new(old_string, new_string)],
            timestamp_us: None,
            source_id: None,
        }
    }

    /// Batch of replacements applied in order
    pub fn multi_edit(path: impl Into<String>, edits: Vec<EditPair>) -> Self {
        Self {
            kind: OperationKind::MultiEdit,
            path: Some(path.into()),
            content: None,
            edits,
            timestamp_us: None,
            source_id: None,
        }
    }

    /// Attach the recorder's event time
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }

    /// Attach the recorder's event id
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// The normalized path, or `None` if the event should be skipped
    pub fn normalized_path(&self) -> Option<String> {
        self.path.as_deref().and_then(normalize_path)
    }

    /// Replay this operation's edits on `text`
    ///
    /// Each pair replaces only its first occurrence; a pair whose
    /// `old_string` is absent leaves the text unchanged.
    pub fn apply_edits(&self, text: &str) -> String {
        let mut current = text.to_string();
        for edit in &self.edits {
            current = current.replacen(&edit.old_string, &edit.new_string, 1);
        }
        current
    }

    /// Commit message describing this operation
    pub fn describe(&self, path: &str) -> String {
        let mut message = match self.kind {
            OperationKind::MultiEdit => {
                format!("{} {} ({} edits)", self.kind, path, self.edits.len())
            }
            _ => format!("{} {}", self.kind, path),
        };
        if let Some(ref source) = self.source_id {
            message.push_str(&format!(" [{}]", source));
        }
        message
    }
}

/// Normalize a recorder path into a tracked relative path
///
/// Strips leading `/` and `./`, trims whitespace around each component,
/// drops empty and `.` components and treats `\` as a separator. Returns
/// `None` for empty results and for paths that escape the root through `..`.
pub fn normalize_path(raw: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in raw.split(['/', '\\']) {
        match component.trim() {
            "" | "." => continue,
            ".." => return None,
            trimmed => parts.push(trimmed),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(OperationKind::parse("Write"), Some(OperationKind::Write));
        assert_eq!(OperationKind::parse("str_replace"), Some(OperationKind::Edit));
        assert_eq!(OperationKind::parse("MultiEdit"), Some(OperationKind::MultiEdit));
        assert_eq!(OperationKind::parse("Bash"), None);
    }

    #[test]
    fn test_edit_replaces_first_occurrence_only() {
        let op = FileOperation::edit("a.txt", "x", "y");
        assert_eq!(op.apply_edits("x x x"), "y x x");
    }

    #[test]
    fn test_multi_edit_accumulates() {
        let op = FileOperation::multi_edit(
            "a.txt",
            vec![EditPair::new("one", "two"), EditPair::new("two", "three")],
        );
        // second pair sees the output of the first
        assert_eq!(op.apply_edits("one"), "three");
    }

    #[test]
    fn test_missing_old_string_is_noop() {
        let op = FileOperation::edit("a.txt", "absent", "present");
        assert_eq!(op.apply_edits("hello"), "hello");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/main.rs"), Some("src/main.rs".to_string()));
        assert_eq!(normalize_path("/src//lib.rs"), Some("src/lib.rs".to_string()));
        assert_eq!(normalize_path("src\\win.rs"), Some("src/win.rs".to_string()));
        assert_eq!(normalize_path(""), None);
        assert_eq!(normalize_path("./"), None);
        assert_eq!(normalize_path("../etc/passwd"), None);
        assert_eq!(normalize_path(" src / main.rs "), Some("src/main.rs".to_string()));
        assert_eq!(normalize_path("docs/ notes.md"), normalize_path("docs/notes.md"));
    }

    #[test]
    fn test_pathless_operation() {
        let mut op = FileOperation::write("x", "y");
        op.path = None;
        assert_eq!(op.normalized_path(), None);
    }

    #[test]
    fn test_describe() {
        let op = FileOperation::write("a.txt", "hi").with_source_id("toolu_01");
        assert_eq!(op.describe("a.txt"), "Write a.txt [toolu_01]");

        let op = FileOperation::multi_edit(
            "b.txt",
            vec![EditPair::new("a", "b"), EditPair::new("c", "d")],
        );
        assert_eq!(op.describe("b.txt"), "MultiEdit b.txt (2 edits)");
    }

    #[test]
    fn test_deserialize_normalized_record() {
        let json = r#"{"kind":"multi_edit","path":"a.txt","edits":[{"old_string":"a","new_string":"b"}]}"#;
        let op: FileOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.kind, OperationKind::MultiEdit);
        assert_eq!(op.edits.len(), 1);
        assert!(op.content.is_none());
    }

    mod normalize_props {
        use super::*;
        use proptest::prelude::*;

        fn arb_raw_path() -> impl Strategy<Value = String> {
            prop::collection::vec(
                prop_oneof![
                    Just("".to_string()),
                    Just(".".to_string()),
                    Just("..".to_string()),
                    "[a-z]{1,6}(\\.[a-z]{1,3})?",
                ],
                0..6,
            )
            .prop_flat_map(|parts| {
                let n = parts.len();
                (Just(parts), prop::collection::vec(prop::sample::select(vec!["/", "\\"]), n))
            })
            .prop_map(|(parts, seps)| {
                parts
                    .iter()
                    .zip(seps)
                    .map(|(p, sep)| format!("{}{}", sep, p))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn prop_normalize_is_idempotent(raw in arb_raw_path()) {
                if let Some(path) = normalize_path(&raw) {
                    prop_assert_eq!(normalize_path(&path), Some(path.clone()));
                    prop_assert!(!path.starts_with('/'));
                    prop_assert!(!path.contains('\\'));
                    prop_assert!(path.split('/').all(|c| !c.is_empty() && c != "." && c != ".."));
                } else {
                    prop_assert!(raw.split(['/', '\\']).any(|c| c == "..")
                        || raw.split(['/', '\\']).all(|c| c.is_empty() || c == "."));
                }
            }
        }
    }
}
