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

//! Three-way merge of flattened trees
//!
//! Files are compared by blob id. For every path that differs between the
//! two sides:
//!
//! | source vs base | target vs base | result              |
//! |----------------|----------------|---------------------|
//! | unchanged      | changed        | target              |
//! | changed        | unchanged      | source              |
//! | changed        | changed, same  | either (identical)  |
//! | changed        | changed, other | conflict, keep target |

use super::objects::ObjectId;
use super::tree_builder::{FileEntry, FlatTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a merge was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// Source already contained in target; nothing to do
    UpToDate,
    /// Target moved forward to source's tip; no commit created
    FastForward,
    /// Merge commit created
    ThreeWay,
}

/// A path both sides changed differently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub path: String,
    /// Content at the common ancestor (None = absent)
    pub ancestor: Option<String>,
    pub source: Option<String>,
    /// Content kept in the merged tree
    pub target: Option<String>,
}

/// Outcome of `Repository::merge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub kind: MergeKind,
    pub source: String,
    pub target: String,
    /// Target tip after the merge
    pub commit: ObjectId,
    /// Common ancestor used for a three-way merge
    pub base: Option<ObjectId>,
    pub conflicts: Vec<MergeConflict>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Blob ids of one conflicting path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictBlobs {
    pub path: String,
    pub ancestor: Option<ObjectId>,
    pub source: Option<ObjectId>,
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ThreeWayOutcome {
    pub merged: FlatTree,
    pub conflicts: Vec<ConflictBlobs>,
}

/// Merge `source` into `target` relative to `base`
pub fn three_way_merge(base: &FlatTree, source: &FlatTree, target: &FlatTree) -> ThreeWayOutcome {
    let paths: BTreeSet<&String> = base
        .keys()
        .chain(source.keys())
        .chain(target.keys())
        .collect();

    let mut outcome = ThreeWayOutcome::default();
    for path in paths {
        let source_file = source.get(path);
        let target_file = target.get(path);
        let b = base.get(path).map(|f| f.blob);
        let s = source_file.map(|f| f.blob);
        let t = target_file.map(|f| f.blob);

        let chosen: Option<&FileEntry> = if s == t || s == b {
            target_file
        } else if t == b {
            source_file
        } else {
            outcome.conflicts.push(ConflictBlobs {
                path: path.clone(),
                ancestor: b,
                source: s,
                target: t,
            });
            target_file
        };

        if let Some(file) = chosen {
            outcome.merged.insert(path.clone(), *file);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(files: &[(&str, &str)]) -> FlatTree {
        files
            .iter()
            .map(|(path, body)| {
                (
                    path.to_string(),
                    FileEntry {
                        blob: ObjectId::from_content(body.as_bytes()),
                        modified_at_us: 0,
                    },
                )
            })
            .collect()
    }

    fn blob(body: &str) -> ObjectId {
        ObjectId::from_content(body.as_bytes())
    }

    #[test]
    fn test_one_sided_changes_are_taken() {
        let base = flat(&[("a", "1"), ("b", "1")]);
        let source = flat(&[("a", "2"), ("b", "1"), ("new", "s")]);
        let target = flat(&[("a", "1"), ("b", "3")]);

        let outcome = three_way_merge(&base, &source, &target);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged["a"].blob, blob("2"));
        assert_eq!(outcome.merged["b"].blob, blob("3"));
        assert_eq!(outcome.merged["new"].blob, blob("s"));
    }

    #[test]
    fn test_identical_changes_merge_cleanly() {
        let base = flat(&[("f", "base")]);
        let both = flat(&[("f", "same")]);

        let outcome = three_way_merge(&base, &both, &both);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged["f"].blob, blob("same"));
    }

    #[test]
    fn test_divergent_change_conflicts_and_keeps_target() {
        let base = flat(&[("f", "base")]);
        let source = flat(&[("f", "b")]);
        let target = flat(&[("f", "a")]);

        let outcome = three_way_merge(&base, &source, &target);
        assert_eq!(
            outcome.conflicts,
            vec![ConflictBlobs {
                path: "f".to_string(),
                ancestor: Some(blob("base")),
                source: Some(blob("b")),
                target: Some(blob("a")),
            }]
        );
        assert_eq!(outcome.merged["f"].blob, blob("a"));
    }

    #[test]
    fn test_empty_base_add_add_conflict() {
        let outcome = three_way_merge(&FlatTree::new(), &flat(&[("x", "s")]), &flat(&[("x", "t")]));
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].ancestor, None);
    }

    #[test]
    fn test_removal_on_one_side() {
        let base = flat(&[("old", "v")]);
        let outcome = three_way_merge(&base, &FlatTree::new(), &base);
        assert!(outcome.merged.is_empty());
        assert!(outcome.conflicts.is_empty());
    }
}
