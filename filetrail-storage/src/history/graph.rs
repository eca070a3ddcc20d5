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

//! Commit Graph - append-only log of commits and their parent links
//!
//! Position in the log is the commit's sequence number. Parent links are
//! kept here as well so ancestry questions never touch the object store.

use super::objects::ObjectId;
use super::store::StoreError;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;

/// One node of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub id: ObjectId,
    pub parents: Vec<ObjectId>,
}

#[derive(Default)]
pub struct CommitGraph {
    entries: RwLock<Vec<GraphEntry>>,
    index: DashMap<ObjectId, usize>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Sequence number the next appended commit will get
    pub fn next_sequence(&self) -> u64 {
        self.len() as u64
    }

    /// Record a commit; returns its sequence number
    pub fn append(&self, id: ObjectId, parents: Vec<ObjectId>) -> u64 {
        let mut entries = self.entries.write();
        let sequence = entries.len();
        entries.push(GraphEntry { id, parents });
        self.index.insert(id, sequence);
        sequence as u64
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains_key(id)
    }

    pub fn parents(&self, id: &ObjectId) -> Option<Vec<ObjectId>> {
        let position = *self.index.get(id)?;
        self.entries.read().get(position).map(|e| e.parents.clone())
    }

    /// All commit ids, newest first
    pub fn recent_first(&self) -> Vec<ObjectId> {
        self.entries.read().iter().rev().map(|e| e.id).collect()
    }

    /// `id` plus everything reachable through parent links
    pub fn ancestors(&self, id: ObjectId) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            for parent in self.parents(&current).unwrap_or_default() {
                queue.push_back(parent);
            }
        }
        seen
    }

    /// True when `ancestor` is `descendant` or reachable from it
    pub fn is_ancestor(&self, ancestor: ObjectId, descendant: ObjectId) -> bool {
        if ancestor == descendant {
            return true;
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([descendant]);
        while let Some(current) = queue.pop_front() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            queue.extend(self.parents(&current).unwrap_or_default());
        }
        false
    }

    /// Nearest common ancestor of `a` and `b`
    ///
    /// Collects every ancestor of `a`, then walks back from `b` breadth-first
    /// and returns the first commit already in that set.
    pub fn merge_base(&self, a: ObjectId, b: ObjectId) -> Option<ObjectId> {
        let from_a = self.ancestors(a);

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(current) = queue.pop_front() {
            if from_a.contains(&current) {
                return Some(current);
            }
            if !seen.insert(current) {
                continue;
            }
            queue.extend(self.parents(&current).unwrap_or_default());
        }
        None
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.index.clear();
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let data = bincode::serialize(&*self.entries.read())?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let data = std::fs::read(path)?;
        let entries: Vec<GraphEntry> = bincode::deserialize(&data)?;

        let graph = Self::new();
        for entry in entries {
            graph.append(entry.id, entry.parents);
        }
        Ok(graph)
    }
}
