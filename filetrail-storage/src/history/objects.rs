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

//! History Object Types
//!
//! Content-addressable objects: Blob, Tree, Commit.
//! All objects are immutable once created. An object's id is the BLAKE3
//! hash of its type tag followed by its bincode encoding, so identical
//! content always yields the same id, objects of different types never
//! share one, and ids never depend on wall-clock time.

use blake3::Hasher;
use filetrail_core::OperationKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Object ID - BLAKE3 hash (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    /// Create from content (content-addressable)
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Id of an encoded history object, prefixed by its type tag
    pub fn for_object(obj_type: ObjectType, encoded: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&[obj_type as u8]);
        hasher.update(encoded);
        Self(hasher.finalize().into())
    }

    /// Display as short hex string (14 chars)
    pub fn short(&self) -> String {
        hex::encode(&self.0[..7])
    }

    /// Full hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a full 64-char hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, ParseError> {
        let bytes = hex::decode(hex_str).map_err(|_| ParseError::InvalidHex)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseError::InvalidLength)?;
        Ok(Self(arr))
    }

    /// Check if the hex form contains `fragment` anywhere
    pub fn matches_fragment(&self, fragment: &str) -> bool {
        !fragment.is_empty() && self.to_hex().contains(&fragment.to_ascii_lowercase())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Parse errors for ObjectId
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid hex string")]
    InvalidHex,
    #[error("Invalid length (expected 32 bytes)")]
    InvalidLength,
}

/// Object type tag stored next to each encoded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    /// File content
    Blob = 1,
    /// Directory listing
    Tree = 2,
    /// Snapshot with provenance
    Commit = 3,
}

/// Blob object - raw file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a text blob
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            data: content.into().into_bytes(),
        }
    }

    /// Content as text; invalid UTF-8 sequences are replaced
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Entry mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    /// Regular file
    Blob,
    /// Subdirectory
    Tree,
}

/// Tree entry - reference to a blob or subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Single path component
    pub name: String,
    /// Object ID of the blob or subtree
    pub oid: ObjectId,
    pub mode: EntryMode,
    /// Timestamp of the commit that last wrote this file (0 for subtrees)
    pub modified_at_us: u64,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>, oid: ObjectId, modified_at_us: u64) -> Self {
        Self {
            name: name.into(),
            oid,
            mode: EntryMode::Blob,
            modified_at_us,
        }
    }

    pub fn dir(name: impl Into<String>, oid: ObjectId) -> Self {
        Self {
            name: name.into(),
            oid,
            mode: EntryMode::Tree,
            modified_at_us: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode == EntryMode::Tree
    }
}

/// Tree object - one directory level of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, maintaining sort order
    pub fn add_entry(&mut self, entry: TreeEntry) {
        match self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(&entry.name))
        {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Get entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }
}

/// What produced a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub kind: OperationKind,
    /// Normalized path the operation targeted
    pub path: String,
    /// Digest of the full operation payload
    pub payload: ObjectId,
    /// Recorder event id, if any
    pub source_id: Option<String>,
}

/// Commit object - versioned snapshot with parent chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// 0-based creation index in the commit graph
    pub sequence: u64,
    /// Root tree this commit points to
    pub tree: ObjectId,
    /// Empty for the first commit, one for linear history, two for merges
    pub parents: Vec<ObjectId>,
    pub message: String,
    pub author: String,
    /// Event time (microseconds), or the logical clock when none was recorded
    pub timestamp_us: u64,
    /// None for merge commits
    pub operation: Option<OperationSummary>,
}

impl Commit {
    /// Commit produced by applying one operation
    pub fn from_operation(
        sequence: u64,
        parent: Option<ObjectId>,
        tree: ObjectId,
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp_us: u64,
        operation: OperationSummary,
    ) -> Self {
        Self {
            sequence,
            tree,
            parents: parent.into_iter().collect(),
            message: message.into(),
            author: author.into(),
            timestamp_us,
            operation: Some(operation),
        }
    }

    /// Merge commit with parents `[target, source]`
    pub fn merge(
        sequence: u64,
        target: ObjectId,
        source: ObjectId,
        tree: ObjectId,
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp_us: u64,
    ) -> Self {
        Self {
            sequence,
            tree,
            parents: vec![target, source],
            message: message.into(),
            author: author.into(),
            timestamp_us,
            operation: None,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }
}

/// Trait for history objects
pub trait GitObject: Sized + Serialize + for<'de> Deserialize<'de> {
    /// Object type constant
    const TYPE: ObjectType;

    /// Canonical encoding
    fn serialize_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    fn deserialize_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Compute object ID
    fn compute_oid(&self) -> Result<ObjectId, bincode::Error> {
        Ok(ObjectId::for_object(Self::TYPE, &self.serialize_bytes()?))
    }
}

impl GitObject for Blob {
    const TYPE: ObjectType = ObjectType::Blob;
}

impl GitObject for Tree {
    const TYPE: ObjectType = ObjectType::Tree;
}

impl GitObject for Commit {
    const TYPE: ObjectType = ObjectType::Commit;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(path: &str) -> OperationSummary {
        OperationSummary {
            kind: OperationKind::Write,
            path: path.to_string(),
            payload: ObjectId::from_content(path.as_bytes()),
            source_id: None,
        }
    }

    #[test]
    fn test_object_id_from_content() {
        let oid1 = ObjectId::from_content(b"hello world");
        let oid2 = ObjectId::from_content(b"hello world");
        let oid3 = ObjectId::from_content(b"different");

        assert_eq!(oid1, oid2);
        assert_ne!(oid1, oid3);
    }

    #[test]
    fn test_object_id_hex() {
        let oid = ObjectId::from_content(b"test");
        assert_eq!(ObjectId::from_hex(&oid.to_hex()).unwrap(), oid);
        assert_eq!(oid.short().len(), 14);
        assert!(oid.to_hex().starts_with(&oid.short()));

        assert_eq!(ObjectId::from_hex("zz"), Err(ParseError::InvalidHex));
        assert_eq!(ObjectId::from_hex("abcd"), Err(ParseError::InvalidLength));
    }

    #[test]
    fn test_fragment_matching() {
        let oid = ObjectId::from_content(b"test");
        let hex = oid.to_hex();
        assert!(oid.matches_fragment(&hex[10..20]));
        assert!(oid.matches_fragment(&hex[..8].to_uppercase()));
        assert!(!oid.matches_fragment(""));
    }

    #[test]
    fn test_tree_entries_sorted() {
        let mut tree = Tree::new();
        let oid1 = ObjectId::from_content(b"blob1");
        let oid2 = ObjectId::from_content(b"blob2");

        tree.add_entry(TreeEntry::file("src", oid1, 1));
        tree.add_entry(TreeEntry::file("README.md", oid2, 2));
        tree.add_entry(TreeEntry::file("src", oid2, 3));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.entries[0].name, "README.md");
        assert_eq!(tree.get("src").unwrap().oid, oid2);
        assert_eq!(tree.get("src").unwrap().modified_at_us, 3);
        assert!(tree.get("missing").is_none());
    }

    #[test]
    fn test_commit_id_is_deterministic() {
        let tree = ObjectId::from_content(b"tree");
        let a = Commit::from_operation(0, None, tree, "Write a.txt", "t", 0, summary("a.txt"));
        let b = Commit::from_operation(0, None, tree, "Write a.txt", "t", 0, summary("a.txt"));
        assert_eq!(a.compute_oid().unwrap(), b.compute_oid().unwrap());

        let c = Commit::from_operation(1, None, tree, "Write a.txt", "t", 0, summary("a.txt"));
        assert_ne!(a.compute_oid().unwrap(), c.compute_oid().unwrap());
    }

    #[test]
    fn test_commit_types() {
        let tree = ObjectId::from_content(b"tree");
        let initial = Commit::from_operation(0, None, tree, "first", "t", 0, summary("a"));
        assert!(initial.is_initial());
        assert!(!initial.is_merge());

        let parent = initial.compute_oid().unwrap();
        let child = Commit::from_operation(1, Some(parent), tree, "second", "t", 1, summary("a"));
        assert_eq!(child.first_parent(), Some(parent));

        let other = child.compute_oid().unwrap();
        let merge = Commit::merge(2, parent, other, tree, "merge", "t", 1);
        assert!(merge.is_merge());
        assert_eq!(merge.parents, vec![parent, other]);
        assert!(merge.operation.is_none());
    }

    #[test]
    fn test_empty_blob_and_tree_ids_differ() {
        let blob = Blob::text("");
        let tree = Tree::new();
        assert_eq!(blob.serialize_bytes().unwrap(), tree.serialize_bytes().unwrap());
        assert_ne!(blob.compute_oid().unwrap(), tree.compute_oid().unwrap());
    }
}
