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

//! Object Store - Content-Addressable Storage
//!
//! Holds every blob, tree and commit. Puts are idempotent: storing the same
//! content twice returns the same id and keeps one copy.

use super::objects::{Blob, Commit, GitObject, ObjectId, ObjectType, Tree};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

/// Stored object with type prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    obj_type: ObjectType,
    data: Vec<u8>,
}

/// Object store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_objects: u64,
    pub blob_count: u64,
    pub tree_count: u64,
    pub commit_count: u64,
    pub total_size_bytes: u64,
    /// Blob fetches served since creation (or the last `clear`)
    pub blob_reads: u64,
}

/// In-memory object store
pub struct ObjectStore {
    objects: DashMap<ObjectId, StoredObject>,
    blob_count: AtomicU64,
    tree_count: AtomicU64,
    commit_count: AtomicU64,
    total_size: AtomicU64,
    blob_reads: AtomicU64,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            blob_count: AtomicU64::new(0),
            tree_count: AtomicU64::new(0),
            commit_count: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            blob_reads: AtomicU64::new(0),
        }
    }

    /// Store an object (idempotent - same content = same ID)
    pub fn put<T: GitObject>(&self, obj: &T) -> Result<ObjectId, StoreError> {
        let data = obj.serialize_bytes()?;
        let oid = ObjectId::for_object(T::TYPE, &data);

        if self.objects.contains_key(&oid) {
            return Ok(oid);
        }

        self.insert_stored(
            oid,
            StoredObject {
                obj_type: T::TYPE,
                data,
            },
        );
        Ok(oid)
    }

    fn insert_stored(&self, oid: ObjectId, stored: StoredObject) {
        let size = stored.data.len() as u64;
        let obj_type = stored.obj_type;
        if self.objects.insert(oid, stored).is_some() {
            return;
        }

        match obj_type {
            ObjectType::Blob => self.blob_count.fetch_add(1, Ordering::Relaxed),
            ObjectType::Tree => self.tree_count.fetch_add(1, Ordering::Relaxed),
            ObjectType::Commit => self.commit_count.fetch_add(1, Ordering::Relaxed),
        };
        self.total_size.fetch_add(size, Ordering::Relaxed);
    }

    /// Get an object by ID
    pub fn get<T: GitObject>(&self, oid: &ObjectId) -> Result<Option<T>, StoreError> {
        match self.objects.get(oid) {
            Some(stored) => {
                if stored.obj_type != T::TYPE {
                    return Err(StoreError::TypeMismatch {
                        expected: T::TYPE,
                        actual: stored.obj_type,
                    });
                }

                if T::TYPE == ObjectType::Blob {
                    self.blob_reads.fetch_add(1, Ordering::Relaxed);
                }

                let obj = T::deserialize_bytes(&stored.data)?;
                Ok(Some(obj))
            }
            None => Ok(None),
        }
    }

    /// Get an object, returning error if not found
    ///
    /// Every id handed to this method was produced by the store itself, so a
    /// miss means the history is corrupted.
    pub fn get_required<T: GitObject>(&self, oid: &ObjectId) -> Result<T, StoreError> {
        match self.get(oid)? {
            Some(obj) => Ok(obj),
            None => {
                tracing::error!(oid = %oid.to_hex(), object_type = ?T::TYPE, "referenced object missing from store");
                Err(StoreError::NotFound(*oid))
            }
        }
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.objects.contains_key(oid)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_objects: self.objects.len() as u64,
            blob_count: self.blob_count.load(Ordering::Relaxed),
            tree_count: self.tree_count.load(Ordering::Relaxed),
            commit_count: self.commit_count.load(Ordering::Relaxed),
            total_size_bytes: self.total_size.load(Ordering::Relaxed),
            blob_reads: self.blob_reads.load(Ordering::Relaxed),
        }
    }

    /// Drop every object and reset all counters
    pub fn clear(&self) {
        self.objects.clear();
        self.blob_count.store(0, Ordering::Relaxed);
        self.tree_count.store(0, Ordering::Relaxed);
        self.commit_count.store(0, Ordering::Relaxed);
        self.total_size.store(0, Ordering::Relaxed);
        self.blob_reads.store(0, Ordering::Relaxed);
    }

    // === Convenience methods ===

    pub fn blob(&self, oid: &ObjectId) -> Result<Blob, StoreError> {
        self.get_required(oid)
    }

    pub fn tree(&self, oid: &ObjectId) -> Result<Tree, StoreError> {
        self.get_required(oid)
    }

    pub fn commit(&self, oid: &ObjectId) -> Result<Commit, StoreError> {
        self.get_required(oid)
    }

    // === Persistence ===

    /// Save store to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let mut objects: Vec<(ObjectId, StoredObject)> = self
            .objects
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        objects.sort_by_key(|(oid, _)| *oid);

        let data = bincode::serialize(&objects)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load store from file
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let data = std::fs::read(path)?;
        let objects: Vec<(ObjectId, StoredObject)> = bincode::deserialize(&data)?;

        let store = Self::new();
        for (oid, stored) in objects {
            store.insert_stored(oid, stored);
        }
        Ok(store)
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::objects::TreeEntry;

    #[test]
    fn test_blob_storage() {
        let store = ObjectStore::new();

        let oid = store.put(&Blob::text("Hello, world!")).unwrap();
        let retrieved = store.blob(&oid).unwrap();
        assert_eq!(retrieved.to_text(), "Hello, world!");
    }

    #[test]
    fn test_content_addressable_dedup() {
        let store = ObjectStore::new();

        let oid1 = store.put(&Blob::text("same content")).unwrap();
        let oid2 = store.put(&Blob::text("same content")).unwrap();
        let oid3 = store.put(&Blob::text("different")).unwrap();

        assert_eq!(oid1, oid2);
        assert_ne!(oid1, oid3);
        assert_eq!(store.stats().blob_count, 2);
    }

    #[test]
    fn test_type_mismatch() {
        let store = ObjectStore::new();
        let oid = store.put(&Blob::text("content")).unwrap();

        let result: Result<Option<Tree>, _> = store.get(&oid);
        assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
    }

    #[test]
    fn test_missing_object() {
        let store = ObjectStore::new();
        let oid = ObjectId::from_content(b"nowhere");

        assert!(store.get::<Blob>(&oid).unwrap().is_none());
        assert!(matches!(store.blob(&oid), Err(StoreError::NotFound(id)) if id == oid));
    }

    #[test]
    fn test_blob_reads_counted() {
        let store = ObjectStore::new();
        let blob = store.put(&Blob::text("x")).unwrap();
        let mut tree = Tree::new();
        tree.add_entry(TreeEntry::file("x", blob, 0));
        let tree = store.put(&tree).unwrap();

        store.blob(&blob).unwrap();
        store.blob(&blob).unwrap();
        store.tree(&tree).unwrap();

        assert_eq!(store.stats().blob_reads, 2);
    }

    #[test]
    fn test_clear() {
        let store = ObjectStore::new();
        let oid = store.put(&Blob::text("gone")).unwrap();
        store.blob(&oid).unwrap();

        store.clear();
        assert!(!store.exists(&oid));
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.bin");

        let store = ObjectStore::new();
        let blob = store.put(&Blob::text("persisted")).unwrap();
        let mut tree = Tree::new();
        tree.add_entry(TreeEntry::file("p.txt", blob, 7));
        let tree = store.put(&tree).unwrap();
        store.save_to_file(&path).unwrap();

        let loaded = ObjectStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.stats().blob_count, 1);
        assert_eq!(loaded.stats().tree_count, 1);
        assert_eq!(loaded.blob(&blob).unwrap().to_text(), "persisted");
        assert_eq!(loaded.tree(&tree).unwrap().get("p.txt").unwrap().modified_at_us, 7);
    }

    #[test]
    fn test_empty_blob_next_to_empty_tree() {
        let store = ObjectStore::new();
        let tree = store.put(&Tree::new()).unwrap();
        let blob = store.put(&Blob::text("")).unwrap();

        assert_ne!(tree, blob);
        assert_eq!(store.blob(&blob).unwrap().to_text(), "");
        assert!(store.tree(&tree).unwrap().is_empty());
        assert_eq!(store.stats().blob_count, 1);
        assert_eq!(store.stats().tree_count, 1);
    }
}
