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

//! Checkout - materializes the concrete file tree of a commit
//!
//! Materialized trees are cached by commit id in a bounded LRU cache.
//! Commits never change, so an entry is only ever evicted, never invalidated
//! (except by a full `clear`).

use super::objects::ObjectId;
use super::repository::RepositoryError;
use super::store::ObjectStore;
use super::tree_builder::TreeBuilder;
use filetrail_core::{CancelCheck, CancellationToken};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One file of a materialized tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedFile {
    pub content: String,
    /// Timestamp of the commit that last wrote this file
    pub modified_at_us: u64,
}

/// Full file tree at one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedTree {
    pub commit: ObjectId,
    pub files: BTreeMap<String, MaterializedFile>,
}

impl MaterializedTree {
    pub fn get(&self, path: &str) -> Option<&MaterializedFile> {
        self.files.get(path)
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|f| f.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Path -> content, dropping modification times
    pub fn contents(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .map(|(path, file)| (path.clone(), file.content.clone()))
            .collect()
    }
}

/// Read every file of `commit` from the store
pub fn materialize(
    store: &ObjectStore,
    commit: ObjectId,
    token: &CancellationToken,
) -> Result<MaterializedTree, RepositoryError> {
    let root = store.commit(&commit)?.tree;
    let flat = TreeBuilder::new(store).flatten(root)?;

    let mut files = BTreeMap::new();
    for (path, entry) in flat {
        token.check()?;
        let content = store.blob(&entry.blob)?.to_text();
        files.insert(
            path,
            MaterializedFile {
                content,
                modified_at_us: entry.modified_at_us,
            },
        );
    }

    Ok(MaterializedTree { commit, files })
}

/// Bounded LRU cache of materialized trees keyed by commit id
pub struct CheckoutCache {
    cache: Cache<ObjectId, Arc<MaterializedTree>>,
    capacity: u64,
}

impl CheckoutCache {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { cache, capacity }
    }

    pub fn get(&self, commit: &ObjectId) -> Option<Arc<MaterializedTree>> {
        self.cache.get(commit)
    }

    pub fn insert(&self, tree: Arc<MaterializedTree>) {
        self.cache.insert(tree.commit, tree);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Current number of cached trees, after pending evictions are applied
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::objects::{Commit, OperationSummary};
    use filetrail_core::{FileOperation, OperationKind};

    fn commit_with(store: &ObjectStore, files: &[(&str, &str)]) -> ObjectId {
        let builder = TreeBuilder::new(store);
        let mut root = builder.empty_tree().unwrap();
        for (i, (path, body)) in files.iter().enumerate() {
            root = builder
                .derive(root, &FileOperation::write(*path, *body), path, i as u64 + 10)
                .unwrap();
        }
        let summary = OperationSummary {
            kind: OperationKind::Write,
            path: String::new(),
            payload: ObjectId::from_content(b""),
            source_id: None,
        };
        store
            .put(&Commit::from_operation(0, None, root, "test", "t", 0, summary))
            .unwrap()
    }

    #[test]
    fn test_materialize() {
        let store = ObjectStore::new();
        let commit = commit_with(&store, &[("a.txt", "alpha"), ("dir/b.txt", "beta")]);

        let tree = materialize(&store, commit, &CancellationToken::new()).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.content("a.txt"), Some("alpha"));
        assert_eq!(tree.content("dir/b.txt"), Some("beta"));
        assert_eq!(tree.get("dir/b.txt").unwrap().modified_at_us, 11);
    }

    #[test]
    fn test_materialize_cancelled() {
        let store = ObjectStore::new();
        let commit = commit_with(&store, &[("a.txt", "alpha")]);
        let token = CancellationToken::new();
        token.cancel();

        let result = materialize(&store, commit, &token);
        assert!(matches!(result, Err(RepositoryError::Cancelled)));
    }

    #[test]
    fn test_cache_is_bounded() {
        let cache = CheckoutCache::new(2);
        for n in 0..5u8 {
            cache.insert(Arc::new(MaterializedTree {
                commit: ObjectId::from_content(&[n]),
                files: BTreeMap::new(),
            }));
        }
        assert!(cache.entry_count() <= 2);

        cache.invalidate_all();
        assert_eq!(cache.entry_count(), 0);
    }
}
