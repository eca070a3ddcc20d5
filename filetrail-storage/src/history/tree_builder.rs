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

//! Tree Builder - derives snapshot trees from file operations
//!
//! Trees are hierarchical: each directory level is its own object. Writing
//! `src/lib.rs` rewrites only the root and `src` tree objects; every other
//! subtree id is carried over untouched.

use super::objects::{Blob, ObjectId, Tree, TreeEntry};
use super::store::{ObjectStore, StoreError};
use filetrail_core::{FileOperation, OperationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A file as seen in a flattened tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub blob: ObjectId,
    pub modified_at_us: u64,
}

/// Full path -> file mapping for one snapshot
pub type FlatTree = BTreeMap<String, FileEntry>;

pub struct TreeBuilder<'a> {
    store: &'a ObjectStore,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// Id of the empty root tree
    pub fn empty_tree(&self) -> Result<ObjectId, StoreError> {
        self.store.put(&Tree::new())
    }

    /// Apply one operation on top of `parent` and return the new root
    ///
    /// `path` must already be normalized. Edits on a missing file return
    /// `parent` unchanged.
    pub fn derive(
        &self,
        parent: ObjectId,
        op: &FileOperation,
        path: &str,
        timestamp_us: u64,
    ) -> Result<ObjectId, StoreError> {
        let text = match op.kind {
            OperationKind::Write => op.content.clone().unwrap_or_default(),
            OperationKind::Edit | OperationKind::MultiEdit => match self.lookup(parent, path)? {
                Some(existing) => {
                    let current = self.store.blob(&existing.blob)?.to_text();
                    op.apply_edits(&current)
                }
                None => {
                    tracing::debug!(path, kind = op.kind.as_str(), "edit on missing file dropped");
                    return Ok(parent);
                }
            },
        };

        let blob = self.store.put(&Blob::text(text))?;
        self.insert(
            parent,
            path,
            FileEntry {
                blob,
                modified_at_us: timestamp_us,
            },
        )
    }

    /// Find the file at `path`, if any
    pub fn lookup(&self, root: ObjectId, path: &str) -> Result<Option<FileEntry>, StoreError> {
        let mut tree = self.store.tree(&root)?;
        let mut components = path.split('/').peekable();

        while let Some(name) = components.next() {
            let entry = match tree.get(name) {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            };

            if components.peek().is_none() {
                return Ok((!entry.is_dir()).then_some(FileEntry {
                    blob: entry.oid,
                    modified_at_us: entry.modified_at_us,
                }));
            }
            if !entry.is_dir() {
                return Ok(None);
            }
            tree = self.store.tree(&entry.oid)?;
        }

        Ok(None)
    }

    /// Set `path` to `file`, rewriting only the directories along the path
    ///
    /// A file standing where a directory is needed (or the reverse) is replaced.
    pub fn insert(
        &self,
        root: ObjectId,
        path: &str,
        file: FileEntry,
    ) -> Result<ObjectId, StoreError> {
        let components: Vec<&str> = path.split('/').collect();
        self.insert_at(Some(root), &components, file)
    }

    fn insert_at(
        &self,
        dir: Option<ObjectId>,
        components: &[&str],
        file: FileEntry,
    ) -> Result<ObjectId, StoreError> {
        let mut tree = match dir {
            Some(oid) => self.store.tree(&oid)?,
            None => Tree::new(),
        };

        if let Some((name, rest)) = components.split_first() {
            if rest.is_empty() {
                tree.add_entry(TreeEntry::file(*name, file.blob, file.modified_at_us));
            } else {
                let child = tree.get(name).filter(|e| e.is_dir()).map(|e| e.oid);
                let child_oid = self.insert_at(child, rest, file)?;
                tree.add_entry(TreeEntry::dir(*name, child_oid));
            }
        }

        self.store.put(&tree)
    }

    /// Every file reachable from `root`, keyed by full path
    pub fn flatten(&self, root: ObjectId) -> Result<FlatTree, StoreError> {
        let mut files = FlatTree::new();
        self.flatten_into(root, "", &mut files)?;
        Ok(files)
    }

    fn flatten_into(
        &self,
        oid: ObjectId,
        prefix: &str,
        files: &mut FlatTree,
    ) -> Result<(), StoreError> {
        let tree = self.store.tree(&oid)?;
        for entry in tree.iter() {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", prefix, entry.name)
            };

            if entry.is_dir() {
                self.flatten_into(entry.oid, &path, files)?;
            } else {
                files.insert(
                    path,
                    FileEntry {
                        blob: entry.oid,
                        modified_at_us: entry.modified_at_us,
                    },
                );
            }
        }
        Ok(())
    }

    /// Store the hierarchical form of `files` and return its root
    pub fn build(&self, files: &FlatTree) -> Result<ObjectId, StoreError> {
        let mut tree = Tree::new();
        let mut subdirs: BTreeMap<&str, FlatTree> = BTreeMap::new();

        for (path, file) in files {
            match path.split_once('/') {
                Some((dir, rest)) => {
                    subdirs
                        .entry(dir)
                        .or_default()
                        .insert(rest.to_string(), *file);
                }
                None => tree.add_entry(TreeEntry::file(path.as_str(), file.blob, file.modified_at_us)),
            }
        }

        for (dir, children) in subdirs {
            let oid = self.build(&children)?;
            tree.add_entry(TreeEntry::dir(dir, oid));
        }

        self.store.put(&tree)
    }
}
