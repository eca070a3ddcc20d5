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

//! Repository - High-Level History Interface
//!
//! Applies file operations as commits on the current branch, materializes
//! any point in history, diffs and merges branches, and persists the whole
//! graph to a data directory.
//!
//! Mutations (`apply`, `branch`, `merge`, `clear`, HEAD switches) serialize
//! on one mutex. Reads go straight to the concurrent stores: every object is
//! written before the branch pointer that references it moves, so a reader
//! never observes a half-built commit.

use super::checkout::{materialize, CheckoutCache, MaterializedTree};
use super::diff::{DiffEngine, StructuralDelta};
use super::graph::CommitGraph;
use super::merge::{three_way_merge, MergeConflict, MergeKind, MergeReport};
use super::objects::{Commit, ObjectId, OperationSummary};
use super::refs::{RefError, RefStore};
use super::store::{ObjectStore, StoreError, StoreStats};
use super::tree_builder::{FlatTree, TreeBuilder};
use chrono::{DateTime, Utc};
use filetrail_core::{CancellationToken, EngineConfig, FileOperation, FiletrailError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Point reference for the head of the current branch
pub const LATEST: &str = "latest";

const OBJECTS_FILE: &str = "objects.bin";
const REFS_FILE: &str = "refs.bin";
const GRAPH_FILE: &str = "graph.bin";

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Point not found: {0}")]
    PointNotFound(String),

    #[error("Branch already exists: {0}")]
    DuplicateBranch(String),

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("Cannot delete the current branch: {0}")]
    CurrentBranch(String),

    #[error("Empty repository - no commits yet")]
    EmptyRepository,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<RefError> for RepositoryError {
    fn from(e: RefError) -> Self {
        match e {
            RefError::NotFound(name) => RepositoryError::PointNotFound(name),
            RefError::BranchExists(name) => RepositoryError::DuplicateBranch(name),
            RefError::InvalidName { name, reason } => {
                RepositoryError::InvalidBranchName { name, reason }
            }
            RefError::IoError(e) => RepositoryError::Store(StoreError::IoError(e)),
            RefError::SerializationError(msg) => RepositoryError::Persistence(msg),
        }
    }
}

impl From<FiletrailError> for RepositoryError {
    fn from(e: FiletrailError) -> Self {
        match e {
            FiletrailError::Cancelled => RepositoryError::Cancelled,
            FiletrailError::Config(msg) => RepositoryError::Config(msg),
            FiletrailError::Io(e) => RepositoryError::Store(StoreError::IoError(e)),
            FiletrailError::Serialization(msg) => RepositoryError::Persistence(msg),
        }
    }
}

impl From<bincode::Error> for RepositoryError {
    fn from(e: bincode::Error) -> Self {
        RepositoryError::Store(StoreError::from(e))
    }
}

/// Log entry for commit history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub commit_id: ObjectId,
    pub sequence: u64,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub parents: Vec<ObjectId>,
}

/// Repository statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub store: StoreStats,
    pub commits: usize,
    pub branches: usize,
    pub current_branch: String,
    pub cached_trees: u64,
    pub cache_capacity: u64,
}

/// File history repository
pub struct Repository {
    config: EngineConfig,
    store: Arc<ObjectStore>,
    refs: Arc<RefStore>,
    graph: Arc<CommitGraph>,
    cache: CheckoutCache,
    diff_engine: DiffEngine,
    /// Serializes every mutation of refs and the graph
    write_lock: Mutex<()>,
}

impl Repository {
    /// Create an empty repository
    pub fn new(config: EngineConfig) -> Result<Self, RepositoryError> {
        config.validate()?;
        let refs = RefStore::new(&config.default_branch);
        Ok(Self::from_parts(
            config,
            ObjectStore::new(),
            refs,
            CommitGraph::new(),
        ))
    }

    /// Empty in-memory repository with default settings
    pub fn in_memory() -> Self {
        let config = EngineConfig::default();
        let refs = RefStore::new(&config.default_branch);
        Self::from_parts(config, ObjectStore::new(), refs, CommitGraph::new())
    }

    /// Open the repository persisted under `config.data_dir`
    ///
    /// Missing files are treated as an empty repository.
    pub fn open(config: EngineConfig) -> Result<Self, RepositoryError> {
        config.validate()?;
        let dir = config
            .data_dir
            .clone()
            .ok_or_else(|| RepositoryError::Config("open requires data_dir".to_string()))?;

        let store = if dir.join(OBJECTS_FILE).exists() {
            ObjectStore::load_from_file(&dir.join(OBJECTS_FILE))?
        } else {
            ObjectStore::new()
        };

        let refs = if dir.join(REFS_FILE).exists() {
            RefStore::load_from_file(&dir.join(REFS_FILE))?
        } else {
            RefStore::new(&config.default_branch)
        };

        let graph = if dir.join(GRAPH_FILE).exists() {
            CommitGraph::load_from_file(&dir.join(GRAPH_FILE))?
        } else {
            CommitGraph::new()
        };

        info!(
            data_dir = %dir.display(),
            commits = graph.len(),
            branch = %refs.current_branch(),
            "opened repository"
        );
        Ok(Self::from_parts(config, store, refs, graph))
    }

    fn from_parts(
        config: EngineConfig,
        store: ObjectStore,
        refs: RefStore,
        graph: CommitGraph,
    ) -> Self {
        Self {
            cache: CheckoutCache::new(config.cache_capacity),
            config,
            store: Arc::new(store),
            refs: Arc::new(refs),
            graph: Arc::new(graph),
            diff_engine: DiffEngine::new(),
            write_lock: Mutex::new(()),
        }
    }

    // === Event application ===

    /// Apply operations in order to the current branch; returns the new head
    pub fn apply<I>(&self, events: I) -> Result<ObjectId, RepositoryError>
    where
        I: IntoIterator<Item = FileOperation>,
    {
        let _guard = self.write_lock.lock();

        let mut applied = 0usize;
        let mut skipped = 0usize;
        for op in events {
            match self.apply_locked(&op)? {
                Some(_) => applied += 1,
                None => skipped += 1,
            }
        }

        let head = self.refs.head().ok_or(RepositoryError::EmptyRepository)?;
        info!(applied, skipped, head = %head, branch = %self.refs.current_branch(), "applied operations");
        Ok(head)
    }

    /// Apply a single operation; None when it was skipped
    pub fn apply_one(&self, op: &FileOperation) -> Result<Option<ObjectId>, RepositoryError> {
        let _guard = self.write_lock.lock();
        self.apply_locked(op)
    }

    fn apply_locked(&self, op: &FileOperation) -> Result<Option<ObjectId>, RepositoryError> {
        let Some(path) = op.normalized_path() else {
            debug!(kind = op.kind.as_str(), raw_path = ?op.path, "skipping operation without a usable path");
            return Ok(None);
        };

        let branch = self.refs.current_branch();
        let parent = self.refs.resolve(&branch);
        let builder = TreeBuilder::new(&self.store);
        let parent_tree = match parent {
            Some(oid) => self.store.commit(&oid)?.tree,
            None => builder.empty_tree()?,
        };

        let sequence = self.graph.next_sequence();
        let timestamp_us = op.timestamp_us.unwrap_or(sequence);
        let tree = builder.derive(parent_tree, op, &path, timestamp_us)?;

        let summary = OperationSummary {
            kind: op.kind,
            path: path.clone(),
            payload: ObjectId::from_content(&bincode::serialize(op)?),
            source_id: op.source_id.clone(),
        };
        let commit = Commit::from_operation(
            sequence,
            parent,
            tree,
            op.describe(&path),
            self.config.author.clone(),
            timestamp_us,
            summary,
        );

        let oid = self.store.put(&commit)?;
        self.graph.append(oid, commit.parents.clone());
        self.refs.update_branch(&branch, oid)?;

        debug!(commit = %oid, sequence, branch = %branch, path = %path, "committed operation");
        Ok(Some(oid))
    }

    // === Checkout ===

    /// Materialize `point`; a branch name also becomes the current branch
    pub fn checkout(&self, point: &str) -> Result<Arc<MaterializedTree>, RepositoryError> {
        self.checkout_with(point, &CancellationToken::new())
    }

    pub fn checkout_with(
        &self,
        point: &str,
        token: &CancellationToken,
    ) -> Result<Arc<MaterializedTree>, RepositoryError> {
        let (oid, branch) = self.resolve_point(point)?;
        let tree = self.materialize(oid, token)?;

        if let Some(branch) = branch {
            let _guard = self.write_lock.lock();
            if self.refs.branch_exists(&branch) && self.refs.current_branch() != branch {
                self.refs.set_head(&branch);
                info!(branch = %branch, commit = %oid, "switched branch");
            }
        }
        Ok(tree)
    }

    /// Materialize `point` without moving HEAD
    pub fn peek(&self, point: &str) -> Result<Arc<MaterializedTree>, RepositoryError> {
        self.peek_with(point, &CancellationToken::new())
    }

    pub fn peek_with(
        &self,
        point: &str,
        token: &CancellationToken,
    ) -> Result<Arc<MaterializedTree>, RepositoryError> {
        let (oid, _) = self.resolve_point(point)?;
        self.materialize(oid, token)
    }

    fn materialize(
        &self,
        oid: ObjectId,
        token: &CancellationToken,
    ) -> Result<Arc<MaterializedTree>, RepositoryError> {
        if let Some(tree) = self.cache.get(&oid) {
            debug!(commit = %oid, "checkout cache hit");
            return Ok(tree);
        }

        let tree = Arc::new(materialize(&self.store, oid, token)?);
        self.cache.insert(Arc::clone(&tree));
        debug!(commit = %oid, files = tree.len(), "materialized tree");
        Ok(tree)
    }

    /// Resolve a point reference to a commit, plus the branch name when the
    /// point named one
    ///
    /// Order: `latest`, exact branch name, then the newest commit whose hex
    /// id or message contains `point`.
    pub fn resolve_point(&self, point: &str) -> Result<(ObjectId, Option<String>), RepositoryError> {
        if point == LATEST {
            return self
                .refs
                .head()
                .map(|oid| (oid, None))
                .ok_or_else(|| RepositoryError::PointNotFound(point.to_string()));
        }

        if let Some(tip) = self.refs.resolve(point) {
            return Ok((tip, Some(point.to_string())));
        }

        if !point.is_empty() {
            for oid in self.graph.recent_first() {
                if oid.matches_fragment(point) || self.store.commit(&oid)?.message.contains(point) {
                    return Ok((oid, None));
                }
            }
        }

        debug!(point, "point reference matched nothing");
        Err(RepositoryError::PointNotFound(point.to_string()))
    }

    // === Branches ===

    /// Create a branch at the current head
    pub fn branch(&self, name: &str) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock();
        let head = self.refs.head().ok_or(RepositoryError::EmptyRepository)?;
        self.refs.create_branch(name, head)?;
        info!(branch = name, commit = %head, "created branch");
        Ok(())
    }

    /// Branch names, sorted
    pub fn list_branches(&self) -> Vec<String> {
        self.refs
            .list_branches()
            .into_iter()
            .map(|b| b.name)
            .collect()
    }

    pub fn current_branch(&self) -> String {
        self.refs.current_branch()
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock();
        if self.refs.current_branch() == name {
            return Err(RepositoryError::CurrentBranch(name.to_string()));
        }
        self.refs.delete_branch(name)?;
        info!(branch = name, "deleted branch");
        Ok(())
    }

    // === Merge ===

    /// Merge branch `source` into branch `target`
    ///
    /// Checks out `target` first. A source already reachable from the target
    /// returns `UpToDate` without writing a merge commit, and a target
    /// reachable from the source fast-forwards. Only diverged tips get a
    /// three-way merge commit. Conflicts are reported, not raised: the
    /// merged tree keeps the target's content for every conflicting path.
    pub fn merge(&self, source: &str, target: &str) -> Result<MergeReport, RepositoryError> {
        let _guard = self.write_lock.lock();

        let source_tip = self
            .refs
            .resolve(source)
            .ok_or_else(|| RepositoryError::PointNotFound(source.to_string()))?;
        let target_tip = self
            .refs
            .resolve(target)
            .ok_or_else(|| RepositoryError::PointNotFound(target.to_string()))?;

        self.refs.set_head(target);

        let report = |kind, commit, base, conflicts| MergeReport {
            kind,
            source: source.to_string(),
            target: target.to_string(),
            commit,
            base,
            conflicts,
        };

        if self.graph.is_ancestor(source_tip, target_tip) {
            info!(source, target, "already up to date");
            return Ok(report(MergeKind::UpToDate, target_tip, None, Vec::new()));
        }

        if self.graph.is_ancestor(target_tip, source_tip) {
            self.refs.update_branch(target, source_tip)?;
            info!(source, target, commit = %source_tip, "fast-forward");
            return Ok(report(
                MergeKind::FastForward,
                source_tip,
                Some(target_tip),
                Vec::new(),
            ));
        }

        let base = self.graph.merge_base(source_tip, target_tip);
        let builder = TreeBuilder::new(&self.store);
        let base_files = match base {
            Some(oid) => builder.flatten(self.store.commit(&oid)?.tree)?,
            None => FlatTree::new(),
        };
        let source_commit = self.store.commit(&source_tip)?;
        let target_commit = self.store.commit(&target_tip)?;
        let source_files = builder.flatten(source_commit.tree)?;
        let target_files = builder.flatten(target_commit.tree)?;

        let outcome = three_way_merge(&base_files, &source_files, &target_files);
        let tree = builder.build(&outcome.merged)?;

        let mut conflicts = Vec::with_capacity(outcome.conflicts.len());
        for blobs in &outcome.conflicts {
            warn!(path = %blobs.path, source, target, "merge conflict, keeping target content");
            conflicts.push(MergeConflict {
                path: blobs.path.clone(),
                ancestor: self.read_text(blobs.ancestor)?,
                source: self.read_text(blobs.source)?,
                target: self.read_text(blobs.target)?,
            });
        }

        let commit = Commit::merge(
            self.graph.next_sequence(),
            target_tip,
            source_tip,
            tree,
            format!("Merge branch '{}' into {}", source, target),
            self.config.author.clone(),
            source_commit.timestamp_us.max(target_commit.timestamp_us),
        );
        let oid = self.store.put(&commit)?;
        self.graph.append(oid, commit.parents.clone());
        self.refs.update_branch(target, oid)?;

        info!(
            source,
            target,
            commit = %oid,
            base = ?base.map(|b| b.short()),
            conflicts = conflicts.len(),
            "three-way merge"
        );
        Ok(report(MergeKind::ThreeWay, oid, base, conflicts))
    }

    fn read_text(&self, blob: Option<ObjectId>) -> Result<Option<String>, RepositoryError> {
        blob.map(|oid| self.store.blob(&oid).map(|b| b.to_text()))
            .transpose()
            .map_err(RepositoryError::from)
    }

    // === Diff ===

    /// Structural diff between two points; never moves HEAD
    pub fn diff(&self, old: &str, new: &str) -> Result<StructuralDelta, RepositoryError> {
        self.diff_with(old, new, &CancellationToken::new())
    }

    pub fn diff_with(
        &self,
        old: &str,
        new: &str,
        token: &CancellationToken,
    ) -> Result<StructuralDelta, RepositoryError> {
        let old_tree = self.peek_with(old, token)?;
        let new_tree = self.peek_with(new, token)?;
        Ok(self.diff_engine.diff_trees(&old_tree, &new_tree, token)?)
    }

    // === History ===

    /// First-parent history of the current branch, newest first
    pub fn log(&self, max_count: Option<usize>) -> Result<Vec<LogEntry>, RepositoryError> {
        let mut current = Some(self.refs.head().ok_or(RepositoryError::EmptyRepository)?);
        let mut entries = Vec::new();

        while let Some(oid) = current {
            if max_count.is_some_and(|max| entries.len() >= max) {
                break;
            }

            let commit = self.store.commit(&oid)?;
            let secs = (commit.timestamp_us / 1_000_000) as i64;
            let nsecs = ((commit.timestamp_us % 1_000_000) * 1000) as u32;

            current = commit.first_parent();
            entries.push(LogEntry {
                commit_id: oid,
                sequence: commit.sequence,
                message: commit.message,
                author: commit.author,
                timestamp: DateTime::from_timestamp(secs, nsecs).unwrap_or_default(),
                parents: commit.parents,
            });
        }

        Ok(entries)
    }

    /// Commit object for a point reference (does not move HEAD)
    pub fn commit(&self, point: &str) -> Result<Commit, RepositoryError> {
        let (oid, _) = self.resolve_point(point)?;
        Ok(self.store.commit(&oid)?)
    }

    /// Every commit on every line, newest first
    pub fn commits(&self) -> Result<Vec<(ObjectId, Commit)>, RepositoryError> {
        self.graph
            .recent_first()
            .into_iter()
            .map(|oid| Ok((oid, self.store.commit(&oid)?)))
            .collect()
    }

    /// Paths whose content differs from the first parent (all paths for a root commit)
    pub fn changed_files(&self, commit: &Commit) -> Result<Vec<String>, RepositoryError> {
        let builder = TreeBuilder::new(&self.store);
        let current = builder.flatten(commit.tree)?;
        let parent = match commit.first_parent() {
            Some(oid) => builder.flatten(self.store.commit(&oid)?.tree)?,
            None => FlatTree::new(),
        };

        let paths: BTreeSet<&String> = current.keys().chain(parent.keys()).collect();
        Ok(paths
            .into_iter()
            .filter(|path| current.get(*path).map(|f| f.blob) != parent.get(*path).map(|f| f.blob))
            .cloned()
            .collect())
    }

    pub fn head(&self) -> Option<ObjectId> {
        self.refs.head()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            store: self.store.stats(),
            commits: self.graph.len(),
            branches: self.refs.list_branches().len(),
            current_branch: self.refs.current_branch(),
            cached_trees: self.cache.entry_count(),
            cache_capacity: self.cache.capacity(),
        }
    }

    // === Lifecycle ===

    /// Drop all history, refs, cached trees and persisted files
    pub fn clear(&self) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock();

        self.cache.invalidate_all();
        self.store.clear();
        self.refs.clear(&self.config.default_branch);
        self.graph.clear();

        if let Some(ref dir) = self.config.data_dir {
            for file in [OBJECTS_FILE, REFS_FILE, GRAPH_FILE] {
                remove_if_exists(&dir.join(file))?;
            }
        }

        info!("cleared repository");
        Ok(())
    }

    /// Save repository to `data_dir`; no-op for in-memory repositories
    pub fn save(&self) -> Result<(), RepositoryError> {
        let Some(ref dir) = self.config.data_dir else {
            return Ok(());
        };
        let _guard = self.write_lock.lock();

        std::fs::create_dir_all(dir).map_err(StoreError::IoError)?;
        self.store.save_to_file(&dir.join(OBJECTS_FILE))?;
        self.refs.save_to_file(&dir.join(REFS_FILE))?;
        self.graph.save_to_file(&dir.join(GRAPH_FILE))?;

        info!(data_dir = %dir.display(), commits = self.graph.len(), "saved repository");
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<(), RepositoryError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::IoError(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_with_history() -> Repository {
        let repo = Repository::in_memory();
        repo.apply(vec![
            FileOperation::write("a.txt", "hello"),
            FileOperation::edit("a.txt", "hello", "world"),
        ])
        .unwrap();
        repo
    }

    #[test]
    fn test_apply_and_log() {
        let repo = repo_with_history();

        let log = repo.log(None).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "Edit a.txt");
        assert_eq!(log[1].message, "Write a.txt");
        assert_eq!(log[0].parents, vec![log[1].commit_id]);
        assert_eq!(repo.log(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_apply_is_an_error() {
        let repo = Repository::in_memory();
        assert!(matches!(
            repo.apply(Vec::new()),
            Err(RepositoryError::EmptyRepository)
        ));

        let mut pathless = FileOperation::write("x", "y");
        pathless.path = None;
        assert!(matches!(
            repo.apply(vec![pathless]),
            Err(RepositoryError::EmptyRepository)
        ));
    }

    #[test]
    fn test_apply_one_skips_pathless() {
        let repo = Repository::in_memory();
        let mut op = FileOperation::write("../escape", "x");
        assert!(repo.apply_one(&op).unwrap().is_none());

        op.path = Some("./ok.txt".to_string());
        let oid = repo.apply_one(&op).unwrap().unwrap();
        assert_eq!(repo.head(), Some(oid));
        assert_eq!(repo.checkout(LATEST).unwrap().content("ok.txt"), Some("x"));
    }

    #[test]
    fn test_edit_on_missing_path_still_commits() {
        let repo = repo_with_history();
        let before = repo.commit(LATEST).unwrap();

        repo.apply_one(&FileOperation::edit("nope.txt", "a", "b"))
            .unwrap()
            .unwrap();
        let after = repo.commit(LATEST).unwrap();
        assert_eq!(after.tree, before.tree);
        assert_eq!(repo.stats().commits, 3);
    }

    #[test]
    fn test_resolution_order() {
        let repo = repo_with_history();
        let first = repo.log(None).unwrap()[1].commit_id;

        assert_eq!(repo.resolve_point(&first.to_hex()[..12]).unwrap().0, first);
        assert_eq!(repo.resolve_point("Write").unwrap().0, first);
        // newest match wins
        assert_eq!(repo.resolve_point("a.txt").unwrap().0, repo.head().unwrap());
        assert!(matches!(
            repo.resolve_point("no such thing"),
            Err(RepositoryError::PointNotFound(_))
        ));
        assert!(matches!(
            repo.resolve_point(""),
            Err(RepositoryError::PointNotFound(_))
        ));
    }

    #[test]
    fn test_checkout_branch_moves_head_peek_does_not() {
        let repo = repo_with_history();
        repo.branch("feature").unwrap();

        repo.peek("feature").unwrap();
        assert_eq!(repo.current_branch(), "main");

        repo.checkout("feature").unwrap();
        assert_eq!(repo.current_branch(), "feature");

        repo.apply_one(&FileOperation::write("b.txt", "on feature"))
            .unwrap();
        assert!(repo.peek("main").unwrap().content("b.txt").is_none());
        assert_eq!(repo.peek("feature").unwrap().content("b.txt"), Some("on feature"));
    }

    #[test]
    fn test_branch_errors() {
        let empty = Repository::in_memory();
        assert!(matches!(
            empty.branch("x"),
            Err(RepositoryError::EmptyRepository)
        ));

        let repo = repo_with_history();
        repo.branch("feature").unwrap();
        assert!(matches!(
            repo.branch("feature"),
            Err(RepositoryError::DuplicateBranch(_))
        ));
        assert!(matches!(
            repo.branch("bad name"),
            Err(RepositoryError::InvalidBranchName { .. })
        ));
        assert_eq!(repo.list_branches(), vec!["feature", "main"]);
    }

    #[test]
    fn test_delete_branch() {
        let repo = repo_with_history();
        repo.branch("scratch").unwrap();

        assert!(matches!(
            repo.delete_branch("main"),
            Err(RepositoryError::CurrentBranch(_))
        ));
        repo.delete_branch("scratch").unwrap();
        assert!(matches!(
            repo.delete_branch("scratch"),
            Err(RepositoryError::PointNotFound(_))
        ));
    }

    #[test]
    fn test_merge_unknown_branch() {
        let repo = repo_with_history();
        assert!(matches!(
            repo.merge("ghost", "main"),
            Err(RepositoryError::PointNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_merge_up_to_date() {
        let repo = repo_with_history();
        repo.branch("old").unwrap();
        repo.apply_one(&FileOperation::write("more.txt", "x")).unwrap();

        let report = repo.merge("old", "main").unwrap();
        assert_eq!(report.kind, MergeKind::UpToDate);
        assert_eq!(report.commit, repo.head().unwrap());
        assert_eq!(repo.stats().commits, 3);
    }

    #[test]
    fn test_changed_files() {
        let repo = repo_with_history();
        repo.apply_one(&FileOperation::write("dir/b.txt", "b")).unwrap();

        let commits = repo.commits().unwrap();
        assert_eq!(commits.len(), 3);
        assert_eq!(repo.changed_files(&commits[0].1).unwrap(), vec!["dir/b.txt"]);
        assert_eq!(repo.changed_files(&commits[2].1).unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn test_operation_timestamps() {
        let repo = Repository::in_memory();
        repo.apply(vec![
            FileOperation::write("t.txt", "1").with_timestamp(1_700_000_000_000_000),
            FileOperation::write("u.txt", "2"),
        ])
        .unwrap();

        let tree = repo.checkout(LATEST).unwrap();
        assert_eq!(tree.get("t.txt").unwrap().modified_at_us, 1_700_000_000_000_000);
        // no recorded time: the logical clock (sequence) is used
        assert_eq!(tree.get("u.txt").unwrap().modified_at_us, 1);
    }
}
