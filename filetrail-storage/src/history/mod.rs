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

//! Event-Sourced File History
//!
//! Every file operation becomes an immutable commit over a content-addressed
//! tree, in the style of Git's object model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Repository                               │
//! │   apply ─► TreeBuilder ─► Commit ─► CommitGraph + branch move    │
//! │   checkout/peek ─► CheckoutCache (LRU) ─► materialize            │
//! │   diff ─► DiffEngine        merge ─► three_way_merge             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐        │
//! │  │    Blob     │     │    Tree     │     │   Commit    │        │
//! │  │  (content)  │◄────│ (directory) │◄────│ (snapshot)  │        │
//! │  └─────────────┘     └─────────────┘     └─────────────┘        │
//! │       │                    │                    │                │
//! │       ▼                    ▼                    ▼                │
//! │  ┌─────────────────────────────────────────────────────┐        │
//! │  │          Content-Addressable Object Store           │        │
//! │  │              (BLAKE3 hashed, immutable)             │        │
//! │  └─────────────────────────────────────────────────────┘        │
//! │                                                                  │
//! │  ┌─────────────┐     ┌─────────────┐                            │
//! │  │   Branch    │     │    HEAD     │                            │
//! │  │  (mutable)  │     │  (current)  │                            │
//! │  └─────────────┘     └─────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Deterministic**: replaying the same operations from an empty store
//!   yields the same commit ids
//! - **Structural sharing**: an operation rewrites only the directories on
//!   its path
//! - **Cached checkout**: materialized trees are cached per commit id

pub mod checkout;
pub mod diff;
pub mod graph;
pub mod merge;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod store;
pub mod tree_builder;

pub use checkout::{CheckoutCache, MaterializedFile, MaterializedTree};
pub use diff::{
    BlobDiff, ChangeKind, DiffConfig, DiffEngine, DiffHunk, DiffLine, DiffStats, LineChange,
    StructuralDelta, ValueChange, ROOT_PATH,
};
pub use graph::CommitGraph;
pub use merge::{MergeConflict, MergeKind, MergeReport};
pub use objects::{Blob, Commit, EntryMode, GitObject, ObjectId, OperationSummary, Tree, TreeEntry};
pub use refs::{Branch, RefError, RefStore};
pub use repository::{LogEntry, Repository, RepositoryError, RepositoryStats, LATEST};
pub use store::{ObjectStore, StoreError, StoreStats};
pub use tree_builder::{FileEntry, FlatTree, TreeBuilder};
