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

//! Filetrail Storage Layer
//!
//! Event-sourced version history for file trees.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use filetrail_core::{EngineConfig, FileOperation};
//! use filetrail_storage::Repository;
//!
//! let repo = Repository::new(EngineConfig::default())?;
//! repo.apply(vec![
//!     FileOperation::write("a.txt", "hello"),
//!     FileOperation::edit("a.txt", "hello", "world"),
//! ])?;
//! let tree = repo.checkout("latest")?;
//! assert_eq!(tree.content("a.txt"), Some("world"));
//! ```

pub mod history;

pub use history::{
    ChangeKind, Commit, DiffEngine, LogEntry, MaterializedFile, MaterializedTree, MergeConflict,
    MergeKind, MergeReport, ObjectId, Repository, RepositoryError, RepositoryStats,
    StructuralDelta, ValueChange, LATEST,
};
