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

//! Query engine over commit metadata
//!
//! Every query flattens the commit graph into an array of [`CommitRecord`]s,
//! newest first across all lines, and evaluates an [`Expression`] against it.

use crate::error::QueryError;
use crate::expression::Expression;
use filetrail_core::{CancelCheck, CancellationToken};
use filetrail_storage::{Commit, ObjectId, Repository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Metadata for one commit as seen by queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full hex commit id
    pub id: String,
    pub sequence: u64,
    pub message: String,
    pub author: String,
    pub timestamp_us: u64,
    pub parents: Vec<String>,
    /// Paths that differ from the first parent
    pub files: Vec<String>,
    /// `Write`, `Edit` or `MultiEdit`; absent on merge commits
    pub operation: Option<String>,
    pub source_id: Option<String>,
}

impl CommitRecord {
    pub fn new(id: ObjectId, commit: Commit, files: Vec<String>) -> Self {
        let (operation, source_id) = match commit.operation {
            Some(op) => (Some(op.kind.as_str().to_string()), op.source_id),
            None => (None, None),
        };
        Self {
            id: id.to_hex(),
            sequence: commit.sequence,
            message: commit.message,
            author: commit.author,
            timestamp_us: commit.timestamp_us,
            parents: commit.parents.iter().map(ObjectId::to_hex).collect(),
            files,
            operation,
            source_id,
        }
    }
}

/// Declarative queries against a repository's history
///
/// Safe to share across threads; queries only read the repository and can
/// run alongside checkouts, diffs and each other.
pub struct QueryEngine {
    repo: Arc<Repository>,
}

impl QueryEngine {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    /// All commit records, newest first
    pub fn records(&self) -> Result<Vec<CommitRecord>, QueryError> {
        self.records_with(&CancellationToken::new())
    }

    pub fn records_with(&self, token: &CancellationToken) -> Result<Vec<CommitRecord>, QueryError> {
        let commits = self.repo.commits()?;
        let mut records = Vec::with_capacity(commits.len());
        for (id, commit) in commits {
            token.check().map_err(|_| QueryError::Cancelled)?;
            let files = self.repo.changed_files(&commit)?;
            records.push(CommitRecord::new(id, commit, files));
        }
        Ok(records)
    }

    /// Evaluate `expression` and return at most `limit` results
    ///
    /// Never fails: malformed expressions and evaluation errors yield an
    /// empty result.
    pub fn query(&self, expression: &str, limit: Option<usize>) -> Vec<Value> {
        match self.query_with(expression, limit, &CancellationToken::new()) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(expression, error = %e, "query failed");
                Vec::new()
            }
        }
    }

    /// Cancellable variant of [`query`](Self::query)
    ///
    /// Expression errors still degrade to an empty result; only
    /// cancellation and storage corruption are returned as errors.
    pub fn query_with(
        &self,
        expression: &str,
        limit: Option<usize>,
        token: &CancellationToken,
    ) -> Result<Vec<Value>, QueryError> {
        let compiled = match Expression::parse(expression) {
            Ok(compiled) => compiled,
            Err(e) => {
                debug!(expression, error = %e, "malformed query expression");
                return Ok(Vec::new());
            }
        };

        let data = serde_json::to_value(self.records_with(token)?)?;
        let result = match compiled.search_with(&data, token) {
            Ok(result) => result,
            Err(QueryError::Cancelled) => return Err(QueryError::Cancelled),
            Err(e) => {
                debug!(expression, error = %e, "query evaluation failed");
                return Ok(Vec::new());
            }
        };

        let mut rows = match result {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        debug!(expression, rows = rows.len(), "query evaluated");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetrail_core::FileOperation;
    use serde_json::json;

    fn engine() -> QueryEngine {
        let repo = Repository::in_memory();
        repo.apply(vec![
            FileOperation::write("a.txt", "hello"),
            FileOperation::edit("a.txt", "hello", "world"),
            FileOperation::write("src/lib.rs", "pub fn f() {}").with_source_id("toolu_3"),
        ])
        .unwrap();
        QueryEngine::new(Arc::new(repo))
    }

    #[test]
    fn test_records_newest_first() {
        let records = engine().records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].message, "Write src/lib.rs [toolu_3]");
        assert_eq!(records[0].files, vec!["src/lib.rs"]);
        assert_eq!(records[0].source_id.as_deref(), Some("toolu_3"));
        assert_eq!(records[1].operation.as_deref(), Some("Edit"));
        assert_eq!(records[2].files, vec!["a.txt"]);
        assert!(records[2].parents.is_empty());
        assert_eq!(records[1].parents, vec![records[2].id.clone()]);
    }

    #[test]
    fn test_identity_returns_every_record() {
        let engine = engine();
        assert_eq!(engine.query("@", None).len(), 3);
        assert_eq!(engine.query("@", Some(2)).len(), 2);
        assert_eq!(engine.query("[*].message", Some(1)), vec![json!("Write src/lib.rs [toolu_3]")]);
    }

    #[test]
    fn test_scalar_and_null_results() {
        let engine = engine();
        assert_eq!(engine.query("length(@)", None), vec![json!(3)]);
        assert!(engine.query("[0].nothing", None).is_empty());
    }

    #[test]
    fn test_malformed_is_empty() {
        let engine = engine();
        assert!(engine.query("[?", None).is_empty());
        assert!(engine.query("length(`1`)", None).is_empty());
        assert!(engine.query("", None).is_empty());
    }

    #[test]
    fn test_query_with_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            engine().query_with("@", None, &token),
            Err(QueryError::Cancelled)
        ));
        // the non-cancellable entry point never fails
        assert_eq!(engine().query("[*].id", None).len(), 3);
    }
}
