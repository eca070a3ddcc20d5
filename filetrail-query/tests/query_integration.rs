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

//! Integration tests for queries over branched history

use filetrail_core::{CancellationToken, FileOperation};
use filetrail_query::{Expression, QueryEngine, QueryError};
use filetrail_storage::Repository;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// main: a.txt, b.txt; feature: c.txt; merged back into main
fn branched_repo() -> Arc<Repository> {
    let repo = Repository::in_memory();
    repo.apply(vec![
        FileOperation::write("a.txt", "one"),
        FileOperation::write("docs/b.md", "two"),
    ])
    .unwrap();
    repo.branch("feature").unwrap();
    repo.checkout("feature").unwrap();
    repo.apply(vec![FileOperation::write("src/c.rs", "three")])
        .unwrap();
    repo.checkout("main").unwrap();
    repo.apply(vec![FileOperation::edit("a.txt", "one", "uno")])
        .unwrap();
    repo.merge("feature", "main").unwrap();
    Arc::new(repo)
}

/// Records cover every line and come newest first
#[test]
fn test_records_span_all_branches() {
    let engine = QueryEngine::new(branched_repo());

    let sequences = engine.query("[*].sequence", None);
    assert_eq!(sequences, vec![json!(4), json!(3), json!(2), json!(1), json!(0)]);

    let messages = engine.query("[*].message", None);
    assert_eq!(messages[0], json!("Merge branch 'feature' into main"));
    assert!(messages.contains(&json!("Write src/c.rs")));
}

/// Merge commits have two parents and no operation
#[test]
fn test_filter_merge_commits() {
    let engine = QueryEngine::new(branched_repo());

    let merges = engine.query("[?length(parents) > `1`]", None);
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0]["operation"], serde_json::Value::Null);
    // the merge brought src/c.rs onto main
    assert_eq!(merges[0]["files"], json!(["src/c.rs"]));

    let linear = engine.query("[?operation].id", None);
    assert_eq!(linear.len(), 4);
}

/// Filters on changed paths
#[test]
fn test_filter_by_changed_file() {
    let engine = QueryEngine::new(branched_repo());

    let touching_a = engine.query("[?contains(files, 'a.txt')].message", None);
    assert_eq!(touching_a, vec![json!("Edit a.txt"), json!("Write a.txt")]);

    let under_docs = engine.query("[?files[?starts_with(@, 'docs/')]].sequence", None);
    assert_eq!(under_docs, vec![json!(1)]);

    let all_paths = engine.query("[*].files[]", None);
    assert_eq!(all_paths.len(), 5);
}

/// Multiselect hashes reshape records, and limit truncates
#[test]
fn test_projection_with_limit() {
    let engine = QueryEngine::new(branched_repo());

    let rows = engine.query("[*].{seq: sequence, op: operation}", Some(2));
    assert_eq!(
        rows,
        vec![json!({"seq": 4, "op": null}), json!({"seq": 3, "op": "Edit"})]
    );
    assert!(engine.query("@", Some(0)).is_empty());
}

/// Garbage never raises
#[test]
fn test_malformed_expressions_yield_nothing() {
    let engine = QueryEngine::new(branched_repo());
    for bad in ["[?", "files[", "unknown_fn(@)", "`{", "a ||", ")"] {
        assert!(engine.query(bad, None).is_empty(), "{:?}", bad);
    }
}

/// Queries on an empty repository return nothing
#[test]
fn test_empty_repository() {
    let engine = QueryEngine::new(Arc::new(Repository::in_memory()));
    assert!(engine.records().unwrap().is_empty());
    assert!(engine.query("@", None).is_empty());
    assert_eq!(engine.query("length(@)", None), vec![json!(0)]);
}

/// Queries run alongside checkouts and diffs on other threads
#[test]
fn test_concurrent_queries() {
    let repo = branched_repo();
    let engine = Arc::new(QueryEngine::new(Arc::clone(&repo)));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..20 {
                    assert_eq!(engine.query("[*].id", None).len(), 5);
                }
            });
        }
        for _ in 0..20 {
            repo.peek("feature").unwrap();
            repo.diff("feature", "main").unwrap();
        }
    });
}

/// A cancelled query reports cancellation instead of an empty result
#[test]
fn test_cancelled_query() {
    let engine = QueryEngine::new(branched_repo());
    let token = CancellationToken::new();
    token.cancel();
    assert!(engine.query_with("@", None, &token).unwrap_err().is_cancelled());
}

/// Deeply nested expressions are rejected, not evaluated
#[test]
fn test_deep_nesting_yields_empty() {
    let engine = QueryEngine::new(branched_repo());
    let negations = "!".repeat(4000) + "@";
    assert!(engine.query(&negations, None).is_empty());
    assert!(engine.query_with(&negations, None, &CancellationToken::new()).unwrap().is_empty());
    assert!(matches!(Expression::parse(&negations), Err(QueryError::TooDeep(_))));
}

proptest! {
    #[test]
    fn prop_parser_never_panics(input in "[a-z@*.\\[\\]?'`|&!=<>(){},: 0-9-]{0,40}") {
        let _ = Expression::parse(&input);
    }

    #[test]
    fn prop_limit_bounds_results(limit in 0usize..8) {
        let engine = QueryEngine::new(branched_repo());
        let rows = engine.query("[*].id", Some(limit));
        prop_assert_eq!(rows.len(), limit.min(5));
    }
}
