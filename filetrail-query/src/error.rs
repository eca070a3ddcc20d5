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

//! Query error types

use filetrail_storage::RepositoryError;
use thiserror::Error;

/// Errors raised while compiling or evaluating a query
///
/// `QueryEngine::query` swallows all of these except cancellation;
/// they surface through `Expression` and `QueryEngine::query_with`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("expression is empty")]
    Empty,

    #[error("expression exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated {what} starting at {pos}")]
    Unterminated { what: &'static str, pos: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("unexpected {found} at {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        pos: usize,
        expected: &'static str,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function {name} takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl QueryError {
    /// Whether the caller asked for the query to stop
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            QueryError::Cancelled | QueryError::Repository(RepositoryError::Cancelled)
        )
    }
}
