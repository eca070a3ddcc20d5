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

//! Filetrail Query Engine
//!
//! Declarative queries over commit metadata. Expressions use a JMESPath-style
//! path/filter language evaluated against `serde_json` values; see
//! [`expression`] for the grammar.

pub mod engine;
pub mod error;
pub mod eval;
pub mod expression;

pub use engine::{CommitRecord, QueryEngine};
pub use error::QueryError;
pub use eval::{evaluate, is_truthy};
pub use expression::{
    Ast, Comparator, Expression, Function, MAX_EXPRESSION_LENGTH, MAX_NESTING_DEPTH,
};
