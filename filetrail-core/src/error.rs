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

//! Core error types

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, FiletrailError>;

/// Errors shared across filetrail crates
#[derive(Debug, Error)]
pub enum FiletrailError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FiletrailError {
    fn from(e: serde_json::Error) -> Self {
        FiletrailError::Serialization(e.to_string())
    }
}
