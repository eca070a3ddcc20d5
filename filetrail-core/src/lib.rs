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

//! Filetrail Core
//!
//! Shared types for the file-history engine: normalized file operations,
//! engine configuration, errors, cancellation and tracing setup.

pub mod cancel;
pub mod config;
pub mod error;
pub mod operation;
pub mod telemetry;

pub use cancel::{CancelCheck, CancellationToken};
pub use config::{EngineConfig, DEFAULT_BRANCH, DEFAULT_CACHE_CAPACITY};
pub use error::{FiletrailError, Result};
pub use operation::{normalize_path, EditPair, FileOperation, OperationKind};
