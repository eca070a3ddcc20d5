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

//! Reference System (Branches & HEAD)
//!
//! Mutable names pointing at immutable commits. HEAD always names a branch;
//! before the first commit that branch does not exist yet.

use super::objects::ObjectId;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Reference errors
#[derive(Debug, Error)]
pub enum RefError {
    #[error("Branch not found: {0}")]
    NotFound(String),

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<bincode::Error> for RefError {
    fn from(e: bincode::Error) -> Self {
        RefError::SerializationError(e.to_string())
    }
}

/// Branch - mutable reference to the tip of a line of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Tip commit
    pub commit: ObjectId,
    /// Wall-clock creation time (microseconds); not part of any object id
    pub created_at_us: u64,
    pub updated_at_us: u64,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit: ObjectId) -> Self {
        let now = now_us();
        Self {
            name: name.into(),
            commit,
            created_at_us: now,
            updated_at_us: now,
        }
    }
}

/// Reference store - branches and HEAD
pub struct RefStore {
    branches: DashMap<String, Branch>,
    /// Name of the current branch
    head: RwLock<String>,
}

impl RefStore {
    pub fn new(default_branch: &str) -> Self {
        Self {
            branches: DashMap::new(),
            head: RwLock::new(default_branch.to_string()),
        }
    }

    /// Create a branch; fails if the name is taken
    pub fn create_branch(&self, name: &str, commit: ObjectId) -> Result<(), RefError> {
        validate_ref_name(name)?;

        match self.branches.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RefError::BranchExists(name.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Branch::new(name, commit));
                Ok(())
            }
        }
    }

    /// Create or move a branch
    pub fn update_branch(&self, name: &str, commit: ObjectId) -> Result<(), RefError> {
        validate_ref_name(name)?;

        let now = now_us();
        self.branches
            .entry(name.to_string())
            .and_modify(|b| {
                b.commit = commit;
                b.updated_at_us = now;
            })
            .or_insert_with(|| Branch::new(name, commit));
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<Branch, RefError> {
        self.branches
            .remove(name)
            .map(|(_, branch)| branch)
            .ok_or_else(|| RefError::NotFound(name.to_string()))
    }

    /// Tip of a branch
    pub fn resolve(&self, name: &str) -> Option<ObjectId> {
        self.branches.get(name).map(|b| b.commit)
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Point HEAD at a branch
    pub fn set_head(&self, branch: &str) {
        *self.head.write() = branch.to_string();
    }

    pub fn current_branch(&self) -> String {
        self.head.read().clone()
    }

    /// HEAD commit, if the current branch has one
    pub fn head(&self) -> Option<ObjectId> {
        let head = self.head.read();
        self.resolve(&head)
    }

    /// All branches, sorted by name
    pub fn list_branches(&self) -> Vec<Branch> {
        let mut branches: Vec<Branch> = self.branches.iter().map(|r| r.value().clone()).collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    /// Remove every branch and point HEAD back at `default_branch`
    pub fn clear(&self, default_branch: &str) {
        self.branches.clear();
        self.set_head(default_branch);
    }

    /// Save refs to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), RefError> {
        let head = self.current_branch();
        let data = bincode::serialize(&(head, self.list_branches()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load refs from a file
    pub fn load_from_file(path: &Path) -> Result<Self, RefError> {
        let data = std::fs::read(path)?;
        let (head, branches): (String, Vec<Branch>) = bincode::deserialize(&data)?;

        let store = Self::new(&head);
        for branch in branches {
            store.branches.insert(branch.name.clone(), branch);
        }
        Ok(store)
    }
}

/// Validate a branch name (git ref-name rules)
pub fn validate_ref_name(name: &str) -> Result<(), RefError> {
    let invalid = |reason: &str| {
        Err(RefError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("empty name");
    }

    if name.starts_with('.') || name.ends_with('.') {
        return invalid("cannot start or end with '.'");
    }

    if name.starts_with('/') || name.ends_with('/') {
        return invalid("cannot start or end with '/'");
    }

    if name.contains("..") {
        return invalid("cannot contain '..'");
    }

    if name.contains("//") {
        return invalid("cannot contain '//'");
    }

    if name == "latest" {
        return invalid("'latest' is reserved");
    }

    let invalid_chars = ['~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name
        .chars()
        .find(|c| invalid_chars.contains(c) || c.is_whitespace() || c.is_control())
    {
        return invalid(&format!("cannot contain '{}'", c.escape_default()));
    }

    Ok(())
}

fn now_us() -> u64 {
    Utc::now().timestamp_micros().max(0) as u64
}
