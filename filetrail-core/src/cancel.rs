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

//! Cooperative cancellation for long-running reads
//!
//! Checkout, diff and query poll a token between per-path steps. Readers
//! never mutate the commit graph, so stopping early cannot leave it
//! inconsistent.

use crate::error::{FiletrailError, Result};

pub use tokio_util::sync::CancellationToken;

/// Polling helper for synchronous readers
pub trait CancelCheck {
    /// Return `Cancelled` if cancellation was requested
    fn check(&self) -> Result<()>;
}

impl CancelCheck for CancellationToken {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FiletrailError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(FiletrailError::Cancelled)));
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        child.cancel();
        assert!(parent.check().is_ok());

        let child = parent.child_token();
        parent.cancel();
        assert!(matches!(child.check(), Err(FiletrailError::Cancelled)));
    }
}
