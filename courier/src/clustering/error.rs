//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Clustering error types.

use thiserror::Error;

/// A failure of the distributed state collaborator.
///
/// The registry never surfaces these to clients.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The backing store could not be reached.
    #[error("distributed state unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record could not be used.
    #[error("invalid distributed record: {0}")]
    InvalidRecord(String),
}

impl ClusterError {
    /// Creates an [`Unavailable`](Self::Unavailable) error without a source.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            source: None,
        }
    }

    /// Returns true if retrying later might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
