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

//! Scheduler error types.

use std::fmt;

/// Errors returned when handing a delivery task to the worker pool.
///
/// Both variants are fatal for the operation attempted and are never
/// retried by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The worker pool is not running.
    ///
    /// Either the engine was never started or it has been stopped.
    NotRunning,

    /// The pool's pending task queue is at capacity.
    Rejected {
        /// The configured pending task bound.
        capacity: usize,
    },
}

impl SchedulerError {
    /// Returns true if the pool is not running.
    #[must_use]
    pub const fn is_not_running(&self) -> bool {
        matches!(self, Self::NotRunning)
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "Delivery worker pool is not running"),
            Self::Rejected { capacity } => write!(
                f,
                "Delivery worker pool rejected task (queue capacity {} reached)",
                capacity
            ),
        }
    }
}

impl std::error::Error for SchedulerError {}
