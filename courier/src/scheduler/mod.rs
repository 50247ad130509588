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

//! Background delivery scheduling.
//!
//! Each channel owns one [`DeliveryRunner`] per [`Direction`]. A runner is
//! a small state machine that guarantees at most one delivery task per
//! channel and direction is pending or running at any time. Queuing a
//! runner that is already pending is a no-op; queuing a runner that is
//! running marks it for exactly one more pass once the current pass ends.
//!
//! The [`TaskScheduler`] executes runners on a bounded pool of tokio
//! workers.

mod error;
mod pool;
mod runner;

pub use error::SchedulerError;
pub use pool::{SchedulerStats, TaskScheduler};
pub use runner::DeliveryRunner;

use async_trait::async_trait;
use std::fmt;

/// Which of a channel's queues a delivery task drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Messages waiting to be written to the client.
    Outbound,
    /// Messages the client handed in for publication.
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outbound => f.write_str("outbound"),
            Self::Inbound => f.write_str("inbound"),
        }
    }
}

/// Something that can run one delivery pass.
///
/// Implemented by channels. A pass drains whatever is queued for the given
/// direction at the time it runs.
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    /// Runs one delivery pass.
    async fn run_delivery(&self, direction: Direction);
}
