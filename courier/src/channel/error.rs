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

//! Error types for the channel layer.

use super::ChannelId;
use crate::scheduler::SchedulerError;
use std::fmt;

/// Errors that can occur when queuing work on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel's outbound queue is at its configured capacity.
    ///
    /// The message was not queued. The caller decides whether to drop it or
    /// report the failure to the publisher.
    QueueFull {
        /// The ID of the full channel.
        channel_id: ChannelId,
        /// The configured maximum number of queued messages.
        capacity: usize,
    },

    /// The channel has been destroyed.
    ///
    /// Returned by operations that cannot be honored after destruction. Plain
    /// enqueues are still accepted after destruction, they simply never get
    /// scheduled.
    Destroyed {
        /// The ID of the destroyed channel.
        channel_id: ChannelId,
    },

    /// A delivery task could not be handed to the scheduler.
    ///
    /// This indicates the engine is not started (or has been stopped) and
    /// is never retried.
    Scheduler {
        /// The ID of the channel whose task was rejected.
        channel_id: ChannelId,
        /// The scheduler failure.
        source: SchedulerError,
    },
}

impl ChannelError {
    /// Returns true if this error is recoverable.
    ///
    /// A full queue drains as the client polls; everything else is permanent.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }

    /// Returns true if the queue was full.
    #[must_use]
    pub const fn is_queue_full(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }

    /// Returns the channel ID associated with this error.
    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            Self::QueueFull { channel_id, .. }
            | Self::Destroyed { channel_id }
            | Self::Scheduler { channel_id, .. } => channel_id,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull {
                channel_id,
                capacity,
            } => {
                write!(
                    f,
                    "Could not queue message (channel's queue is full, capacity {}) for channel {}",
                    capacity, channel_id
                )
            }
            Self::Destroyed { channel_id } => {
                write!(f, "Channel {} has been destroyed", channel_id)
            }
            Self::Scheduler { channel_id, source } => {
                write!(
                    f,
                    "Could not schedule delivery for channel {}: {}",
                    channel_id, source
                )
            }
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scheduler { source, .. } => Some(source),
            _ => None,
        }
    }
}
