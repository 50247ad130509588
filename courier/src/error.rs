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

//! Top-level error type.
//!
//! Each layer of the engine has its own error type:
//!
//! 1. **Transport**: delivery context I/O ([`TransportError`])
//! 2. **Channel**: queue bounds and scheduling ([`ChannelError`])
//! 3. **Registry**: lifecycle and channel creation ([`RegistryError`])
//!
//! [`CourierError`] composes them for callers that drive several layers.
//! Protocol-level rejections are not errors at all: dispatch answers them
//! with error replies carrying a [`Fault`](crate::message::Fault).
//!
//! # Examples
//!
//! ```rust
//! use courier::CourierError;
//! use courier::registry::RegistryError;
//! use courier::transport::TransportError;
//!
//! let error: CourierError = TransportError::Closed.into();
//! assert!(error.is_transport_error());
//!
//! let error: CourierError = RegistryError::NotStarted.into();
//! assert!(error.is_not_started());
//! ```

use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::scheduler::SchedulerError;
use crate::transport::TransportError;
use thiserror::Error;

/// Any error the engine reports to its embedder.
#[derive(Debug, Error)]
pub enum CourierError {
    /// A delivery context failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A channel refused an operation.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The registry refused an operation.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl CourierError {
    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a channel error.
    #[must_use]
    pub const fn is_channel_error(&self) -> bool {
        matches!(self, Self::Channel(_))
    }

    /// Returns `true` if this is a registry error.
    #[must_use]
    pub const fn is_registry_error(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns `true` if the engine was not running.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use courier::CourierError;
    /// use courier::channel::{ChannelError, ChannelId};
    /// use courier::scheduler::SchedulerError;
    ///
    /// let error = CourierError::Channel(ChannelError::Scheduler {
    ///     channel_id: ChannelId::from("c1"),
    ///     source: SchedulerError::NotRunning,
    /// });
    /// assert!(error.is_not_started());
    /// ```
    #[must_use]
    pub fn is_not_started(&self) -> bool {
        match self {
            Self::Transport(_) => false,
            Self::Channel(ChannelError::Scheduler { source, .. }) => source.is_not_running(),
            Self::Channel(_) => false,
            Self::Registry(e) => e.is_not_started(),
        }
    }

    /// Returns `true` if retrying the operation later might succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Channel(e) => e.is_recoverable(),
            Self::Registry(RegistryError::ChannelCreation { .. }) => true,
            Self::Registry(_) => false,
        }
    }
}

impl From<SchedulerError> for CourierError {
    fn from(error: SchedulerError) -> Self {
        Self::Registry(RegistryError::Scheduler(error))
    }
}

impl From<ConfigError> for CourierError {
    fn from(error: ConfigError) -> Self {
        Self::Registry(RegistryError::Config(error))
    }
}
