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

//! Registry error types.

use crate::config::ConfigError;
use crate::scheduler::SchedulerError;
use thiserror::Error;

/// Errors from registry lifecycle and channel management.
///
/// Protocol failures such as unknown clients or denied access are not
/// errors: dispatch reports them as error replies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No unused channel id was found.
    #[error("could not find an unused channel id after {attempts} attempts")]
    ChannelCreation {
        /// How many ids were tried.
        attempts: usize,
    },

    /// The registry is not started.
    #[error("registry is not started")]
    NotStarted,

    /// The worker pool refused a task.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// Returns true if the registry was not running.
    #[must_use]
    pub const fn is_not_started(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::Scheduler(SchedulerError::NotRunning)
        )
    }

    /// Returns true if the configuration was rejected.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
