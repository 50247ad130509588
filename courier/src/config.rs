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

//! Configuration types for the messaging engine.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sizing of the background delivery worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers kept alive for the life of the pool.
    pub core_pool_size: usize,
    /// Upper bound on concurrently running workers.
    pub maximum_pool_size: usize,
    /// How long an extra worker above the core size idles before exiting.
    pub keep_alive: Duration,
    /// Maximum number of delivery tasks waiting for a worker.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_pool_size: 5,
            maximum_pool_size: 20,
            keep_alive: Duration::from_secs(10),
            queue_capacity: 10_000,
        }
    }
}

impl PoolConfig {
    /// Sets the core worker count.
    pub fn with_core_pool_size(mut self, size: usize) -> Self {
        self.core_pool_size = size;
        self
    }

    /// Sets the maximum worker count.
    pub fn with_maximum_pool_size(mut self, size: usize) -> Self {
        self.maximum_pool_size = size;
        self
    }

    /// Sets the idle time after which extra workers exit.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the pending task bound.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Configuration of the messaging engine.
///
/// # Examples
///
/// ```rust
/// use courier::config::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_channel_idle_timeout(Duration::from_secs(60))
///     .with_max_messages_queued_per_channel(500)
///     .with_retry_on_error(false);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_messages_queued_per_channel, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A channel with no client activity for this long is removed.
    pub channel_idle_timeout: Duration,

    /// How long a long-poll request is parked waiting for messages.
    pub long_polling_timeout: Duration,

    /// Whether a batch that failed to reach the client is requeued.
    pub retry_on_error: bool,

    /// Upper bound on a channel's outbound queue.
    pub max_messages_queued_per_channel: usize,

    /// Reconnection interval advised to clients on ping.
    pub reconnect_interval: Duration,

    /// Reconnection attempts advised to clients on ping.
    pub reconnect_max_attempts: u32,

    /// Delivery worker pool sizing.
    pub pool: PoolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_idle_timeout: Duration::from_secs(30 * 60),
            long_polling_timeout: Duration::from_secs(20),
            retry_on_error: true,
            max_messages_queued_per_channel: 10_000,
            reconnect_interval: Duration::from_secs(30),
            reconnect_max_attempts: 60,
            pool: PoolConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle timeout.
    pub fn with_channel_idle_timeout(mut self, timeout: Duration) -> Self {
        self.channel_idle_timeout = timeout;
        self
    }

    /// Sets the long-poll timeout.
    pub fn with_long_polling_timeout(mut self, timeout: Duration) -> Self {
        self.long_polling_timeout = timeout;
        self
    }

    /// Enables or disables requeueing after a failed delivery.
    pub fn with_retry_on_error(mut self, retry: bool) -> Self {
        self.retry_on_error = retry;
        self
    }

    /// Sets the per-channel outbound queue bound.
    pub fn with_max_messages_queued_per_channel(mut self, max: usize) -> Self {
        self.max_messages_queued_per_channel = max;
        self
    }

    /// Sets the advised reconnection interval.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the advised reconnection attempts.
    pub fn with_reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = attempts;
        self
    }

    /// Sets the worker pool sizing.
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Checks the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages_queued_per_channel == 0 {
            return Err(ConfigError::invalid(
                "max_messages_queued_per_channel",
                "must be greater than 0",
            ));
        }
        if self.channel_idle_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "channel_idle_timeout",
                "must be greater than 0",
            ));
        }
        if self.pool.core_pool_size == 0 {
            return Err(ConfigError::invalid("pool.core_pool_size", "must be greater than 0"));
        }
        if self.pool.maximum_pool_size < self.pool.core_pool_size {
            return Err(ConfigError::invalid(
                "pool.maximum_pool_size",
                "must not be less than pool.core_pool_size",
            ));
        }
        if self.pool.queue_capacity == 0 {
            return Err(ConfigError::invalid("pool.queue_capacity", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration shared between the registry and its channels.
///
/// Readers take a short read lock per operation so a reconfiguration is
/// observed by the next enqueue or drain.
pub type SharedConfig = Arc<RwLock<EngineConfig>>;

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value the engine cannot run with.
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
