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

//! Per-channel, per-direction delivery task state.

use super::pool::Shared;
use super::{DeliveryTarget, Direction, SchedulerError};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "observability")]
use tracing::{error, warn};

const IDLE: u8 = 0;
const QUEUED: u8 = 1;
const RUNNING: u8 = 2;
const RERUN: u8 = 3;
const CLOSED: u8 = 4;

/// The pending-task handle of one channel in one direction.
///
/// States:
///
/// ```text
/// IDLE --queue--> QUEUED --begin--> RUNNING --finish--> IDLE
///                   ^                  |
///                   |                queue
///                   |                  v
///                   +----finish----- RERUN
/// ```
///
/// `close` moves any state to the terminal `CLOSED` state. A pass that is
/// already running completes, nothing is scheduled afterwards.
pub struct DeliveryRunner {
    state: AtomicU8,
    direction: Direction,
    target: Weak<dyn DeliveryTarget>,
}

impl DeliveryRunner {
    /// Creates an idle runner for `target`.
    pub fn new(direction: Direction, target: Weak<dyn DeliveryTarget>) -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            direction,
            target,
        }
    }

    /// The direction this runner drains.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns true if a pass is queued but has not started.
    pub fn is_pending(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), QUEUED | RERUN)
    }

    /// Returns true if a pass is currently running.
    pub fn is_running(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), RUNNING | RERUN)
    }

    /// Returns true once the runner has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// Requests a pass. Returns whether a new task was handed to the pool.
    pub(super) fn request(self: &Arc<Self>, shared: &Arc<Shared>) -> Result<bool, SchedulerError> {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        continue;
                    }
                    return match shared.submit(Arc::clone(self)) {
                        Ok(()) => Ok(true),
                        Err(e) => {
                            let _ = self.state.compare_exchange(
                                QUEUED,
                                IDLE,
                                Ordering::AcqRel,
                                Ordering::Acquire,
                            );
                            Err(e)
                        }
                    };
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, RERUN, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
    }

    /// Withdraws a pass that has not started yet.
    ///
    /// Returns true if a pending pass was actually withdrawn. A pass that is
    /// already running is left alone.
    pub fn cancel(&self) -> bool {
        loop {
            match self.state.load(Ordering::Acquire) {
                QUEUED => {
                    if self
                        .state
                        .compare_exchange(QUEUED, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return true;
                    }
                }
                RERUN => {
                    if self
                        .state
                        .compare_exchange(RERUN, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return true;
                    }
                }
                _ => return false,
            }
        }
    }

    /// Cancels any pending pass and prevents further scheduling.
    ///
    /// Returns true if a pending pass was withdrawn.
    pub fn close(&self) -> bool {
        matches!(self.state.swap(CLOSED, Ordering::AcqRel), QUEUED | RERUN)
    }

    /// Executes one pass if the runner is still queued.
    pub(super) async fn run(self: Arc<Self>, shared: &Arc<Shared>) {
        if self
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let Some(target) = self.target.upgrade() {
            let direction = self.direction;
            let pass = tokio::spawn(async move { target.run_delivery(direction).await }).await;
            if let Err(_e) = pass {
                #[cfg(feature = "observability")]
                error!(direction = %direction, error = %_e, "Delivery task panicked");
            }
        }

        self.finish(shared);
    }

    fn finish(self: &Arc<Self>, shared: &Arc<Shared>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                RERUN => {
                    if self
                        .state
                        .compare_exchange(RERUN, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        continue;
                    }
                    if let Err(_e) = shared.submit(Arc::clone(self)) {
                        let _ = self.state.compare_exchange(
                            QUEUED,
                            IDLE,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                        #[cfg(feature = "observability")]
                        warn!(direction = %self.direction, error = %_e, "Could not reschedule delivery");
                    }
                    return;
                }
                _ => return,
            }
        }
    }
}

impl std::fmt::Debug for DeliveryRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryRunner")
            .field("direction", &self.direction)
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}
