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

//! Idle channel eviction.
//!
//! Every registered channel owns a [`TimerSlot`]. Touching the channel
//! re-arms the slot: the previous sleep task is aborted and a new one
//! installed while the slot lock is held. A sleep task that wakes up
//! removes the channel only if its slot still holds the same generation,
//! so a timer superseded by a newer touch never fires.

use super::Registry;
use crate::channel::ChannelId;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

#[cfg(feature = "observability")]
use tracing::{debug, info};

#[derive(Debug, Default)]
struct TimerState {
    generation: u64,
    task: Option<AbortHandle>,
    closed: bool,
}

/// The idle timer of one channel.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    state: Mutex<TimerState>,
}

impl TimerSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Aborts the pending timer and refuses further arming.
    ///
    /// Returns true if a pending timer was aborted.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        state.closed = true;
        state.generation += 1;
        match state.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true if a timer is pending.
    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.state.lock().task.is_some()
    }

    /// Claims the firing of `generation`. Fails if the slot was re-armed or
    /// closed since.
    fn claim(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.generation != generation {
            return false;
        }
        state.task = None;
        state.generation += 1;
        true
    }
}

/// Arms idle timers on the registry's runtime.
pub(crate) struct IdleEvictor {
    runtime: RwLock<Option<Handle>>,
    registry: Weak<Registry>,
}

impl IdleEvictor {
    pub(crate) fn new(registry: Weak<Registry>) -> Self {
        Self {
            runtime: RwLock::new(None),
            registry,
        }
    }

    pub(crate) fn start(&self, runtime: Handle) {
        *self.runtime.write() = Some(runtime);
    }

    /// Stops arming new timers. Timers already pending are closed with their
    /// channels.
    pub(crate) fn stop(&self) {
        self.runtime.write().take();
    }

    /// Cancels the previous timer of `slot` and installs one that removes
    /// `channel_id` after `timeout`.
    ///
    /// Returns false if the slot is closed or the evictor is stopped.
    pub(crate) fn arm(&self, slot: &Arc<TimerSlot>, channel_id: &ChannelId, timeout: Duration) -> bool {
        let Some(runtime) = self.runtime.read().clone() else {
            return false;
        };

        let mut state = slot.state.lock();
        if state.closed {
            return false;
        }
        if let Some(previous) = state.task.take() {
            previous.abort();
        }
        state.generation += 1;

        let generation = state.generation;
        let weak_slot = Arc::downgrade(slot);
        let registry = self.registry.clone();
        let channel_id = channel_id.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            fire(weak_slot, generation, registry, channel_id).await;
        });
        state.task = Some(task.abort_handle());
        true
    }
}

async fn fire(slot: Weak<TimerSlot>, generation: u64, registry: Weak<Registry>, channel_id: ChannelId) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    if !slot.claim(generation) {
        #[cfg(feature = "observability")]
        debug!(channel_id = %channel_id, "Superseded idle timer ignored");
        return;
    }
    let Some(registry) = registry.upgrade() else {
        return;
    };

    #[cfg(feature = "observability")]
    info!(channel_id = %channel_id, "Removing idle channel");

    registry.remove_channel(&channel_id).await;
}

impl std::fmt::Debug for IdleEvictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleEvictor")
            .field("running", &self.runtime.read().is_some())
            .finish()
    }
}
