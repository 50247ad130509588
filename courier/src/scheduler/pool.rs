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

//! Bounded delivery worker pool.

use super::{DeliveryRunner, SchedulerError};
use crate::config::PoolConfig;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;

#[cfg(feature = "observability")]
use tracing::{debug, info};

type TaskReceiver = Arc<AsyncMutex<mpsc::Receiver<Arc<DeliveryRunner>>>>;

struct Pool {
    sender: mpsc::Sender<Arc<DeliveryRunner>>,
    receiver: TaskReceiver,
    runtime: Handle,
    config: PoolConfig,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// State shared between the scheduler handle and its workers.
pub(super) struct Shared {
    pool: RwLock<Option<Pool>>,
    pending: AtomicUsize,
    busy: AtomicUsize,
    workers: AtomicUsize,
}

impl Shared {
    /// Hands a queued runner to the workers.
    pub(super) fn submit(self: &Arc<Self>, runner: Arc<DeliveryRunner>) -> Result<(), SchedulerError> {
        let guard = self.pool.read();
        let pool = guard.as_ref().ok_or(SchedulerError::NotRunning)?;

        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = pool.sender.try_send(runner) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => SchedulerError::Rejected {
                    capacity: pool.config.queue_capacity,
                },
                mpsc::error::TrySendError::Closed(_) => SchedulerError::NotRunning,
            });
        }

        // Grow above the core size only while every worker is busy.
        let max = pool.config.maximum_pool_size;
        if self.busy.load(Ordering::Acquire) >= self.workers.load(Ordering::Acquire)
            && self
                .workers
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
                .is_ok()
        {
            let handle = pool.runtime.spawn(worker_loop(
                Arc::clone(self),
                Arc::clone(&pool.receiver),
                Some(pool.config.keep_alive),
            ));
            let mut handles = pool.handles.lock();
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
        Ok(())
    }
}

async fn worker_loop(shared: Arc<Shared>, receiver: TaskReceiver, keep_alive: Option<Duration>) {
    loop {
        let next = async {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let runner = match keep_alive {
            Some(idle) => match tokio::time::timeout(idle, next).await {
                Ok(runner) => runner,
                Err(_) => break,
            },
            None => next.await,
        };
        let Some(runner) = runner else { break };

        shared.pending.fetch_sub(1, Ordering::AcqRel);
        shared.busy.fetch_add(1, Ordering::AcqRel);
        runner.run(&shared).await;
        shared.busy.fetch_sub(1, Ordering::AcqRel);
    }
    shared.workers.fetch_sub(1, Ordering::AcqRel);
}

/// Point-in-time counters of a [`TaskScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Tasks waiting for a worker.
    pub queued: usize,
    /// Workers currently running a task.
    pub active: usize,
    /// Live workers.
    pub workers: usize,
}

/// Executes delivery runners on a bounded pool of tokio workers.
///
/// The pool keeps `core_pool_size` workers alive and grows up to
/// `maximum_pool_size` while every worker is busy. Workers above the core
/// size exit after idling for `keep_alive`. At most `queue_capacity` tasks
/// wait for a worker; further submissions are rejected.
///
/// # Examples
///
/// ```rust
/// use courier::config::PoolConfig;
/// use courier::scheduler::TaskScheduler;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = TaskScheduler::new();
/// assert!(!scheduler.is_running());
///
/// scheduler.start(&PoolConfig::default(), tokio::runtime::Handle::current());
/// assert!(scheduler.is_running());
///
/// scheduler.stop(false).await;
/// assert!(!scheduler.is_running());
/// # }
/// ```
pub struct TaskScheduler {
    shared: Arc<Shared>,
}

impl TaskScheduler {
    /// Creates a scheduler that is not yet running.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                pool: RwLock::new(None),
                pending: AtomicUsize::new(0),
                busy: AtomicUsize::new(0),
                workers: AtomicUsize::new(0),
            }),
        }
    }

    /// Starts the pool on `runtime`. Does nothing if already running.
    pub fn start(&self, config: &PoolConfig, runtime: Handle) {
        let mut guard = self.shared.pool.write();
        if guard.is_some() {
            return;
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver: TaskReceiver = Arc::new(AsyncMutex::new(receiver));
        let mut handles = Vec::with_capacity(config.core_pool_size);
        for _ in 0..config.core_pool_size {
            self.shared.workers.fetch_add(1, Ordering::AcqRel);
            handles.push(runtime.spawn(worker_loop(
                Arc::clone(&self.shared),
                Arc::clone(&receiver),
                None,
            )));
        }

        #[cfg(feature = "observability")]
        info!(
            core = config.core_pool_size,
            max = config.maximum_pool_size,
            queue_capacity = config.queue_capacity,
            "Delivery worker pool started"
        );

        *guard = Some(Pool {
            sender,
            receiver,
            runtime,
            config: config.clone(),
            handles: Mutex::new(handles),
        });
    }

    /// Stops the pool.
    ///
    /// With `now` false, tasks already queued are run before the workers
    /// exit. With `now` true, workers are aborted and queued tasks are
    /// discarded. Either way no new task is accepted once this is called.
    pub async fn stop(&self, now: bool) {
        let pool = self.shared.pool.write().take();
        let Some(pool) = pool else {
            return;
        };
        let Pool {
            sender, handles, ..
        } = pool;
        drop(sender);
        let handles = handles.into_inner();

        if now {
            for handle in &handles {
                handle.abort();
            }
        }
        for handle in handles {
            let _ = handle.await;
        }
        if now {
            self.shared.pending.store(0, Ordering::Release);
            self.shared.busy.store(0, Ordering::Release);
            self.shared.workers.store(0, Ordering::Release);
        }

        #[cfg(feature = "observability")]
        debug!(now, "Delivery worker pool stopped");
    }

    /// Returns true while the pool accepts tasks.
    pub fn is_running(&self) -> bool {
        self.shared.pool.read().is_some()
    }

    /// Requests a delivery pass for `runner`.
    ///
    /// Returns `Ok(true)` when a new task was handed to the pool and
    /// `Ok(false)` when one was already pending or the current pass was
    /// marked to run again.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotRunning`] if the pool is not running and
    /// [`SchedulerError::Rejected`] if its queue is full.
    pub fn schedule(&self, runner: &Arc<DeliveryRunner>) -> Result<bool, SchedulerError> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }
        runner.request(&self.shared)
    }

    /// Withdraws a pass of `runner` that has not started yet.
    ///
    /// Returns true if a pending pass was actually withdrawn.
    pub fn cancel(&self, runner: &DeliveryRunner) -> bool {
        runner.cancel()
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.shared.pending.load(Ordering::Acquire),
            active: self.shared.busy.load(Ordering::Acquire),
            workers: self.shared.workers.load(Ordering::Acquire),
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        if let Some(pool) = self.shared.pool.write().take() {
            for handle in pool.handles.lock().iter() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}
