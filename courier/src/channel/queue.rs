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

//! Lock-guarded FIFO buffers with swap-and-take draining.
//!
//! Producers append under a short lock; the consumer swaps the whole
//! sequence out under the same lock and processes the batch after the lock
//! is released, so delivery I/O never blocks producers.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A single FIFO buffer guarded by its own lock.
#[derive(Debug)]
pub struct MessageQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> MessageQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an item.
    pub fn enqueue(&self, item: T) {
        self.items.lock().push_back(item);
    }

    /// Appends an item unless the queue already holds `capacity` items.
    ///
    /// The size check and the append happen under one lock acquisition.
    /// On overflow the item is handed back.
    pub fn enqueue_bounded(&self, item: T, capacity: usize) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    /// Replaces the queue with an empty one and returns what it held.
    pub fn swap_and_take(&self) -> VecDeque<T> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Puts a batch back at the front of the queue, ahead of anything that
    /// arrived since it was taken.
    ///
    /// If the combined size would exceed `capacity` nothing is inserted and
    /// the whole batch is handed back. A batch is never partially requeued.
    pub fn requeue_front(&self, batch: Vec<T>, capacity: usize) -> Result<(), Vec<T>> {
        let mut items = self.items.lock();
        if items.len() + batch.len() > capacity {
            return Err(batch);
        }
        for item in batch.into_iter().rev() {
            items.push_front(item);
        }
        Ok(())
    }

    /// Returns the number of queued items.
    pub fn size_under_lock(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty_under_lock(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Discards everything queued and returns how many items were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let count = items.len();
        items.clear();
        count
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two independent queues owned by every channel.
///
/// `outbound` holds messages waiting to be written to the client through a
/// delivery context; `inbound` holds messages the client handed in for
/// asynchronous publication. Each has its own lock.
#[derive(Debug)]
pub struct QueuePair<O, I> {
    outbound: MessageQueue<O>,
    inbound: MessageQueue<I>,
}

impl<O, I> QueuePair<O, I> {
    /// Creates a pair of empty queues.
    pub fn new() -> Self {
        Self {
            outbound: MessageQueue::new(),
            inbound: MessageQueue::new(),
        }
    }

    /// The to-client queue.
    pub fn outbound(&self) -> &MessageQueue<O> {
        &self.outbound
    }

    /// The from-client queue.
    pub fn inbound(&self) -> &MessageQueue<I> {
        &self.inbound
    }
}

impl<O, I> Default for QueuePair<O, I> {
    fn default() -> Self {
        Self::new()
    }
}
