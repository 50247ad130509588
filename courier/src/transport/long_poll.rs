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

//! Long-poll transport binding.
//!
//! A long-poll client keeps one request parked on the server. The parked
//! request is the channel's only delivery context: the first delivery pass
//! that finds it writes the whole outbound queue into it and completes the
//! request. A poll that finds nothing to deliver within the configured wait
//! completes with an empty batch.

use super::{ChannelFactory, ChannelTransport, DeliveryContext, TransportError};
use crate::channel::{Channel, ChannelId};
use crate::message::Message;
use crate::serialization::{JsonSerializer, Serializer};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

#[cfg(feature = "observability")]
use tracing::{debug, warn};

struct PendingPoll {
    id: u64,
    correlation_id: Option<String>,
    responder: oneshot::Sender<Vec<u8>>,
}

#[derive(Default)]
struct Slot {
    parked: Option<PendingPoll>,
    expired: Vec<u64>,
}

/// Transport of long-polling clients.
///
/// # Example
///
/// ```rust
/// use courier::channel::{Channel, ChannelId};
/// use courier::message::{CommandOperation, Message};
/// use courier::transport::LongPollTransport;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let channel = Channel::builder(ChannelId::from("c1"), "long-poll", Arc::new(LongPollTransport::default())).build();
/// let transport = channel.transport_as::<LongPollTransport>().unwrap();
///
/// let connect = Message::command(CommandOperation::Connect);
/// let bytes = transport.wait(&channel, &connect, Duration::from_millis(10)).await.unwrap();
/// assert_eq!(bytes, b"[]");
/// # }
/// ```
pub struct LongPollTransport {
    serializer: Arc<dyn Serializer>,
    slot: Arc<Mutex<Slot>>,
    next_poll: AtomicU64,
    closed: AtomicBool,
}

impl LongPollTransport {
    /// Creates a transport encoding batches with `serializer`.
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self {
            serializer,
            slot: Arc::new(Mutex::new(Slot::default())),
            next_poll: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Parks a poll request and waits for a batch.
    ///
    /// A poll already parked is completed with an empty batch first. The
    /// channel is told a context is available so queued messages go out
    /// right away. Returns the encoded batch, which is empty if nothing
    /// arrived within `timeout` or the channel was destroyed meanwhile.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Closed`] if the channel was already destroyed.
    /// - [`TransportError::Serialization`] if the empty batch could not be
    ///   encoded.
    pub async fn wait(
        &self,
        channel: &Channel,
        connect: &Message,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let empty = self.serializer.encode_batch(&[])?;

        let id = self.next_poll.fetch_add(1, Ordering::AcqRel);
        let (responder, mut receiver) = oneshot::channel();
        let previous = self.slot.lock().parked.replace(PendingPoll {
            id,
            correlation_id: connect.message_id.clone(),
            responder,
        });
        if let Some(previous) = previous {
            let _ = previous.responder.send(empty.clone());
        }

        if let Err(_e) = channel.delivery_context_attached() {
            #[cfg(feature = "observability")]
            warn!(channel_id = %channel.id(), error = %_e, "Could not schedule delivery for parked poll");
        }

        let outcome = tokio::time::timeout(timeout, &mut receiver).await;
        match outcome {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(_)) => Ok(empty),
            Err(_) => {
                let withdrawn = {
                    let mut slot = self.slot.lock();
                    if slot.parked.as_ref().is_some_and(|poll| poll.id == id) {
                        slot.parked.take()
                    } else {
                        slot.expired.push(id);
                        None
                    }
                };
                if withdrawn.is_some() {
                    #[cfg(feature = "observability")]
                    debug!(channel_id = %channel.id(), "Long-poll timed out");
                    return Ok(empty);
                }
                // A delivery pass holds the poll. It either completes it or
                // drops it; either way the receiver resolves.
                Ok(receiver.await.unwrap_or(empty))
            }
        }
    }
}

impl Default for LongPollTransport {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer::default()))
    }
}

#[async_trait]
impl ChannelTransport for LongPollTransport {
    fn name(&self) -> &str {
        "long-poll"
    }

    fn has_delivery_context(&self) -> bool {
        self.slot
            .lock()
            .parked
            .as_ref()
            .is_some_and(|poll| !poll.responder.is_closed())
    }

    async fn acquire_delivery_context(&self) -> Option<Box<dyn DeliveryContext>> {
        let poll = self.slot.lock().parked.take()?;
        if poll.responder.is_closed() {
            return None;
        }
        Some(Box::new(LongPollContext {
            poll: Some(poll),
            slot: Arc::clone(&self.slot),
            serializer: Arc::clone(&self.serializer),
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.slot.lock().parked.take();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for LongPollTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongPollTransport")
            .field("serializer", &self.serializer.name())
            .field("parked", &self.has_delivery_context())
            .finish()
    }
}

struct LongPollContext {
    poll: Option<PendingPoll>,
    slot: Arc<Mutex<Slot>>,
    serializer: Arc<dyn Serializer>,
}

#[async_trait]
impl DeliveryContext for LongPollContext {
    fn is_usable(&self) -> bool {
        self.poll
            .as_ref()
            .is_some_and(|poll| !poll.responder.is_closed())
    }

    fn correlation_id(&self) -> Option<&str> {
        self.poll.as_ref()?.correlation_id.as_deref()
    }

    async fn write_batch(&mut self, batch: &[Message]) -> Result<(), TransportError> {
        let bytes = self.serializer.encode_batch(batch)?;
        let poll = self.poll.take().ok_or(TransportError::Closed)?;
        self.slot.lock().expired.retain(|id| *id != poll.id);
        poll.responder
            .send(bytes)
            .map_err(|_| TransportError::ConnectionLost {
                reason: "long-poll request completed before delivery".to_string(),
                source: None,
            })
    }
}

impl Drop for LongPollContext {
    fn drop(&mut self) {
        // An unused poll goes back to the slot unless its waiter gave up or
        // a newer poll was parked meanwhile.
        let Some(poll) = self.poll.take() else {
            return;
        };
        let mut slot = self.slot.lock();
        if let Some(index) = slot.expired.iter().position(|id| *id == poll.id) {
            slot.expired.swap_remove(index);
            return;
        }
        if slot.parked.is_none() && !poll.responder.is_closed() {
            slot.parked = Some(poll);
        }
    }
}

/// Factory of [`LongPollTransport`] channels.
#[derive(Clone)]
pub struct LongPollChannelFactory {
    serializer: Arc<dyn Serializer>,
}

impl LongPollChannelFactory {
    /// The name this factory registers under.
    pub const NAME: &'static str = "long-poll";

    /// Creates a factory whose transports use `serializer`.
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl Default for LongPollChannelFactory {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer::default()))
    }
}

impl ChannelFactory for LongPollChannelFactory {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn new_transport(&self, _id: &ChannelId) -> Arc<dyn ChannelTransport> {
        Arc::new(LongPollTransport::new(Arc::clone(&self.serializer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel() -> Arc<Channel> {
        Channel::builder(
            ChannelId::from("c1"),
            LongPollChannelFactory::NAME,
            Arc::new(LongPollTransport::default()),
        )
        .build()
    }

    #[tokio::test]
    async fn test_wait_times_out_with_empty_batch() {
        let channel = channel();
        let transport = channel.transport_as::<LongPollTransport>().unwrap();
        let connect = Message::command(crate::message::CommandOperation::Connect);

        let bytes = transport
            .wait(&channel, &connect, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(bytes, b"[]");
        assert!(!transport.has_delivery_context());
    }

    #[tokio::test]
    async fn test_parked_poll_receives_drained_batch() {
        let channel = channel();
        channel
            .enqueue_outbound(Message::publish("news", json!(1)))
            .unwrap();
        let connect = Message::command(crate::message::CommandOperation::Connect);

        let waiter = {
            let channel = Arc::clone(&channel);
            let connect = connect.clone();
            tokio::spawn(async move {
                let transport = channel.transport_as::<LongPollTransport>().unwrap();
                transport
                    .wait(&channel, &connect, Duration::from_secs(5))
                    .await
            })
        };

        // The channel has no running scheduler here, so drain by hand once
        // the poll is parked.
        let transport = channel.transport_as::<LongPollTransport>().unwrap();
        while !transport.has_delivery_context() {
            tokio::task::yield_now().await;
        }
        let mut context = transport.acquire_delivery_context().await.unwrap();
        assert!(channel.drain_outbound(context.as_mut()).await);
        drop(context);

        let bytes = waiter.await.unwrap().unwrap();
        let batch = JsonSerializer::default().decode_batch(&bytes).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, json!(1));
        assert_eq!(batch[0].correlation_id, connect.message_id);
    }

    #[tokio::test]
    async fn test_unused_context_returns_to_slot() {
        let channel = channel();
        let transport = channel.transport_as::<LongPollTransport>().unwrap();
        let connect = Message::command(crate::message::CommandOperation::Connect);

        let wait = transport.wait(&channel, &connect, Duration::from_millis(50));
        let check = async {
            while !transport.has_delivery_context() {
                tokio::task::yield_now().await;
            }
            let mut context = transport.acquire_delivery_context().await.unwrap();
            // Nothing queued: the context is left untouched.
            assert!(!channel.drain_outbound(context.as_mut()).await);
            drop(context);
            assert!(transport.has_delivery_context());
        };
        let (bytes, ()) = tokio::join!(wait, check);
        assert_eq!(bytes.unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_destroyed_channel_rejects_wait() {
        let channel = channel();
        channel.destroy();
        let transport = channel.transport_as::<LongPollTransport>().unwrap();
        let connect = Message::command(crate::message::CommandOperation::Connect);
        let result = transport
            .wait(&channel, &connect, Duration::from_millis(5))
            .await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
