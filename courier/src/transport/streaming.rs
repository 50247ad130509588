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

//! Streaming transport binding.
//!
//! A streaming client holds one connection open. While it is attached every
//! delivery pass writes straight into it.

use super::{ChannelFactory, ChannelTransport, DeliveryContext, TransportError};
use crate::channel::{Channel, ChannelError, ChannelId};
use crate::message::Message;
use crate::serialization::{JsonSerializer, Serializer};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;

#[cfg(feature = "observability")]
use tracing::debug;

/// Transport of streaming clients.
///
/// The binding owns the socket and hands the transport the sending half of
/// an `mpsc` channel feeding it. Each encoded batch is one item.
pub struct StreamingTransport {
    serializer: Arc<dyn Serializer>,
    sink: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
}

impl StreamingTransport {
    /// Creates a transport encoding batches with `serializer`.
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self {
            serializer,
            sink: Mutex::new(None),
        }
    }

    /// Attaches a connection and requests delivery of anything queued.
    ///
    /// A connection already attached is replaced.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Destroyed`] if the channel was destroyed. Nothing
    ///   is attached.
    /// - [`ChannelError::Scheduler`] if the delivery pass could not be
    ///   scheduled. The connection stays attached.
    pub fn attach(&self, channel: &Channel, sink: mpsc::Sender<Vec<u8>>) -> Result<(), ChannelError> {
        if channel.is_destroyed() {
            return Err(ChannelError::Destroyed {
                channel_id: channel.id().clone(),
            });
        }
        *self.sink.lock() = Some(sink);

        #[cfg(feature = "observability")]
        debug!(channel_id = %channel.id(), "Streaming connection attached");

        channel.delivery_context_attached()
    }

    /// Detaches the current connection, if any.
    pub fn detach(&self) -> bool {
        self.sink.lock().take().is_some()
    }
}

impl Default for StreamingTransport {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer::default()))
    }
}

#[async_trait]
impl ChannelTransport for StreamingTransport {
    fn name(&self) -> &str {
        "streaming"
    }

    fn has_delivery_context(&self) -> bool {
        self.sink
            .lock()
            .as_ref()
            .is_some_and(|sink| !sink.is_closed())
    }

    async fn acquire_delivery_context(&self) -> Option<Box<dyn DeliveryContext>> {
        let mut guard = self.sink.lock();
        let sink = guard.as_ref()?;
        if sink.is_closed() {
            guard.take();
            return None;
        }
        Some(Box::new(StreamingContext {
            sink: sink.clone(),
            serializer: Arc::clone(&self.serializer),
        }))
    }

    fn close(&self) {
        self.detach();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for StreamingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingTransport")
            .field("serializer", &self.serializer.name())
            .field("attached", &self.has_delivery_context())
            .finish()
    }
}

struct StreamingContext {
    sink: mpsc::Sender<Vec<u8>>,
    serializer: Arc<dyn Serializer>,
}

#[async_trait]
impl DeliveryContext for StreamingContext {
    fn is_usable(&self) -> bool {
        !self.sink.is_closed()
    }

    async fn write_batch(&mut self, batch: &[Message]) -> Result<(), TransportError> {
        let bytes = self.serializer.encode_batch(batch)?;
        self.sink
            .send(bytes)
            .await
            .map_err(|_| TransportError::ConnectionLost {
                reason: "streaming connection closed".to_string(),
                source: None,
            })
    }
}

/// Factory of [`StreamingTransport`] channels.
#[derive(Clone)]
pub struct StreamingChannelFactory {
    serializer: Arc<dyn Serializer>,
}

impl StreamingChannelFactory {
    /// The name this factory registers under.
    pub const NAME: &'static str = "streaming";

    /// Creates a factory whose transports use `serializer`.
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl Default for StreamingChannelFactory {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer::default()))
    }
}

impl ChannelFactory for StreamingChannelFactory {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn new_transport(&self, _id: &ChannelId) -> Arc<dyn ChannelTransport> {
        Arc::new(StreamingTransport::new(Arc::clone(&self.serializer)))
    }
}
