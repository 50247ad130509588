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

//! Transport capability traits.
//!
//! A channel does not know how its client is connected. It holds an
//! `Arc<dyn ChannelTransport>` and asks it for a [`DeliveryContext`] when
//! there is something to write. Long-poll and streaming bindings differ
//! only in how they implement these traits.

use crate::channel::ChannelId;
use crate::message::Message;
use crate::transport::TransportError;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// One deliverable unit of connectivity.
///
/// For long-polling this is a parked poll request; for streaming it is the
/// open connection. A context that failed a write is consumed.
#[async_trait]
pub trait DeliveryContext: Send {
    /// Returns true if the context can still accept a write.
    fn is_usable(&self) -> bool;

    /// The id of the request that opened the context, if any.
    ///
    /// Delivered messages are correlated to it.
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Writes a batch to the client.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the batch could not be encoded or
    /// written. The caller decides whether the batch is requeued.
    async fn write_batch(&mut self, batch: &[Message]) -> Result<(), TransportError>;
}

/// Transport-specific behavior of a channel.
///
/// # Example
///
/// ```rust
/// use courier::transport::{ChannelTransport, DeliveryContext, NullTransport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = NullTransport;
/// assert!(!transport.has_delivery_context());
/// assert!(transport.acquire_delivery_context().await.is_none());
/// # }
/// ```
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Returns true if a delivery context is currently attached.
    fn has_delivery_context(&self) -> bool;

    /// Takes the attached delivery context, if any.
    async fn acquire_delivery_context(&self) -> Option<Box<dyn DeliveryContext>>;

    /// Hands back a context after a delivery pass.
    ///
    /// Transports whose contexts outlive a single pass (streaming
    /// connections) reattach it here. The default drops it.
    fn release_delivery_context(&self, context: Box<dyn DeliveryContext>) {
        drop(context);
    }

    /// Called once when the owning channel is destroyed.
    fn close(&self) {}

    /// Upcast for downcasting to the concrete transport.
    fn as_any(&self) -> &dyn Any;
}

/// Builds the transport of new channels.
///
/// Factories are registered with the registry by name. The name is recorded
/// with the clustering collaborator so another registry can rebuild the
/// channel with the same kind of transport.
pub trait ChannelFactory: Send + Sync + 'static {
    /// The registered factory name.
    fn name(&self) -> &str;

    /// Creates the transport for the channel `id`.
    fn new_transport(&self, id: &ChannelId) -> Arc<dyn ChannelTransport>;
}
