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

//! The server-side representative of one connected client.

use super::{ChannelError, ChannelId, QueuePair, Subscription};
use crate::config::{EngineConfig, SharedConfig};
use crate::message::Message;
use crate::registry::Registry;
use crate::scheduler::{DeliveryRunner, DeliveryTarget, Direction, TaskScheduler};
use crate::transport::{ChannelTransport, DeliveryContext};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "observability")]
use tracing::{debug, instrument, warn};

/// A stateful channel to one client.
///
/// A channel outlives the physical connections of its client. It buffers
/// messages in two independent queues:
///
/// - **outbound**: messages waiting to be written to the client. Bounded by
///   `max_messages_queued_per_channel`. Drained through whatever
///   [`DeliveryContext`] the transport currently offers.
/// - **inbound**: messages the client handed in for asynchronous
///   publication. Drained by republishing each through the registry.
///
/// Each direction has at most one pending or running delivery task.
///
/// Channels compare equal by id only.
///
/// # Example
///
/// ```rust
/// use courier::channel::{Channel, ChannelId};
/// use courier::message::Message;
/// use courier::transport::NullTransport;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let channel = Channel::builder(ChannelId::from("c1"), "server", Arc::new(NullTransport)).build();
/// channel.enqueue_outbound(Message::publish("news", json!("hi"))).unwrap();
/// assert_eq!(channel.outbound_len(), 1);
/// ```
pub struct Channel {
    id: ChannelId,
    factory_name: String,
    session_id: Option<String>,
    client_type: Option<String>,
    transport: Arc<dyn ChannelTransport>,
    queues: QueuePair<Message, Message>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
    outbound: Arc<DeliveryRunner>,
    inbound: Arc<DeliveryRunner>,
    scheduler: Arc<TaskScheduler>,
    config: SharedConfig,
    registry: Weak<Registry>,
    self_ref: Weak<Channel>,
    destroyed: AtomicBool,
    removing: AtomicBool,
    dropped: AtomicUsize,
}

impl Channel {
    /// Starts building a channel.
    pub fn builder(
        id: ChannelId,
        factory_name: impl Into<String>,
        transport: Arc<dyn ChannelTransport>,
    ) -> ChannelBuilder {
        ChannelBuilder {
            id,
            factory_name: factory_name.into(),
            transport,
            session_id: None,
            client_type: None,
            scheduler: None,
            config: None,
            registry: Weak::new(),
        }
    }

    /// The channel id.
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Name of the factory that built this channel's transport.
    pub fn factory_name(&self) -> &str {
        &self.factory_name
    }

    /// Session the channel was created in.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Client type tag.
    pub fn client_type(&self) -> Option<&str> {
        self.client_type.as_deref()
    }

    /// The channel's transport.
    pub fn transport(&self) -> &Arc<dyn ChannelTransport> {
        &self.transport
    }

    /// Downcasts the transport to its concrete type.
    pub fn transport_as<T: 'static>(&self) -> Option<&T> {
        self.transport.as_any().downcast_ref::<T>()
    }

    /// Returns true if a delivery context is attached.
    pub fn has_delivery_context(&self) -> bool {
        self.transport.has_delivery_context()
    }

    /// Queues a message for the client.
    ///
    /// A delivery pass is requested right away when the transport has a
    /// context attached; otherwise the message waits until one attaches.
    /// A destroyed channel still accepts the message but never schedules.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::QueueFull`] if the outbound queue is at capacity.
    /// - [`ChannelError::Scheduler`] if the delivery pass could not be
    ///   scheduled. The message stays queued.
    #[cfg_attr(feature = "observability", instrument(skip(self, message), fields(channel_id = %self.id)))]
    pub fn enqueue_outbound(&self, message: Message) -> Result<(), ChannelError> {
        let capacity = self.config.read().max_messages_queued_per_channel;
        if self.queues.outbound().enqueue_bounded(message, capacity).is_err() {
            #[cfg(feature = "observability")]
            warn!(capacity, "Outbound queue is full");

            return Err(ChannelError::QueueFull {
                channel_id: self.id.clone(),
                capacity,
            });
        }

        if self.transport.has_delivery_context() {
            self.schedule(Direction::Outbound)?;
        }
        Ok(())
    }

    /// Queues a message the client handed in for publication.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Scheduler`] if the publication pass could not
    /// be scheduled. The message stays queued.
    #[cfg_attr(feature = "observability", instrument(skip(self, message), fields(channel_id = %self.id)))]
    pub fn enqueue_inbound(&self, message: Message) -> Result<(), ChannelError> {
        self.queues.inbound().enqueue(message);
        self.schedule(Direction::Inbound)
    }

    /// Requests an outbound pass after the transport gained a context.
    ///
    /// Transport bindings call this once a poll is parked or a streaming
    /// connection is attached.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Scheduler`] if the pass could not be scheduled.
    pub fn delivery_context_attached(&self) -> Result<(), ChannelError> {
        if self.queues.outbound().is_empty_under_lock() {
            return Ok(());
        }
        self.schedule(Direction::Outbound)
    }

    fn schedule(&self, direction: Direction) -> Result<(), ChannelError> {
        if self.is_destroyed() {
            return Ok(());
        }
        let runner = match direction {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        };
        self.scheduler
            .schedule(runner)
            .map(|_| ())
            .map_err(|source| ChannelError::Scheduler {
                channel_id: self.id.clone(),
                source,
            })
    }

    /// Writes everything queued for the client through `context`.
    ///
    /// Returns false without touching the context if it is no longer
    /// usable or nothing was queued. Otherwise the queue is swapped out and
    /// the batch written, and true is returned whether or not the write
    /// succeeded.
    ///
    /// On a failed write with `retry_on_error` set, the batch is put back at
    /// the front of the queue, ahead of messages that arrived meanwhile. If
    /// that would overflow the queue the whole batch is dropped instead.
    #[cfg_attr(feature = "observability", instrument(skip(self, context), fields(channel_id = %self.id)))]
    pub async fn drain_outbound(&self, context: &mut dyn DeliveryContext) -> bool {
        if !context.is_usable() {
            return false;
        }
        let batch: Vec<Message> = self.queues.outbound().swap_and_take().into();
        if batch.is_empty() {
            return false;
        }

        let correlation = context.correlation_id().map(str::to_string);
        let outgoing: Cow<'_, [Message]> = match correlation {
            Some(correlation) => Cow::Owned(
                batch
                    .iter()
                    .map(|message| {
                        let mut message = message.clone();
                        message.correlation_id = Some(correlation.clone());
                        message
                    })
                    .collect(),
            ),
            None => Cow::Borrowed(&batch),
        };

        let written = context.write_batch(&outgoing).await;
        drop(outgoing);
        match written {
            Ok(()) => {
                #[cfg(feature = "observability")]
                debug!(count = batch.len(), "Delivered batch");
            }
            Err(_e) => {
                let (retry, capacity) = {
                    let config = self.config.read();
                    (config.retry_on_error, config.max_messages_queued_per_channel)
                };
                if !retry {
                    #[cfg(feature = "observability")]
                    debug!(count = batch.len(), error = %_e, "Delivery failed, dropping batch");
                    self.dropped.fetch_add(batch.len(), Ordering::AcqRel);
                } else if let Err(batch) = self.queues.outbound().requeue_front(batch, capacity) {
                    #[cfg(feature = "observability")]
                    warn!(
                        count = batch.len(),
                        capacity,
                        error = %_e,
                        "Delivery failed and requeueing would exceed queue capacity, dropping batch"
                    );
                    self.dropped.fetch_add(batch.len(), Ordering::AcqRel);
                } else {
                    #[cfg(feature = "observability")]
                    debug!(error = %_e, "Delivery failed, batch requeued");
                }
            }
        }
        true
    }

    async fn run_outbound(&self) {
        if self.queues.outbound().is_empty_under_lock() {
            return;
        }
        let Some(mut context) = self.transport.acquire_delivery_context().await else {
            return;
        };
        self.drain_outbound(context.as_mut()).await;
        self.transport.release_delivery_context(context);
    }

    async fn run_inbound(&self) {
        let batch = self.queues.inbound().swap_and_take();
        if batch.is_empty() {
            return;
        }
        let (Some(registry), Some(channel)) = (self.registry.upgrade(), self.self_ref.upgrade())
        else {
            #[cfg(feature = "observability")]
            warn!(channel_id = %self.id, count = batch.len(), "No registry, discarding inbound messages");
            return;
        };
        for message in batch {
            let _reply = registry.publish_from(&channel, message).await;
            #[cfg(feature = "observability")]
            if let Some(fault) = _reply.fault() {
                warn!(channel_id = %self.id, fault = %fault, "Inbound publication failed");
            }
        }
    }

    /// Cancels pending delivery tasks and clears subscriptions.
    ///
    /// Idempotent. A pass that already started runs to completion.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.outbound.close();
        self.inbound.close();
        self.subscriptions.write().clear();
        self.transport.close();

        #[cfg(feature = "observability")]
        debug!(channel_id = %self.id, "Channel destroyed");
    }

    /// Returns true once [`destroy`](Self::destroy) ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Claims the channel for removal. Only the first caller gets true.
    pub(crate) fn claim_removal(&self) -> bool {
        !self.removing.swap(true, Ordering::AcqRel)
    }

    /// Registers a subscription unless one with the same id exists.
    ///
    /// Returns true if it was added.
    pub fn add_subscription(&self, subscription: Subscription) -> bool {
        let mut subscriptions = self.subscriptions.write();
        if subscriptions.contains_key(subscription.id()) {
            return false;
        }
        subscriptions.insert(subscription.id().to_string(), subscription);
        true
    }

    /// Removes a subscription.
    pub fn remove_subscription(&self, subscription_id: &str) -> Option<Subscription> {
        self.subscriptions.write().remove(subscription_id)
    }

    /// Looks up a subscription.
    pub fn subscription(&self, subscription_id: &str) -> Option<Subscription> {
        self.subscriptions.read().get(subscription_id).cloned()
    }

    /// A snapshot of the live subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.read().values().cloned().collect()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Messages waiting for the client.
    pub fn outbound_len(&self) -> usize {
        self.queues.outbound().size_under_lock()
    }

    /// Messages waiting for publication.
    pub fn inbound_len(&self) -> usize {
        self.queues.inbound().size_under_lock()
    }

    /// Messages discarded after failed deliveries.
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Acquire)
    }

    /// Returns true if a delivery task is pending for `direction`.
    pub fn has_pending_task(&self, direction: Direction) -> bool {
        match direction {
            Direction::Outbound => self.outbound.is_pending(),
            Direction::Inbound => self.inbound.is_pending(),
        }
    }

    /// Withdraws a pending delivery task. Returns true if one was withdrawn.
    pub fn cancel_task(&self, direction: Direction) -> bool {
        match direction {
            Direction::Outbound => self.scheduler.cancel(&self.outbound),
            Direction::Inbound => self.scheduler.cancel(&self.inbound),
        }
    }
}

#[async_trait]
impl DeliveryTarget for Channel {
    async fn run_delivery(&self, direction: Direction) {
        match direction {
            Direction::Outbound => self.run_outbound().await,
            Direction::Inbound => self.run_inbound().await,
        }
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("factory", &self.factory_name)
            .field("transport", &self.transport.name())
            .field("session_id", &self.session_id)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Builder for [`Channel`].
///
/// A channel built without a scheduler gets one that is not running, which
/// is enough for channels that are drained by hand.
pub struct ChannelBuilder {
    id: ChannelId,
    factory_name: String,
    transport: Arc<dyn ChannelTransport>,
    session_id: Option<String>,
    client_type: Option<String>,
    scheduler: Option<Arc<TaskScheduler>>,
    config: Option<SharedConfig>,
    registry: Weak<Registry>,
}

impl ChannelBuilder {
    /// Sets the session id.
    pub fn session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Sets the client type tag.
    pub fn client_type(mut self, client_type: Option<String>) -> Self {
        self.client_type = client_type;
        self
    }

    /// Sets the scheduler delivery tasks run on.
    pub fn scheduler(mut self, scheduler: Arc<TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the shared configuration.
    pub fn config(mut self, config: SharedConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the owning registry.
    pub fn registry(mut self, registry: Weak<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Builds the channel.
    pub fn build(self) -> Arc<Channel> {
        Arc::new_cyclic(|weak: &Weak<Channel>| {
            let target: Weak<dyn DeliveryTarget> = weak.clone();
            Channel {
                id: self.id,
                factory_name: self.factory_name,
                session_id: self.session_id,
                client_type: self.client_type,
                transport: self.transport,
                queues: QueuePair::new(),
                subscriptions: RwLock::new(HashMap::new()),
                outbound: Arc::new(DeliveryRunner::new(Direction::Outbound, target.clone())),
                inbound: Arc::new(DeliveryRunner::new(Direction::Inbound, target)),
                scheduler: self
                    .scheduler
                    .unwrap_or_else(|| Arc::new(TaskScheduler::new())),
                config: self
                    .config
                    .unwrap_or_else(|| Arc::new(RwLock::new(EngineConfig::default()))),
                registry: self.registry,
                self_ref: weak.clone(),
                destroyed: AtomicBool::new(false),
                removing: AtomicBool::new(false),
                dropped: AtomicUsize::new(0),
            }
        })
    }
}
