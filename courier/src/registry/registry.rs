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

//! The channel registry.

use super::RegistryError;
use super::evictor::{IdleEvictor, TimerSlot};
use crate::adapter::{AdapterFactory, DefaultAdapterFactory};
use crate::channel::{Channel, ChannelId};
use crate::clustering::DistributedState;
use crate::config::{EngineConfig, SharedConfig};
use crate::context::RequestContext;
use crate::destination::ServicesConfig;
use crate::interceptor::MessageInterceptor;
use crate::message::Message;
use crate::scheduler::TaskScheduler;
use crate::security::SecurityService;
use crate::transport::{ChannelFactory, ServerChannelFactory};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;

#[cfg(feature = "observability")]
use tracing::{debug, info, instrument, warn};

/// How many fresh ids channel creation tries before giving up.
pub const MAX_CHANNEL_CREATION_ATTEMPTS: usize = 10;

/// Produces candidate ids for new channels.
pub type ChannelIdGenerator = Arc<dyn Fn() -> ChannelId + Send + Sync>;

pub(super) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone)]
struct RegistryEntry {
    channel: Arc<Channel>,
    timer: Arc<TimerSlot>,
}

/// Point-in-time counters of a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Registered client channels.
    pub channels: usize,
    /// Delivery tasks waiting for a worker.
    pub queued_tasks: usize,
    /// Workers running a delivery task.
    pub active_workers: usize,
    /// Live workers.
    pub workers: usize,
}

/// The root of the engine.
///
/// The registry maps channel ids to channels, creates, looks up and
/// removes channels, interprets protocol commands through
/// [`dispatch`](Self::dispatch), and evicts channels that stayed idle for
/// `channel_idle_timeout`.
///
/// Single-key operations on the channel map need no external locking.
/// No registry operation holds a map or queue lock while calling into an
/// adapter, the security service or the clustering collaborator.
///
/// # Example
///
/// ```rust
/// use courier::context::RequestContext;
/// use courier::message::{CommandOperation, Message};
/// use courier::registry::Registry;
/// use courier::transport::LongPollChannelFactory;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Registry::builder().build()?;
/// registry.start().await?;
///
/// let context = RequestContext::new(Arc::new(LongPollChannelFactory::default()));
/// let reply = registry
///     .dispatch(&context, Message::command(CommandOperation::Ping))
///     .await
///     .unwrap();
/// let channel_id = reply.client_id.unwrap();
/// assert!(registry.touch(&channel_id));
///
/// registry.stop(false).await;
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    channels: DashMap<ChannelId, RegistryEntry>,
    factories: RwLock<HashMap<String, Arc<dyn ChannelFactory>>>,
    pub(super) services: ServicesConfig,
    pub(super) adapters: Arc<dyn AdapterFactory>,
    pub(super) security: Option<Arc<dyn SecurityService>>,
    pub(super) cluster: Option<Arc<dyn DistributedState>>,
    pub(super) interceptor: Option<Arc<dyn MessageInterceptor>>,
    pub(super) config: SharedConfig,
    scheduler: Arc<TaskScheduler>,
    evictor: IdleEvictor,
    id_generator: ChannelIdGenerator,
    server_channel: RwLock<Option<Arc<Channel>>>,
    lifecycle: tokio::sync::Mutex<()>,
    self_ref: Weak<Registry>,
}

impl Registry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Starts the worker pool and the idle evictor and creates the server
    /// channel. Does nothing if already started.
    ///
    /// Must be called from within a tokio runtime, which the pool and the
    /// evictor run on.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the current configuration is
    /// invalid.
    pub async fn start(&self) -> Result<(), RegistryError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_started() {
            return Ok(());
        }

        let config = self.config.read().clone();
        config.validate()?;

        let runtime = Handle::current();
        self.scheduler.start(&config.pool, runtime.clone());
        self.evictor.start(runtime);

        let context = RequestContext::new(Arc::new(ServerChannelFactory));
        let server = self.build_channel(ChannelId::generate(), &context);
        *self.server_channel.write() = Some(server);

        #[cfg(feature = "observability")]
        info!("Registry started");
        Ok(())
    }

    /// Removes every channel, stops the adapters and shuts the worker pool.
    ///
    /// With `now` false, delivery tasks already queued run before the pool
    /// exits; with `now` true they are discarded.
    pub async fn stop(&self, now: bool) {
        let _lifecycle = self.lifecycle.lock().await;
        let server = self.server_channel.write().take();
        let Some(server) = server else {
            return;
        };

        #[cfg(feature = "observability")]
        info!(now, "Stopping registry");

        for id in self.channel_ids() {
            self.remove_channel(&id).await;
        }
        for adapter in self.adapters.adapters() {
            adapter.stop().await;
        }
        server.destroy();
        self.evictor.stop();
        self.scheduler.stop(now).await;

        #[cfg(feature = "observability")]
        info!("Registry stopped");
    }

    /// Stops gracefully, then starts again.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub async fn restart(&self) -> Result<(), RegistryError> {
        self.stop(false).await;
        self.start().await
    }

    /// Returns true between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_started(&self) -> bool {
        self.server_channel.read().is_some()
    }

    /// Replaces the configuration.
    ///
    /// Queue bounds, timeouts and retry behavior apply to the next
    /// operation. Pool sizing applies from the next start.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] and keeps the current
    /// configuration if `config` is invalid.
    pub fn reconfigure(&self, config: EngineConfig) -> Result<(), RegistryError> {
        config.validate()?;
        *self.config.write() = config;

        #[cfg(feature = "observability")]
        debug!("Registry reconfigured");
        Ok(())
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    /// The configured destinations.
    pub fn services(&self) -> &ServicesConfig {
        &self.services
    }

    /// The channel the registry publishes server-side messages from.
    pub fn server_channel(&self) -> Option<Arc<Channel>> {
        self.server_channel.read().clone()
    }

    /// Returns the channel `client_id` if it is live or recoverable,
    /// otherwise creates a channel under a freshly minted id.
    ///
    /// A new channel is registered, recorded with the clustering
    /// collaborator and gets its idle timer armed.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotStarted`] if the registry is not started.
    /// - [`RegistryError::ChannelCreation`] if every candidate id was taken.
    #[cfg_attr(feature = "observability", instrument(skip(self, context), fields(factory = context.factory().name())))]
    pub async fn create_or_get_channel(
        &self,
        context: &RequestContext,
        client_id: Option<&ChannelId>,
    ) -> Result<Arc<Channel>, RegistryError> {
        if let Some(id) = client_id {
            if let Some(channel) = self.lookup_channel(context, id).await {
                return Ok(channel);
            }
        }
        if !self.is_started() {
            return Err(RegistryError::NotStarted);
        }
        self.register_factory(context.factory());

        let mut attempts = 0;
        let channel = loop {
            if attempts >= MAX_CHANNEL_CREATION_ATTEMPTS {
                #[cfg(feature = "observability")]
                warn!(attempts, "Could not find an unused channel id");
                return Err(RegistryError::ChannelCreation { attempts });
            }
            attempts += 1;

            let id = (self.id_generator)();
            let channel = self.build_channel(id.clone(), context);
            match self.channels.entry(id) {
                Entry::Occupied(_) => channel.destroy(),
                Entry::Vacant(vacant) => {
                    vacant.insert(RegistryEntry {
                        channel: Arc::clone(&channel),
                        timer: TimerSlot::new(),
                    });
                    break channel;
                }
            }
        };

        if let Some(cluster) = &self.cluster {
            if let Err(_e) = cluster
                .add_channel_id(channel.id(), channel.factory_name())
                .await
            {
                #[cfg(feature = "observability")]
                warn!(channel_id = %channel.id(), error = %_e, "Could not record channel in distributed state");
            }
        }
        self.touch(channel.id());

        #[cfg(feature = "observability")]
        debug!(channel_id = %channel.id(), "Channel created");
        Ok(channel)
    }

    /// Returns the live channel `id`, without rehydration.
    pub fn channel(&self, id: &ChannelId) -> Option<Arc<Channel>> {
        self.channels.get(id).map(|entry| Arc::clone(&entry.channel))
    }

    /// Returns the channel `id`.
    ///
    /// On a local miss the channel is rebuilt from the clustering
    /// collaborator, if it knows the id: the channel is recreated with the
    /// recorded factory and its recorded subscriptions are replayed.
    /// Failures along that path are logged and yield `None`.
    pub fn lookup_channel<'a>(
        &'a self,
        context: &'a RequestContext,
        id: &'a ChannelId,
    ) -> BoxFuture<'a, Option<Arc<Channel>>> {
        Box::pin(async move {
            if let Some(channel) = self.channel(id) {
                return Some(channel);
            }
            self.rehydrate(context, id).await
        })
    }

    async fn rehydrate(&self, context: &RequestContext, id: &ChannelId) -> Option<Arc<Channel>> {
        let cluster = self.cluster.as_ref()?;
        if !self.is_started() {
            return None;
        }

        let factory_name = match cluster.channel_factory_name(id).await {
            Ok(Some(name)) => name,
            Ok(None) => return None,
            Err(_e) => {
                #[cfg(feature = "observability")]
                warn!(channel_id = %id, error = %_e, "Could not read channel from distributed state");
                return None;
            }
        };
        let factory = if context.factory().name() == factory_name {
            Some(Arc::clone(context.factory()))
        } else {
            self.factories.read().get(&factory_name).cloned()
        };
        let Some(factory) = factory else {
            #[cfg(feature = "observability")]
            warn!(channel_id = %id, factory = %factory_name, "No channel factory registered under recorded name");
            return None;
        };

        let mut rehydrated = RequestContext::new(factory);
        if let Some(session_id) = context.session_id() {
            rehydrated = rehydrated.with_session_id(session_id);
        }
        if let Some(client_type) = context.client_type() {
            rehydrated = rehydrated.with_client_type(client_type);
        }

        let channel = self.build_channel(id.clone(), &rehydrated);
        let inserted = match self.channels.entry(id.clone()) {
            Entry::Occupied(occupied) => Err(Arc::clone(&occupied.get().channel)),
            Entry::Vacant(vacant) => {
                vacant.insert(RegistryEntry {
                    channel: Arc::clone(&channel),
                    timer: TimerSlot::new(),
                });
                Ok(())
            }
        };
        if let Err(existing) = inserted {
            channel.destroy();
            return Some(existing);
        }

        #[cfg(feature = "observability")]
        debug!(channel_id = %id, "Channel rehydrated from distributed state");

        let records = match cluster.subscriptions(id).await {
            Ok(records) => records,
            Err(_e) => {
                #[cfg(feature = "observability")]
                warn!(channel_id = %id, error = %_e, "Could not read subscriptions from distributed state");
                Vec::new()
            }
        };
        for subscribe in records {
            let _reply = self.handle_subscribe(&rehydrated, subscribe, false).await;
            #[cfg(feature = "observability")]
            if let Some(fault) = _reply.fault() {
                warn!(channel_id = %id, fault = %fault, "Could not replay subscription");
            }
        }
        self.touch(id);
        Some(channel)
    }

    /// Removes the channel `id`.
    ///
    /// The idle timer is cancelled, the clustering record dropped, and one
    /// unsubscribe per live subscription is dispatched before the channel
    /// is destroyed and unregistered. Returns the channel only to the
    /// caller that actually removed it.
    pub fn remove_channel<'a>(&'a self, id: &'a ChannelId) -> BoxFuture<'a, Option<Arc<Channel>>> {
        Box::pin(async move {
            let entry = self.channels.get(id).map(|entry| entry.clone())?;
            if !entry.channel.claim_removal() {
                return None;
            }
            entry.timer.close();

            if let Some(cluster) = &self.cluster {
                if let Err(_e) = cluster.remove_channel_id(id).await {
                    #[cfg(feature = "observability")]
                    warn!(channel_id = %id, error = %_e, "Could not remove channel from distributed state");
                }
            }

            let channel = entry.channel;
            let context = self.context_for(&channel);
            for subscription in channel.subscriptions() {
                let reply = self
                    .dispatch_inner(&context, subscription.unsubscribe_message(), true)
                    .await;
                if let Some(_fault) = reply.as_ref().and_then(Message::fault) {
                    #[cfg(feature = "observability")]
                    warn!(
                        channel_id = %id,
                        subscription_id = subscription.id(),
                        fault = %_fault,
                        "Error while unsubscribing removed channel"
                    );
                }
            }

            channel.destroy();
            self.channels.remove(id);

            #[cfg(feature = "observability")]
            debug!(channel_id = %id, "Channel removed");
            Some(channel)
        })
    }

    /// Re-arms the idle timer of `id`.
    ///
    /// Returns false if no live channel is registered under `id`. A channel
    /// removed concurrently is left alone.
    pub fn touch(&self, id: &ChannelId) -> bool {
        let Some(timer) = self.channels.get(id).map(|entry| Arc::clone(&entry.timer)) else {
            return false;
        };
        let timeout = self.config.read().channel_idle_timeout;
        self.evictor.arm(&timer, id, timeout);
        true
    }

    /// Dispatches one inbound message and returns the reply.
    ///
    /// `None` is only returned for a successful connect: the transport
    /// binding then attaches its delivery context and waits. Every other
    /// outcome, including failures, is a reply message.
    pub async fn dispatch(&self, context: &RequestContext, message: Message) -> Option<Message> {
        self.dispatch_inner(context, message, false).await
    }

    /// Publishes `message` from the server channel.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotStarted`] if the registry is not started.
    pub async fn publish_message(&self, message: Message) -> Result<Message, RegistryError> {
        let server = self.server_channel().ok_or(RegistryError::NotStarted)?;
        Ok(self.publish_from(&server, message).await)
    }

    /// Publishes `message` on behalf of `channel` and returns the reply.
    pub async fn publish_from(&self, channel: &Arc<Channel>, message: Message) -> Message {
        let context = self.context_for(channel);
        self.handle_publish(&context, message, Some(channel)).await
    }

    /// Number of registered client channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Ids of the registered client channels.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Current counters.
    pub fn stats(&self) -> RegistryStats {
        let scheduler = self.scheduler.stats();
        RegistryStats {
            channels: self.channels.len(),
            queued_tasks: scheduler.queued,
            active_workers: scheduler.active,
            workers: scheduler.workers,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_idle_timer_armed(&self, id: &ChannelId) -> bool {
        self.channels
            .get(id)
            .is_some_and(|entry| entry.timer.is_armed())
    }

    fn build_channel(&self, id: ChannelId, context: &RequestContext) -> Arc<Channel> {
        let transport = context.factory().new_transport(&id);
        Channel::builder(id, context.factory().name(), transport)
            .session_id(context.session_id().map(str::to_string))
            .client_type(context.client_type().map(str::to_string))
            .scheduler(Arc::clone(&self.scheduler))
            .config(Arc::clone(&self.config))
            .registry(self.self_ref.clone())
            .build()
    }

    fn register_factory(&self, factory: &Arc<dyn ChannelFactory>) {
        if self.factories.read().contains_key(factory.name()) {
            return;
        }
        self.factories
            .write()
            .entry(factory.name().to_string())
            .or_insert_with(|| Arc::clone(factory));
    }

    /// The context dispatch runs under for work a channel triggers itself.
    fn context_for(&self, channel: &Channel) -> RequestContext {
        let factory = self
            .factories
            .read()
            .get(channel.factory_name())
            .cloned()
            .unwrap_or_else(|| Arc::new(ServerChannelFactory) as Arc<dyn ChannelFactory>);
        let mut context = RequestContext::new(factory);
        if let Some(session_id) = channel.session_id() {
            context = context.with_session_id(session_id);
        }
        if let Some(client_type) = channel.client_type() {
            context = context.with_client_type(client_type);
        }
        context
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("started", &self.is_started())
            .field("channels", &self.channels.len())
            .field("evictor", &self.evictor)
            .finish()
    }
}

/// Builder for [`Registry`].
///
/// Everything is optional. Without an adapter factory every destination is
/// served by a [`SimpleServiceAdapter`](crate::adapter::SimpleServiceAdapter).
#[derive(Default)]
pub struct RegistryBuilder {
    config: EngineConfig,
    services: ServicesConfig,
    adapters: Option<Arc<dyn AdapterFactory>>,
    security: Option<Arc<dyn SecurityService>>,
    cluster: Option<Arc<dyn DistributedState>>,
    interceptor: Option<Arc<dyn MessageInterceptor>>,
    factories: Vec<Arc<dyn ChannelFactory>>,
    id_generator: Option<ChannelIdGenerator>,
}

impl RegistryBuilder {
    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the configured destinations.
    pub fn with_services(mut self, services: ServicesConfig) -> Self {
        self.services = services;
        self
    }

    /// Sets the adapter factory.
    pub fn with_adapter_factory(mut self, adapters: Arc<dyn AdapterFactory>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Sets the security service.
    pub fn with_security_service(mut self, security: Arc<dyn SecurityService>) -> Self {
        self.security = Some(security);
        self
    }

    /// Sets the clustering collaborator.
    pub fn with_distributed_state(mut self, cluster: Arc<dyn DistributedState>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Sets the dispatch interceptor.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn MessageInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Registers a channel factory for rehydration.
    ///
    /// Factories of incoming requests are registered automatically; this is
    /// needed for channels first created on another registry.
    pub fn with_channel_factory(mut self, factory: Arc<dyn ChannelFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Replaces the channel id generator.
    pub fn with_channel_id_generator(mut self, generator: ChannelIdGenerator) -> Self {
        self.id_generator = Some(generator);
        self
    }

    /// Builds the registry. It still has to be started.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<Arc<Registry>, RegistryError> {
        self.config.validate()?;

        let mut factories: HashMap<String, Arc<dyn ChannelFactory>> = HashMap::new();
        factories.insert(
            ServerChannelFactory::NAME.to_string(),
            Arc::new(ServerChannelFactory),
        );
        for factory in self.factories {
            factories.insert(factory.name().to_string(), factory);
        }

        Ok(Arc::new_cyclic(|weak: &Weak<Registry>| Registry {
            channels: DashMap::new(),
            factories: RwLock::new(factories),
            services: self.services,
            adapters: self
                .adapters
                .unwrap_or_else(|| Arc::new(DefaultAdapterFactory::new()) as Arc<dyn AdapterFactory>),
            security: self.security,
            cluster: self.cluster,
            interceptor: self.interceptor,
            config: Arc::new(RwLock::new(self.config)),
            scheduler: Arc::new(TaskScheduler::new()),
            evictor: IdleEvictor::new(weak.clone()),
            id_generator: self
                .id_generator
                .unwrap_or_else(|| Arc::new(ChannelId::generate) as ChannelIdGenerator),
            server_channel: RwLock::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            self_ref: weak.clone(),
        }))
    }
}
