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

//! In-memory topic fan-out.

use super::ServiceAdapter;
use crate::channel::{Channel, ChannelId, Subscription};
use crate::message::{CommandOperation, Fault, Message, headers};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

#[cfg(feature = "observability")]
use tracing::{debug, warn};

/// Delivers every publication to the channels subscribed to its
/// destination, inside this process.
///
/// Subscriptions live on the channels themselves. The adapter only keeps a
/// weak index of which channels subscribed to which destination. A
/// publication is enqueued once per matching subscription, tagged with the
/// subscription id. Recipients whose outbound queue is full are skipped.
///
/// # Example
///
/// ```rust
/// use courier::adapter::{ServiceAdapter, SimpleServiceAdapter};
/// use courier::channel::{Channel, ChannelId};
/// use courier::message::{CommandOperation, Message, headers};
/// use courier::transport::NullTransport;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let adapter = SimpleServiceAdapter::new();
/// let alice = Channel::builder(ChannelId::from("alice"), "server", Arc::new(NullTransport)).build();
/// let bob = Channel::builder(ChannelId::from("bob"), "server", Arc::new(NullTransport)).build();
///
/// let subscribe = Message::command(CommandOperation::Subscribe)
///     .with_destination("news")
///     .with_header(headers::SUBSCRIPTION_ID, "s1");
/// adapter.manage(&alice, &subscribe).await.unwrap();
///
/// adapter.invoke(&bob, &Message::publish("news", json!("hello"))).await.unwrap();
/// assert_eq!(alice.outbound_len(), 1);
/// # }
/// ```
pub struct SimpleServiceAdapter {
    id: String,
    topics: DashMap<String, HashMap<ChannelId, Weak<Channel>>>,
}

impl SimpleServiceAdapter {
    /// The id of the default simple adapter.
    pub const DEFAULT_ID: &'static str = "simple";

    /// Creates an adapter with the default id.
    pub fn new() -> Self {
        Self::with_id(Self::DEFAULT_ID)
    }

    /// Creates an adapter with a custom id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topics: DashMap::new(),
        }
    }

    /// Number of channels subscribed to `destination`.
    pub fn subscriber_count(&self, destination: &str) -> usize {
        self.topics
            .get(destination)
            .map_or(0, |subscribers| subscribers.len())
    }

    fn subscribe(&self, channel: &Arc<Channel>, command: &Message) -> Result<Message, Fault> {
        let (Some(destination), Some(subscription_id)) =
            (command.destination.as_deref(), command.subscription_id())
        else {
            return Err(Fault::processing("Subscribe command without destination or subscription id"));
        };

        let subscription = Subscription::from_command(subscription_id, channel.id().clone(), command);
        if !channel.add_subscription(subscription) {
            #[cfg(feature = "observability")]
            debug!(channel_id = %channel.id(), subscription_id, "Subscription already exists");
        }
        self.topics
            .entry(destination.to_string())
            .or_default()
            .insert(channel.id().clone(), Arc::downgrade(channel));

        Ok(Message::acknowledge(command))
    }

    fn unsubscribe(&self, channel: &Arc<Channel>, command: &Message) -> Result<Message, Fault> {
        let Some(destination) = command.destination.as_deref() else {
            return Err(Fault::processing("Unsubscribe command without destination"));
        };

        if let Some(subscription_id) = command.subscription_id() {
            channel.remove_subscription(subscription_id);
        }
        let still_subscribed = channel
            .subscriptions()
            .iter()
            .any(|subscription| subscription.destination() == destination);
        if !still_subscribed {
            self.topics.remove_if_mut(destination, |_, subscribers| {
                subscribers.remove(channel.id());
                subscribers.is_empty()
            });
        }

        Ok(Message::acknowledge(command))
    }

    fn recipients(&self, destination: &str) -> Vec<Arc<Channel>> {
        let Some(mut subscribers) = self.topics.get_mut(destination) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(subscribers.len());
        subscribers.retain(|_, channel| match channel.upgrade() {
            Some(channel) if !channel.is_destroyed() => {
                live.push(channel);
                true
            }
            _ => false,
        });
        live
    }
}

impl Default for SimpleServiceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceAdapter for SimpleServiceAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn manage(&self, channel: &Arc<Channel>, command: &Message) -> Result<Message, Fault> {
        match command.operation() {
            Some(CommandOperation::Subscribe) => self.subscribe(channel, command),
            Some(CommandOperation::Unsubscribe) => self.unsubscribe(channel, command),
            Some(other) => Err(Fault::unsupported_operation(other.as_str())),
            None => Err(Fault::unsupported_operation(command.kind.name())),
        }
    }

    async fn invoke(&self, from: &Arc<Channel>, message: &Message) -> Result<Message, Fault> {
        let Some(destination) = message.destination.as_deref() else {
            return Err(Fault::processing("Publication without destination"));
        };

        let sender = message.client_id.as_ref().unwrap_or(from.id());
        let sub_topic = message.subtopic();
        #[cfg_attr(not(feature = "observability"), allow(unused_variables, unused_assignments))]
        let mut delivered = 0usize;

        for recipient in self.recipients(destination) {
            for subscription in recipient.subscriptions() {
                if subscription.destination() != destination
                    || !subscription.accepts(Some(sender), sub_topic)
                {
                    continue;
                }
                let mut copy = message.clone();
                copy.set_header(headers::SUBSCRIPTION_ID, subscription.id());
                match recipient.enqueue_outbound(copy) {
                    Ok(()) => delivered += 1,
                    Err(_e) => {
                        #[cfg(feature = "observability")]
                        warn!(
                            channel_id = %recipient.id(),
                            subscription_id = subscription.id(),
                            error = %_e,
                            "Could not deliver publication, skipping subscriber"
                        );
                    }
                }
            }
        }

        #[cfg(feature = "observability")]
        debug!(destination, delivered, "Publication fanned out");

        Ok(Message::acknowledge(message))
    }

    async fn stop(&self) {
        self.topics.clear();
    }
}

impl std::fmt::Debug for SimpleServiceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleServiceAdapter")
            .field("id", &self.id)
            .field("topics", &self.topics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::transport::NullTransport;
    use parking_lot::RwLock;
    use serde_json::json;

    fn channel(id: &str) -> Arc<Channel> {
        Channel::builder(ChannelId::from(id), "server", Arc::new(NullTransport)).build()
    }

    fn subscribe(destination: &str, subscription_id: &str) -> Message {
        Message::command(CommandOperation::Subscribe)
            .with_destination(destination)
            .with_header(headers::SUBSCRIPTION_ID, subscription_id)
    }

    #[tokio::test]
    async fn test_fan_out_tags_subscription_id() {
        let adapter = SimpleServiceAdapter::new();
        let alice = channel("alice");
        let bob = channel("bob");
        adapter.manage(&alice, &subscribe("news", "a1")).await.unwrap();
        adapter.manage(&bob, &subscribe("news", "b1")).await.unwrap();
        assert_eq!(adapter.subscriber_count("news"), 2);

        let publisher = channel("carol");
        let reply = adapter
            .invoke(&publisher, &Message::publish("news", json!(1)))
            .await
            .unwrap();
        assert!(!reply.is_error());
        assert_eq!(alice.outbound_len(), 1);
        assert_eq!(bob.outbound_len(), 1);
    }

    #[tokio::test]
    async fn test_sub_topic_filtering() {
        let adapter = SimpleServiceAdapter::new();
        let sports = channel("sports");
        let all = channel("all");
        adapter
            .manage(&sports, &subscribe("news", "s").with_header(headers::SUBTOPIC, "sports.*"))
            .await
            .unwrap();
        adapter.manage(&all, &subscribe("news", "a")).await.unwrap();

        let publisher = channel("p");
        let weather = Message::publish("news", json!(1)).with_header(headers::SUBTOPIC, "weather");
        adapter.invoke(&publisher, &weather).await.unwrap();
        let tennis =
            Message::publish("news", json!(2)).with_header(headers::SUBTOPIC, "sports.tennis");
        adapter.invoke(&publisher, &tennis).await.unwrap();

        assert_eq!(sports.outbound_len(), 1);
        assert_eq!(all.outbound_len(), 2);
    }

    #[tokio::test]
    async fn test_no_local_skips_sender() {
        let adapter = SimpleServiceAdapter::new();
        let alice = channel("alice");
        adapter
            .manage(&alice, &subscribe("chat", "a").with_header(headers::NO_LOCAL, true))
            .await
            .unwrap();

        adapter
            .invoke(&alice, &Message::publish("chat", json!("me")))
            .await
            .unwrap();
        assert_eq!(alice.outbound_len(), 0);

        let bob = channel("bob");
        adapter
            .invoke(&bob, &Message::publish("chat", json!("you")))
            .await
            .unwrap();
        assert_eq!(alice.outbound_len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_index_entry() {
        let adapter = SimpleServiceAdapter::new();
        let alice = channel("alice");
        adapter.manage(&alice, &subscribe("news", "a1")).await.unwrap();
        adapter.manage(&alice, &subscribe("news", "a2")).await.unwrap();
        assert_eq!(alice.subscription_count(), 2);

        let unsubscribe = alice.subscription("a1").unwrap().unsubscribe_message();
        adapter.manage(&alice, &unsubscribe).await.unwrap();
        assert_eq!(adapter.subscriber_count("news"), 1);

        let unsubscribe = alice.subscription("a2").unwrap().unsubscribe_message();
        adapter.manage(&alice, &unsubscribe).await.unwrap();
        assert_eq!(adapter.subscriber_count("news"), 0);
        assert_eq!(alice.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_full_recipient_is_skipped() {
        let config = Arc::new(RwLock::new(
            EngineConfig::default().with_max_messages_queued_per_channel(1),
        ));
        let adapter = SimpleServiceAdapter::new();
        let full = Channel::builder(ChannelId::from("full"), "server", Arc::new(NullTransport))
            .config(Arc::clone(&config))
            .build();
        let other = channel("other");
        adapter.manage(&full, &subscribe("news", "f")).await.unwrap();
        adapter.manage(&other, &subscribe("news", "o")).await.unwrap();

        let publisher = channel("p");
        for n in 0..3 {
            let reply = adapter
                .invoke(&publisher, &Message::publish("news", json!(n)))
                .await
                .unwrap();
            assert!(!reply.is_error());
        }
        assert_eq!(full.outbound_len(), 1);
        assert_eq!(other.outbound_len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_operation() {
        let adapter = SimpleServiceAdapter::new();
        let alice = channel("alice");
        let fault = adapter
            .manage(&alice, &Message::command(CommandOperation::Ping))
            .await
            .unwrap_err();
        assert_eq!(fault.code, crate::message::codes::UNSUPPORTED_OPERATION);
    }
}
