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

//! Process-local distributed state.

use super::{ClusterError, DistributedState};
use crate::channel::ChannelId;
use crate::message::Message;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default, Clone)]
struct DestinationRecord {
    selector: Option<String>,
    client_id: Option<ChannelId>,
    subscription_id: Option<String>,
}

/// A [`DistributedState`] kept in memory.
///
/// Several registries in one process can share an instance through an
/// `Arc`, which is how failover between registries is exercised in tests.
///
/// # Example
///
/// ```rust
/// use courier::channel::ChannelId;
/// use courier::clustering::{DistributedState, InMemoryDistributedState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let state = InMemoryDistributedState::new();
/// let id = ChannelId::from("c1");
/// state.add_channel_id(&id, "long-poll").await.unwrap();
/// assert_eq!(state.channel_factory_name(&id).await.unwrap().as_deref(), Some("long-poll"));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDistributedState {
    channels: DashMap<ChannelId, String>,
    subscriptions: DashMap<ChannelId, Vec<Message>>,
    destinations: DashMap<String, DestinationRecord>,
}

impl InMemoryDistributedState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session selector of a destination.
    pub fn set_destination_selector(&self, destination: &str, selector: impl Into<String>) {
        self.destinations
            .entry(destination.to_string())
            .or_default()
            .selector = Some(selector.into());
    }

    /// The last channel that subscribed to `destination`.
    pub fn destination_client_id(&self, destination: &str) -> Option<ChannelId> {
        self.destinations.get(destination)?.client_id.clone()
    }

    /// The last subscription id used on `destination`.
    pub fn destination_subscription_id(&self, destination: &str) -> Option<String> {
        self.destinations.get(destination)?.subscription_id.clone()
    }

    /// Number of recorded channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl DistributedState for InMemoryDistributedState {
    async fn add_channel_id(
        &self,
        channel_id: &ChannelId,
        factory_name: &str,
    ) -> Result<(), ClusterError> {
        self.channels
            .insert(channel_id.clone(), factory_name.to_string());
        Ok(())
    }

    async fn channel_factory_name(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<String>, ClusterError> {
        Ok(self.channels.get(channel_id).map(|name| name.clone()))
    }

    async fn remove_channel_id(&self, channel_id: &ChannelId) -> Result<(), ClusterError> {
        self.channels.remove(channel_id);
        self.subscriptions.remove(channel_id);
        Ok(())
    }

    async fn add_subscription(
        &self,
        channel_id: &ChannelId,
        subscribe: &Message,
    ) -> Result<(), ClusterError> {
        let Some(subscription_id) = subscribe.subscription_id() else {
            return Err(ClusterError::InvalidRecord(
                "subscribe command without subscription id".to_string(),
            ));
        };
        let mut records = self.subscriptions.entry(channel_id.clone()).or_default();
        records.retain(|record| record.subscription_id() != Some(subscription_id));
        records.push(subscribe.clone());
        Ok(())
    }

    async fn remove_subscription(
        &self,
        channel_id: &ChannelId,
        subscription_id: &str,
    ) -> Result<(), ClusterError> {
        if let Some(mut records) = self.subscriptions.get_mut(channel_id) {
            records.retain(|record| record.subscription_id() != Some(subscription_id));
        }
        Ok(())
    }

    async fn subscriptions(&self, channel_id: &ChannelId) -> Result<Vec<Message>, ClusterError> {
        Ok(self
            .subscriptions
            .get(channel_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn destination_selector(&self, destination: &str) -> Result<Option<String>, ClusterError> {
        Ok(self
            .destinations
            .get(destination)
            .and_then(|record| record.selector.clone()))
    }

    async fn set_destination_client_id(
        &self,
        destination: &str,
        client_id: &ChannelId,
    ) -> Result<(), ClusterError> {
        self.destinations
            .entry(destination.to_string())
            .or_default()
            .client_id = Some(client_id.clone());
        Ok(())
    }

    async fn set_destination_subscription_id(
        &self,
        destination: &str,
        subscription_id: &str,
    ) -> Result<(), ClusterError> {
        self.destinations
            .entry(destination.to_string())
            .or_default()
            .subscription_id = Some(subscription_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommandOperation, headers};

    fn subscribe(id: &str) -> Message {
        Message::command(CommandOperation::Subscribe)
            .with_destination("news")
            .with_header(headers::SUBSCRIPTION_ID, id)
    }

    #[tokio::test]
    async fn test_subscription_records_replace_by_id() {
        let state = InMemoryDistributedState::new();
        let id = ChannelId::from("c1");
        state.add_subscription(&id, &subscribe("a")).await.unwrap();
        state.add_subscription(&id, &subscribe("b")).await.unwrap();
        state
            .add_subscription(&id, &subscribe("a").with_header(headers::SUBTOPIC, "x"))
            .await
            .unwrap();

        let records = state.subscriptions(&id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subscription_id(), Some("b"));
        assert_eq!(records[1].subtopic(), Some("x"));

        state.remove_subscription(&id, "b").await.unwrap();
        assert_eq!(state.subscriptions(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_without_id_is_rejected() {
        let state = InMemoryDistributedState::new();
        let command = Message::command(CommandOperation::Subscribe).with_destination("news");
        let error = state
            .add_subscription(&ChannelId::from("c1"), &command)
            .await
            .unwrap_err();
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn test_remove_channel_forgets_subscriptions() {
        let state = InMemoryDistributedState::new();
        let id = ChannelId::from("c1");
        state.add_channel_id(&id, "streaming").await.unwrap();
        state.add_subscription(&id, &subscribe("a")).await.unwrap();
        state.remove_channel_id(&id).await.unwrap();

        assert!(state.channel_factory_name(&id).await.unwrap().is_none());
        assert!(state.subscriptions(&id).await.unwrap().is_empty());
        assert_eq!(state.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_destination_records() {
        let state = InMemoryDistributedState::new();
        assert!(state.destination_selector("news").await.unwrap().is_none());
        state.set_destination_selector("news", "region = 'EU'");
        state
            .set_destination_client_id("news", &ChannelId::from("c1"))
            .await
            .unwrap();
        state
            .set_destination_subscription_id("news", "s1")
            .await
            .unwrap();

        assert_eq!(
            state.destination_selector("news").await.unwrap().as_deref(),
            Some("region = 'EU'")
        );
        assert_eq!(state.destination_client_id("news"), Some(ChannelId::from("c1")));
        assert_eq!(state.destination_subscription_id("news").as_deref(), Some("s1"));
    }
}
