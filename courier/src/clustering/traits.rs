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

//! The distributed state trait.

use super::ClusterError;
use crate::channel::ChannelId;
use crate::message::Message;
use async_trait::async_trait;

/// Channel and subscription records shared between registries.
///
/// Subscriptions are stored as the subscribe commands that created them so
/// they can be replayed verbatim on rehydration.
#[async_trait]
pub trait DistributedState: Send + Sync {
    /// Records that `channel_id` exists and was built by `factory_name`.
    async fn add_channel_id(&self, channel_id: &ChannelId, factory_name: &str)
        -> Result<(), ClusterError>;

    /// The factory that built `channel_id`, if the channel is recorded.
    async fn channel_factory_name(&self, channel_id: &ChannelId)
        -> Result<Option<String>, ClusterError>;

    /// Forgets a channel and its subscriptions.
    async fn remove_channel_id(&self, channel_id: &ChannelId) -> Result<(), ClusterError>;

    /// Records a subscribe command of `channel_id`. A command with the same
    /// subscription id replaces the earlier one.
    async fn add_subscription(&self, channel_id: &ChannelId, subscribe: &Message)
        -> Result<(), ClusterError>;

    /// Forgets one subscription of `channel_id`.
    async fn remove_subscription(&self, channel_id: &ChannelId, subscription_id: &str)
        -> Result<(), ClusterError>;

    /// The recorded subscribe commands of `channel_id`, oldest first.
    async fn subscriptions(&self, channel_id: &ChannelId) -> Result<Vec<Message>, ClusterError>;

    /// The session selector held for `destination`.
    async fn destination_selector(&self, destination: &str) -> Result<Option<String>, ClusterError>;

    /// Records the last channel that subscribed to `destination`.
    async fn set_destination_client_id(&self, destination: &str, client_id: &ChannelId)
        -> Result<(), ClusterError>;

    /// Records the last subscription id used on `destination`.
    async fn set_destination_subscription_id(&self, destination: &str, subscription_id: &str)
        -> Result<(), ClusterError>;
}
