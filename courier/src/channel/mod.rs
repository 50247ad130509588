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

//! Channels, their queues and their subscriptions.
//!
//! A [`Channel`] is the server-side state of one connected client. It is
//! identified by a [`ChannelId`], owns a [`QueuePair`] of outbound and
//! inbound messages and a set of [`Subscription`]s, and delegates the
//! actual writing of messages to its transport.

#[allow(clippy::module_inception)]
mod channel;
mod error;
mod id;
mod queue;
mod subscription;

#[cfg(test)]
mod tests;

pub use channel::{Channel, ChannelBuilder};
pub use error::ChannelError;
pub use id::ChannelId;
pub use queue::{MessageQueue, QueuePair};
pub use subscription::{SUBTOPIC_SEPARATOR, Subscription, sub_topic_matches};
