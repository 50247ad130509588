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

//! The adapter trait.

use crate::channel::Channel;
use crate::message::{Fault, Message};
use async_trait::async_trait;
use std::sync::Arc;

/// Serves subscribe, unsubscribe and publish for one or more destinations.
///
/// Rejections are returned as [`Fault`]s. The registry turns them into
/// error replies correlated to the request.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// The adapter id destinations refer to.
    fn id(&self) -> &str;

    /// Handles a subscribe or unsubscribe command from `channel`.
    ///
    /// The registry has already made sure subscribe commands carry a
    /// subscription id header.
    async fn manage(&self, channel: &Arc<Channel>, command: &Message) -> Result<Message, Fault>;

    /// Delivers a publication from `from`.
    async fn invoke(&self, from: &Arc<Channel>, message: &Message) -> Result<Message, Fault>;

    /// Releases adapter resources when the registry stops.
    async fn stop(&self) {}
}
