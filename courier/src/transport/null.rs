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

//! A transport that never delivers.

use super::{ChannelFactory, ChannelTransport, DeliveryContext};
use crate::channel::ChannelId;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Transport of channels with no client behind them.
///
/// Used by the registry's own server channel, which only ever publishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

#[async_trait]
impl ChannelTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn has_delivery_context(&self) -> bool {
        false
    }

    async fn acquire_delivery_context(&self) -> Option<Box<dyn DeliveryContext>> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory of [`NullTransport`] channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerChannelFactory;

impl ServerChannelFactory {
    /// The name this factory registers under.
    pub const NAME: &'static str = "server";
}

impl ChannelFactory for ServerChannelFactory {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn new_transport(&self, _id: &ChannelId) -> Arc<dyn ChannelTransport> {
        Arc::new(NullTransport)
    }
}
