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

//! Adapter resolution.

use super::{ServiceAdapter, SimpleServiceAdapter};
use crate::destination::Destination;
use crate::message::Message;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves the adapter serving a destination.
pub trait AdapterFactory: Send + Sync {
    /// The adapter for `destination`, or `None` if none serves it.
    fn adapter_for(&self, destination: &Destination, message: &Message)
        -> Option<Arc<dyn ServiceAdapter>>;

    /// Every adapter this factory hands out. Stopped with the registry.
    fn adapters(&self) -> Vec<Arc<dyn ServiceAdapter>>;
}

/// Maps destinations to adapters by the adapter id they name.
///
/// Destinations that name no adapter get the default adapter, a
/// [`SimpleServiceAdapter`] unless replaced.
///
/// # Example
///
/// ```rust
/// use courier::adapter::{AdapterFactory, DefaultAdapterFactory};
/// use courier::destination::Destination;
/// use courier::message::Message;
/// use serde_json::json;
///
/// let factory = DefaultAdapterFactory::new();
/// let message = Message::publish("news", json!(null));
/// let adapter = factory.adapter_for(&Destination::new("news"), &message).unwrap();
/// assert_eq!(adapter.id(), "simple");
/// assert!(factory.adapter_for(&Destination::new("x").with_adapter("jms"), &message).is_none());
/// ```
pub struct DefaultAdapterFactory {
    default: Arc<dyn ServiceAdapter>,
    adapters: HashMap<String, Arc<dyn ServiceAdapter>>,
}

impl DefaultAdapterFactory {
    /// Creates a factory whose default adapter is a fresh
    /// [`SimpleServiceAdapter`].
    pub fn new() -> Self {
        Self::with_default(Arc::new(SimpleServiceAdapter::new()))
    }

    /// Creates a factory with the given default adapter.
    pub fn with_default(default: Arc<dyn ServiceAdapter>) -> Self {
        Self {
            default,
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter under its id.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ServiceAdapter>) -> Self {
        self.adapters.insert(adapter.id().to_string(), adapter);
        self
    }
}

impl Default for DefaultAdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFactory for DefaultAdapterFactory {
    fn adapter_for(
        &self,
        destination: &Destination,
        _message: &Message,
    ) -> Option<Arc<dyn ServiceAdapter>> {
        match destination.adapter() {
            None => Some(Arc::clone(&self.default)),
            Some(id) if id == self.default.id() => Some(Arc::clone(&self.default)),
            Some(id) => self.adapters.get(id).cloned(),
        }
    }

    fn adapters(&self) -> Vec<Arc<dyn ServiceAdapter>> {
        let mut adapters = vec![Arc::clone(&self.default)];
        adapters.extend(self.adapters.values().cloned());
        adapters
    }
}

impl std::fmt::Debug for DefaultAdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAdapterFactory")
            .field("default", &self.default.id())
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
