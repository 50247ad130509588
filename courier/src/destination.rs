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

//! Configured messaging destinations.

use crate::security::DestinationSecurizer;
use std::collections::HashMap;
use std::sync::Arc;

/// Destination property enabling session selectors.
///
/// When set to `"true"`, a subscribe command's selector is replaced by the
/// selector the clustering collaborator holds for the destination.
pub const SESSION_SELECTOR_PROPERTY: &str = "session-selector";

/// A configured named endpoint messages are published to or subscribed from.
///
/// # Example
///
/// ```rust
/// use courier::destination::{Destination, ServicesConfig};
///
/// let services = ServicesConfig::new()
///     .with_destination(Destination::new("news"))
///     .with_destination(Destination::new("orders").secured(true).with_adapter("orders-adapter"));
///
/// assert!(services.find("news").is_some());
/// assert!(services.find("orders").unwrap().is_secured());
/// assert!(services.find("weather").is_none());
/// ```
#[derive(Clone)]
pub struct Destination {
    id: String,
    adapter: Option<String>,
    secured: bool,
    properties: HashMap<String, String>,
    securizer: Option<Arc<dyn DestinationSecurizer>>,
}

impl Destination {
    /// Creates an unsecured destination served by the default adapter.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            adapter: None,
            secured: false,
            properties: HashMap::new(),
            securizer: None,
        }
    }

    /// Marks the destination as secured.
    pub fn secured(mut self, secured: bool) -> Self {
        self.secured = secured;
        self
    }

    /// Names the adapter serving this destination.
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Sets a property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Attaches a per-destination securizer.
    pub fn with_securizer(mut self, securizer: Arc<dyn DestinationSecurizer>) -> Self {
        self.securizer = Some(securizer);
        self
    }

    /// The destination id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The adapter id, if one was named.
    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    /// Whether operations on this destination are authorized.
    pub fn is_secured(&self) -> bool {
        self.secured
    }

    /// A property value.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// The securizer, if any.
    pub fn securizer(&self) -> Option<&Arc<dyn DestinationSecurizer>> {
        self.securizer.as_ref()
    }

    /// Returns true if subscribe selectors come from the clustering
    /// collaborator.
    pub fn uses_session_selector(&self) -> bool {
        self.property(SESSION_SELECTOR_PROPERTY)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("id", &self.id)
            .field("adapter", &self.adapter)
            .field("secured", &self.secured)
            .field("properties", &self.properties)
            .field("securizer", &self.securizer.is_some())
            .finish()
    }
}

/// The set of configured destinations.
#[derive(Debug, Clone, Default)]
pub struct ServicesConfig {
    destinations: HashMap<String, Destination>,
}

impl ServicesConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a destination, replacing one with the same id.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.add_destination(destination);
        self
    }

    /// Adds a destination in place, returning the one it replaced.
    pub fn add_destination(&mut self, destination: Destination) -> Option<Destination> {
        self.destinations.insert(destination.id.clone(), destination)
    }

    /// Looks up a destination by id.
    pub fn find(&self, id: &str) -> Option<&Destination> {
        self.destinations.get(id)
    }

    /// All configured destinations.
    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.values()
    }
}
