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

//! Data update notifications.
//!
//! Applications that change persistent entities can collect the changes of
//! one unit of work in a [`DataUpdates`] set and broadcast them once through
//! a [`DataPublisher`], so every client watching the topic can refresh its
//! copies.

use crate::message::{Message, headers};
use crate::registry::{Registry, RegistryError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[cfg(feature = "observability")]
use tracing::debug;

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataUpdateKind {
    /// The entity was created.
    Persist,
    /// The entity was modified.
    Update,
    /// The entity was deleted.
    Remove,
}

impl DataUpdateKind {
    /// The wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Persist => "PERSIST",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
        }
    }
}

/// One entity change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataUpdate {
    /// The kind of change.
    pub kind: DataUpdateKind,
    /// The changed entity.
    pub entity: Value,
}

impl DataUpdate {
    /// Creates an update record.
    pub fn new(kind: DataUpdateKind, entity: Value) -> Self {
        Self { kind, entity }
    }

    fn to_value(&self) -> Value {
        json!({ "kind": self.kind.as_str(), "entity": self.entity })
    }
}

/// When a collected set of updates goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Only when the application publishes explicitly.
    Manual,
    /// When the unit of work completed successfully.
    #[default]
    OnSuccess,
    /// When the surrounding transaction committed.
    OnCommit,
}

/// The updates of one unit of work.
///
/// Duplicate records are collapsed. The set is handed out for publication
/// at most once, and only for the trigger matching its [`PublishMode`].
///
/// # Example
///
/// ```rust
/// use courier::data::{DataUpdateKind, DataUpdates, PublishMode};
/// use serde_json::json;
///
/// let mut updates = DataUpdates::new(PublishMode::OnCommit);
/// assert!(updates.add(DataUpdateKind::Update, json!({"id": 1})));
/// assert!(!updates.add(DataUpdateKind::Update, json!({"id": 1})));
///
/// assert!(updates.take_for(PublishMode::OnSuccess).is_none());
/// assert_eq!(updates.take_for(PublishMode::OnCommit).unwrap().len(), 1);
/// assert!(updates.take_for(PublishMode::OnCommit).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataUpdates {
    mode: PublishMode,
    updates: Vec<DataUpdate>,
    published: bool,
}

impl DataUpdates {
    /// Creates an empty set published on `mode`.
    pub fn new(mode: PublishMode) -> Self {
        Self {
            mode,
            updates: Vec::new(),
            published: false,
        }
    }

    /// The publish mode.
    pub fn mode(&self) -> PublishMode {
        self.mode
    }

    /// Records an update. Returns false if the same record was already
    /// collected or the set was already published.
    pub fn add(&mut self, kind: DataUpdateKind, entity: Value) -> bool {
        if self.published {
            return false;
        }
        let update = DataUpdate::new(kind, entity);
        if self.updates.contains(&update) {
            return false;
        }
        self.updates.push(update);
        true
    }

    /// Number of collected updates.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Returns true if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Returns true once the set was handed out.
    pub fn is_published(&self) -> bool {
        self.published
    }

    /// The collected updates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DataUpdate> {
        self.updates.iter()
    }

    /// Hands out the updates if `trigger` matches the publish mode, nothing
    /// was handed out yet, and there is something to hand out.
    pub fn take_for(&mut self, trigger: PublishMode) -> Option<Vec<DataUpdate>> {
        if self.published || trigger != self.mode || self.updates.is_empty() {
            return None;
        }
        self.published = true;
        Some(std::mem::take(&mut self.updates))
    }

    /// Discards collected updates without publishing them.
    pub fn clear(&mut self) {
        self.updates.clear();
    }
}

/// Broadcasts data updates to a topic through the registry's server channel.
#[derive(Debug, Clone)]
pub struct DataPublisher {
    registry: Arc<Registry>,
    topic: String,
    sub_topic: Option<String>,
}

impl DataPublisher {
    /// Creates a publisher for `topic`.
    pub fn new(registry: Arc<Registry>, topic: impl Into<String>) -> Self {
        Self {
            registry,
            topic: topic.into(),
            sub_topic: None,
        }
    }

    /// Publishes to a sub-topic of the topic.
    #[must_use]
    pub fn with_sub_topic(mut self, sub_topic: impl Into<String>) -> Self {
        self.sub_topic = Some(sub_topic.into());
        self
    }

    /// The destination updates are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publishes `updates` if `trigger` releases them.
    ///
    /// Returns the publication reply, or `None` if nothing was published.
    /// A reply may itself be an error reply, for instance when the topic is
    /// not configured.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotStarted`] if the registry is not running.
    pub async fn publish(
        &self,
        updates: &mut DataUpdates,
        trigger: PublishMode,
    ) -> Result<Option<Message>, RegistryError> {
        if !self.registry.is_started() {
            return Err(RegistryError::NotStarted);
        }
        let Some(batch) = updates.take_for(trigger) else {
            return Ok(None);
        };

        #[cfg(feature = "observability")]
        debug!(topic = %self.topic, count = batch.len(), "Publishing data updates");

        let body = Value::Array(batch.iter().map(DataUpdate::to_value).collect());
        let mut message = Message::publish(self.topic.clone(), body);
        if let Some(sub_topic) = &self.sub_topic {
            message.set_header(headers::SUBTOPIC, sub_topic.clone());
        }
        self.registry.publish_message(message).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_entity_different_kinds_are_kept() {
        let mut updates = DataUpdates::new(PublishMode::Manual);
        assert!(updates.add(DataUpdateKind::Persist, json!({"id": 1})));
        assert!(updates.add(DataUpdateKind::Update, json!({"id": 1})));
        assert!(updates.add(DataUpdateKind::Remove, json!({"id": 1})));
        assert_eq!(updates.len(), 3);
        let kinds: Vec<_> = updates.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![DataUpdateKind::Persist, DataUpdateKind::Update, DataUpdateKind::Remove]
        );
    }

    #[test]
    fn test_publish_once() {
        let mut updates = DataUpdates::new(PublishMode::OnSuccess);
        assert!(updates.take_for(PublishMode::OnSuccess).is_none());

        updates.add(DataUpdateKind::Persist, json!("a"));
        assert!(updates.take_for(PublishMode::Manual).is_none());
        assert!(!updates.is_published());

        let batch = updates.take_for(PublishMode::OnSuccess).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(updates.is_published());
        assert!(updates.is_empty());
        assert!(!updates.add(DataUpdateKind::Persist, json!("b")));
    }

    #[test]
    fn test_update_wire_shape() {
        let update = DataUpdate::new(DataUpdateKind::Remove, json!({"id": 7}));
        assert_eq!(
            update.to_value(),
            json!({"kind": "REMOVE", "entity": {"id": 7}})
        );
        assert_eq!(serde_json::to_value(update.kind).unwrap(), json!("REMOVE"));
    }
}
