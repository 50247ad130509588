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

//! Channel subscriptions.

use super::ChannelId;
use crate::message::{CommandOperation, Message, headers};

/// Separator between sub-topic segments.
pub const SUBTOPIC_SEPARATOR: char = '.';

/// A channel's registered interest in a destination.
///
/// A subscription is identified by its subscription id, which is unique
/// within the owning channel. It may narrow what it receives with a
/// sub-topic pattern and a selector expression, and may ask not to receive
/// messages published by its own channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: String,
    channel_id: ChannelId,
    destination: String,
    sub_topic: Option<String>,
    selector: Option<String>,
    no_local: bool,
}

impl Subscription {
    /// Creates a subscription with no sub-topic, no selector and no-local off.
    pub fn new(
        id: impl Into<String>,
        channel_id: ChannelId,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id,
            destination: destination.into(),
            sub_topic: None,
            selector: None,
            no_local: false,
        }
    }

    /// Builds a subscription from a subscribe command.
    ///
    /// Sub-topic, selector and no-local are read from the command headers.
    pub fn from_command(id: impl Into<String>, channel_id: ChannelId, command: &Message) -> Self {
        Self {
            id: id.into(),
            channel_id,
            destination: command.destination.clone().unwrap_or_default(),
            sub_topic: command.subtopic().map(str::to_string),
            selector: command.selector().map(str::to_string),
            no_local: command.no_local(),
        }
    }

    /// Narrows the subscription to a sub-topic pattern.
    #[must_use]
    pub fn with_sub_topic(mut self, sub_topic: impl Into<String>) -> Self {
        self.sub_topic = Some(sub_topic.into());
        self
    }

    /// Attaches a selector expression.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Sets the no-local flag.
    #[must_use]
    pub fn with_no_local(mut self, no_local: bool) -> Self {
        self.no_local = no_local;
        self
    }

    /// The subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning channel's id.
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// The destination id.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The sub-topic pattern, if any.
    pub fn sub_topic(&self) -> Option<&str> {
        self.sub_topic.as_deref()
    }

    /// The selector expression, if any.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Whether the subscriber ignores its own publications.
    pub fn no_local(&self) -> bool {
        self.no_local
    }

    /// Returns true if a message published to `sub_topic` reaches this
    /// subscription.
    ///
    /// A subscription without a pattern receives everything published to
    /// its destination. A pattern only matches messages that carry a
    /// sub-topic: `*` matches exactly one segment, a trailing `**` matches
    /// any number of remaining segments.
    pub fn accepts_sub_topic(&self, sub_topic: Option<&str>) -> bool {
        match (&self.sub_topic, sub_topic) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(pattern), Some(topic)) => sub_topic_matches(pattern, topic),
        }
    }

    /// Returns true if a message from `sender` reaches this subscription.
    pub fn accepts(&self, sender: Option<&ChannelId>, sub_topic: Option<&str>) -> bool {
        if self.no_local && sender == Some(&self.channel_id) {
            return false;
        }
        self.accepts_sub_topic(sub_topic)
    }

    /// Builds the unsubscribe command that withdraws this subscription.
    ///
    /// Used when the owning channel is removed so adapters observe one
    /// unsubscribe per live subscription.
    pub fn unsubscribe_message(&self) -> Message {
        let mut message = Message::command(CommandOperation::Unsubscribe)
            .with_client_id(self.channel_id.clone())
            .with_destination(self.destination.clone())
            .with_header(headers::SUBSCRIPTION_ID, self.id.clone());
        if let Some(sub_topic) = &self.sub_topic {
            message.set_header(headers::SUBTOPIC, sub_topic.clone());
        }
        message
    }
}

/// Matches a dotted sub-topic against a pattern.
///
/// # Examples
///
/// ```rust
/// use courier::channel::sub_topic_matches;
///
/// assert!(sub_topic_matches("sports.*", "sports.tennis"));
/// assert!(!sub_topic_matches("sports.*", "sports.tennis.wimbledon"));
/// assert!(sub_topic_matches("sports.**", "sports.tennis.wimbledon"));
/// assert!(sub_topic_matches("sports.tennis", "sports.tennis"));
/// ```
pub fn sub_topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_parts = pattern.split(SUBTOPIC_SEPARATOR);
    let mut topic_parts = topic.split(SUBTOPIC_SEPARATOR);
    loop {
        match (pattern_parts.next(), topic_parts.next()) {
            (Some("**"), _) => return pattern_parts.next().is_none(),
            (Some("*"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_topic_exact() {
        assert!(sub_topic_matches("a.b", "a.b"));
        assert!(!sub_topic_matches("a.b", "a.c"));
        assert!(!sub_topic_matches("a.b", "a"));
        assert!(!sub_topic_matches("a", "a.b"));
    }

    #[test]
    fn test_sub_topic_wildcards() {
        assert!(sub_topic_matches("*", "a"));
        assert!(!sub_topic_matches("*", "a.b"));
        assert!(sub_topic_matches("a.*.c", "a.x.c"));
        assert!(sub_topic_matches("**", "a.b.c"));
        assert!(sub_topic_matches("a.**", "a"));
        assert!(!sub_topic_matches("a.**.c", "a.b.c"));
    }

    #[test]
    fn test_accepts_no_local() {
        let owner = ChannelId::from("owner");
        let subscription = Subscription::new("s1", owner.clone(), "news").with_no_local(true);
        assert!(!subscription.accepts(Some(&owner), None));
        assert!(subscription.accepts(Some(&ChannelId::from("other")), None));
        assert!(subscription.accepts(None, None));
    }

    #[test]
    fn test_pattern_requires_sub_topic() {
        let subscription =
            Subscription::new("s1", ChannelId::from("c"), "news").with_sub_topic("sports.*");
        assert!(!subscription.accepts_sub_topic(None));
        assert!(subscription.accepts_sub_topic(Some("sports.golf")));

        let everything = Subscription::new("s2", ChannelId::from("c"), "news");
        assert!(everything.accepts_sub_topic(None));
        assert!(everything.accepts_sub_topic(Some("anything")));
    }

    #[test]
    fn test_from_command_reads_headers() {
        let command = Message::command(CommandOperation::Subscribe)
            .with_destination("news")
            .with_header(headers::SUBTOPIC, "a.*")
            .with_header(headers::SELECTOR, "priority > 2")
            .with_header(headers::NO_LOCAL, true);
        let subscription = Subscription::from_command("s9", ChannelId::from("c"), &command);
        assert_eq!(subscription.destination(), "news");
        assert_eq!(subscription.sub_topic(), Some("a.*"));
        assert_eq!(subscription.selector(), Some("priority > 2"));
        assert!(subscription.no_local());
    }

    #[test]
    fn test_unsubscribe_message() {
        let subscription =
            Subscription::new("s1", ChannelId::from("c"), "news").with_sub_topic("x");
        let message = subscription.unsubscribe_message();
        assert_eq!(message.operation(), Some(CommandOperation::Unsubscribe));
        assert_eq!(message.subscription_id(), Some("s1"));
        assert_eq!(message.subtopic(), Some("x"));
        assert_eq!(message.client_id, Some(ChannelId::from("c")));
        assert_eq!(message.destination.as_deref(), Some("news"));
    }
}
