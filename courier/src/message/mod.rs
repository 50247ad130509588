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

//! Protocol message envelopes.
//!
//! Every unit exchanged with a client is a [`Message`]. Its [`MessageKind`]
//! distinguishes ordinary published messages from connection-management
//! commands and from the acknowledgement and error replies the engine
//! produces.

mod fault;

pub use fault::{Fault, codes};

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Well-known message header names.
pub mod headers {
    /// Sub-topic a message is published to or a subscription narrows to.
    pub const SUBTOPIC: &str = "DSSubtopic";
    /// Selector expression attached to a subscription.
    pub const SELECTOR: &str = "DSSelector";
    /// Client-assigned subscription id.
    pub const SUBSCRIPTION_ID: &str = "DSDstClientId";
    /// When true, a subscriber does not receive its own publications.
    pub const NO_LOCAL: &str = "DSNoLocal";
    /// Character set of login credentials.
    pub const CREDENTIALS_CHARSET: &str = "DSCredentialsCharset";
    /// Session identifier stamped on replies.
    pub const SESSION_ID: &str = "DSSessionId";
}

/// Keys of the reconnection advice carried in a ping acknowledgement body.
pub mod advice {
    /// Milliseconds a client waits before reconnecting.
    pub const RECONNECT_INTERVAL_MS: &str = "reconnect-interval-ms";
    /// Number of reconnection attempts before a client gives up.
    pub const RECONNECT_MAX_ATTEMPTS: &str = "reconnect-max-attempts";
}

/// Connection-management command operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandOperation {
    /// Register interest in a destination.
    Subscribe,
    /// Withdraw interest in a destination.
    Unsubscribe,
    /// Create or refresh a channel.
    Ping,
    /// Attach a transport to an existing channel.
    Connect,
    /// Tear down a channel.
    Disconnect,
    /// Authenticate.
    Login,
    /// Drop authentication.
    Logout,
}

impl CommandOperation {
    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ping => "PING",
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
        }
    }
}

impl fmt::Display for CommandOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a message is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// An ordinary message published to a destination.
    Async,
    /// A connection-management command.
    Command {
        /// The requested operation.
        operation: CommandOperation,
    },
    /// A successful reply.
    Acknowledge,
    /// A failed reply.
    Error {
        /// What went wrong.
        fault: Fault,
    },
}

impl MessageKind {
    /// A short name for the kind, used in fault texts and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Async => "async",
            Self::Command { .. } => "command",
            Self::Acknowledge => "acknowledge",
            Self::Error { .. } => "error",
        }
    }
}

/// A protocol message envelope.
///
/// # Example
///
/// ```rust
/// use courier::message::{Message, CommandOperation, headers};
/// use serde_json::json;
///
/// let publish = Message::publish("news", json!({"headline": "hello"}))
///     .with_header(headers::SUBTOPIC, "sports.football");
/// assert_eq!(publish.subtopic(), Some("sports.football"));
///
/// let ping = Message::command(CommandOperation::Ping);
/// let ack = Message::acknowledge(&ping);
/// assert_eq!(ack.correlation_id, ping.message_id);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// What the message is.
    #[serde(flatten)]
    pub kind: MessageKind,
    /// Unique message id. Filled in on publication when missing.
    #[serde(default)]
    pub message_id: Option<String>,
    /// For replies and deliveries, the id of the message being answered.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// The channel the message comes from or is addressed to.
    #[serde(default)]
    pub client_id: Option<ChannelId>,
    /// The destination id.
    #[serde(default)]
    pub destination: Option<String>,
    /// Free-form headers.
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    /// Message payload.
    #[serde(default)]
    pub body: Value,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
}

impl Message {
    fn with_kind(kind: MessageKind) -> Self {
        Self {
            kind,
            message_id: Some(new_message_id()),
            correlation_id: None,
            client_id: None,
            destination: None,
            headers: BTreeMap::new(),
            body: Value::Null,
            timestamp: now_millis(),
        }
    }

    /// Creates an ordinary message for `destination`.
    pub fn publish(destination: impl Into<String>, body: Value) -> Self {
        let mut message = Self::with_kind(MessageKind::Async);
        message.destination = Some(destination.into());
        message.body = body;
        message
    }

    /// Creates a command message.
    pub fn command(operation: CommandOperation) -> Self {
        Self::with_kind(MessageKind::Command { operation })
    }

    /// Creates an acknowledgement replying to `request`.
    ///
    /// The reply is correlated to the request and addressed to the same
    /// client and destination. Request headers are not copied.
    pub fn acknowledge(request: &Message) -> Self {
        Self::reply(MessageKind::Acknowledge, request)
    }

    /// Creates an acknowledgement carrying a copy of the request headers.
    pub fn acknowledge_with_headers(request: &Message) -> Self {
        let mut reply = Self::acknowledge(request);
        reply.headers = request.headers.clone();
        reply
    }

    /// Creates an error reply to `request`.
    pub fn error(request: &Message, fault: Fault) -> Self {
        Self::reply(MessageKind::Error { fault }, request)
    }

    fn reply(kind: MessageKind, request: &Message) -> Self {
        let mut reply = Self::with_kind(kind);
        reply.correlation_id = request.message_id.clone();
        reply.client_id = request.client_id.clone();
        reply.destination = request.destination.clone();
        reply
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<ChannelId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Sets a header in place.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Removes a header.
    pub fn remove_header(&mut self, name: &str) -> Option<Value> {
        self.headers.remove(name)
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// Returns a header value if it is a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(Value::as_str)
    }

    /// The command operation, if this is a command.
    #[must_use]
    pub fn operation(&self) -> Option<CommandOperation> {
        match &self.kind {
            MessageKind::Command { operation } => Some(*operation),
            _ => None,
        }
    }

    /// Returns true if this is a command.
    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self.kind, MessageKind::Command { .. })
    }

    /// Returns true if this is an error reply.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error { .. })
    }

    /// The fault carried by an error reply.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match &self.kind {
            MessageKind::Error { fault } => Some(fault),
            _ => None,
        }
    }

    /// The subscription id header.
    #[must_use]
    pub fn subscription_id(&self) -> Option<&str> {
        self.header_str(headers::SUBSCRIPTION_ID)
    }

    /// The sub-topic header.
    #[must_use]
    pub fn subtopic(&self) -> Option<&str> {
        self.header_str(headers::SUBTOPIC)
    }

    /// The selector header.
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        self.header_str(headers::SELECTOR)
    }

    /// The session id header.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.header_str(headers::SESSION_ID)
    }

    /// The no-local flag. Accepts a boolean or the string `"true"`.
    #[must_use]
    pub fn no_local(&self) -> bool {
        match self.header(headers::NO_LOCAL) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Mints a new message id.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string().to_uppercase()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
