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

//! Structured protocol faults.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable fault codes carried by error replies.
pub mod codes {
    /// The command referenced a channel id with no live registration.
    pub const UNKNOWN_CLIENT: &str = "Server.Call.UnknownClient";
    /// The command referenced a destination that is not configured.
    pub const INVALID_DESTINATION: &str = "Server.Messaging.InvalidDestination";
    /// The command operation is not supported.
    pub const UNSUPPORTED_OPERATION: &str = "Server.Messaging.UnsupportedOperation";
    /// No adapter could be resolved for the destination.
    pub const NO_ADAPTER: &str = "Server.Messaging.NoAdapter";
    /// An adapter or collaborator failed while processing the command.
    pub const PROCESSING: &str = "Server.Processing";
    /// The caller is not authenticated.
    pub const NOT_LOGGED_IN: &str = "Server.Security.NotLoggedIn";
    /// The supplied credentials were rejected.
    pub const INVALID_CREDENTIALS: &str = "Server.Security.InvalidCredentials";
    /// The caller is authenticated but not allowed to perform the operation.
    pub const ACCESS_DENIED: &str = "Server.Security.AccessDenied";
    /// The caller's session expired.
    pub const SESSION_EXPIRED: &str = "Server.Security.SessionExpired";
}

/// A structured fault carried in an error reply.
///
/// Faults are protocol values, not Rust errors: dispatch never fails with
/// them, it returns them inside a reply message so one bad command in a
/// batch does not abort the others.
///
/// # Example
///
/// ```rust
/// use courier::message::{Fault, codes};
///
/// let fault = Fault::unknown_client();
/// assert_eq!(fault.code, codes::UNKNOWN_CLIENT);
/// assert!(fault.is_security() == false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Stable machine-readable code.
    pub code: String,
    /// Short human-readable description.
    pub string: String,
    /// Optional detail text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Fault {
    /// Creates a fault with the given code and description.
    pub fn new(code: impl Into<String>, string: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            detail: None,
        }
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The fault returned when a command names an unregistered channel.
    pub fn unknown_client() -> Self {
        Self::new(codes::UNKNOWN_CLIENT, "Unknown client")
    }

    /// The fault returned when a destination is not configured.
    pub fn invalid_destination(destination: &str, message_type: &str) -> Self {
        Self::new(
            codes::INVALID_DESTINATION,
            format!(
                "No configured destination for id: {} and message type: {}",
                destination, message_type
            ),
        )
    }

    /// The fault returned for unsupported command operations.
    pub fn unsupported_operation(operation: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_OPERATION,
            format!("Unsupported command operation: {}", operation),
        )
    }

    /// The fault returned when no adapter serves a destination.
    pub fn no_adapter(destination: &str) -> Self {
        Self::new(
            codes::NO_ADAPTER,
            format!("No adapter for destination: {}", destination),
        )
    }

    /// A generic processing failure.
    pub fn processing(string: impl Into<String>) -> Self {
        Self::new(codes::PROCESSING, string)
    }

    /// Returns true if this is a security fault.
    #[must_use]
    pub fn is_security(&self) -> bool {
        self.code.starts_with("Server.Security.")
    }

    /// Returns true if this fault reports an unknown client.
    #[must_use]
    pub fn is_unknown_client(&self) -> bool {
        self.code == codes::UNKNOWN_CLIENT
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.string)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
