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

//! Authentication and authorization hooks.
//!
//! Security rejections never escape dispatch as errors: they become error
//! replies carrying one of the `Server.Security.*` fault codes.

use crate::channel::ChannelId;
use crate::context::RequestContext;
use crate::destination::Destination;
use crate::message::{Fault, Message, codes};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Why a security check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// The caller is not authenticated.
    #[error("not logged in")]
    NotLoggedIn,

    /// The supplied credentials were rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The caller may not perform the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The caller's session expired.
    #[error("session expired")]
    SessionExpired,

    /// The security service failed.
    #[error("security service failure: {0}")]
    Other(String),
}

impl SecurityError {
    /// The fault code reported to the client.
    #[must_use]
    pub fn fault_code(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => codes::NOT_LOGGED_IN,
            Self::InvalidCredentials => codes::INVALID_CREDENTIALS,
            Self::AccessDenied(_) => codes::ACCESS_DENIED,
            Self::SessionExpired => codes::SESSION_EXPIRED,
            Self::Other(_) => codes::PROCESSING,
        }
    }
}

impl From<SecurityError> for Fault {
    fn from(error: SecurityError) -> Self {
        Fault::new(error.fault_code(), error.to_string())
    }
}

/// The operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecuredOperation {
    /// A subscribe command.
    Subscribe,
    /// A publication.
    Publish,
}

/// Everything a security check may look at.
#[derive(Debug, Clone, Copy)]
pub struct InvocationContext<'a> {
    /// The request being dispatched.
    pub request: &'a RequestContext,
    /// The command or published message.
    pub message: &'a Message,
    /// The resolved destination.
    pub destination: &'a Destination,
    /// The channel acting, when known.
    pub channel_id: Option<&'a ChannelId>,
    /// What is being attempted.
    pub operation: SecuredOperation,
}

/// The authentication collaborator.
///
/// `authorize` is consulted before the adapter runs for every subscribe and
/// publish on a secured destination.
#[async_trait]
pub trait SecurityService: Send + Sync {
    /// Returns false if this service does not handle requests like this one,
    /// in which case security operations are acknowledged without effect.
    fn accepts_context(&self, _request: &RequestContext) -> bool {
        true
    }

    /// Authenticates with the credentials carried in a login command body.
    async fn login(
        &self,
        request: &RequestContext,
        credentials: &Value,
        charset: Option<&str>,
    ) -> Result<(), SecurityError>;

    /// Drops the authentication of the request's session.
    async fn logout(&self, request: &RequestContext) -> Result<(), SecurityError>;

    /// Decides whether the invocation may proceed.
    async fn authorize(&self, invocation: &InvocationContext<'_>) -> Result<(), SecurityError>;
}

/// Fine-grained per-destination checks run before [`SecurityService::authorize`].
pub trait DestinationSecurizer: Send + Sync {
    /// Decides whether the invocation may subscribe.
    fn can_subscribe(&self, invocation: &InvocationContext<'_>) -> Result<(), SecurityError>;

    /// Decides whether the invocation may publish.
    fn can_publish(&self, invocation: &InvocationContext<'_>) -> Result<(), SecurityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_codes_are_stable() {
        assert_eq!(SecurityError::NotLoggedIn.fault_code(), "Server.Security.NotLoggedIn");
        assert_eq!(
            SecurityError::InvalidCredentials.fault_code(),
            "Server.Security.InvalidCredentials"
        );
        assert_eq!(
            SecurityError::AccessDenied("x".into()).fault_code(),
            "Server.Security.AccessDenied"
        );
        assert_eq!(SecurityError::SessionExpired.fault_code(), "Server.Security.SessionExpired");
    }

    #[test]
    fn test_into_fault() {
        let fault: Fault = SecurityError::AccessDenied("admins only".into()).into();
        assert_eq!(fault.code, codes::ACCESS_DENIED);
        assert_eq!(fault.string, "access denied: admins only");
        assert!(fault.is_security());
    }
}
