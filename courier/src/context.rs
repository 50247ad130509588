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

//! Per-request context passed to dispatch.

use crate::transport::ChannelFactory;
use std::sync::Arc;

/// What the transport binding knows about the request being dispatched.
///
/// The context is passed explicitly to every dispatch call. It names the
/// factory that builds transports for channels created by this request and
/// the session the request belongs to.
///
/// # Example
///
/// ```rust
/// use courier::context::RequestContext;
/// use courier::transport::LongPollChannelFactory;
/// use std::sync::Arc;
///
/// let context = RequestContext::new(Arc::new(LongPollChannelFactory::default()))
///     .with_session_id("session-1")
///     .with_client_type("js");
/// assert_eq!(context.session_id(), Some("session-1"));
/// ```
#[derive(Clone)]
pub struct RequestContext {
    factory: Arc<dyn ChannelFactory>,
    session_id: Option<String>,
    client_type: Option<String>,
}

impl RequestContext {
    /// Creates a context for requests arriving through `factory`'s transport.
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            factory,
            session_id: None,
            client_type: None,
        }
    }

    /// Sets the session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the client type tag.
    pub fn with_client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = Some(client_type.into());
        self
    }

    /// The channel factory.
    pub fn factory(&self) -> &Arc<dyn ChannelFactory> {
        &self.factory
    }

    /// The session id.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The client type tag.
    pub fn client_type(&self) -> Option<&str> {
        self.client_type.as_deref()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("factory", &self.factory.name())
            .field("session_id", &self.session_id)
            .field("client_type", &self.client_type)
            .finish()
    }
}
