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

//! Hooks around message dispatch.

use crate::context::RequestContext;
use crate::message::Message;

/// Observes every dispatched message and its reply.
///
/// `before` runs before the command is interpreted and `after` runs once a
/// reply (or no reply) is known. Synthetic unsubscribes issued while a
/// channel is being removed bypass the interceptor.
pub trait MessageInterceptor: Send + Sync {
    /// Called before dispatch. May adjust the message.
    fn before(&self, context: &RequestContext, message: &mut Message);

    /// Called after dispatch with the reply, if any.
    fn after(&self, context: &RequestContext, message: &Message, reply: Option<&Message>);
}
