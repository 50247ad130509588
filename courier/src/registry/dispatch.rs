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

//! Command dispatch.
//!
//! Every handler turns its outcome into a reply message. Unknown clients,
//! unknown destinations, missing adapters and security rejections are
//! answered with error replies and never reach an adapter.

use super::Registry;
use crate::channel::Channel;
use crate::context::RequestContext;
use crate::destination::Destination;
use crate::message::{
    CommandOperation, Fault, Message, MessageKind, advice, headers, new_message_id, now_millis,
};
use crate::security::{InvocationContext, SecuredOperation};
use serde_json::{Map, Value};
use std::sync::Arc;

#[cfg(feature = "observability")]
use tracing::{debug, instrument, warn};

impl Registry {
    #[cfg_attr(
        feature = "observability",
        instrument(skip_all, fields(kind = message.kind.name(), client_id = ?message.client_id))
    )]
    pub(super) async fn dispatch_inner(
        &self,
        context: &RequestContext,
        mut message: Message,
        skip_interceptor: bool,
    ) -> Option<Message> {
        let interceptor = if skip_interceptor {
            None
        } else {
            self.interceptor.as_ref()
        };
        if let Some(interceptor) = interceptor {
            interceptor.before(context, &mut message);
        }

        let mut reply = match message.operation() {
            Some(CommandOperation::Ping) => Some(self.handle_ping(context, &message).await),
            Some(CommandOperation::Connect) => self.handle_connect(context, &message).await,
            Some(CommandOperation::Disconnect) => {
                Some(self.handle_disconnect(context, &message).await)
            }
            Some(CommandOperation::Subscribe) => {
                Some(self.handle_subscribe(context, message.clone(), true).await)
            }
            Some(CommandOperation::Unsubscribe) => {
                Some(self.handle_unsubscribe(context, &message).await)
            }
            Some(CommandOperation::Login) => Some(self.handle_login(context, &message).await),
            Some(CommandOperation::Logout) => Some(self.handle_logout(context, &message).await),
            None => match message.kind {
                MessageKind::Async => Some(self.handle_publish(context, message.clone(), None).await),
                _ => Some(Message::error(
                    &message,
                    Fault::unsupported_operation(message.kind.name()),
                )),
            },
        };

        if let (Some(reply), Some(session_id)) = (reply.as_mut(), context.session_id()) {
            reply.set_header(headers::SESSION_ID, session_id);
        }

        #[cfg(feature = "observability")]
        if let Some(fault) = reply.as_ref().and_then(Message::fault) {
            debug!(fault = %fault, "Dispatch answered with an error reply");
        }

        if let Some(interceptor) = interceptor {
            interceptor.after(context, &message, reply.as_ref());
        }
        reply
    }

    async fn handle_ping(&self, context: &RequestContext, ping: &Message) -> Message {
        let channel = match self.create_or_get_channel(context, ping.client_id.as_ref()).await {
            Ok(channel) => channel,
            Err(e) => {
                #[cfg(feature = "observability")]
                warn!(error = %e, "Could not create channel");
                return Message::error(ping, Fault::processing(e.to_string()));
            }
        };

        let (interval, attempts) = {
            let config = self.config.read();
            (config.reconnect_interval, config.reconnect_max_attempts)
        };
        let mut body = Map::new();
        body.insert(
            advice::RECONNECT_INTERVAL_MS.to_string(),
            Value::from(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)),
        );
        body.insert(
            advice::RECONNECT_MAX_ATTEMPTS.to_string(),
            Value::from(attempts),
        );

        Message::acknowledge(ping)
            .with_client_id(channel.id().clone())
            .with_body(Value::Object(body))
    }

    async fn handle_connect(&self, context: &RequestContext, connect: &Message) -> Option<Message> {
        match self.lookup_sender(context, connect).await {
            Some(_) => None,
            None => Some(Message::error(connect, Fault::unknown_client())),
        }
    }

    async fn handle_disconnect(&self, context: &RequestContext, disconnect: &Message) -> Message {
        let Some(channel) = self.lookup_sender(context, disconnect).await else {
            return Message::error(disconnect, Fault::unknown_client());
        };
        self.remove_channel(channel.id()).await;
        Message::acknowledge(disconnect).with_client_id(channel.id().clone())
    }

    pub(super) async fn handle_subscribe(
        &self,
        context: &RequestContext,
        mut command: Message,
        persist: bool,
    ) -> Message {
        let destination = match self.resolve_destination(&command) {
            Ok(destination) => destination,
            Err(fault) => return Message::error(&command, fault),
        };
        if let Err(fault) = self
            .check_access(context, &command, destination, SecuredOperation::Subscribe)
            .await
        {
            return Message::error(&command, fault);
        }
        let Some(channel) = self.lookup_sender(context, &command).await else {
            return Message::error(&command, Fault::unknown_client());
        };

        let subscription_id = match command.subscription_id() {
            Some(id) => id.to_string(),
            None => {
                let id = new_message_id();
                command.set_header(headers::SUBSCRIPTION_ID, id.clone());
                id
            }
        };

        if destination.uses_session_selector() {
            if let Some(cluster) = &self.cluster {
                match cluster.destination_selector(destination.id()).await {
                    Ok(Some(selector)) => command.set_header(headers::SELECTOR, selector),
                    Ok(None) => {}
                    Err(_e) => {
                        #[cfg(feature = "observability")]
                        warn!(destination = destination.id(), error = %_e, "Could not read session selector");
                    }
                }
            }
        }

        let Some(adapter) = self.adapters.adapter_for(destination, &command) else {
            return Message::error(&command, Fault::no_adapter(destination.id()));
        };
        let mut reply = match adapter.manage(&channel, &command).await {
            Ok(reply) => reply,
            Err(fault) => Message::error(&command, fault),
        };
        annotate(&mut reply, &command, destination.id(), &channel);

        if reply.is_error() {
            return reply;
        }
        if let Some(cluster) = &self.cluster {
            if persist {
                if let Err(_e) = cluster.add_subscription(channel.id(), &command).await {
                    #[cfg(feature = "observability")]
                    warn!(channel_id = %channel.id(), error = %_e, "Could not record subscription in distributed state");
                }
            }
            if let Err(_e) = cluster
                .set_destination_client_id(destination.id(), channel.id())
                .await
            {
                #[cfg(feature = "observability")]
                warn!(destination = destination.id(), error = %_e, "Could not record destination client id");
            }
            if let Err(_e) = cluster
                .set_destination_subscription_id(destination.id(), &subscription_id)
                .await
            {
                #[cfg(feature = "observability")]
                warn!(destination = destination.id(), error = %_e, "Could not record destination subscription id");
            }
        }
        reply
    }

    async fn handle_unsubscribe(&self, context: &RequestContext, command: &Message) -> Message {
        let Some(channel) = self.lookup_sender(context, command).await else {
            return Message::error(command, Fault::unknown_client());
        };
        let destination = match self.resolve_destination(command) {
            Ok(destination) => destination,
            Err(fault) => return Message::error(command, fault),
        };
        let Some(adapter) = self.adapters.adapter_for(destination, command) else {
            return Message::error(command, Fault::no_adapter(destination.id()));
        };

        let mut reply = match adapter.manage(&channel, command).await {
            Ok(reply) => {
                if let (Some(cluster), Some(subscription_id)) =
                    (&self.cluster, command.subscription_id())
                {
                    if let Err(_e) = cluster
                        .remove_subscription(channel.id(), subscription_id)
                        .await
                    {
                        #[cfg(feature = "observability")]
                        warn!(channel_id = %channel.id(), error = %_e, "Could not remove subscription from distributed state");
                    }
                }
                reply
            }
            Err(fault) => Message::error(command, fault),
        };
        annotate(&mut reply, command, destination.id(), &channel);
        reply
    }

    pub(super) async fn handle_publish(
        &self,
        context: &RequestContext,
        mut message: Message,
        from: Option<&Arc<Channel>>,
    ) -> Message {
        let destination = match self.resolve_destination(&message) {
            Ok(destination) => destination,
            Err(fault) => return Message::error(&message, fault),
        };

        if message.message_id.is_none() {
            message.message_id = Some(new_message_id());
        }
        message.timestamp = now_millis();
        if let Some(channel) = from {
            message.client_id = Some(channel.id().clone());
        }

        if let Err(fault) = self
            .check_access(context, &message, destination, SecuredOperation::Publish)
            .await
        {
            return Message::error(&message, fault);
        }

        let from = match from {
            Some(channel) => Arc::clone(channel),
            None => match self.lookup_sender(context, &message).await {
                Some(channel) => channel,
                None => return Message::error(&message, Fault::unknown_client()),
            },
        };
        let Some(adapter) = self.adapters.adapter_for(destination, &message) else {
            return Message::error(&message, Fault::no_adapter(destination.id()));
        };

        let mut reply = match adapter.invoke(&from, &message).await {
            Ok(reply) => reply,
            Err(fault) => Message::error(&message, fault),
        };
        reply.destination = Some(destination.id().to_string());
        reply.client_id = Some(from.id().clone());
        reply
    }

    async fn handle_login(&self, context: &RequestContext, command: &Message) -> Message {
        let Some(security) = &self.security else {
            #[cfg(feature = "observability")]
            warn!("Login requested but no security service is configured");
            return Message::acknowledge(command);
        };
        if !security.accepts_context(context) {
            return Message::acknowledge(command);
        }

        let charset = command.header_str(headers::CREDENTIALS_CHARSET);
        match security.login(context, &command.body, charset).await {
            Ok(()) => Message::acknowledge(command).with_body(Value::from("success")),
            Err(e) => Message::error(command, e.into()),
        }
    }

    async fn handle_logout(&self, context: &RequestContext, command: &Message) -> Message {
        let Some(security) = &self.security else {
            #[cfg(feature = "observability")]
            warn!("Logout requested but no security service is configured");
            return Message::acknowledge(command);
        };
        if !security.accepts_context(context) {
            return Message::acknowledge(command);
        }

        match security.logout(context).await {
            Ok(()) => Message::acknowledge(command).with_body(Value::from("success")),
            Err(e) => Message::error(command, e.into()),
        }
    }

    async fn lookup_sender(&self, context: &RequestContext, message: &Message) -> Option<Arc<Channel>> {
        let id = message.client_id.as_ref()?;
        self.lookup_channel(context, id).await
    }

    fn resolve_destination(&self, message: &Message) -> Result<&Destination, Fault> {
        let id = message.destination.as_deref().unwrap_or_default();
        self.services
            .find(id)
            .ok_or_else(|| Fault::invalid_destination(id, message.kind.name()))
    }

    /// Runs the destination securizer, then the security service for
    /// secured destinations.
    async fn check_access(
        &self,
        context: &RequestContext,
        message: &Message,
        destination: &Destination,
        operation: SecuredOperation,
    ) -> Result<(), Fault> {
        let invocation = InvocationContext {
            request: context,
            message,
            destination,
            channel_id: message.client_id.as_ref(),
            operation,
        };

        if let Some(securizer) = destination.securizer() {
            let checked = match operation {
                SecuredOperation::Subscribe => securizer.can_subscribe(&invocation),
                SecuredOperation::Publish => securizer.can_publish(&invocation),
            };
            checked.map_err(Fault::from)?;
        }

        if destination.is_secured() {
            match &self.security {
                Some(security) if security.accepts_context(context) => {
                    security.authorize(&invocation).await.map_err(Fault::from)?;
                }
                _ => {
                    #[cfg(feature = "observability")]
                    debug!(destination = destination.id(), "Secured destination without applicable security service");
                }
            }
        }
        Ok(())
    }
}

/// Addresses an adapter reply to the requesting channel and carries the
/// request headers over.
fn annotate(reply: &mut Message, request: &Message, destination: &str, channel: &Channel) {
    reply.destination = Some(destination.to_string());
    reply.client_id = Some(channel.id().clone());
    for (name, value) in &request.headers {
        reply
            .headers
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
}
