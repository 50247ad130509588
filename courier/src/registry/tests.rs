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

//! Registry lifecycle and dispatch tests.

use super::*;
use crate::channel::ChannelId;
use crate::config::EngineConfig;
use crate::context::RequestContext;
use crate::destination::{Destination, ServicesConfig};
use crate::interceptor::MessageInterceptor;
use crate::message::{CommandOperation, Message, codes, headers};
use crate::security::{InvocationContext, SecurityError, SecurityService};
use crate::transport::LongPollChannelFactory;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn context() -> RequestContext {
    RequestContext::new(Arc::new(LongPollChannelFactory::default()))
}

async fn started(builder: RegistryBuilder) -> Arc<Registry> {
    let registry = builder.build().unwrap();
    registry.start().await.unwrap();
    registry
}

async fn ping(registry: &Registry, context: &RequestContext) -> ChannelId {
    registry
        .dispatch(context, Message::command(CommandOperation::Ping))
        .await
        .unwrap()
        .client_id
        .unwrap()
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_channel_creation_retries_taken_ids() {
    let candidates = Arc::new(Mutex::new(vec!["taken", "taken", "fresh"]));
    let generator: ChannelIdGenerator = {
        let candidates = Arc::clone(&candidates);
        Arc::new(move || {
            let mut candidates = candidates.lock();
            let next = if candidates.len() > 1 {
                candidates.remove(0)
            } else {
                candidates[0]
            };
            ChannelId::from(next)
        })
    };
    let registry = started(Registry::builder().with_channel_id_generator(generator)).await;
    let context = context();

    let first = registry.create_or_get_channel(&context, None).await.unwrap();
    assert_eq!(first.id().as_str(), "taken");
    let second = registry.create_or_get_channel(&context, None).await.unwrap();
    assert_eq!(second.id().as_str(), "fresh");
    assert_eq!(registry.channel_count(), 2);

    let error = registry
        .create_or_get_channel(&context, None)
        .await
        .unwrap_err();
    assert_eq!(
        error,
        RegistryError::ChannelCreation {
            attempts: MAX_CHANNEL_CREATION_ATTEMPTS
        }
    );
    assert_eq!(registry.channel_count(), 2);
}

#[tokio::test]
async fn test_create_or_get_returns_live_channel() {
    let registry = started(Registry::builder()).await;
    let context = context();
    let channel = registry.create_or_get_channel(&context, None).await.unwrap();
    let again = registry
        .create_or_get_channel(&context, Some(channel.id()))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&channel, &again));

    let unknown = ChannelId::from("never-seen");
    let minted = registry
        .create_or_get_channel(&context, Some(&unknown))
        .await
        .unwrap();
    assert_ne!(minted.id(), &unknown);
}

#[tokio::test]
async fn test_channel_creation_requires_start() {
    let registry = Registry::builder().build().unwrap();
    let error = registry
        .create_or_get_channel(&context(), None)
        .await
        .unwrap_err();
    assert!(error.is_not_started());
}

#[tokio::test]
async fn test_touch_and_remove_are_idempotent() {
    let registry = started(Registry::builder()).await;
    assert!(!registry.touch(&ChannelId::from("missing")));
    assert_eq!(registry.channel_count(), 0);

    let id = ping(&registry, &context()).await;
    assert!(registry.is_idle_timer_armed(&id));
    assert!(registry.touch(&id));

    let removed = registry.remove_channel(&id).await;
    assert!(removed.is_some_and(|channel| channel.is_destroyed()));
    assert!(registry.remove_channel(&id).await.is_none());
    assert!(!registry.touch(&id));
    assert_eq!(registry.channel_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_idle_channel_is_evicted() {
    let config = EngineConfig::default().with_channel_idle_timeout(Duration::from_secs(10));
    let registry = started(Registry::builder().with_config(config)).await;
    let id = ping(&registry, &context()).await;

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(registry.touch(&id));

    tokio::time::sleep(Duration::from_secs(6)).await;
    settle().await;
    assert!(registry.channel(&id).is_some(), "touch must supersede the first timer");

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    assert!(registry.channel(&id).is_none());
}

#[tokio::test]
async fn test_reconfigure_validates() {
    let registry = started(Registry::builder()).await;
    let invalid = EngineConfig::default().with_max_messages_queued_per_channel(0);
    let error = registry.reconfigure(invalid).unwrap_err();
    assert!(error.is_config_error());
    assert_eq!(registry.config().max_messages_queued_per_channel, 10_000);

    registry
        .reconfigure(EngineConfig::default().with_max_messages_queued_per_channel(5))
        .unwrap();
    assert_eq!(registry.config().max_messages_queued_per_channel, 5);
}

#[tokio::test]
async fn test_stop_removes_channels_and_restart_recovers() {
    let registry = started(Registry::builder()).await;
    let context = context();
    ping(&registry, &context).await;
    ping(&registry, &context).await;
    assert_eq!(registry.stats().channels, 2);

    registry.stop(false).await;
    assert!(!registry.is_started());
    assert_eq!(registry.channel_count(), 0);
    let error = registry
        .publish_message(Message::publish("news", json!(1)))
        .await
        .unwrap_err();
    assert_eq!(error, RegistryError::NotStarted);

    registry.restart().await.unwrap();
    assert!(registry.is_started());
    ping(&registry, &context).await;
    assert_eq!(registry.channel_count(), 1);
    registry.stop(true).await;
}

#[derive(Default)]
struct CountingInterceptor {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl MessageInterceptor for CountingInterceptor {
    fn before(&self, _context: &RequestContext, message: &mut Message) {
        self.before.fetch_add(1, Ordering::SeqCst);
        message.set_header("X-Intercepted", true);
    }

    fn after(&self, _context: &RequestContext, message: &Message, _reply: Option<&Message>) {
        assert_eq!(message.header("X-Intercepted"), Some(&Value::Bool(true)));
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_interceptor_is_skipped_for_synthetic_unsubscribes() {
    let interceptor = Arc::new(CountingInterceptor::default());
    let registry = started(
        Registry::builder()
            .with_services(ServicesConfig::new().with_destination(Destination::new("news")))
            .with_interceptor(Arc::clone(&interceptor) as Arc<dyn MessageInterceptor>),
    )
    .await;
    let context = context();

    let id = ping(&registry, &context).await;
    let subscribe = Message::command(CommandOperation::Subscribe)
        .with_client_id(id.clone())
        .with_destination("news");
    let reply = registry.dispatch(&context, subscribe).await.unwrap();
    assert!(!reply.is_error());
    assert_eq!(interceptor.before.load(Ordering::SeqCst), 2);

    registry.remove_channel(&id).await.unwrap();
    assert_eq!(interceptor.before.load(Ordering::SeqCst), 2);
    assert_eq!(interceptor.after.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_session_id_is_stamped_on_replies() {
    let registry = started(Registry::builder()).await;
    let context = context().with_session_id("session-9");
    let reply = registry
        .dispatch(&context, Message::command(CommandOperation::Ping))
        .await
        .unwrap();
    assert_eq!(reply.session_id(), Some("session-9"));
    assert_eq!(
        registry.channel(reply.client_id.as_ref().unwrap()).unwrap().session_id(),
        Some("session-9")
    );
}

#[tokio::test]
async fn test_reply_kinds_are_rejected_as_unsupported() {
    let registry = started(Registry::builder()).await;
    let request = Message::command(CommandOperation::Ping);
    let stray_ack = Message::acknowledge(&request);
    let reply = registry.dispatch(&context(), stray_ack).await.unwrap();
    assert_eq!(reply.fault().unwrap().code, codes::UNSUPPORTED_OPERATION);
}

#[tokio::test]
async fn test_connect_replies_only_for_unknown_clients() {
    let registry = started(Registry::builder()).await;
    let context = context();
    let id = ping(&registry, &context).await;

    let connect = Message::command(CommandOperation::Connect).with_client_id(id);
    assert!(registry.dispatch(&context, connect).await.is_none());

    let stranger = Message::command(CommandOperation::Connect).with_client_id("nobody");
    let reply = registry.dispatch(&context, stranger).await.unwrap();
    assert!(reply.fault().unwrap().is_unknown_client());
}

struct PasswordService {
    logged_in: Mutex<bool>,
}

#[async_trait]
impl SecurityService for PasswordService {
    async fn login(
        &self,
        _request: &RequestContext,
        credentials: &Value,
        charset: Option<&str>,
    ) -> Result<(), SecurityError> {
        assert_eq!(charset, Some("UTF-8"));
        if credentials == &json!({"user": "admin", "password": "secret"}) {
            *self.logged_in.lock() = true;
            Ok(())
        } else {
            Err(SecurityError::InvalidCredentials)
        }
    }

    async fn logout(&self, _request: &RequestContext) -> Result<(), SecurityError> {
        let mut logged_in = self.logged_in.lock();
        if !*logged_in {
            return Err(SecurityError::NotLoggedIn);
        }
        *logged_in = false;
        Ok(())
    }

    async fn authorize(&self, _invocation: &InvocationContext<'_>) -> Result<(), SecurityError> {
        if *self.logged_in.lock() {
            Ok(())
        } else {
            Err(SecurityError::NotLoggedIn)
        }
    }
}

#[tokio::test]
async fn test_login_and_logout() {
    let registry = started(Registry::builder().with_security_service(Arc::new(PasswordService {
        logged_in: Mutex::new(false),
    })))
    .await;
    let context = context();
    let login = |credentials: Value| {
        Message::command(CommandOperation::Login)
            .with_header(headers::CREDENTIALS_CHARSET, "UTF-8")
            .with_body(credentials)
    };

    let reply = registry
        .dispatch(&context, login(json!({"user": "admin", "password": "wrong"})))
        .await
        .unwrap();
    assert_eq!(reply.fault().unwrap().code, codes::INVALID_CREDENTIALS);

    let reply = registry
        .dispatch(&context, login(json!({"user": "admin", "password": "secret"})))
        .await
        .unwrap();
    assert!(!reply.is_error());
    assert_eq!(reply.body, json!("success"));

    let logout = Message::command(CommandOperation::Logout);
    let reply = registry.dispatch(&context, logout.clone()).await.unwrap();
    assert!(!reply.is_error());
    let reply = registry.dispatch(&context, logout).await.unwrap();
    assert_eq!(reply.fault().unwrap().code, codes::NOT_LOGGED_IN);
}

#[tokio::test]
async fn test_login_without_security_service_is_acknowledged() {
    let registry = started(Registry::builder()).await;
    let reply = registry
        .dispatch(&context(), Message::command(CommandOperation::Login))
        .await
        .unwrap();
    assert!(!reply.is_error());
}
