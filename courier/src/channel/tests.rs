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

//! Cross-cutting tests for the channel layer.

use super::*;
use crate::config::{EngineConfig, PoolConfig};
use crate::message::Message;
use crate::scheduler::{Direction, SchedulerError, TaskScheduler};
use crate::transport::{ChannelTransport, DeliveryContext, NullTransport, TransportError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// A context whose writes always fail. Runs `during_write` first.
struct FailingContext {
    correlation: Option<String>,
    during_write: Option<Box<dyn FnMut() + Send>>,
}

#[async_trait]
impl DeliveryContext for FailingContext {
    fn is_usable(&self) -> bool {
        true
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation.as_deref()
    }

    async fn write_batch(&mut self, _batch: &[Message]) -> Result<(), TransportError> {
        if let Some(during_write) = self.during_write.as_mut() {
            during_write();
        }
        Err(TransportError::ConnectionLost {
            reason: "connection reset".to_string(),
            source: None,
        })
    }
}

/// A context recording every batch written to it.
#[derive(Clone, Default)]
struct RecordingContext {
    batches: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl RecordingContext {
    fn delivered(&self) -> Vec<Message> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl DeliveryContext for RecordingContext {
    fn is_usable(&self) -> bool {
        true
    }

    async fn write_batch(&mut self, batch: &[Message]) -> Result<(), TransportError> {
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }
}

struct UnusableContext;

#[async_trait]
impl DeliveryContext for UnusableContext {
    fn is_usable(&self) -> bool {
        false
    }

    async fn write_batch(&mut self, _batch: &[Message]) -> Result<(), TransportError> {
        panic!("unusable context must not be written");
    }
}

/// A transport that always offers a recording context.
#[derive(Default)]
struct AlwaysConnected {
    context: RecordingContext,
}

#[async_trait]
impl ChannelTransport for AlwaysConnected {
    fn name(&self) -> &str {
        "always-connected"
    }

    fn has_delivery_context(&self) -> bool {
        true
    }

    async fn acquire_delivery_context(&self) -> Option<Box<dyn DeliveryContext>> {
        Some(Box::new(self.context.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn channel_with(config: EngineConfig) -> Arc<Channel> {
    Channel::builder(ChannelId::from("c1"), "test", Arc::new(NullTransport))
        .config(Arc::new(RwLock::new(config)))
        .build()
}

fn numbered(n: usize) -> Vec<Message> {
    (0..n)
        .map(|i| Message::publish("news", json!(i)))
        .collect()
}

#[tokio::test]
async fn test_failed_drain_then_successful_drain_delivers_in_order() {
    let channel = channel_with(EngineConfig::default().with_retry_on_error(true));
    let messages = numbered(3);
    for message in &messages {
        channel.enqueue_outbound(message.clone()).unwrap();
    }

    let mut failing = FailingContext {
        correlation: Some("poll-1".to_string()),
        during_write: None,
    };
    assert!(channel.drain_outbound(&mut failing).await);
    assert_eq!(channel.outbound_len(), 3);
    assert_eq!(channel.dropped_count(), 0);

    let mut recording = RecordingContext::default();
    assert!(channel.drain_outbound(&mut recording).await);
    assert_eq!(channel.outbound_len(), 0);

    // Same messages, same order, and the failed attempt left no trace.
    assert_eq!(recording.delivered(), messages);
    assert_eq!(recording.batches.lock().len(), 1);
}

#[tokio::test]
async fn test_requeued_batch_goes_ahead_of_newer_messages() {
    let channel = channel_with(EngineConfig::default());
    let first = numbered(2);
    for message in &first {
        channel.enqueue_outbound(message.clone()).unwrap();
    }

    let late = Message::publish("news", json!("late"));
    let mut failing = FailingContext {
        correlation: None,
        during_write: Some(Box::new({
            let channel = Arc::clone(&channel);
            let late = late.clone();
            move || channel.enqueue_outbound(late.clone()).unwrap()
        })),
    };
    assert!(channel.drain_outbound(&mut failing).await);
    assert_eq!(channel.outbound_len(), 3);

    let mut recording = RecordingContext::default();
    channel.drain_outbound(&mut recording).await;
    let delivered = recording.delivered();
    assert_eq!(&delivered[..2], &first[..]);
    assert_eq!(delivered[2], late);
}

#[tokio::test]
async fn test_requeue_overflow_drops_whole_batch() {
    let channel = channel_with(EngineConfig::default().with_max_messages_queued_per_channel(4));
    for message in numbered(3) {
        channel.enqueue_outbound(message).unwrap();
    }

    let mut failing = FailingContext {
        correlation: None,
        during_write: Some(Box::new({
            let channel = Arc::clone(&channel);
            move || {
                channel
                    .enqueue_outbound(Message::publish("news", json!("a")))
                    .unwrap();
                channel
                    .enqueue_outbound(Message::publish("news", json!("b")))
                    .unwrap();
            }
        })),
    };
    assert!(channel.drain_outbound(&mut failing).await);

    // 3 retried + 2 new would exceed 4: the retried batch is gone entirely.
    assert_eq!(channel.outbound_len(), 2);
    assert_eq!(channel.dropped_count(), 3);

    let mut recording = RecordingContext::default();
    channel.drain_outbound(&mut recording).await;
    let bodies: Vec<_> = recording.delivered().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec![json!("a"), json!("b")]);
}

#[tokio::test]
async fn test_failed_drain_without_retry_drops_batch() {
    let channel = channel_with(EngineConfig::default().with_retry_on_error(false));
    for message in numbered(2) {
        channel.enqueue_outbound(message).unwrap();
    }
    let mut failing = FailingContext {
        correlation: None,
        during_write: None,
    };
    assert!(channel.drain_outbound(&mut failing).await);
    assert_eq!(channel.outbound_len(), 0);
    assert_eq!(channel.dropped_count(), 2);
}

#[tokio::test]
async fn test_drain_leaves_unusable_or_idle_context_alone() {
    let channel = channel_with(EngineConfig::default());
    let mut recording = RecordingContext::default();
    assert!(!channel.drain_outbound(&mut recording).await);
    assert!(recording.batches.lock().is_empty());

    channel
        .enqueue_outbound(Message::publish("news", json!(1)))
        .unwrap();
    assert!(!channel.drain_outbound(&mut UnusableContext).await);
    assert_eq!(channel.outbound_len(), 1);
}

#[tokio::test]
async fn test_drain_stamps_correlation_id() {
    let channel = channel_with(EngineConfig::default());
    channel
        .enqueue_outbound(Message::publish("news", json!(1)))
        .unwrap();

    struct Correlated(RecordingContext);

    #[async_trait]
    impl DeliveryContext for Correlated {
        fn is_usable(&self) -> bool {
            true
        }

        fn correlation_id(&self) -> Option<&str> {
            Some("poll-7")
        }

        async fn write_batch(&mut self, batch: &[Message]) -> Result<(), TransportError> {
            self.0.write_batch(batch).await
        }
    }

    let recording = RecordingContext::default();
    let mut context = Correlated(recording.clone());
    channel.drain_outbound(&mut context).await;
    assert_eq!(
        recording.delivered()[0].correlation_id.as_deref(),
        Some("poll-7")
    );
}

#[test]
fn test_outbound_capacity_is_enforced() {
    let channel = channel_with(EngineConfig::default().with_max_messages_queued_per_channel(2));
    for message in numbered(2) {
        channel.enqueue_outbound(message).unwrap();
    }
    let error = channel
        .enqueue_outbound(Message::publish("news", json!("overflow")))
        .unwrap_err();
    assert!(error.is_queue_full());
    assert_eq!(error.channel_id(), &ChannelId::from("c1"));
    assert_eq!(channel.outbound_len(), 2);
}

#[test]
fn test_inbound_requires_running_scheduler() {
    let channel = channel_with(EngineConfig::default());
    let error = channel
        .enqueue_inbound(Message::publish("news", json!(1)))
        .unwrap_err();
    assert!(matches!(
        error,
        ChannelError::Scheduler {
            source: SchedulerError::NotRunning,
            ..
        }
    ));
    assert_eq!(channel.inbound_len(), 1);
}

#[test]
fn test_destroy_is_idempotent_and_clears_subscriptions() {
    let channel = channel_with(EngineConfig::default());
    assert!(channel.add_subscription(Subscription::new("s1", channel.id().clone(), "news")));
    assert!(!channel.add_subscription(Subscription::new("s1", channel.id().clone(), "news")));
    assert_eq!(channel.subscription_count(), 1);

    channel.destroy();
    channel.destroy();
    assert!(channel.is_destroyed());
    assert_eq!(channel.subscription_count(), 0);
}

#[test]
fn test_channels_compare_by_id() {
    let a = Channel::builder(ChannelId::from("same"), "x", Arc::new(NullTransport)).build();
    let b = Channel::builder(ChannelId::from("same"), "y", Arc::new(NullTransport)).build();
    let c = Channel::builder(ChannelId::from("other"), "x", Arc::new(NullTransport)).build();
    assert_eq!(*a, *b);
    assert_ne!(*a, *c);
}

#[tokio::test]
async fn test_scheduled_delivery_through_transport() {
    let scheduler = Arc::new(TaskScheduler::new());
    scheduler.start(&PoolConfig::default(), tokio::runtime::Handle::current());

    let transport = Arc::new(AlwaysConnected::default());
    let recording = transport.context.clone();
    let channel = Channel::builder(ChannelId::from("c1"), "test", transport)
        .scheduler(Arc::clone(&scheduler))
        .build();

    let messages = numbered(5);
    for message in &messages {
        channel.enqueue_outbound(message.clone()).unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while recording.delivered().len() < messages.len() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("messages were not delivered");
    assert_eq!(recording.delivered(), messages);

    scheduler.stop(false).await;
}

#[tokio::test]
async fn test_destroyed_channel_accepts_but_never_schedules() {
    let scheduler = Arc::new(TaskScheduler::new());
    scheduler.start(&PoolConfig::default().with_core_pool_size(0).with_maximum_pool_size(0), tokio::runtime::Handle::current());

    let channel = Channel::builder(
        ChannelId::from("c1"),
        "test",
        Arc::new(AlwaysConnected::default()),
    )
    .scheduler(Arc::clone(&scheduler))
    .build();

    channel.destroy();
    channel
        .enqueue_outbound(Message::publish("news", json!(1)))
        .unwrap();
    assert_eq!(channel.outbound_len(), 1);
    assert!(!channel.has_pending_task(Direction::Outbound));
    assert!(!channel.cancel_task(Direction::Outbound));

    scheduler.stop(true).await;
}
