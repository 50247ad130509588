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

//! Integration tests for data update broadcasts.

use courier::data::{DataPublisher, DataUpdateKind, DataUpdates, PublishMode};
use courier::destination::{Destination, ServicesConfig};
use courier::message::{CommandOperation, Message, codes, headers};
use courier::transport::LongPollChannelFactory;
use courier::{Registry, RegistryError, RequestContext};
use serde_json::json;
use std::sync::Arc;

async fn registry_with_watcher(sub_topic: Option<&str>) -> (Arc<Registry>, courier::ChannelId) {
    let registry = Registry::builder()
        .with_services(ServicesConfig::new().with_destination(Destination::new("catalog")))
        .build()
        .unwrap();
    registry.start().await.unwrap();
    let context = RequestContext::new(Arc::new(LongPollChannelFactory::default()));

    let id = registry
        .dispatch(&context, Message::command(CommandOperation::Ping))
        .await
        .unwrap()
        .client_id
        .unwrap();
    let mut subscribe = Message::command(CommandOperation::Subscribe)
        .with_client_id(id.clone())
        .with_destination("catalog");
    if let Some(sub_topic) = sub_topic {
        subscribe.set_header(headers::SUBTOPIC, sub_topic);
    }
    assert!(!registry.dispatch(&context, subscribe).await.unwrap().is_error());
    (registry, id)
}

/// A committed unit of work reaches watchers as one publication.
#[tokio::test]
async fn test_updates_are_broadcast_once_on_commit() {
    let (registry, watcher) = registry_with_watcher(None).await;
    let publisher = DataPublisher::new(Arc::clone(&registry), "catalog");

    let mut updates = DataUpdates::new(PublishMode::OnCommit);
    assert!(updates.add(DataUpdateKind::Persist, json!({"sku": "A-1"})));
    assert!(updates.add(DataUpdateKind::Update, json!({"sku": "B-2"})));
    assert!(!updates.add(DataUpdateKind::Persist, json!({"sku": "A-1"})));

    // Success alone does not release commit-bound updates.
    assert!(publisher
        .publish(&mut updates, PublishMode::OnSuccess)
        .await
        .unwrap()
        .is_none());

    let reply = publisher
        .publish(&mut updates, PublishMode::OnCommit)
        .await
        .unwrap()
        .unwrap();
    assert!(!reply.is_error());
    assert!(updates.is_published());
    assert_eq!(registry.channel(&watcher).unwrap().outbound_len(), 1);

    assert!(publisher
        .publish(&mut updates, PublishMode::OnCommit)
        .await
        .unwrap()
        .is_none());
    assert_eq!(registry.channel(&watcher).unwrap().outbound_len(), 1);
}

/// Publications on a sub-topic reach only matching watchers.
#[tokio::test]
async fn test_sub_topic_publication() {
    let (registry, watcher) = registry_with_watcher(Some("books.*")).await;
    let mut updates = DataUpdates::new(PublishMode::Manual);

    updates.add(DataUpdateKind::Remove, json!(7));
    DataPublisher::new(Arc::clone(&registry), "catalog")
        .with_sub_topic("music.jazz")
        .publish(&mut updates, PublishMode::Manual)
        .await
        .unwrap();
    assert_eq!(registry.channel(&watcher).unwrap().outbound_len(), 0);

    let mut updates = DataUpdates::new(PublishMode::Manual);
    updates.add(DataUpdateKind::Remove, json!(8));
    DataPublisher::new(Arc::clone(&registry), "catalog")
        .with_sub_topic("books.poetry")
        .publish(&mut updates, PublishMode::Manual)
        .await
        .unwrap();
    assert_eq!(registry.channel(&watcher).unwrap().outbound_len(), 1);
}

/// An unconfigured topic yields an error reply, a stopped registry an error.
#[tokio::test]
async fn test_publication_failures() {
    let (registry, _watcher) = registry_with_watcher(None).await;

    let mut updates = DataUpdates::new(PublishMode::OnSuccess);
    updates.add(DataUpdateKind::Persist, json!(1));
    let reply = DataPublisher::new(Arc::clone(&registry), "inventory")
        .publish(&mut updates, PublishMode::OnSuccess)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.fault().unwrap().code, codes::INVALID_DESTINATION);

    registry.stop(false).await;
    let mut updates = DataUpdates::new(PublishMode::OnSuccess);
    updates.add(DataUpdateKind::Persist, json!(2));
    let error = DataPublisher::new(Arc::clone(&registry), "catalog")
        .publish(&mut updates, PublishMode::OnSuccess)
        .await
        .unwrap_err();
    assert_eq!(error, RegistryError::NotStarted);
    assert!(!updates.is_published());
}
