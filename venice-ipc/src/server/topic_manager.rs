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


//! Topic registry.

use crate::destination::{DestinationKind, IpcTopic, TopicStatus};
use crate::error::IpcError;
use crate::message::{validate_topic_name, Topics};
use crate::server::connection::Outbound;
use crate::server::{Authenticator, Subscriptions};
use crate::transport::ConnectionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Owns every topic of a server and their subscriptions.
///
/// Subscribing holds the topic map's read lock and removal holds its write
/// lock while subscriptions change, so a subscription never outlives its
/// topic.
#[derive(Debug)]
pub struct TopicManager {
    topics: RwLock<HashMap<String, Arc<IpcTopic>>>,
    max_topics: usize,
    authenticator: Arc<Authenticator>,
    subscriptions: Subscriptions,
}

impl TopicManager {
    /// Creates an empty manager.
    pub fn new(max_topics: usize, authenticator: Arc<Authenticator>) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            max_topics,
            authenticator,
            subscriptions: Subscriptions::new(),
        }
    }

    /// The subscription registry.
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Creates a topic, or returns the existing one.
    pub fn create_topic(&self, name: &str) -> Result<Arc<IpcTopic>, IpcError> {
        validate_topic_name(name)?;
        if let Some(existing) = self.topics.read().get(name) {
            return Ok(existing.clone());
        }

        let mut topics = self.topics.write();
        if let Some(existing) = topics.get(name) {
            return Ok(existing.clone());
        }
        if topics.len() >= self.max_topics {
            return Err(IpcError::Capacity {
                kind: DestinationKind::Topic,
                max: self.max_topics,
            });
        }
        let acls = self.authenticator.acls_for(DestinationKind::Topic, name);
        let topic = Arc::new(IpcTopic::new(name, acls));
        topics.insert(name.to_string(), topic.clone());
        drop(topics);

        #[cfg(feature = "tracing")]
        tracing::info!("Created topic {}", name);
        Ok(topic)
    }

    /// Subscribes a connection to every topic in `names`, or to none.
    ///
    /// `authorize` vets each topic before anything is registered.
    pub(crate) fn subscribe(
        &self,
        names: &Topics,
        connection: ConnectionId,
        outbound: &mpsc::Sender<Outbound>,
        authorize: impl Fn(&IpcTopic) -> Result<(), IpcError>,
    ) -> Result<(), IpcError> {
        let topics = self.topics.read();
        for name in names.iter() {
            let topic = topics.get(name).ok_or_else(|| IpcError::NotFound {
                kind: DestinationKind::Topic,
                name: name.to_string(),
            })?;
            authorize(topic)?;
        }
        for name in names.iter() {
            self.subscriptions.subscribe(name, connection, outbound.clone());
        }
        Ok(())
    }

    /// Looks up a topic.
    pub fn get_topic(&self, name: &str) -> Result<Arc<IpcTopic>, IpcError> {
        self.topics
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IpcError::NotFound {
                kind: DestinationKind::Topic,
                name: name.to_string(),
            })
    }

    /// Returns `true` if the topic exists.
    pub fn exists_topic(&self, name: &str) -> bool {
        self.topics.read().contains_key(name)
    }

    /// Removes a topic and drops its subscriptions.
    pub fn remove_topic(&self, name: &str) -> Result<(), IpcError> {
        let mut topics = self.topics.write();
        if topics.remove(name).is_none() {
            return Err(IpcError::NotFound {
                kind: DestinationKind::Topic,
                name: name.to_string(),
            });
        }
        let dropped = self.subscriptions.remove_topic(name);
        drop(topics);
        #[cfg(feature = "tracing")]
        tracing::info!("Removed topic {} ({} subscriptions dropped)", name, dropped);
        Ok(())
    }

    /// Describes a topic.
    pub fn topic_status(&self, name: &str) -> Result<TopicStatus, IpcError> {
        let topic = self.get_topic(name)?;
        Ok(topic.status(self.subscriptions.subscribers(name)))
    }

    /// All topic names, sorted.
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of topics.
    pub fn len(&self) -> usize {
        self.topics.read().len()
    }

    /// Returns `true` if there are no topics.
    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_idempotent_and_limited() {
        let manager = TopicManager::new(1, Arc::new(Authenticator::new()));
        let a = manager.create_topic("news").unwrap();
        let b = manager.create_topic("news").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(
            manager.create_topic("other"),
            Err(IpcError::Capacity { max: 1, .. })
        ));
        assert!(manager.create_topic("bad name").is_err());
    }

    #[test]
    fn test_remove_drops_subscriptions() {
        let manager = TopicManager::new(5, Arc::new(Authenticator::new()));
        manager.create_topic("news").unwrap();
        let (tx, _rx) = mpsc::channel(1);
        manager.subscriptions().subscribe("news", ConnectionId::next(), tx);
        assert_eq!(manager.topic_status("news").unwrap().subscribers, 1);

        manager.remove_topic("news").unwrap();
        assert_eq!(manager.subscriptions().subscribers("news"), 0);
        assert!(matches!(
            manager.topic_status("news"),
            Err(IpcError::NotFound { .. })
        ));
    }

    #[test]
    fn test_subscribe_is_all_or_nothing() {
        let manager = TopicManager::new(5, Arc::new(Authenticator::new()));
        manager.create_topic("news").unwrap();
        let (tx, _rx) = mpsc::channel(1);
        let connection = ConnectionId::next();

        let both = Topics::parse("news,sports").unwrap();
        let result = manager.subscribe(&both, connection, &tx, |_| Ok(()));
        assert!(matches!(result, Err(IpcError::NotFound { .. })));
        assert_eq!(manager.subscriptions().subscribers("news"), 0);

        let news = Topics::parse("news").unwrap();
        let denied = manager.subscribe(&news, connection, &tx, |_| {
            Err(IpcError::InvalidRequest {
                reason: "denied".to_string(),
            })
        });
        assert!(denied.is_err());
        assert_eq!(manager.subscriptions().subscribers("news"), 0);

        manager.subscribe(&news, connection, &tx, |_| Ok(())).unwrap();
        assert!(manager.subscriptions().is_subscribed("news", connection));
    }

    #[test]
    fn test_subscription_never_outlives_its_topic() {
        let manager = Arc::new(TopicManager::new(5, Arc::new(Authenticator::new())));
        let news = Topics::parse("news").unwrap();
        for _ in 0..200 {
            manager.create_topic("news").unwrap();
            let subscriber = {
                let manager = manager.clone();
                let news = news.clone();
                std::thread::spawn(move || {
                    let (tx, _rx) = mpsc::channel(1);
                    let _ = manager.subscribe(&news, ConnectionId::next(), &tx, |_| Ok(()));
                })
            };
            manager.remove_topic("news").unwrap();
            subscriber.join().unwrap();

            assert!(!manager.exists_topic("news"));
            assert_eq!(manager.subscriptions().subscribers("news"), 0);
        }
    }
}
