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


//! Topic subscription registry.

use crate::message::Message;
use crate::server::connection::Outbound;
use crate::transport::ConnectionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Result of fanning one message out to a topic's subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Subscribers whose outbound buffer took the message
    pub delivered: usize,
    /// Subscribers whose buffer was full
    pub discarded: usize,
    /// Subscribers whose connection is gone
    pub closed: usize,
}

/// Maps topics to the outbound channels of subscribed connections.
///
/// Publishing never waits: a full subscriber buffer drops the delivery for
/// that subscriber only.
#[derive(Debug, Default)]
pub struct Subscriptions {
    topics: RwLock<HashMap<String, HashMap<ConnectionId, mpsc::Sender<Outbound>>>>,
}

impl Subscriptions {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to a topic. Returns `false` if it already was.
    pub(crate) fn subscribe(
        &self,
        topic: &str,
        connection: ConnectionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> bool {
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .insert(connection, outbound)
            .is_none()
    }

    /// Drops one subscription. Returns `false` if there was none.
    pub fn unsubscribe(&self, topic: &str, connection: ConnectionId) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };
        let removed = subscribers.remove(&connection).is_some();
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Drops every subscription of a connection.
    pub fn unsubscribe_all(&self, connection: ConnectionId) -> usize {
        let mut topics = self.topics.write();
        let mut removed = 0;
        topics.retain(|_, subscribers| {
            if subscribers.remove(&connection).is_some() {
                removed += 1;
            }
            !subscribers.is_empty()
        });
        removed
    }

    /// Drops every subscription to a topic.
    pub fn remove_topic(&self, topic: &str) -> usize {
        self.topics.write().remove(topic).map_or(0, |s| s.len())
    }

    /// Number of connections subscribed to a topic.
    pub fn subscribers(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, HashMap::len)
    }

    /// Returns `true` if the connection is subscribed to the topic.
    pub fn is_subscribed(&self, topic: &str, connection: ConnectionId) -> bool {
        self.topics
            .read()
            .get(topic)
            .is_some_and(|s| s.contains_key(&connection))
    }

    /// Queues `push` on every subscriber of `topic`.
    pub fn publish(&self, topic: &str, push: &Message) -> FanOut {
        let mut fan_out = FanOut::default();
        let topics = self.topics.read();
        let Some(subscribers) = topics.get(topic) else {
            return fan_out;
        };
        for (connection, outbound) in subscribers {
            match outbound.try_send(Outbound::Message(push.clone())) {
                Ok(()) => fan_out.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Discarding push on {} for slow subscriber {}", topic, connection);
                    fan_out.discarded += 1;
                }
                Err(TrySendError::Closed(_)) => fan_out.closed += 1,
            }
        }
        fan_out
    }
}
