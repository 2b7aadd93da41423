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


//! Publish/subscribe topics.

use crate::destination::{Acl, AclTable, Destination, DestinationKind, SharedAcls};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time description of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStatus {
    /// Topic name
    pub name: String,
    /// Connections currently subscribed
    pub subscribers: usize,
    /// Messages published since creation
    pub published: u64,
}

/// A fan-out destination.
///
/// The topic itself holds no messages; delivery to subscribers is done by
/// the server's subscription registry.
#[derive(Debug)]
pub struct IpcTopic {
    name: String,
    acls: SharedAcls,
    published: AtomicU64,
}

impl IpcTopic {
    /// Creates a topic.
    pub fn new(name: impl Into<String>, acls: AclTable) -> Self {
        Self {
            name: name.into(),
            acls: SharedAcls::new(acls),
            published: AtomicU64::new(0),
        }
    }

    /// Counts one publication.
    pub fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Describes the topic, given its current subscriber count.
    pub fn status(&self, subscribers: usize) -> TopicStatus {
        TopicStatus {
            name: self.name.clone(),
            subscribers,
            published: self.published.load(Ordering::Relaxed),
        }
    }
}

impl Destination for IpcTopic {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Topic
    }

    fn acls(&self) -> Arc<AclTable> {
        self.acls.load()
    }

    fn update_acls(&self, acls: Vec<Acl>) {
        self.acls.update(acls);
    }
}
