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


//! JSON bodies of control and administrative messages.

use crate::destination::{Persistence, QueueKind};
use serde::{Deserialize, Serialize};

/// Body of a queue creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQueueRequest {
    /// Maximum number of messages, greater than one
    pub capacity: usize,
    /// Overflow behavior
    pub kind: QueueKind,
    /// Whether the queue is write-ahead logged
    #[serde(default)]
    pub persistence: Persistence,
}

/// Body of a temporary queue creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTemporaryQueueRequest {
    /// Maximum number of messages, greater than one
    pub capacity: usize,
    /// Overflow behavior
    pub kind: QueueKind,
}

/// Body of an authentication request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Principal name
    pub user: String,
    /// Clear-text password, only ever sent after key agreement if encryption
    /// is on
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Body of the server status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatusReport {
    /// Crate version of the server
    pub server_version: String,
    /// Wire protocol version
    pub protocol_version: i32,
    /// Milliseconds since the server started
    pub uptime_ms: u64,
    /// Encryption is mandatory
    pub encrypt: bool,
    /// Connections must authenticate
    pub authentication: bool,
    /// Durable queues are available
    pub durable_queues: bool,
    /// Open connections
    pub connections: u64,
    /// Queue names, the dead-letter queue included
    pub queues: Vec<String>,
    /// Topic names
    pub topics: Vec<String>,
    /// Function names
    pub functions: Vec<String>,
}
