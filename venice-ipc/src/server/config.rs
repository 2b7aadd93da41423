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


//! Server configuration and the settings it advertises.

use crate::destination::FunctionHandler;
use crate::protocol::PROTOCOL_VERSION;
use crate::serialization::framing::DEFAULT_MAX_FRAME_SIZE;
use crate::server::Authenticator;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of queues, topics or functions.
pub const DEFAULT_MAX_DESTINATIONS: usize = 20;

/// Default number of outbound messages buffered per connection.
pub const DEFAULT_SEND_BUFFER_SIZE: usize = 1000;

/// Configuration for a [`Server`](crate::server::Server).
///
/// # Examples
///
/// ```rust
/// use venice_ipc::server::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1:0")
///     .with_encryption(true)
///     .with_compress_cutoff(Some(4096))
///     .with_max_queues(50);
/// assert!(config.encrypt);
/// assert_eq!(config.max_topics, 20);
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    ///
    /// Default: `127.0.0.1:33333`
    pub address: String,

    /// Largest payload accepted or sent.
    ///
    /// Default: 20 MiB
    pub max_message_size: usize,

    /// Payloads above this size are compressed. `None` disables compression.
    ///
    /// Default: None
    pub compress_cutoff_size: Option<usize>,

    /// Require every connection to negotiate encryption.
    ///
    /// Default: false
    pub encrypt: bool,

    /// Connections beyond this count are closed on accept. `None` is unlimited.
    ///
    /// Default: None
    pub max_connections: Option<usize>,

    /// Maximum number of queues, the dead-letter queue excluded.
    ///
    /// Default: 20
    pub max_queues: usize,

    /// Maximum number of topics.
    ///
    /// Default: 20
    pub max_topics: usize,

    /// Maximum number of functions.
    ///
    /// Default: 20
    pub max_functions: usize,

    /// Directory holding the write-ahead logs of durable queues. `None`
    /// disables durable queues.
    ///
    /// Default: None
    pub wal_dir: Option<PathBuf>,

    /// Rewrite each log to its live content when it is recovered.
    ///
    /// Default: true
    pub wal_compact_at_start: bool,

    /// Outbound messages buffered per connection before topic pushes are
    /// discarded.
    ///
    /// Default: 1000
    pub send_buffer_size: usize,

    /// Time a new connection gets to send its first message.
    ///
    /// Default: 30 seconds
    pub handshake_timeout: Duration,

    /// Credentials, admin principals and ACL seeds.
    pub authenticator: Arc<Authenticator>,

    /// Handles requests addressed to no destination.
    pub default_handler: Option<Arc<dyn FunctionHandler>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:33333".to_string(),
            max_message_size: DEFAULT_MAX_FRAME_SIZE,
            compress_cutoff_size: None,
            encrypt: false,
            max_connections: None,
            max_queues: DEFAULT_MAX_DESTINATIONS,
            max_topics: DEFAULT_MAX_DESTINATIONS,
            max_functions: DEFAULT_MAX_DESTINATIONS,
            wal_dir: None,
            wal_compact_at_start: true,
            send_buffer_size: DEFAULT_SEND_BUFFER_SIZE,
            handshake_timeout: Duration::from_secs(30),
            authenticator: Arc::new(Authenticator::new()),
            default_handler: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("max_message_size", &self.max_message_size)
            .field("compress_cutoff_size", &self.compress_cutoff_size)
            .field("encrypt", &self.encrypt)
            .field("max_connections", &self.max_connections)
            .field("max_queues", &self.max_queues)
            .field("max_topics", &self.max_topics)
            .field("max_functions", &self.max_functions)
            .field("wal_dir", &self.wal_dir)
            .field("wal_compact_at_start", &self.wal_compact_at_start)
            .field("send_buffer_size", &self.send_buffer_size)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("authenticator", &self.authenticator)
            .field("default_handler", &self.default_handler.is_some())
            .finish()
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `address` with default limits.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the compression cutoff.
    pub fn with_compress_cutoff(mut self, cutoff: Option<usize>) -> Self {
        self.compress_cutoff_size = cutoff;
        self
    }

    /// Requires encryption on every connection.
    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Limits concurrent connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the maximum number of queues.
    pub fn with_max_queues(mut self, max: usize) -> Self {
        self.max_queues = max;
        self
    }

    /// Sets the maximum number of topics.
    pub fn with_max_topics(mut self, max: usize) -> Self {
        self.max_topics = max;
        self
    }

    /// Sets the maximum number of functions.
    pub fn with_max_functions(mut self, max: usize) -> Self {
        self.max_functions = max;
        self
    }

    /// Enables durable queues with logs under `dir`.
    pub fn with_wal_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wal_dir = Some(dir.into());
        self
    }

    /// Controls log compaction during recovery.
    pub fn with_wal_compact_at_start(mut self, compact: bool) -> Self {
        self.wal_compact_at_start = compact;
        self
    }

    /// Sets the per-connection outbound buffer.
    pub fn with_send_buffer_size(mut self, size: usize) -> Self {
        self.send_buffer_size = size.max(1);
        self
    }

    /// Sets the first-message timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the authenticator.
    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    /// Sets the handler for requests addressed to no destination.
    pub fn with_default_handler(mut self, handler: Arc<dyn FunctionHandler>) -> Self {
        self.default_handler = Some(handler);
        self
    }

    /// The settings advertised to clients.
    pub fn settings(&self) -> ServerSettings {
        ServerSettings {
            max_message_size: self.max_message_size,
            compress_cutoff_size: self.compress_cutoff_size,
            encrypt: self.encrypt,
            authentication: self.authenticator.is_active(),
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Limits returned in reply to a client configuration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Largest payload the server accepts
    pub max_message_size: usize,
    /// Payload compression cutoff, `None` if disabled
    pub compress_cutoff_size: Option<usize>,
    /// Encryption is mandatory
    pub encrypt: bool,
    /// Connections must authenticate
    pub authentication: bool,
    /// Wire protocol version
    pub protocol_version: i32,
    /// Crate version of the server
    pub server_version: String,
}
