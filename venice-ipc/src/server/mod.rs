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


//! The IPC server.
//!
//! A server owns three registries ([`QueueManager`], [`TopicManager`],
//! [`FunctionManager`]), an [`Authenticator`] and one handler task per
//! connection. Its lifecycle runs through typed phases:
//!
//! ```text
//! Server::bind ──► BoundServer ──recover()──► RecoveredServer ──start()──► RunningServer
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use venice_ipc::destination::HandlerError;
//! use venice_ipc::message::Message;
//! use venice_ipc::server::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pong = |_request: Message| -> Result<Message, HandlerError> {
//!     Ok(Message::new_text("pong", "text/plain", "pong")?)
//! };
//! let config = ServerConfig::new("127.0.0.1:33333").with_default_handler(Arc::new(pong));
//! let server = Server::start(config).await?;
//! # server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod authenticator;
mod config;
mod connection;
mod context;
mod function_manager;
mod payloads;
mod queue_manager;
#[allow(clippy::module_inception)]
mod server;
mod subscriptions;
mod topic_manager;

pub use authenticator::{AclSeed, Authenticator};
pub use config::{ServerConfig, ServerSettings, DEFAULT_MAX_DESTINATIONS, DEFAULT_SEND_BUFFER_SIZE};
pub use function_manager::FunctionManager;
pub use payloads::{CreateQueueRequest, CreateTemporaryQueueRequest, Credentials, ServerStatusReport};
pub use queue_manager::{QueueManager, DEAD_LETTER_CAPACITY, DEAD_LETTER_QUEUE, TEMPORARY_QUEUE_PREFIX};
pub use server::{BoundServer, RecoveredServer, RunningServer, Server};
pub use subscriptions::{FanOut, Subscriptions};
pub use topic_manager::TopicManager;
