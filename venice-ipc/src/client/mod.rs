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


//! The IPC client.
//!
//! [`Client`] is the request/response API over one [`ClientConnection`].
//! The connection runs a listener task that owns socket reads and a
//! dispatcher task that feeds topic deliveries to a [`SubscriptionHandler`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use venice_ipc::client::{Client, ClientConfig};
//! use venice_ipc::message::{Message, Topics};
//!
//! # async fn example() -> Result<(), venice_ipc::IpcError> {
//! let config = ClientConfig::new("127.0.0.1:33333").with_encryption(true);
//! let client = Client::connect(config).await?;
//!
//! let topics = Topics::parse("prices")?;
//! client
//!     .subscribe(|m: Message| println!("{}", m.subject()), &topics)
//!     .await?;
//! client
//!     .publish("prices", Message::new_text("ACME", "text/plain", "42.0")?)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#[allow(clippy::module_inception)]
mod client;
mod config;
mod connection;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_RECEIVE_QUEUE_CAPACITY, DEFAULT_SUBSCRIPTION_BUFFER_SIZE};
pub use connection::{ClientConnection, SubscriptionHandler};
