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


#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

//! ## Architecture
//!
//! The crate is layered bottom-up:
//!
//! - **[`serialization`]**: length-prefixed framing and record encodings
//! - **[`transport`]**: TCP sockets and payload compression
//! - **[`crypto`]**: X25519 key agreement, AES-GCM and password hashing
//! - **[`message`]**: the [`Message`](message::Message) envelope, wire codes
//!   and name rules
//! - **[`protocol`]**: the frame codec tying the layers above together
//! - **[`wal`]**: the write-ahead log behind durable queues
//! - **[`destination`]**: queues, topics, functions and their ACLs
//! - **[`server`]** / **[`client`]**: the two ends of a connection
//! - **[`observability`]**: statistics and the recent error log
//!
//! Errors from every layer compose into [`IpcError`].

pub mod client;
pub mod crypto;
pub mod destination;
pub mod error;
pub mod message;
pub mod observability;
pub mod protocol;
pub mod serialization;
pub mod server;
pub mod transport;
pub mod wal;

pub use error::IpcError;
