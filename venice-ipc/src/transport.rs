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


//! Transport layer.
//!
//! The lowest layer of the IPC stack: stream sockets and the byte-level
//! transforms applied to individual payloads.
//!
//! - [`TcpTransport`]: connect, bind, accept and split TCP streams
//! - [`Compressor`]: per-message gzip compression with a size cutoff
//! - [`TransportError`]: socket failures, with peer-closed conditions
//!   classified apart from transient I/O errors
//! - [`ConnectionId`]: process-unique id of a physical connection

mod compression;
mod error;
mod tcp;
mod types;

pub use compression::{Compressor, DEFAULT_COMPRESSION_LEVEL};
pub use error::TransportError;
pub use tcp::TcpTransport;
pub use types::ConnectionId;
