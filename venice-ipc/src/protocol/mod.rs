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


//! Wire protocol.
//!
//! - [`Header`]: the 18-byte plaintext header opening every transmission
//! - [`Codec`]: assembles and parses header, metadata frame and payload frame,
//!   applying compression and authenticated encryption
//! - [`ProtocolError`]: violations that are fatal to a connection

mod codec;
mod error;
mod header;

pub use codec::Codec;
pub use error::ProtocolError;
pub use header::{Header, HEADER_SIZE, MAGIC, PROTOCOL_VERSION};
