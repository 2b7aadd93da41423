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


//! Protocol error types.

use crate::message::ValidationError;
use thiserror::Error;

/// A violation of the wire protocol.
///
/// Every protocol error is fatal to the connection it occurred on: the stream
/// can no longer be trusted to be aligned on a message boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The header does not start with the protocol magic.
    #[error("bad magic bytes {found:02x?}")]
    BadMagic {
        /// The two bytes received
        found: [u8; 2],
    },

    /// The header announces a protocol version this crate does not speak.
    #[error("unsupported protocol version {version}")]
    UnsupportedVersion {
        /// The announced version
        version: i32,
    },

    /// A header flag is neither 0 nor 1.
    #[error("invalid {field} flag {value}")]
    InvalidFlag {
        /// Name of the flag
        field: &'static str,
        /// The received value
        value: i16,
    },

    /// A frame is malformed or its length is out of bounds.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// What was wrong
        reason: String,
    },

    /// The frame's encryption flag disagrees with the channel state.
    #[error("frame encryption flag does not match channel (channel encrypted: {channel_encrypted})")]
    EncryptionMismatch {
        /// Whether the channel has encryption active
        channel_encrypted: bool,
    },

    /// A sealed frame failed authentication.
    #[error("{frame} frame failed authentication")]
    Authentication {
        /// Which frame failed
        frame: &'static str,
    },

    /// The payload did not decompress.
    #[error("payload decompression failed: {reason}")]
    Decompression {
        /// Decoder message
        reason: String,
    },

    /// The metadata record did not decode.
    #[error("invalid metadata record: {reason}")]
    InvalidMetadata {
        /// Decoder message
        reason: String,
    },

    /// The decoded message failed validation.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ValidationError),
}
