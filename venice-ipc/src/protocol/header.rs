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


//! The fixed-size transmission header.

use crate::protocol::ProtocolError;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 18;

/// Magic bytes opening every header.
pub const MAGIC: [u8; 2] = *b"vn";

/// The protocol version this crate speaks.
pub const PROTOCOL_VERSION: i32 = 1;

/// The plaintext header preceding the metadata and payload frames.
///
/// Layout, big-endian:
///
/// ```text
/// +-------+---------+------------+-----------+-----------+
/// | magic | version | compressed | encrypted | timestamp |
/// | 2     | i32     | i16        | i16       | i64       |
/// +-------+---------+------------+-----------+-----------+
/// ```
///
/// The encoded bytes double as the additional authenticated data of both
/// following frames when encryption is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload frame is gzip-compressed
    pub compressed: bool,
    /// Metadata and payload frames are sealed
    pub encrypted: bool,
    /// Message timestamp in epoch millis
    pub timestamp: i64,
}

impl Header {
    /// Encodes the header for the current protocol version.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2..6].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        buf[6..8].copy_from_slice(&i16::from(self.compressed).to_be_bytes());
        buf[8..10].copy_from_slice(&i16::from(self.encrypted).to_be_bytes());
        buf[10..18].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    /// Decodes and validates a header.
    ///
    /// # Errors
    ///
    /// Rejects bad magic, any version other than [`PROTOCOL_VERSION`], and
    /// flags other than 0 or 1.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let magic = [buf[0], buf[1]];
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic { found: magic });
        }
        let version = i32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion { version });
        }
        let compressed = decode_flag("compressed", [buf[6], buf[7]])?;
        let encrypted = decode_flag("encrypted", [buf[8], buf[9]])?;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&buf[10..18]);

        Ok(Self {
            compressed,
            encrypted,
            timestamp: i64::from_be_bytes(ts),
        })
    }
}

fn decode_flag(field: &'static str, bytes: [u8; 2]) -> Result<bool, ProtocolError> {
    match i16::from_be_bytes(bytes) {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(ProtocolError::InvalidFlag { field, value }),
    }
}
