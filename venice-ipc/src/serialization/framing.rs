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


//! Length-prefixed framing.
//!
//! Every variable-sized piece of a message transmission (the metadata record
//! and the payload) travels as a frame: a 4-byte big-endian length followed by
//! exactly that many bytes.
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! Frames are always read in full. Running out of input after the length
//! prefix has started is reported as an end-of-stream condition, never as a
//! partially filled frame.
//!
//! # Examples
//!
//! ```rust
//! use venice_ipc::serialization::framing::{read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! write_frame(&mut buffer, b"ping", DEFAULT_MAX_FRAME_SIZE).await?;
//!
//! let mut reader = &buffer[..];
//! let frame = read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await?;
//! assert_eq!(frame, b"ping");
//! # Ok(())
//! # }
//! ```

use crate::serialization::{DeserializationError, SerializationError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound for a single frame (20 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 20 * 1024 * 1024;

/// Size of the frame length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Appends a length-prefixed frame to an in-memory buffer.
///
/// # Errors
///
/// Returns a [`SerializationError`] if the payload exceeds `max_size`.
pub fn encode_frame(
    buffer: &mut Vec<u8>,
    payload: &[u8],
    max_size: usize,
) -> Result<(), SerializationError> {
    let len = checked_length(payload.len(), max_size)?;
    buffer.reserve(FRAME_HEADER_SIZE + payload.len());
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(payload);
    Ok(())
}

/// Writes a length-prefixed frame to an async writer and flushes it.
///
/// # Errors
///
/// Returns a [`SerializationError`] if the payload exceeds `max_size` or the
/// writer fails.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    max_size: usize,
) -> Result<(), SerializationError>
where
    W: AsyncWrite + Unpin,
{
    let len = checked_length(payload.len(), max_size)?;

    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| SerializationError::io("writing frame length", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| SerializationError::io("writing frame payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| SerializationError::io("flushing frame", e))?;

    Ok(())
}

/// Reads one length-prefixed frame from an async reader.
///
/// # Errors
///
/// Returns a [`DeserializationError`] if the announced length exceeds
/// `max_size`, or an end-of-stream error if the reader is exhausted before
/// the frame is complete.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, DeserializationError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| DeserializationError::io("reading frame length", e))?;

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_size {
        return Err(DeserializationError::TooLarge { size: len, max: max_size });
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| DeserializationError::io("reading frame payload", e))?;

    Ok(payload)
}

/// Splits one frame off the front of an in-memory buffer.
///
/// Returns the frame payload and the remaining bytes.
///
/// # Errors
///
/// Returns a [`DeserializationError`] if the buffer is shorter than the
/// announced frame or the length exceeds `max_size`.
pub fn decode_frame(bytes: &[u8], max_size: usize) -> Result<(&[u8], &[u8]), DeserializationError> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(DeserializationError::Truncated {
            expected: FRAME_HEADER_SIZE,
            available: bytes.len(),
        });
    }
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len > max_size {
        return Err(DeserializationError::TooLarge { size: len, max: max_size });
    }
    let rest = &bytes[FRAME_HEADER_SIZE..];
    if rest.len() < len {
        return Err(DeserializationError::Truncated {
            expected: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

fn checked_length(len: usize, max_size: usize) -> Result<u32, SerializationError> {
    if len > max_size {
        return Err(SerializationError::TooLarge { size: len, max: max_size });
    }
    u32::try_from(len).map_err(|_| SerializationError::TooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}
