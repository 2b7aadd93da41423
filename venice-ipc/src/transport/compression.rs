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


//! Per-message payload compression.
//!
//! Unlike a stream-wrapping transport, the IPC protocol compresses each payload
//! frame independently: a payload is compressed only when compression is
//! enabled and the payload exceeds the configured cutoff, and the header flag
//! tells the receiver whether to decompress. Small control messages therefore
//! never pay the compression cost.
//!
//! Without the `compression` feature nothing is compressed, and a peer's
//! compressed payload is refused as unsupported.
//!
//! # Examples
//!
//! ```rust
//! use venice_ipc::transport::Compressor;
//!
//! # #[cfg(feature = "compression")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = Compressor::new(Some(64));
//! let payload = vec![b'a'; 4096];
//!
//! assert!(compressor.should_compress(payload.len()));
//! let packed = compressor.compress(&payload).await?;
//! assert!(packed.len() < payload.len());
//!
//! let unpacked = compressor.decompress(&packed, 1 << 20).await?;
//! assert_eq!(unpacked, payload);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "compression")]
use async_compression::tokio::bufread::GzipDecoder;
#[cfg(feature = "compression")]
use async_compression::tokio::write::GzipEncoder;
#[cfg(feature = "compression")]
use async_compression::Level;
use std::io;
#[cfg(feature = "compression")]
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Default gzip compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

/// Stateless gzip compressor applied to individual payload frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressor {
    cutoff: Option<usize>,
    level: i32,
}

impl Compressor {
    /// Creates a compressor. `None` disables compression; `Some(n)` compresses
    /// payloads strictly larger than `n` bytes.
    pub fn new(cutoff: Option<usize>) -> Self {
        Self {
            cutoff,
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// A compressor that never compresses.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Sets the gzip level (clamped to 0-9).
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level.clamp(0, 9);
        self
    }

    /// Returns the configured cutoff.
    pub fn cutoff(&self) -> Option<usize> {
        self.cutoff
    }

    /// Returns `true` if compression is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.cutoff.is_some()
    }

    /// Returns `true` if a payload of `len` bytes should be compressed.
    pub fn should_compress(&self, len: usize) -> bool {
        cfg!(feature = "compression") && matches!(self.cutoff, Some(cutoff) if len > cutoff)
    }

    /// Gzip-compresses `data`.
    #[cfg(feature = "compression")]
    pub async fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzipEncoder::with_quality(
            Vec::with_capacity(data.len() / 2 + 32),
            Level::Precise(self.level),
        );
        encoder.write_all(data).await?;
        encoder.shutdown().await?;
        Ok(encoder.into_inner())
    }

    /// Decompresses gzip `data`, refusing to inflate beyond `max_size` bytes.
    #[cfg(feature = "compression")]
    pub async fn decompress(&self, data: &[u8], max_size: usize) -> io::Result<Vec<u8>> {
        let decoder = GzipDecoder::new(data);
        let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
        let mut limited = decoder.take(limit);
        let mut out = Vec::with_capacity(data.len().saturating_mul(2));
        limited.read_to_end(&mut out).await?;
        if out.len() > max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("decompressed payload exceeds {} bytes", max_size),
            ));
        }
        Ok(out)
    }

    /// Always fails: built without the `compression` feature.
    #[cfg(not(feature = "compression"))]
    pub async fn compress(&self, _data: &[u8]) -> io::Result<Vec<u8>> {
        Err(unsupported())
    }

    /// Always fails: built without the `compression` feature.
    #[cfg(not(feature = "compression"))]
    pub async fn decompress(&self, _data: &[u8], _max_size: usize) -> io::Result<Vec<u8>> {
        Err(unsupported())
    }
}

#[cfg(not(feature = "compression"))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "built without gzip support")
}

impl Default for Compressor {
    fn default() -> Self {
        Self::disabled()
    }
}
