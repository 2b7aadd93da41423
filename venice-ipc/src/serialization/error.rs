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


//! Serialization error types.
//!
//! Raised while encoding or decoding length-prefixed frames, metadata
//! records, WAL record bodies and the JSON payloads of administrative
//! messages.

use std::io;
use thiserror::Error;

/// Error raised while turning a value into bytes.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::serialization::SerializationError;
///
/// let error = SerializationError::TooLarge { size: 300, max: 256 };
/// assert_eq!(error.to_string(), "encoded size 300 exceeds maximum 256");
/// ```
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The encoded value or frame exceeds the configured limit.
    #[error("encoded size {size} exceeds maximum {max}")]
    TooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Writing a frame failed.
    #[error("{context}: {source}")]
    Io {
        /// The step that failed
        context: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Postcard could not encode the value.
    #[error("postcard encoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// serde_json could not encode the value.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SerializationError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Returns the underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Error raised while turning bytes back into a value.
///
/// Input that ends before a frame is complete is an end-of-stream condition,
/// so callers can tell a closed peer apart from a malformed frame.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::serialization::DeserializationError;
///
/// let error = DeserializationError::Truncated { expected: 10, available: 4 };
/// assert!(error.is_end_of_stream());
/// ```
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// An announced frame or input is larger than the configured limit.
    #[error("announced size {size} exceeds maximum {max}")]
    TooLarge {
        /// Announced size in bytes
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// An in-memory buffer ends inside a frame.
    #[error("incomplete frame: expected {expected} bytes, {available} available")]
    Truncated {
        /// Bytes the frame needs
        expected: usize,
        /// Bytes present
        available: usize,
    },

    /// Reading a frame failed.
    #[error("{context}: {source}")]
    Io {
        /// The step that failed
        context: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Postcard could not decode the bytes.
    #[error("postcard decoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// serde_json could not decode the bytes.
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeserializationError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Returns `true` if the input ended before the value was complete.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            Self::Truncated { .. } => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }

    /// Returns the underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
