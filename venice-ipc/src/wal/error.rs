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


//! Write-ahead log error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while writing or replaying a queue log.
#[derive(Debug, Error)]
pub enum WalError {
    /// File system failure.
    #[error("io error at {path:?}: {source}")]
    Io {
        /// File involved, if known
        path: Option<PathBuf>,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A record does not start with the record magic.
    #[error("record magic mismatch: got {got:#x}")]
    MagicMismatch {
        /// The value read
        got: u32,
    },

    /// A record announces an impossible length.
    #[error("record length invalid: {reason}")]
    LengthInvalid {
        /// What was wrong
        reason: String,
    },

    /// A record body exceeds the size limit.
    #[error("record exceeds max bytes {max_bytes} (got {got_bytes})")]
    RecordTooLarge {
        /// Size limit
        max_bytes: usize,
        /// Body size
        got_bytes: usize,
    },

    /// A record body does not match its checksum.
    #[error("record crc32c mismatch: expected {expected:#x}, got {got:#x}")]
    CrcMismatch {
        /// Checksum stored in the frame
        expected: u32,
        /// Checksum of the body read
        got: u32,
    },

    /// The log content is structurally invalid.
    #[error("corrupt log {path:?}: {reason}")]
    Corrupt {
        /// Log file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// A record failed to encode or decode.
    #[error("record codec error: {reason}")]
    Codec {
        /// Serializer message
        reason: String,
    },

    /// The log has been closed.
    #[error("log {path:?} is closed")]
    Closed {
        /// Log file
        path: PathBuf,
    },
}
