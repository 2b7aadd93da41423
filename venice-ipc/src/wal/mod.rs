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


//! Write-ahead log for durable queues.
//!
//! Each durable queue owns one log file, `<wal_dir>/<encoded name>.wal`. The
//! file is a sequence of framed records:
//!
//! ```text
//! +-------------+--------------+--------------+------------------+
//! | magic (u32) | length (u32) | crc32c (u32) | postcard body    |
//! +-------------+--------------+--------------+------------------+
//! ```
//!
//! The first record is always [`WalRecord::Config`]. Replaying the offers and
//! removals that follow reproduces the queue's live content in order. A record
//! cut short by a crash at the end of the file is dropped and the file
//! truncated; any other damage fails the replay.

mod error;
mod frame;
mod log;
mod record;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::WalError;
pub use frame::{encode_frame, FrameReader, DEFAULT_MAX_RECORD_BYTES, FRAME_HEADER_LEN};
pub use log::{Replay, WriteAheadLog};
pub use record::WalRecord;

/// Extension of log files.
pub const WAL_EXTENSION: &str = "wal";

/// Runs log I/O on the blocking pool so syncs never stall async workers.
pub(crate) async fn blocking<T, F>(op: F) -> Result<T, WalError>
where
    F: FnOnce() -> Result<T, WalError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| WalError::Io {
            path: None,
            source: std::io::Error::other(e),
        })?
}

/// Returns the log file name for a queue name.
///
/// Queue names may contain `/`, which is encoded as `~`. Queue names can
/// never contain `~`, so the mapping is reversible.
pub fn file_name(queue_name: &str) -> String {
    format!("{}.{}", queue_name.replace('/', "~"), WAL_EXTENSION)
}

/// Returns the queue name encoded in a log file name.
pub fn queue_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(&format!(".{}", WAL_EXTENSION))?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('~', "/"))
}

/// Returns the log path for a queue in `dir`.
pub fn log_path(dir: &Path, queue_name: &str) -> PathBuf {
    dir.join(file_name(queue_name))
}

/// Lists the logs in `dir` as `(queue name, path)` pairs, sorted by name.
pub fn list_logs(dir: &Path) -> Result<Vec<(String, PathBuf)>, WalError> {
    let entries = fs::read_dir(dir).map_err(|source| WalError::Io {
        path: Some(dir.to_path_buf()),
        source,
    })?;

    let mut logs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| WalError::Io {
            path: Some(dir.to_path_buf()),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).and_then(queue_name) else {
            continue;
        };
        logs.push((name, path));
    }
    logs.sort();
    Ok(logs)
}
