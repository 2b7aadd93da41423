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


//! Per-queue log files.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::destination::QueueKind;
use crate::message::Message;
use crate::wal::{encode_frame, FrameReader, WalError, WalRecord, DEFAULT_MAX_RECORD_BYTES};

/// Queue state rebuilt from a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Capacity from the config record
    pub capacity: usize,
    /// Overflow behavior from the config record
    pub kind: QueueKind,
    /// Live messages, oldest first
    pub messages: VecDeque<Message>,
    /// Number of complete records read
    pub records: usize,
    /// Bytes dropped from a torn final record
    pub truncated_bytes: u64,
}

/// An append-only log owned by one durable queue.
///
/// Every append is written, flushed and synced before it returns, so a
/// record the caller has seen succeed survives a crash.
#[derive(Debug)]
pub struct WriteAheadLog {
    path: PathBuf,
    file: Option<File>,
    max_record_bytes: usize,
}

impl WriteAheadLog {
    /// Creates a new log at `path`, replacing any existing file, and writes
    /// the config record.
    pub fn create(path: impl Into<PathBuf>, capacity: usize, kind: QueueKind) -> Result<Self, WalError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| WalError::Io {
                path: Some(path.clone()),
                source,
            })?;
        let mut log = Self {
            path,
            file: Some(file),
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        };
        log.append(&WalRecord::Config {
            capacity: capacity as u64,
            kind,
        })?;
        Ok(log)
    }

    /// Opens an existing log for appending and returns its replayed state.
    ///
    /// A torn final record is cut off the file before appending resumes.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Replay), WalError> {
        let path = path.into();
        let (replay, valid_len) = Self::replay(&path)?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| WalError::Io {
                path: Some(path.clone()),
                source,
            })?;
        if replay.truncated_bytes > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Truncating {} torn bytes from {}",
                replay.truncated_bytes,
                path.display()
            );
            file.set_len(valid_len).map_err(|source| WalError::Io {
                path: Some(path.clone()),
                source,
            })?;
            file.sync_all().map_err(|source| WalError::Io {
                path: Some(path.clone()),
                source,
            })?;
        }

        Ok((
            Self {
                path,
                file: Some(file),
                max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            },
            replay,
        ))
    }

    /// Reads a log without modifying it.
    ///
    /// Returns the replayed state and the length of the valid prefix.
    pub fn replay(path: &Path) -> Result<(Replay, u64), WalError> {
        let file = File::open(path).map_err(|source| WalError::Io {
            path: Some(path.to_path_buf()),
            source,
        })?;
        let file_len = file
            .metadata()
            .map_err(|source| WalError::Io {
                path: Some(path.to_path_buf()),
                source,
            })?
            .len();
        let mut reader = FrameReader::new(BufReader::new(file), DEFAULT_MAX_RECORD_BYTES);

        let corrupt = |reason: &str| WalError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let (capacity, kind) = match reader.read_next()? {
            Some(WalRecord::Config { capacity, kind }) => (capacity as usize, kind),
            Some(_) => return Err(corrupt("first record is not a config record")),
            None => return Err(corrupt("missing config record")),
        };

        // Offers in log order; a removal empties its slot.
        let mut slots: Vec<Option<Message>> = Vec::new();
        let mut live: HashMap<Uuid, usize> = HashMap::new();
        let mut records = 1;
        while let Some(record) = reader.read_next()? {
            records += 1;
            match record {
                WalRecord::Config { .. } => return Err(corrupt("duplicate config record")),
                WalRecord::Offer(message) => {
                    if let Entry::Vacant(slot) = live.entry(message.id()) {
                        slot.insert(slots.len());
                        slots.push(Some(message));
                    }
                }
                WalRecord::Remove(id) => {
                    if let Some(index) = live.remove(&id) {
                        slots[index] = None;
                    }
                }
            }
        }
        let mut messages: VecDeque<Message> = slots.into_iter().flatten().collect();
        while messages.len() > capacity {
            messages.pop_front();
        }

        let valid_len = reader.offset();
        let truncated_bytes = if reader.is_torn() {
            file_len.saturating_sub(valid_len)
        } else {
            0
        };

        Ok((
            Replay {
                capacity,
                kind,
                messages,
                records,
                truncated_bytes,
            },
            valid_len,
        ))
    }

    /// Appends a record and syncs it to disk.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Appends `records` with a single write and sync.
    ///
    /// A failed write closes the log, since the file may now end in a
    /// partial frame that later appends would bury.
    pub fn append_all(&mut self, records: &[WalRecord]) -> Result<(), WalError> {
        let mut buf = Vec::new();
        for record in records {
            buf.extend(encode_frame(record, self.max_record_bytes)?);
        }
        let file = self.file.as_mut().ok_or_else(|| WalError::Closed {
            path: self.path.clone(),
        })?;
        let written = file
            .write_all(&buf)
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data());
        if let Err(source) = written {
            self.file = None;
            #[cfg(feature = "tracing")]
            tracing::warn!("Closing write-ahead log {} after failed append", self.path.display());
            return Err(WalError::Io {
                path: Some(self.path.clone()),
                source,
            });
        }
        Ok(())
    }

    /// Rewrites the log to hold only the config record and `live` messages.
    ///
    /// The new content is written to a temporary file which then replaces
    /// the log, so a crash mid-compaction leaves the old log intact.
    pub fn compact<'a>(
        &mut self,
        capacity: usize,
        kind: QueueKind,
        live: impl IntoIterator<Item = &'a Message>,
    ) -> Result<(), WalError> {
        if self.file.is_none() {
            return Err(WalError::Closed {
                path: self.path.clone(),
            });
        }
        let tmp_path = self.path.with_extension("wal.tmp");
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| WalError::Io {
                path: Some(path),
                source,
            }
        };

        let mut buf = encode_frame(
            &WalRecord::Config {
                capacity: capacity as u64,
                kind,
            },
            self.max_record_bytes,
        )?;
        for message in live {
            buf.extend(encode_frame(
                &WalRecord::Offer(message.clone()),
                self.max_record_bytes,
            )?);
        }

        let mut tmp = File::create(&tmp_path).map_err(io(&tmp_path))?;
        tmp.write_all(&buf).map_err(io(&tmp_path))?;
        tmp.sync_all().map_err(io(&tmp_path))?;
        drop(tmp);

        self.file = None;
        fs::rename(&tmp_path, &self.path).map_err(io(&self.path))?;
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(io(&self.path))?;
        self.file = Some(file);
        Ok(())
    }

    /// Syncs and closes the file handle. Further appends fail.
    pub fn close(&mut self) -> Result<(), WalError> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(|source| WalError::Io {
                path: Some(self.path.clone()),
                source,
            })?;
        }
        Ok(())
    }

    /// Closes the log and deletes its file.
    pub fn delete(&mut self) -> Result<(), WalError> {
        self.file = None;
        fs::remove_file(&self.path).map_err(|source| WalError::Io {
            path: Some(self.path.clone()),
            source,
        })
    }

    /// Returns `true` while appends are accepted.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
