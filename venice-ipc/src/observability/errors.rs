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


//! Recent error log.

use crate::message::now_millis;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of errors kept.
pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 100;

/// One logged error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// When it happened, epoch millis
    pub timestamp: i64,
    /// Where it happened, e.g. a connection id
    pub context: String,
    /// Error text
    pub message: String,
}

/// A bounded ring of the most recent errors.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::observability::ErrorLog;
///
/// let log = ErrorLog::new(2);
/// log.record("conn-1", "first");
/// log.record("conn-1", "second");
/// log.record("conn-2", "third");
///
/// let recent = log.snapshot();
/// assert_eq!(recent.len(), 2);
/// assert_eq!(recent[0].message, "second");
/// ```
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorEntry>>,
}

impl ErrorLog {
    /// Creates a log keeping at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Records an error, evicting the oldest when full.
    pub fn record(&self, context: impl Into<String>, message: impl Into<String>) {
        let entry = ErrorEntry {
            timestamp: now_millis(),
            context: context.into(),
            message: message.into(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the logged errors, oldest first.
    pub fn snapshot(&self) -> Vec<ErrorEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of logged errors.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_CAPACITY)
    }
}
