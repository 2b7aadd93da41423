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


//! Work queues.

use crate::destination::{AclTable, Destination, DestinationKind, SharedAcls};
use crate::error::IpcError;
use crate::message::{now_millis, Message, ValidationError};
use crate::transport::ConnectionId;
use crate::wal::{self, WalError, WalRecord, WriteAheadLog};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, OwnedMutexGuard};
use tokio::time::Instant;

/// What a full queue does with a new message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    /// Wait up to the caller's timeout for room, then reject.
    Bounded,
    /// Evict the oldest message.
    Circular,
}

/// Whether a queue survives a server restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Persistence {
    /// In memory only.
    #[default]
    Transient,
    /// Backed by a write-ahead log.
    Durable,
}

/// Point-in-time description of a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Queue name
    pub name: String,
    /// Overflow behavior
    pub kind: QueueKind,
    /// Maximum number of messages
    pub capacity: usize,
    /// Current number of messages
    pub size: usize,
    /// Backed by a write-ahead log
    pub durable: bool,
    /// Owned by a connection
    pub temporary: bool,
    /// Messages accepted since creation
    pub offered: u64,
    /// Messages handed out since creation
    pub polled: u64,
    /// Messages evicted or expired since creation
    pub discarded: u64,
}

type LogGuard = OwnedMutexGuard<WriteAheadLog>;

/// A named buffer of messages.
///
/// A durable queue logs every durable message it accepts before making it
/// visible, and logs its removal when it leaves, so replaying the log yields
/// exactly the live content.
///
/// The in-memory buffer sits behind a short lock that is never held across
/// I/O. On a durable queue every change first takes the log's async lock,
/// which orders changes the same way in memory and on disk; the appends
/// themselves run on the blocking pool. A change reaches memory only after
/// its records are synced, so a failed append leaves the queue as it was.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::destination::{AccessMode, AclTable, IpcQueue, QueueKind};
/// use venice_ipc::message::Message;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = IpcQueue::new("jobs", QueueKind::Bounded, 10, AclTable::new("jobs", AccessMode::ReadWrite))?;
/// queue.offer(Message::new_text("job", "text/plain", "1")?, Duration::ZERO).await?;
/// let next = queue.poll(Duration::from_millis(10)).await?;
/// assert_eq!(next.unwrap().text()?, "1");
/// # Ok(())
/// # }
/// ```
pub struct IpcQueue {
    name: String,
    kind: QueueKind,
    capacity: usize,
    owner: Option<ConnectionId>,
    acls: SharedAcls,
    items: Mutex<VecDeque<Message>>,
    log: Option<Arc<tokio::sync::Mutex<WriteAheadLog>>>,
    not_empty: Notify,
    not_full: Notify,
    dead_letters: Option<Arc<IpcQueue>>,
    offered: AtomicU64,
    polled: AtomicU64,
    discarded: AtomicU64,
}

impl IpcQueue {
    /// Creates an empty in-memory queue.
    ///
    /// # Errors
    ///
    /// Rejects a capacity of one or less.
    pub fn new(
        name: impl Into<String>,
        kind: QueueKind,
        capacity: usize,
        acls: AclTable,
    ) -> Result<Self, ValidationError> {
        if capacity <= 1 {
            return Err(ValidationError::InvalidCapacity { capacity });
        }
        Ok(Self {
            name: name.into(),
            kind,
            capacity,
            owner: None,
            acls: SharedAcls::new(acls),
            items: Mutex::new(VecDeque::new()),
            log: None,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            dead_letters: None,
            offered: AtomicU64::new(0),
            polled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Attaches the write-ahead log backing this queue.
    pub fn with_log(mut self, log: WriteAheadLog) -> Self {
        self.log = Some(Arc::new(tokio::sync::Mutex::new(log)));
        self
    }

    /// Seeds the queue with replayed messages, oldest first.
    pub fn with_messages(mut self, messages: VecDeque<Message>) -> Self {
        *self.items.get_mut() = messages;
        self
    }

    /// Marks the queue as temporary, owned by `owner`.
    pub fn temporary_for(mut self, owner: ConnectionId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Routes expired messages to `queue`.
    pub fn with_dead_letters(mut self, queue: Arc<IpcQueue>) -> Self {
        self.dead_letters = Some(queue);
        self
    }

    /// Overflow behavior.
    pub fn queue_kind(&self) -> QueueKind {
        self.kind
    }

    /// Maximum number of messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of messages.
    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if the queue holds no messages.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` if the queue has a write-ahead log.
    pub fn is_durable(&self) -> bool {
        self.log.is_some()
    }

    /// Returns `true` if a connection owns the queue.
    pub fn is_temporary(&self) -> bool {
        self.owner.is_some()
    }

    /// The owning connection of a temporary queue.
    pub fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    /// Describes the queue.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            name: self.name.clone(),
            kind: self.kind,
            capacity: self.capacity,
            size: self.size(),
            durable: self.is_durable(),
            temporary: self.is_temporary(),
            offered: self.offered.load(Ordering::Relaxed),
            polled: self.polled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Enqueues a message.
    ///
    /// A full bounded queue waits up to `timeout` for room and then fails with
    /// [`IpcError::QueueFull`]. A full circular queue evicts its oldest
    /// message instead.
    pub async fn offer(&self, message: Message, timeout: Duration) -> Result<(), IpcError> {
        let deadline = Instant::now() + timeout;
        let mut message = message;
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.push(message).await? {
                None => return Ok(()),
                Some(rejected) => message = rejected,
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(IpcError::QueueFull {
                    name: self.name.clone(),
                });
            }
        }
    }

    /// Enqueues a message without waiting for room.
    pub async fn try_offer(&self, message: Message) -> Result<(), IpcError> {
        match self.push(message).await? {
            None => Ok(()),
            Some(_) => Err(IpcError::QueueFull {
                name: self.name.clone(),
            }),
        }
    }

    /// Hands back the message if a bounded queue is full.
    async fn push(&self, message: Message) -> Result<Option<Message>, IpcError> {
        let Some(log) = &self.log else {
            let items = self.items.lock();
            let evict = match self.room(&items) {
                Room::Free => false,
                Room::Full => return Ok(Some(message)),
                Room::Evict => true,
            };
            self.commit_push(items, message, evict);
            return Ok(None);
        };

        let log = log.clone().lock_owned().await;
        let (evict, evicted_record) = {
            let items = self.items.lock();
            match self.room(&items) {
                Room::Free => (false, None),
                Room::Full => return Ok(Some(message)),
                Room::Evict => {
                    let record = items
                        .front()
                        .filter(|oldest| oldest.is_durable())
                        .map(|oldest| WalRecord::Remove(oldest.id()));
                    (true, record)
                }
            }
        };

        // The offer is logged ahead of the eviction so both land in one sync.
        let mut records = Vec::with_capacity(2);
        if message.is_durable() {
            records.push(WalRecord::Offer(message.clone()));
        }
        records.extend(evicted_record);
        let _log = append(log, records).await?;

        self.commit_push(self.items.lock(), message, evict);
        Ok(None)
    }

    fn room(&self, items: &VecDeque<Message>) -> Room {
        if items.len() < self.capacity {
            Room::Free
        } else if self.kind == QueueKind::Bounded {
            Room::Full
        } else {
            Room::Evict
        }
    }

    fn commit_push(&self, mut items: MutexGuard<'_, VecDeque<Message>>, message: Message, evict: bool) {
        if evict && items.pop_front().is_some() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        items.push_back(message);
        drop(items);
        self.offered.fetch_add(1, Ordering::Relaxed);
        self.not_empty.notify_one();
    }

    /// Dequeues the oldest live message, waiting up to `timeout` for one.
    ///
    /// Expired messages found on the way are moved to the dead-letter queue.
    /// Returns `Ok(None)` if the queue stayed empty.
    pub async fn poll(&self, timeout: Duration) -> Result<Option<Message>, IpcError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.pop().await? {
                return Ok(Some(message));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn pop(&self) -> Result<Option<Message>, IpcError> {
        let now = now_millis();
        let (popped, expired) = match &self.log {
            None => self.take_front(&mut self.items.lock(), now),
            Some(log) => {
                let log = log.clone().lock_owned().await;
                let records: Vec<WalRecord> = {
                    let items = self.items.lock();
                    let taken = front_run(&items, now);
                    items
                        .iter()
                        .take(taken)
                        .filter(|m| m.is_durable())
                        .map(|m| WalRecord::Remove(m.id()))
                        .collect()
                };
                let _log = append(log, records).await?;
                self.take_front(&mut self.items.lock(), now)
            }
        };

        if !expired.is_empty() {
            self.discarded.fetch_add(expired.len() as u64, Ordering::Relaxed);
            self.not_full.notify_one();
        }
        for message in expired {
            self.dead_letter(message).await;
        }
        if popped.is_some() {
            self.polled.fetch_add(1, Ordering::Relaxed);
            self.not_full.notify_one();
        }
        Ok(popped)
    }

    /// Removes the expired messages at the front and the live one behind them.
    fn take_front(&self, items: &mut VecDeque<Message>, now: i64) -> (Option<Message>, Vec<Message>) {
        let taken = front_run(items, now);
        let mut expired: Vec<Message> = items.drain(..taken).collect();
        let popped = match expired.last() {
            Some(last) if !last.is_expired_at(now) => expired.pop(),
            _ => None,
        };
        (popped, expired)
    }

    async fn dead_letter(&self, message: Message) {
        let Some(dead_letters) = &self.dead_letters else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Dropping expired message {} from {}", message.id(), self.name);
            return;
        };
        if let Err(e) = dead_letters.try_offer(message).await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to dead-letter expired message from {}: {}", self.name, e);
        }
    }

    /// Drops every message, returning how many were removed.
    pub async fn clear(&self) -> Result<usize, IpcError> {
        let removed = match &self.log {
            None => self.items.lock().drain(..).count(),
            Some(log) => {
                let log = log.clone().lock_owned().await;
                let records: Vec<WalRecord> = self
                    .items
                    .lock()
                    .iter()
                    .filter(|m| m.is_durable())
                    .map(|m| WalRecord::Remove(m.id()))
                    .collect();
                let _log = append(log, records).await?;
                self.items.lock().drain(..).count()
            }
        };
        self.discarded.fetch_add(removed as u64, Ordering::Relaxed);
        self.not_full.notify_waiters();
        Ok(removed)
    }

    /// Syncs and closes the log. The queue stays usable in memory.
    pub async fn close(&self) -> Result<(), WalError> {
        match &self.log {
            Some(log) => {
                let mut log = log.clone().lock_owned().await;
                wal::blocking(move || log.close()).await
            }
            None => Ok(()),
        }
    }

    /// Empties the queue and deletes its log file.
    pub async fn destroy(&self) -> Result<(), WalError> {
        self.items.lock().clear();
        match &self.log {
            Some(log) => {
                let mut log = log.clone().lock_owned().await;
                wal::blocking(move || log.delete()).await
            }
            None => Ok(()),
        }
    }
}

enum Room {
    Free,
    Full,
    Evict,
}

/// Number of front messages a poll takes: every expired one plus the first
/// live one, if any.
fn front_run(items: &VecDeque<Message>, now: i64) -> usize {
    match items.iter().position(|m| !m.is_expired_at(now)) {
        Some(live) => live + 1,
        None => items.len(),
    }
}

/// Appends `records` on the blocking pool and hands the log back.
async fn append(mut log: LogGuard, records: Vec<WalRecord>) -> Result<LogGuard, WalError> {
    if records.is_empty() {
        return Ok(log);
    }
    wal::blocking(move || {
        log.append_all(&records)?;
        Ok(log)
    })
    .await
}

impl Destination for IpcQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Queue
    }

    fn acls(&self) -> Arc<AclTable> {
        self.acls.load()
    }

    fn update_acls(&self, acls: Vec<crate::destination::Acl>) {
        self.acls.update(acls);
    }
}

impl std::fmt::Debug for IpcQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcQueue")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::AccessMode;

    fn queue(kind: QueueKind, capacity: usize) -> IpcQueue {
        IpcQueue::new("q", kind, capacity, AclTable::new("q", AccessMode::ReadWrite)).unwrap()
    }

    fn msg(text: &str) -> Message {
        Message::new_text("s", "text/plain", text).unwrap()
    }

    #[test]
    fn test_capacity_must_exceed_one() {
        let acls = AclTable::new("q", AccessMode::ReadWrite);
        assert_eq!(
            IpcQueue::new("q", QueueKind::Bounded, 1, acls.clone()).unwrap_err(),
            ValidationError::InvalidCapacity { capacity: 1 }
        );
        assert!(IpcQueue::new("q", QueueKind::Bounded, 2, acls).is_ok());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let q = queue(QueueKind::Bounded, 10);
        for i in 0..3 {
            q.offer(msg(&i.to_string()), Duration::ZERO).await.unwrap();
        }
        for i in 0..3 {
            let m = q.poll(Duration::ZERO).await.unwrap().unwrap();
            assert_eq!(m.text().unwrap(), i.to_string());
        }
        assert!(q.poll(Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bounded_rejects_after_timeout() {
        let q = queue(QueueKind::Bounded, 2);
        q.offer(msg("a"), Duration::ZERO).await.unwrap();
        q.offer(msg("b"), Duration::ZERO).await.unwrap();

        let start = std::time::Instant::now();
        let err = q.offer(msg("c"), Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, IpcError::QueueFull { .. }));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(q.size(), 2);
    }

    #[tokio::test]
    async fn test_bounded_offer_waits_for_room() {
        let q = Arc::new(queue(QueueKind::Bounded, 2));
        q.offer(msg("a"), Duration::ZERO).await.unwrap();
        q.offer(msg("b"), Duration::ZERO).await.unwrap();

        let producer = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.offer(msg("c"), Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "a");
        producer.await.unwrap().unwrap();

        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "b");
        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "c");
    }

    #[tokio::test]
    async fn test_circular_evicts_oldest() {
        let q = queue(QueueKind::Circular, 2);
        for text in ["a", "b", "c", "d"] {
            q.offer(msg(text), Duration::ZERO).await.unwrap();
        }
        assert_eq!(q.size(), 2);
        assert_eq!(q.status().discarded, 2);
        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "c");
        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "d");
    }

    #[tokio::test]
    async fn test_poll_waits_for_offer() {
        let q = Arc::new(queue(QueueKind::Bounded, 4));
        let consumer = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.poll(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.offer(msg("late"), Duration::ZERO).await.unwrap();
        let got = consumer.await.unwrap().unwrap().unwrap();
        assert_eq!(got.text().unwrap(), "late");
    }

    #[tokio::test]
    async fn test_expired_messages_dead_lettered() {
        let dlq = Arc::new(queue(QueueKind::Circular, 10));
        let q = queue(QueueKind::Bounded, 4).with_dead_letters(Arc::clone(&dlq));

        q.offer(msg("stale").with_expires_at(1), Duration::ZERO).await.unwrap();
        q.offer(msg("fresh"), Duration::ZERO).await.unwrap();

        let got = q.poll(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(got.text().unwrap(), "fresh");
        assert_eq!(dlq.size(), 1);
        assert_eq!(dlq.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "stale");
    }

    #[tokio::test]
    async fn test_durable_messages_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.wal");
        {
            let log = WriteAheadLog::create(&path, 4, QueueKind::Bounded).unwrap();
            let q = queue(QueueKind::Bounded, 4).with_log(log);
            assert!(q.is_durable());
            q.offer(msg("one").with_durable(true), Duration::ZERO).await.unwrap();
            q.offer(msg("transient"), Duration::ZERO).await.unwrap();
            q.offer(msg("two").with_durable(true), Duration::ZERO).await.unwrap();
            assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "one");
            q.close().await.unwrap();
        }

        let (log, replay) = WriteAheadLog::open(&path).unwrap();
        let q = queue(replay.kind, replay.capacity)
            .with_log(log)
            .with_messages(replay.messages);
        assert_eq!(q.size(), 1);
        assert_eq!(q.poll(Duration::ZERO).await.unwrap().unwrap().text().unwrap(), "two");
    }

    #[tokio::test]
    async fn test_clear_and_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.wal");
        let log = WriteAheadLog::create(&path, 4, QueueKind::Bounded).unwrap();
        let q = queue(QueueKind::Bounded, 4).with_log(log);
        q.offer(msg("a").with_durable(true), Duration::ZERO).await.unwrap();
        q.offer(msg("b"), Duration::ZERO).await.unwrap();

        assert_eq!(q.clear().await.unwrap(), 2);
        assert!(q.is_empty());
        let (replay, _) = WriteAheadLog::replay(&path).unwrap();
        assert!(replay.messages.is_empty());

        q.destroy().await.unwrap();
        assert!(!path.exists());
        assert!(q.offer(msg("c").with_durable(true), Duration::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_eviction_keeps_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.wal");
        let log = WriteAheadLog::create(&path, 2, QueueKind::Circular).unwrap();
        let q = queue(QueueKind::Circular, 2).with_log(log);
        q.offer(msg("a").with_durable(true), Duration::ZERO).await.unwrap();
        q.offer(msg("b").with_durable(true), Duration::ZERO).await.unwrap();
        q.close().await.unwrap();

        let err = q.offer(msg("c").with_durable(true), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, IpcError::Wal(WalError::Closed { .. })));
        assert_eq!(q.size(), 2);
        assert_eq!(q.status().discarded, 0);

        let (replay, _) = WriteAheadLog::replay(&path).unwrap();
        let texts: Vec<_> = replay.messages.iter().map(|m| m.text().unwrap()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_expired_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.wal");
        let dlq = Arc::new(queue(QueueKind::Circular, 10));
        let log = WriteAheadLog::create(&path, 4, QueueKind::Bounded).unwrap();
        let q = queue(QueueKind::Bounded, 4)
            .with_log(log)
            .with_dead_letters(Arc::clone(&dlq));
        q.offer(msg("stale").with_durable(true).with_expires_at(1), Duration::ZERO)
            .await
            .unwrap();
        q.offer(msg("fresh").with_durable(true), Duration::ZERO).await.unwrap();
        q.close().await.unwrap();

        assert!(q.poll(Duration::ZERO).await.is_err());
        assert_eq!(q.size(), 2);
        assert!(dlq.is_empty());
        assert_eq!(q.status().discarded, 0);

        let (replay, _) = WriteAheadLog::replay(&path).unwrap();
        assert_eq!(replay.messages.len(), 2);
    }

    #[test]
    fn test_destination_acls() {
        let q = IpcQueue::new("q", QueueKind::Bounded, 2, AclTable::new("q", AccessMode::Read)).unwrap();
        assert!(q.can_read(None));
        assert!(!q.can_write(None));
        q.update_acls(vec![crate::destination::Acl::new("q", "w", AccessMode::Write)]);
        assert!(q.can_write(Some("w")));
        assert!(q.can_execute(Some("w")));
        assert!(!q.can_read(Some("w")));
    }
}
