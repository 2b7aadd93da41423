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


//! Queue registry.

use crate::destination::{
    AccessMode, Destination, DestinationKind, IpcQueue, Persistence, QueueKind, QueueStatus,
};
use crate::error::IpcError;
use crate::message::{validate_queue_name, Message, ValidationError};
use crate::server::Authenticator;
use crate::transport::ConnectionId;
use crate::wal::{self, WriteAheadLog};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Name of the always-present dead-letter queue.
pub const DEAD_LETTER_QUEUE: &str = "dead-letter-queue";

/// Capacity of the dead-letter queue.
pub const DEAD_LETTER_CAPACITY: usize = 1000;

/// Prefix of generated temporary queue names.
pub const TEMPORARY_QUEUE_PREFIX: &str = "temp-";

/// Owns every queue of a server.
///
/// Lookups take a short read lock. Creations and removals are serialized by
/// a separate async lock, so a durable creation can create and sync its log
/// on the blocking pool without stalling lookups, and concurrent creators of
/// one name still converge on one queue. The dead-letter queue is created
/// with the manager and never counts against the queue limit.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::destination::{Persistence, QueueKind};
/// use venice_ipc::server::{Authenticator, QueueManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), venice_ipc::IpcError> {
/// let manager = QueueManager::new(20, None, Arc::new(Authenticator::new()))?;
/// let jobs = manager.create_queue("jobs", 10, QueueKind::Bounded, Persistence::Transient).await?;
/// let again = manager.create_queue("jobs", 10, QueueKind::Bounded, Persistence::Transient).await?;
/// assert!(Arc::ptr_eq(&jobs, &again));
///
/// // Durable queues need a WAL directory
/// assert!(manager.create_queue("log", 10, QueueKind::Bounded, Persistence::Durable).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueueManager {
    queues: RwLock<HashMap<String, Arc<IpcQueue>>>,
    mutations: tokio::sync::Mutex<()>,
    max_queues: usize,
    wal_dir: Option<PathBuf>,
    authenticator: Arc<Authenticator>,
    dead_letters: Arc<IpcQueue>,
}

impl QueueManager {
    /// Creates a manager holding only the dead-letter queue.
    pub fn new(
        max_queues: usize,
        wal_dir: Option<PathBuf>,
        authenticator: Arc<Authenticator>,
    ) -> Result<Self, IpcError> {
        let acls = authenticator.seeded(DestinationKind::Queue, DEAD_LETTER_QUEUE, AccessMode::Deny);
        let dead_letters = Arc::new(IpcQueue::new(
            DEAD_LETTER_QUEUE,
            QueueKind::Circular,
            DEAD_LETTER_CAPACITY,
            acls,
        )?);
        let mut queues = HashMap::new();
        queues.insert(DEAD_LETTER_QUEUE.to_string(), dead_letters.clone());
        Ok(Self {
            queues: RwLock::new(queues),
            mutations: tokio::sync::Mutex::new(()),
            max_queues,
            wal_dir,
            authenticator,
            dead_letters,
        })
    }

    /// The dead-letter queue.
    pub fn dead_letter_queue(&self) -> &Arc<IpcQueue> {
        &self.dead_letters
    }

    /// Moves an undeliverable message to the dead-letter queue.
    pub async fn dead_letter(&self, message: Message) {
        let id = message.id();
        if let Err(e) = self.dead_letters.try_offer(message).await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dropping undeliverable message {}: {}", id, e);
        }
    }

    /// Returns `true` if durable queues are available.
    pub fn is_durable_enabled(&self) -> bool {
        self.wal_dir.is_some()
    }

    /// Creates a queue, or returns the existing one with the same settings.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Validation`] for a bad name or a capacity of one or less
    /// - [`IpcError::InvalidRequest`] for a durable queue without a WAL
    ///   directory
    /// - [`IpcError::Conflict`] if the name exists with other settings
    /// - [`IpcError::Capacity`] if the queue limit is reached
    pub async fn create_queue(
        &self,
        name: &str,
        capacity: usize,
        kind: QueueKind,
        persistence: Persistence,
    ) -> Result<Arc<IpcQueue>, IpcError> {
        validate_queue_name(name)?;
        if capacity <= 1 {
            return Err(ValidationError::InvalidCapacity { capacity }.into());
        }
        let durable = persistence == Persistence::Durable;
        let wal_dir = match (durable, &self.wal_dir) {
            (true, None) => {
                return Err(IpcError::InvalidRequest {
                    reason: format!("durable queue '{name}' requires a WAL directory"),
                })
            }
            (true, Some(dir)) => Some(dir.as_path()),
            (false, _) => None,
        };

        if let Some(existing) = self.lookup(name) {
            return Self::same_settings(&existing, name, capacity, kind, durable);
        }

        let _mutations = self.mutations.lock().await;
        if let Some(existing) = self.lookup(name) {
            return Self::same_settings(&existing, name, capacity, kind, durable);
        }
        self.check_limit(self.len())?;

        let acls = self.authenticator.acls_for(DestinationKind::Queue, name);
        let mut queue = IpcQueue::new(name, kind, capacity, acls)?.with_dead_letters(self.dead_letters.clone());
        if let Some(dir) = wal_dir {
            let path = wal::log_path(dir, name);
            let log = wal::blocking(move || WriteAheadLog::create(path, capacity, kind)).await?;
            queue = queue.with_log(log);
        }
        let queue = Arc::new(queue);
        self.queues.write().insert(name.to_string(), queue.clone());

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Created {} queue {} (capacity {}, {:?})",
            if durable { "durable" } else { "transient" },
            name,
            capacity,
            kind
        );
        Ok(queue)
    }

    /// Creates a queue owned by `owner`, removed when that connection closes.
    pub async fn create_temporary_queue(
        &self,
        owner: ConnectionId,
        capacity: usize,
        kind: QueueKind,
    ) -> Result<Arc<IpcQueue>, IpcError> {
        if capacity <= 1 {
            return Err(ValidationError::InvalidCapacity { capacity }.into());
        }
        let name = format!("{TEMPORARY_QUEUE_PREFIX}{}", Uuid::new_v4());
        let acls = self.authenticator.acls_for(DestinationKind::Queue, &name);
        let queue = Arc::new(
            IpcQueue::new(name.clone(), kind, capacity, acls)?
                .temporary_for(owner)
                .with_dead_letters(self.dead_letters.clone()),
        );

        let _mutations = self.mutations.lock().await;
        self.check_limit(self.len())?;
        self.queues.write().insert(name.clone(), queue.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!("Created temporary queue {} for {}", name, owner);
        Ok(queue)
    }

    /// Rebuilds a durable queue from its log.
    ///
    /// Recovery bypasses the queue limit: a queue that existed before a
    /// restart always comes back.
    pub fn recover_queue(&self, name: &str, path: &Path, compact: bool) -> Result<Arc<IpcQueue>, IpcError> {
        validate_queue_name(name)?;
        let (mut log, replay) = WriteAheadLog::open(path)?;
        if compact {
            log.compact(replay.capacity, replay.kind, replay.messages.iter())?;
        }
        let acls = self.authenticator.acls_for(DestinationKind::Queue, name);
        let queue = IpcQueue::new(name, replay.kind, replay.capacity, acls)?
            .with_log(log)
            .with_messages(replay.messages)
            .with_dead_letters(self.dead_letters.clone());
        let queue = Arc::new(queue);

        let mut queues = self.queues.write();
        if queues.len() > self.max_queues {
            #[cfg(feature = "tracing")]
            tracing::warn!("Recovered queue {} exceeds the limit of {}", name, self.max_queues);
        }
        queues.insert(name.to_string(), queue.clone());
        drop(queues);

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Recovered queue {} with {} messages from {} records",
            name,
            queue.size(),
            replay.records
        );
        Ok(queue)
    }

    fn lookup(&self, name: &str) -> Option<Arc<IpcQueue>> {
        self.queues.read().get(name).cloned()
    }

    /// Looks up a queue.
    pub fn get_queue(&self, name: &str) -> Result<Arc<IpcQueue>, IpcError> {
        self.queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IpcError::NotFound {
                kind: DestinationKind::Queue,
                name: name.to_string(),
            })
    }

    /// Returns `true` if the queue exists.
    pub fn exists_queue(&self, name: &str) -> bool {
        self.queues.read().contains_key(name)
    }

    /// Removes a queue and deletes its log.
    ///
    /// The dead-letter queue and temporary queues cannot be removed this way.
    pub async fn remove_queue(&self, name: &str) -> Result<(), IpcError> {
        if name == DEAD_LETTER_QUEUE {
            return Err(IpcError::InvalidRequest {
                reason: "the dead-letter queue cannot be removed".to_string(),
            });
        }
        // Held until the log is gone, so a new queue of this name cannot
        // create its log first and lose it.
        let _mutations = self.mutations.lock().await;
        let queue = {
            let mut queues = self.queues.write();
            match queues.get(name) {
                None => {
                    return Err(IpcError::NotFound {
                        kind: DestinationKind::Queue,
                        name: name.to_string(),
                    })
                }
                Some(queue) if queue.is_temporary() => {
                    return Err(IpcError::InvalidRequest {
                        reason: format!("temporary queue '{name}' is removed with its connection"),
                    })
                }
                Some(_) => {}
            }
            queues.remove(name)
        };
        if let Some(queue) = queue {
            queue.destroy().await?;
            #[cfg(feature = "tracing")]
            tracing::info!("Removed queue {}", name);
        }
        Ok(())
    }

    /// Removes every temporary queue owned by `owner`.
    pub fn remove_temporary_queues(&self, owner: ConnectionId) -> usize {
        let mut queues = self.queues.write();
        let before = queues.len();
        queues.retain(|_, queue| queue.owner() != Some(owner));
        let removed = before - queues.len();
        if removed > 0 {
            #[cfg(feature = "tracing")]
            tracing::debug!("Removed {} temporary queues of {}", removed, owner);
        }
        removed
    }

    /// Describes a queue.
    pub fn queue_status(&self, name: &str) -> Result<QueueStatus, IpcError> {
        Ok(self.get_queue(name)?.status())
    }

    /// Drops every message of a queue.
    pub async fn clear_queue(&self, name: &str) -> Result<usize, IpcError> {
        self.get_queue(name)?.clear().await
    }

    /// All queue names, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of queues, the dead-letter queue included.
    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    /// Always `false`: the dead-letter queue is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Syncs and closes every log. Queues remain usable in memory.
    pub async fn close(&self) -> Result<(), IpcError> {
        let queues: Vec<Arc<IpcQueue>> = self.queues.read().values().cloned().collect();
        let mut first_error = None;
        for queue in queues.iter().filter(|q| q.is_durable()) {
            if let Err(e) = queue.close().await {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to close log of queue {}: {}", queue.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn check_limit(&self, len: usize) -> Result<(), IpcError> {
        // The dead-letter queue is always in the map.
        if len.saturating_sub(1) >= self.max_queues {
            return Err(IpcError::Capacity {
                kind: DestinationKind::Queue,
                max: self.max_queues,
            });
        }
        Ok(())
    }

    fn same_settings(
        existing: &Arc<IpcQueue>,
        name: &str,
        capacity: usize,
        kind: QueueKind,
        durable: bool,
    ) -> Result<Arc<IpcQueue>, IpcError> {
        if existing.capacity() == capacity
            && existing.queue_kind() == kind
            && existing.is_durable() == durable
            && !existing.is_temporary()
        {
            Ok(existing.clone())
        } else {
            Err(IpcError::Conflict {
                kind: DestinationKind::Queue,
                name: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager(max: usize, wal_dir: Option<PathBuf>) -> QueueManager {
        QueueManager::new(max, wal_dir, Arc::new(Authenticator::new())).unwrap()
    }

    #[tokio::test]
    async fn test_dead_letter_queue_present() {
        let manager = manager(2, None);
        let dlq = manager.get_queue(DEAD_LETTER_QUEUE).unwrap();
        assert_eq!(dlq.capacity(), DEAD_LETTER_CAPACITY);
        assert_eq!(dlq.queue_kind(), QueueKind::Circular);
        assert!(!dlq.can_read(None));
        assert!(manager.remove_queue(DEAD_LETTER_QUEUE).await.is_err());
    }

    #[tokio::test]
    async fn test_create_validates() {
        let manager = manager(2, None);
        assert!(matches!(
            manager.create_queue("wal", 10, QueueKind::Bounded, Persistence::Transient).await,
            Err(IpcError::Validation(_))
        ));
        assert!(matches!(
            manager.create_queue("q", 1, QueueKind::Bounded, Persistence::Transient).await,
            Err(IpcError::Validation(ValidationError::InvalidCapacity { capacity: 1 }))
        ));
        assert!(matches!(
            manager.create_queue("q", 10, QueueKind::Bounded, Persistence::Durable).await,
            Err(IpcError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_conflict_and_limit() {
        let manager = manager(2, None);
        manager.create_queue("a", 10, QueueKind::Bounded, Persistence::Transient).await.unwrap();
        assert!(matches!(
            manager.create_queue("a", 5, QueueKind::Bounded, Persistence::Transient).await,
            Err(IpcError::Conflict { .. })
        ));
        manager.create_queue("b", 10, QueueKind::Circular, Persistence::Transient).await.unwrap();
        assert!(matches!(
            manager.create_queue("c", 10, QueueKind::Bounded, Persistence::Transient).await,
            Err(IpcError::Capacity { max: 2, .. })
        ));
        assert_eq!(manager.queue_names(), vec!["a", "b", DEAD_LETTER_QUEUE]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creators_converge() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(manager(20, Some(dir.path().to_path_buf())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    let shared = manager
                        .create_queue("shared", 10, QueueKind::Bounded, Persistence::Transient)
                        .await
                        .unwrap();
                    let logged = manager
                        .create_queue("logged", 10, QueueKind::Bounded, Persistence::Durable)
                        .await
                        .unwrap();
                    (shared, logged)
                })
            })
            .collect();
        let mut queues = Vec::new();
        for handle in handles {
            queues.push(handle.await.unwrap());
        }
        assert!(queues.iter().all(|(s, _)| Arc::ptr_eq(s, &queues[0].0)));
        assert!(queues.iter().all(|(_, l)| Arc::ptr_eq(l, &queues[0].1)));
        assert_eq!(manager.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_recreate_after_remove_keeps_new_log() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(manager(5, Some(dir.path().to_path_buf())));
        let path = wal::log_path(dir.path(), "q");
        for _ in 0..20 {
            manager
                .create_queue("q", 10, QueueKind::Bounded, Persistence::Durable)
                .await
                .unwrap();
            let remover = {
                let manager = manager.clone();
                tokio::spawn(async move { manager.remove_queue("q").await })
            };
            let creator = {
                let manager = manager.clone();
                tokio::spawn(async move {
                    manager
                        .create_queue("q", 10, QueueKind::Bounded, Persistence::Durable)
                        .await
                })
            };
            remover.await.unwrap().unwrap();
            creator.await.unwrap().unwrap();
            // Whichever ran last decides, but registry and disk agree.
            assert_eq!(manager.exists_queue("q"), path.exists());
            if manager.exists_queue("q") {
                manager.remove_queue("q").await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_temporary_queue_lifecycle() {
        let manager = manager(5, None);
        let owner = ConnectionId::next();
        let queue = manager.create_temporary_queue(owner, 10, QueueKind::Bounded).await.unwrap();
        let name = queue.name().to_string();
        assert!(name.starts_with(TEMPORARY_QUEUE_PREFIX));
        assert!(matches!(
            manager.remove_queue(&name).await,
            Err(IpcError::InvalidRequest { .. })
        ));
        assert_eq!(manager.remove_temporary_queues(ConnectionId::next()), 0);
        assert_eq!(manager.remove_temporary_queues(owner), 1);
        assert!(!manager.exists_queue(&name));
    }

    #[tokio::test]
    async fn test_durable_recovery() {
        let dir = tempfile::tempdir().unwrap();
        {
            let manager = manager(5, Some(dir.path().to_path_buf()));
            let queue = manager
                .create_queue("orders/eu", 10, QueueKind::Bounded, Persistence::Durable)
                .await
                .unwrap();
            for i in 0..3 {
                let message = Message::new_text("order", "text/plain", format!("{i}"))
                    .unwrap()
                    .with_durable(true);
                queue.offer(message, Duration::ZERO).await.unwrap();
            }
            queue.poll(Duration::ZERO).await.unwrap();
            manager.close().await.unwrap();
        }

        let manager = manager(5, Some(dir.path().to_path_buf()));
        let path = wal::log_path(dir.path(), "orders/eu");
        let queue = manager.recover_queue("orders/eu", &path, true).unwrap();
        assert_eq!(queue.size(), 2);
        assert!(queue.is_durable());
        let next = queue.poll(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(next.text().unwrap(), "1");
    }

    #[tokio::test]
    async fn test_remove_deletes_log() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(5, Some(dir.path().to_path_buf()));
        manager.create_queue("q", 10, QueueKind::Bounded, Persistence::Durable).await.unwrap();
        let path = wal::log_path(dir.path(), "q");
        assert!(path.exists());
        manager.remove_queue("q").await.unwrap();
        assert!(!path.exists());
        assert!(matches!(manager.remove_queue("q").await, Err(IpcError::NotFound { .. })));
    }
}
