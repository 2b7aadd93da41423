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


//! Server lifecycle.
//!
//! Startup order is encoded in types: a [`BoundServer`] owns the listener,
//! [`BoundServer::recover`] replays the write-ahead logs into a
//! [`RecoveredServer`], and only [`RecoveredServer::start`] begins accepting
//! connections. No connection is serviced before every durable queue is
//! back in memory.

use crate::destination::FunctionHandler;
use crate::error::IpcError;
use crate::observability::{ErrorEntry, ServerStatisticsSnapshot};
use crate::server::connection;
use crate::server::context::ServerContext;
use crate::server::{FunctionManager, QueueManager, ServerConfig, ServerSettings, TopicManager};
use crate::transport::{TcpTransport, TransportError};
use crate::wal::{self, WalError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

/// Time connections get to finish after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Entry point of the server lifecycle.
///
/// # Examples
///
/// ```rust,no_run
/// use venice_ipc::destination::HandlerError;
/// use venice_ipc::message::Message;
/// use venice_ipc::server::{Server, ServerConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bound = Server::bind(ServerConfig::new("127.0.0.1:0").with_wal_dir("/var/lib/venice")).await?;
/// let echo = |request: Message| -> Result<Message, HandlerError> { Ok(request) };
/// bound.functions().register("echo", Arc::new(echo))?;
///
/// let server = bound.recover()?.start();
/// println!("listening on {}", server.local_addr());
/// server.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Server;

impl Server {
    /// Binds the listener and creates the registries.
    pub async fn bind(config: ServerConfig) -> Result<BoundServer, IpcError> {
        let listener = TcpTransport::bind(config.address.clone()).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Io { source })?;
        let context = Arc::new(ServerContext::new(config)?);
        Ok(BoundServer {
            listener,
            local_addr,
            context,
        })
    }

    /// Binds, recovers and starts in one step.
    pub async fn start(config: ServerConfig) -> Result<RunningServer, IpcError> {
        Ok(Self::bind(config).await?.recover()?.start())
    }
}

/// A server whose listener is bound but not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<ServerContext>,
}

impl BoundServer {
    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The function registry, for registering handlers before start.
    pub fn functions(&self) -> &FunctionManager {
        &self.context.functions
    }

    /// Registers a function handler.
    pub fn register_function(&self, name: &str, handler: Arc<dyn FunctionHandler>) -> Result<(), IpcError> {
        self.context.functions.register(name, handler).map(|_| ())
    }

    /// Replays every write-ahead log in the WAL directory.
    ///
    /// # Errors
    ///
    /// Any log that cannot be replayed fails startup.
    pub fn recover(self) -> Result<RecoveredServer, IpcError> {
        let mut recovered = 0;
        if let Some(dir) = &self.context.config.wal_dir {
            std::fs::create_dir_all(dir).map_err(|source| WalError::Io {
                path: Some(dir.clone()),
                source,
            })?;
            let logs = wal::list_logs(dir)?;
            #[cfg(feature = "tracing")]
            tracing::info!("Recovering {} durable queues from {}", logs.len(), dir.display());
            let compact = self.context.config.wal_compact_at_start;
            for (name, path) in logs {
                self.context.queues.recover_queue(&name, &path, compact)?;
                recovered += 1;
            }
        }
        Ok(RecoveredServer {
            listener: self.listener,
            local_addr: self.local_addr,
            context: self.context,
            recovered,
        })
    }
}

/// A server with every durable queue replayed, ready to accept.
pub struct RecoveredServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<ServerContext>,
    recovered: usize,
}

impl RecoveredServer {
    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of queues rebuilt from logs.
    pub fn recovered_queues(&self) -> usize {
        self.recovered
    }

    /// The queue registry, holding the recovered queues.
    pub fn queues(&self) -> &QueueManager {
        &self.context.queues
    }

    /// The function registry.
    pub fn functions(&self) -> &FunctionManager {
        &self.context.functions
    }

    /// Starts the accept loop.
    pub fn start(self) -> RunningServer {
        let (shutdown, signal) = watch::channel(false);
        let accept = tokio::spawn(accept_loop(self.listener, self.context.clone(), signal));
        #[cfg(feature = "tracing")]
        tracing::info!("Server accepting connections on {}", self.local_addr);
        RunningServer {
            local_addr: self.local_addr,
            context: self.context,
            shutdown,
            accept,
        }
    }
}

/// A server accepting connections.
///
/// Dropping it without calling [`shutdown`](Self::shutdown) also stops the
/// accept loop and every connection, but leaves the logs unsynced.
pub struct RunningServer {
    local_addr: SocketAddr,
    context: Arc<ServerContext>,
    shutdown: watch::Sender<bool>,
    accept: JoinHandle<()>,
}

impl RunningServer {
    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns `true` while the accept loop runs.
    pub fn is_running(&self) -> bool {
        !self.accept.is_finished()
    }

    /// The settings advertised to clients.
    pub fn settings(&self) -> &ServerSettings {
        &self.context.settings
    }

    /// The queue registry.
    pub fn queues(&self) -> &QueueManager {
        &self.context.queues
    }

    /// The topic registry.
    pub fn topics(&self) -> &TopicManager {
        &self.context.topics
    }

    /// The function registry.
    pub fn functions(&self) -> &FunctionManager {
        &self.context.functions
    }

    /// Current server counters.
    pub fn statistics(&self) -> ServerStatisticsSnapshot {
        self.context.statistics.snapshot()
    }

    /// Recently logged errors, oldest first.
    pub fn errors(&self) -> Vec<ErrorEntry> {
        self.context.errors.snapshot()
    }

    /// Stops accepting, closes every connection and syncs every log.
    pub async fn shutdown(self) -> Result<(), IpcError> {
        #[cfg(feature = "tracing")]
        tracing::info!("Shutting down server on {}", self.local_addr);
        self.shutdown.send_replace(true);
        if let Err(e) = self.accept.await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Accept loop of {} ended abnormally: {}", self.local_addr, e);
        }
        self.context.queues.close().await
    }
}

impl std::fmt::Debug for RunningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningServer")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn accept_loop(listener: TcpListener, context: Arc<ServerContext>, mut shutdown: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = TcpTransport::accept(&listener) => match accepted {
                Ok((transport, peer)) => {
                    let limit = context.config.max_connections;
                    if limit.is_some_and(|max| context.statistics.active_connections() >= max as u64) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Refusing connection from {}: connection limit reached", peer);
                        context.statistics.record_connection_rejected();
                        continue;
                    }
                    context.statistics.record_connection_opened();
                    #[cfg(feature = "tracing")]
                    tracing::info!("Accepted connection {} from {}", transport.id(), peer);
                    connections.spawn(connection::serve(transport, context.clone(), shutdown.clone()));
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Error accepting connection: {}", e);
                }
            },
        }
    }
    drop(listener);

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        #[cfg(feature = "tracing")]
        tracing::warn!("Aborting {} connections after shutdown grace", connections.len());
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}
