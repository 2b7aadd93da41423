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


//! State shared by every connection of a server.

use crate::error::IpcError;
use crate::observability::{ErrorLog, ServerStatistics};
use crate::protocol::{Codec, PROTOCOL_VERSION};
use crate::server::{
    FunctionManager, QueueManager, ServerConfig, ServerSettings, ServerStatusReport, TopicManager,
};
use crate::transport::Compressor;
use std::time::Instant;

pub(crate) struct ServerContext {
    pub(crate) config: ServerConfig,
    pub(crate) settings: ServerSettings,
    pub(crate) queues: QueueManager,
    pub(crate) topics: TopicManager,
    pub(crate) functions: FunctionManager,
    pub(crate) statistics: ServerStatistics,
    pub(crate) errors: ErrorLog,
    started: Instant,
}

impl ServerContext {
    pub(crate) fn new(config: ServerConfig) -> Result<Self, IpcError> {
        let authenticator = config.authenticator.clone();
        let queues = QueueManager::new(config.max_queues, config.wal_dir.clone(), authenticator.clone())?;
        let topics = TopicManager::new(config.max_topics, authenticator.clone());
        let functions = FunctionManager::new(config.max_functions, authenticator);
        Ok(Self {
            settings: config.settings(),
            config,
            queues,
            topics,
            functions,
            statistics: ServerStatistics::new(),
            errors: ErrorLog::default(),
            started: Instant::now(),
        })
    }

    /// A fresh plaintext codec for a new connection.
    pub(crate) fn codec(&self) -> Codec {
        Codec::new(self.config.max_message_size)
            .with_compressor(Compressor::new(self.config.compress_cutoff_size))
    }

    pub(crate) fn status_report(&self) -> ServerStatusReport {
        ServerStatusReport {
            server_version: self.settings.server_version.clone(),
            protocol_version: PROTOCOL_VERSION,
            uptime_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            encrypt: self.config.encrypt,
            authentication: self.settings.authentication,
            durable_queues: self.queues.is_durable_enabled(),
            connections: self.statistics.active_connections(),
            queues: self.queues.queue_names(),
            topics: self.topics.topic_names(),
            functions: self.functions.function_names(),
        }
    }
}
