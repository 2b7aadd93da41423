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


//! High-level client API.

use crate::client::{ClientConfig, ClientConnection, SubscriptionHandler};
use crate::destination::{
    Acl, DestinationKind, FunctionStatus, Persistence, QueueKind, QueueStatus, TopicStatus,
};
use crate::error::IpcError;
use crate::message::{
    Message, MessageType, ResponseStatus, Topics, CHARSET_UTF8, MIMETYPE_TEXT,
    SUBJECT_CLIENT_THREAD_POOL_STATISTICS,
};
use crate::observability::{ClientStatistics, ErrorEntry, ServerStatisticsSnapshot};
use crate::server::{CreateQueueRequest, CreateTemporaryQueueRequest, ServerSettings, ServerStatusReport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// A client of a Venice IPC server.
///
/// Every request method waits for its response up to the configured
/// [`default_timeout`](ClientConfig::default_timeout) and turns failure
/// statuses into [`IpcError::Rejected`].
///
/// # Examples
///
/// ```rust,no_run
/// use venice_ipc::client::{Client, ClientConfig};
/// use venice_ipc::destination::QueueKind;
/// use venice_ipc::message::Message;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), venice_ipc::IpcError> {
/// let client = Client::connect(ClientConfig::new("127.0.0.1:33333")).await?;
/// client.create_queue("jobs", 100, QueueKind::Bounded).await?;
///
/// let job = Message::new_text("resize", "text/plain", "image-42")?;
/// client.offer("jobs", job, Duration::from_secs(1)).await?;
///
/// if let Some(job) = client.poll("jobs", Duration::from_secs(1)).await? {
///     println!("got {}", job.text()?);
/// }
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    connection: ClientConnection,
}

impl Client {
    /// Connects and sets the connection up.
    ///
    /// See [`ClientConnection::connect`] for the errors.
    pub async fn connect(config: ClientConfig) -> Result<Self, IpcError> {
        let connection = ClientConnection::connect(&config).await?;
        Ok(Self { config, connection })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }

    /// Settings the server advertised.
    pub fn settings(&self) -> &ServerSettings {
        self.connection.settings()
    }

    /// Client counters.
    pub fn statistics(&self) -> &ClientStatistics {
        self.connection.statistics()
    }

    /// Returns `true` once the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Sends a request and returns its successful response.
    ///
    /// Requests without a destination go to the server's default handler;
    /// requests addressed to a function invoke it.
    pub async fn send(&self, request: Message) -> Result<Message, IpcError> {
        self.send_with_timeout(request, self.config.default_timeout).await
    }

    /// Like [`send`](Self::send) with an explicit timeout.
    pub async fn send_with_timeout(&self, request: Message, timeout: Duration) -> Result<Message, IpcError> {
        let response = self
            .connection
            .send(&request, timeout)
            .await?
            .ok_or_else(|| IpcError::InvalidRequest {
                reason: "one-way message sent as a request".to_string(),
            })?;
        if response.response_status().is_success() {
            Ok(response)
        } else {
            Err(IpcError::rejected(&response))
        }
    }

    /// Sends a message without waiting for any response.
    pub async fn send_oneway(&self, message: Message) -> Result<(), IpcError> {
        let message = message.with_oneway(true);
        self.connection.send(&message, self.config.default_timeout).await?;
        Ok(())
    }

    /// Subscribes to `topics`, installing `handler` for every delivery.
    ///
    /// The handler replaces any previous one and serves all subscribed
    /// topics. If the server refuses, the previous handler is put back.
    /// Returns the topics now subscribed by this request.
    pub async fn subscribe<H>(&self, handler: H, topics: &Topics) -> Result<Topics, IpcError>
    where
        H: SubscriptionHandler,
    {
        if topics.is_empty() {
            return Err(IpcError::InvalidRequest {
                reason: "no topics to subscribe to".to_string(),
            });
        }
        // Installed first so deliveries racing the response are handled.
        let previous = self
            .connection
            .set_subscription_handler(Some(Arc::new(handler)));
        let result = self.request_subscription(topics).await;
        if result.is_err() {
            self.connection.set_subscription_handler(previous);
        }
        result
    }

    async fn request_subscription(&self, topics: &Topics) -> Result<Topics, IpcError> {
        let request = control(MessageType::Subscribe, &topics.encode());
        let response = self.send(request).await?;
        Ok(Topics::parse(response.text()?)?)
    }

    /// Drops subscriptions to `topics`, or to every topic if `None`.
    ///
    /// Returns the number of subscriptions removed.
    pub async fn unsubscribe(&self, topics: Option<&Topics>) -> Result<usize, IpcError> {
        let text = topics.map(Topics::encode).unwrap_or_default();
        let response = self.send(control(MessageType::Unsubscribe, &text)).await?;
        if topics.is_none() {
            self.connection.set_subscription_handler(None);
        }
        parse_count(&response)
    }

    /// Publishes to a topic, returning the number of subscribers reached.
    pub async fn publish(&self, topic: &str, message: Message) -> Result<usize, IpcError> {
        let request = message
            .with_type(MessageType::Publish)
            .with_destination(topic);
        parse_count(&self.send(request).await?)
    }

    /// Enqueues a message, letting a full bounded queue wait up to `wait`.
    pub async fn offer(&self, queue: &str, message: Message, wait: Duration) -> Result<(), IpcError> {
        let request = message
            .with_type(MessageType::Offer)
            .with_destination(queue)
            .with_timeout(millis(wait));
        self.send_with_timeout(request, wait + self.config.default_timeout)
            .await?;
        Ok(())
    }

    /// Enqueues a message without waiting for the outcome.
    ///
    /// A message the server cannot enqueue goes to its dead letter queue.
    pub async fn offer_oneway(&self, queue: &str, message: Message) -> Result<(), IpcError> {
        let message = message
            .with_type(MessageType::Offer)
            .with_destination(queue)
            .with_timeout(0);
        self.send_oneway(message).await
    }

    /// Dequeues a message, waiting up to `wait` for one to arrive.
    ///
    /// Returns `None` if the queue stayed empty.
    pub async fn poll(&self, queue: &str, wait: Duration) -> Result<Option<Message>, IpcError> {
        let request = addressed(MessageType::Poll, queue)?.with_timeout(millis(wait));
        let response = self
            .connection
            .send(&request, wait + self.config.default_timeout)
            .await?
            .ok_or_else(|| IpcError::InvalidRequest {
                reason: "poll sent one-way".to_string(),
            })?;
        match response.response_status() {
            ResponseStatus::Ok => Ok(Some(response)),
            ResponseStatus::QueueEmpty => Ok(None),
            _ => Err(IpcError::rejected(&response)),
        }
    }

    /// Creates an in-memory queue. Creating an identical queue again is
    /// a no-op.
    pub async fn create_queue(&self, name: &str, capacity: usize, kind: QueueKind) -> Result<(), IpcError> {
        self.create_queue_with(name, capacity, kind, Persistence::Transient)
            .await
    }

    /// Creates a queue, choosing whether it is write-ahead logged.
    pub async fn create_queue_with(
        &self,
        name: &str,
        capacity: usize,
        kind: QueueKind,
        persistence: Persistence,
    ) -> Result<(), IpcError> {
        let body = CreateQueueRequest {
            capacity,
            kind,
            persistence,
        };
        let request = Message::new_json(name, &body)?
            .with_type(MessageType::CreateQueue)
            .with_destination(name);
        self.send(request).await?;
        Ok(())
    }

    /// Creates a queue owned by this connection and returns its name.
    ///
    /// The server removes it when the connection closes.
    pub async fn create_temporary_queue(&self, capacity: usize, kind: QueueKind) -> Result<String, IpcError> {
        let body = CreateTemporaryQueueRequest { capacity, kind };
        let request = Message::new_json("temporary-queue", &body)?
            .with_type(MessageType::CreateTemporaryQueue);
        let response = self.send(request).await?;
        Ok(response.text()?.to_string())
    }

    /// Removes a queue and, if durable, its log.
    pub async fn remove_queue(&self, name: &str) -> Result<(), IpcError> {
        self.send(addressed(MessageType::RemoveQueue, name)?).await?;
        Ok(())
    }

    /// Status of a queue.
    pub async fn queue_status(&self, name: &str) -> Result<QueueStatus, IpcError> {
        self.query(addressed(MessageType::StatusQueue, name)?).await
    }

    /// Returns `true` if the queue exists.
    pub async fn exists_queue(&self, name: &str) -> Result<bool, IpcError> {
        self.exists(MessageType::StatusQueue, name, ResponseStatus::QueueNotFound)
            .await
    }

    /// Drops every message of a queue, returning how many were removed.
    pub async fn clear_queue(&self, name: &str) -> Result<usize, IpcError> {
        parse_count(&self.send(addressed(MessageType::ClearQueue, name)?).await?)
    }

    /// Creates a topic. Creating an existing topic is a no-op.
    pub async fn create_topic(&self, name: &str) -> Result<(), IpcError> {
        self.send(addressed(MessageType::CreateTopic, name)?).await?;
        Ok(())
    }

    /// Removes a topic and its subscriptions.
    pub async fn remove_topic(&self, name: &str) -> Result<(), IpcError> {
        self.send(addressed(MessageType::RemoveTopic, name)?).await?;
        Ok(())
    }

    /// Returns `true` if the topic exists.
    pub async fn exists_topic(&self, name: &str) -> Result<bool, IpcError> {
        self.exists(MessageType::StatusTopic, name, ResponseStatus::TopicNotFound)
            .await
    }

    /// Status of a topic.
    pub async fn topic_status(&self, name: &str) -> Result<TopicStatus, IpcError> {
        self.query(addressed(MessageType::StatusTopic, name)?).await
    }

    /// Returns `true` if the function is registered.
    pub async fn exists_function(&self, name: &str) -> Result<bool, IpcError> {
        self.exists(MessageType::StatusFunction, name, ResponseStatus::FunctionNotFound)
            .await
    }

    /// Unregisters a function.
    pub async fn remove_function(&self, name: &str) -> Result<(), IpcError> {
        self.send(addressed(MessageType::RemoveFunction, name)?).await?;
        Ok(())
    }

    /// Status of a function.
    pub async fn function_status(&self, name: &str) -> Result<FunctionStatus, IpcError> {
        self.query(addressed(MessageType::StatusFunction, name)?).await
    }

    /// Reads the ACLs of a destination.
    pub async fn get_acls(&self, kind: DestinationKind, name: &str) -> Result<Vec<Acl>, IpcError> {
        let request = Message::new_text(kind.as_str(), MIMETYPE_TEXT, "")?
            .with_type(MessageType::GetAcls)
            .with_destination(name);
        self.query(request).await
    }

    /// Replaces the ACLs of a destination.
    ///
    /// Entries for [`WILDCARD_PRINCIPAL`](crate::destination::WILDCARD_PRINCIPAL)
    /// replace the default mode; otherwise the default is kept.
    pub async fn update_acls(&self, kind: DestinationKind, name: &str, acls: &[Acl]) -> Result<(), IpcError> {
        let request = Message::new_json(kind.as_str(), acls)?
            .with_type(MessageType::UpdateAcls)
            .with_destination(name);
        self.send(request).await?;
        Ok(())
    }

    /// Checks the server is alive, returning the round trip time.
    pub async fn heartbeat(&self) -> Result<Duration, IpcError> {
        let started = tokio::time::Instant::now();
        self.send(control(MessageType::Heartbeat, "")).await?;
        Ok(started.elapsed())
    }

    /// Server status report.
    pub async fn server_status(&self) -> Result<ServerStatusReport, IpcError> {
        self.query(control(MessageType::ServerStatus, "")).await
    }

    /// Server request counters.
    pub async fn server_thread_pool_statistics(&self) -> Result<ServerStatisticsSnapshot, IpcError> {
        self.query(control(MessageType::ServerThreadPoolStatistics, ""))
            .await
    }

    /// Recent server errors, oldest first.
    pub async fn server_errors(&self) -> Result<Vec<ErrorEntry>, IpcError> {
        self.query(control(MessageType::ServerErrors, "")).await
    }

    /// Local client counters as a JSON message, shaped like the server
    /// reports.
    pub fn client_statistics(&self) -> Result<Message, IpcError> {
        let snapshot = self.connection.statistics().snapshot();
        Ok(
            Message::new_json(SUBJECT_CLIENT_THREAD_POOL_STATISTICS, &snapshot)?
                .with_type(MessageType::Response)
                .with_response_status(ResponseStatus::Ok),
        )
    }

    /// Closes the connection. Later calls do nothing.
    pub async fn close(&self) -> Result<(), IpcError> {
        self.connection.close().await
    }

    async fn query<T: DeserializeOwned>(&self, request: Message) -> Result<T, IpcError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }

    async fn exists(&self, status_type: MessageType, name: &str, missing: ResponseStatus) -> Result<bool, IpcError> {
        match self.send(addressed(status_type, name)?).await {
            Ok(_) => Ok(true),
            Err(IpcError::Rejected { status, .. }) if status == missing => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn control(message_type: MessageType, text: &str) -> Message {
    Message::control(
        message_type,
        MIMETYPE_TEXT,
        Some(CHARSET_UTF8),
        text.as_bytes().to_vec(),
    )
}

fn addressed(message_type: MessageType, name: &str) -> Result<Message, IpcError> {
    Ok(Message::new_text(name, MIMETYPE_TEXT, "")?
        .with_type(message_type)
        .with_destination(name))
}

fn parse_count(response: &Message) -> Result<usize, IpcError> {
    let text = response.text()?;
    text.parse().map_err(|_| IpcError::InvalidRequest {
        reason: format!("expected a count, got '{text}'"),
    })
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
