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


//! Per-connection request handling.
//!
//! Each connection runs two tasks. The handler task owns the read half and
//! processes requests one at a time, in arrival order. The writer task owns
//! the write half and drains a bounded channel shared by responses and topic
//! pushes, so everything sent on a connection goes through one ordered
//! writer.

use crate::crypto::{DiffieHellmanKeys, SecureChannel, Side};
use crate::destination::{Acl, Destination, DestinationKind};
use crate::error::IpcError;
use crate::message::{Message, MessageType, ResponseStatus, Topics, MIMETYPE_BINARY};
use crate::protocol::Codec;
use crate::server::context::ServerContext;
use crate::server::{CreateQueueRequest, CreateTemporaryQueueRequest, Credentials};
use crate::transport::{ConnectionId, TcpTransport, TransportError};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

/// Work for a connection's writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// A response or topic push.
    Message(Message),
    /// The key exchange answer, written in plaintext, after which the writer
    /// encrypts.
    KeyAgreed {
        response: Message,
        channel: Arc<SecureChannel>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
    Execute,
}

struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    context: Arc<ServerContext>,
    codec: Codec,
    outbound: mpsc::Sender<Outbound>,
    principal: Option<String>,
    authenticated: bool,
}

/// Serves one accepted connection until it closes or the server shuts down.
pub(crate) async fn serve(
    transport: TcpTransport,
    context: Arc<ServerContext>,
    shutdown: watch::Receiver<bool>,
) {
    let id = transport.id();
    let peer = transport.peer_addr();
    let (mut reader, writer) = transport.into_split();
    let (outbound, rx) = mpsc::channel(context.config.send_buffer_size);
    let writer = tokio::spawn(write_loop(writer, context.codec(), rx, context.clone()));

    let mut connection = Connection {
        id,
        peer,
        context: context.clone(),
        codec: context.codec(),
        outbound,
        principal: None,
        authenticated: false,
    };
    let result = connection.run(&mut reader, shutdown).await;
    drop(connection);

    // Subscriptions hold clones of the outbound sender; the writer only
    // finishes once they are gone.
    context.topics.subscriptions().unsubscribe_all(id);
    context.queues.remove_temporary_queues(id);

    match result {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::info!("Connection {} from {} closed", id, peer);
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Connection {} from {} closed: {}", id, peer, e);
            context.errors.record(id.to_string(), e.to_string());
        }
    }
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Writer of connection {} stopped: {}", id, e);
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Writer of connection {} panicked: {}", id, e);
        }
    }
    context.statistics.record_connection_closed();
}

async fn write_loop<W>(
    mut writer: W,
    mut codec: Codec,
    mut outbound: mpsc::Receiver<Outbound>,
    context: Arc<ServerContext>,
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(next) = outbound.recv().await {
        let (message, channel) = match next {
            Outbound::Message(message) => (message, None),
            Outbound::KeyAgreed { response, channel } => (response, Some(channel)),
        };
        match codec.write(&mut writer, &message).await {
            Ok(()) => context.statistics.record_message_sent(),
            Err(e) if e.is_connection_fatal() => return Err(e),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Dropping outbound message {}: {}", message.id(), e);
            }
        }
        if let Some(channel) = channel {
            codec.activate_encryption(channel);
        }
    }
    writer
        .shutdown()
        .await
        .map_err(|e| TransportError::from_io(e, "shutting down connection"))?;
    Ok(())
}

impl Connection {
    async fn run<R>(&mut self, reader: &mut R, mut shutdown: watch::Receiver<bool>) -> Result<(), IpcError>
    where
        R: AsyncRead + Unpin,
    {
        let mut first_timeout = Some(self.context.config.handshake_timeout);
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            let next = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                result = read_next(&self.codec, reader, first_timeout.take()) => result?,
            };
            let Some(request) = next else {
                return Ok(());
            };

            self.context.statistics.record_message_received();
            let started = Instant::now();
            self.dispatch(request).await?;
            self.context.statistics.record_handling_time(started.elapsed());
        }
    }

    async fn dispatch(&mut self, request: Message) -> Result<(), IpcError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            "Connection {} received {} {}",
            self.id,
            request.message_type(),
            request.id()
        );
        match request.message_type() {
            MessageType::ClientConfig => {
                let response = json_reply(&request, &self.context.settings)?;
                return self.send(response).await;
            }
            MessageType::DiffieHellmanKeyRequest => return self.key_exchange(&request).await,
            MessageType::Authentication => return self.authenticate(&request).await,
            _ => {}
        }

        let result = match self.admit(&request) {
            Ok(()) => self.handle(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(Some(response)) if !is_oneway(&request) => self.send(response).await,
            Ok(_) => Ok(()),
            Err(e) => self.fail(&request, e).await,
        }
    }

    /// Checks the connection-level preconditions of a request.
    fn admit(&self, request: &Message) -> Result<(), IpcError> {
        if self.context.config.encrypt && !self.codec.is_encrypted() {
            return Err(IpcError::Rejected {
                status: ResponseStatus::NoPermission,
                reason: "encryption required".to_string(),
            });
        }
        let authenticator = &self.context.config.authenticator;
        if authenticator.is_active()
            && !self.authenticated
            && request.message_type() != MessageType::Heartbeat
        {
            return Err(IpcError::Rejected {
                status: ResponseStatus::AuthenticationFailed,
                reason: "authentication required".to_string(),
            });
        }
        if request.message_type().is_admin() && !authenticator.may_administer(self.principal.as_deref()) {
            return Err(IpcError::Rejected {
                status: ResponseStatus::NoPermission,
                reason: format!("{} requires an admin", request.message_type()),
            });
        }
        Ok(())
    }

    fn check(&self, destination: &dyn Destination, access: Access) -> Result<(), IpcError> {
        let principal = self.principal.as_deref();
        if self.context.config.authenticator.is_admin(principal) {
            return Ok(());
        }
        let allowed = match access {
            Access::Read => destination.can_read(principal),
            Access::Write => destination.can_write(principal),
            Access::Execute => destination.can_execute(principal),
        };
        if allowed {
            Ok(())
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Denied {:?} on {} {} for {:?}",
                access,
                destination.kind(),
                destination.name(),
                principal
            );
            Err(IpcError::AccessDenied {
                kind: destination.kind(),
                name: destination.name().to_string(),
                principal: self.principal.clone(),
            })
        }
    }

    async fn handle(&mut self, request: &Message) -> Result<Option<Message>, IpcError> {
        let context = self.context.clone();
        let response = match request.message_type() {
            MessageType::Request | MessageType::OneWay => self.call(request).await?,
            MessageType::Test => Message::response_to(request, ResponseStatus::Ok, request.clone()),
            MessageType::Heartbeat => Message::status_response(request, ResponseStatus::Ok, "alive"),
            MessageType::ServerStatus => json_reply(request, &context.status_report())?,
            MessageType::ServerThreadPoolStatistics => {
                json_reply(request, &context.statistics.snapshot())?
            }
            MessageType::ServerErrors => json_reply(request, &context.errors.snapshot())?,
            MessageType::Subscribe => self.subscribe(request)?,
            MessageType::Unsubscribe => self.unsubscribe(request)?,
            MessageType::Publish => self.publish(request)?,
            MessageType::Offer => self.offer(request).await?,
            MessageType::Poll => self.poll(request).await?,
            MessageType::CreateQueue => {
                let name = destination_of(request)?;
                let body: CreateQueueRequest = request.json()?;
                context
                    .queues
                    .create_queue(name, body.capacity, body.kind, body.persistence)
                    .await?;
                ok(request, name)
            }
            MessageType::CreateTemporaryQueue => {
                let body: CreateTemporaryQueueRequest = request.json()?;
                let queue = context
                    .queues
                    .create_temporary_queue(self.id, body.capacity, body.kind)
                    .await?;
                ok(request, queue.name())
            }
            MessageType::RemoveQueue => {
                let name = destination_of(request)?;
                context.queues.remove_queue(name).await?;
                ok(request, name)
            }
            MessageType::StatusQueue => {
                let queue = context.queues.get_queue(destination_of(request)?)?;
                self.check(queue.as_ref(), Access::Read)?;
                json_reply(request, &queue.status())?
            }
            MessageType::ClearQueue => {
                let removed = context.queues.clear_queue(destination_of(request)?).await?;
                ok(request, removed.to_string())
            }
            MessageType::CreateTopic => {
                let name = destination_of(request)?;
                context.topics.create_topic(name)?;
                ok(request, name)
            }
            MessageType::RemoveTopic => {
                let name = destination_of(request)?;
                context.topics.remove_topic(name)?;
                ok(request, name)
            }
            MessageType::StatusTopic => {
                let name = destination_of(request)?;
                let topic = context.topics.get_topic(name)?;
                self.check(topic.as_ref(), Access::Read)?;
                json_reply(request, &context.topics.topic_status(name)?)?
            }
            MessageType::RemoveFunction => {
                let name = destination_of(request)?;
                context.functions.remove_function(name)?;
                ok(request, name)
            }
            MessageType::StatusFunction => {
                let function = context.functions.get_function(destination_of(request)?)?;
                self.check(function.as_ref(), Access::Read)?;
                json_reply(request, &function.status())?
            }
            MessageType::GetAcls => {
                let destination = self.lookup(request)?;
                self.check(destination.as_ref(), Access::Read)?;
                json_reply(request, &destination.acls().acls())?
            }
            MessageType::UpdateAcls => {
                let destination = self.lookup(request)?;
                let acls: Vec<Acl> = request.json()?;
                #[cfg(feature = "tracing")]
                tracing::info!(
                    "Updating ACLs of {} {} ({} entries)",
                    destination.kind(),
                    destination.name(),
                    acls.len()
                );
                destination.update_acls(acls);
                ok(request, destination.name())
            }
            MessageType::Response
            | MessageType::SubscriptionPush
            | MessageType::ClientConfig
            | MessageType::DiffieHellmanKeyRequest
            | MessageType::Authentication => {
                return Err(IpcError::InvalidRequest {
                    reason: format!("unexpected {} message", request.message_type()),
                })
            }
        };
        Ok(Some(response))
    }

    /// Invokes a function, or the default handler for requests without a
    /// destination.
    async fn call(&self, request: &Message) -> Result<Message, IpcError> {
        let reply = match request.destination_name() {
            None => {
                let handler = self.context.config.default_handler.clone().ok_or_else(|| {
                    IpcError::InvalidRequest {
                        reason: "request has no destination".to_string(),
                    }
                })?;
                handler.call(request.clone()).await
            }
            Some(name) => {
                let function = self.context.functions.get_function(name)?;
                self.check(function.as_ref(), Access::Execute)?;
                function.invoke(request.clone()).await
            }
        };
        let reply = reply.map_err(|e| IpcError::Handler {
            reason: e.to_string(),
        })?;
        Ok(Message::response_to(request, ResponseStatus::Ok, reply))
    }

    fn subscribe(&self, request: &Message) -> Result<Message, IpcError> {
        let topics = Topics::parse(request.text()?)?;
        self.context
            .topics
            .subscribe(&topics, self.id, &self.outbound, |topic| self.check(topic, Access::Read))?;
        #[cfg(feature = "tracing")]
        tracing::debug!("Connection {} subscribed to {}", self.id, topics);
        Ok(ok(request, topics.encode()))
    }

    fn unsubscribe(&self, request: &Message) -> Result<Message, IpcError> {
        let subscriptions = self.context.topics.subscriptions();
        let text = request.text()?;
        let removed = if text.is_empty() {
            subscriptions.unsubscribe_all(self.id)
        } else {
            let topics = Topics::parse(text)?;
            topics
                .iter()
                .filter(|name| subscriptions.unsubscribe(name, self.id))
                .count()
        };
        Ok(ok(request, removed.to_string()))
    }

    fn publish(&self, request: &Message) -> Result<Message, IpcError> {
        let name = destination_of(request)?;
        let topic = self.context.topics.get_topic(name)?;
        self.check(topic.as_ref(), Access::Write)?;
        topic.record_publish();

        let push = request
            .clone()
            .with_type(MessageType::SubscriptionPush)
            .as_subscription_reply();
        let fan_out = self.context.topics.subscriptions().publish(name, &push);
        let statistics = &self.context.statistics;
        for _ in 0..fan_out.delivered {
            statistics.record_subscription_push();
        }
        for _ in 0..fan_out.discarded {
            statistics.record_subscription_discard();
        }
        Ok(ok(request, fan_out.delivered.to_string()))
    }

    async fn offer(&self, request: &Message) -> Result<Message, IpcError> {
        let name = destination_of(request)?;
        let queue = self.context.queues.get_queue(name)?;
        self.check(queue.as_ref(), Access::Write)?;
        queue.offer(request.clone(), wait_of(request)).await?;
        Ok(Message::status_response(request, ResponseStatus::QueueAccepted, name))
    }

    async fn poll(&self, request: &Message) -> Result<Message, IpcError> {
        let name = destination_of(request)?;
        let queue = self.context.queues.get_queue(name)?;
        self.check(queue.as_ref(), Access::Read)?;
        Ok(match queue.poll(wait_of(request)).await? {
            Some(message) => Message::response_to(request, ResponseStatus::Ok, message),
            None => Message::status_response(request, ResponseStatus::QueueEmpty, name),
        })
    }

    /// Resolves the destination of an ACL request. The subject names the kind.
    fn lookup(&self, request: &Message) -> Result<Arc<dyn Destination>, IpcError> {
        let name = destination_of(request)?;
        let kind = DestinationKind::parse(request.subject()).ok_or_else(|| IpcError::InvalidRequest {
            reason: format!("'{}' is not a destination kind", request.subject()),
        })?;
        let context = &self.context;
        Ok(match kind {
            DestinationKind::Queue => context.queues.get_queue(name)? as Arc<dyn Destination>,
            DestinationKind::Topic => context.topics.get_topic(name)? as Arc<dyn Destination>,
            DestinationKind::Function => context.functions.get_function(name)? as Arc<dyn Destination>,
        })
    }

    async fn key_exchange(&mut self, request: &Message) -> Result<(), IpcError> {
        if self.codec.is_encrypted() {
            let nak = Message::status_response(
                request,
                ResponseStatus::DiffieHellmanNak,
                "channel is already encrypted",
            );
            return self.send(nak).await;
        }

        let keys = DiffieHellmanKeys::generate();
        let server_public = keys.public_key();
        let agreed = DiffieHellmanKeys::parse_public_key(request.data())
            .and_then(|client_public| keys.agree(&client_public, &client_public, &server_public, Side::Server));
        let channel = match agreed {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Key exchange with {} failed: {}", self.peer, e);
                let nak = Message::status_response(request, ResponseStatus::DiffieHellmanNak, e.to_string());
                return self.send(nak).await;
            }
        };

        let body = Message::new_binary(request.subject(), MIMETYPE_BINARY, server_public.to_vec())?;
        let response = Message::response_to(request, ResponseStatus::DiffieHellmanAck, body);
        self.outbound
            .send(Outbound::KeyAgreed {
                response,
                channel: channel.clone(),
            })
            .await
            .map_err(|_| writer_gone())?;
        self.codec.activate_encryption(channel);
        #[cfg(feature = "tracing")]
        tracing::debug!("Connection {} is encrypted", self.id);
        Ok(())
    }

    async fn authenticate(&mut self, request: &Message) -> Result<(), IpcError> {
        if self.context.config.encrypt && !self.codec.is_encrypted() {
            let reply = Message::status_response(
                request,
                ResponseStatus::NoPermission,
                "encryption required before authentication",
            );
            self.send(reply).await?;
            return Err(IpcError::Handshake {
                reason: "authentication attempted before key exchange".to_string(),
            });
        }
        let credentials: Credentials = match request.json() {
            Ok(credentials) => credentials,
            Err(e) => return self.fail(request, e.into()).await,
        };

        let authenticator = self.context.config.authenticator.clone();
        if !authenticator.is_active() {
            return self
                .send(Message::status_response(request, ResponseStatus::Ok, "not required"))
                .await;
        }
        if authenticator.is_authenticated(&credentials.user, &credentials.password) {
            #[cfg(feature = "tracing")]
            tracing::info!("Connection {} authenticated as {}", self.id, credentials.user);
            self.principal = Some(credentials.user);
            self.authenticated = true;
            self.send(Message::status_response(request, ResponseStatus::Ok, "authenticated"))
                .await
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("Authentication of {} as {} failed", self.peer, credentials.user);
            let reply = Message::status_response(
                request,
                ResponseStatus::AuthenticationFailed,
                "invalid credentials",
            );
            self.send(reply).await?;
            Err(IpcError::AuthenticationFailed)
        }
    }

    /// Reports a failed request. One-way requests get no answer; failed
    /// one-way offers are dead-lettered.
    async fn fail(&self, request: &Message, error: IpcError) -> Result<(), IpcError> {
        let status = error.response_status();
        if matches!(status, ResponseStatus::ServerError | ResponseStatus::HandlerError) {
            self.context.errors.record(self.id.to_string(), error.to_string());
        }
        if is_oneway(request) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "One-way {} {} on connection {} failed: {}",
                request.message_type(),
                request.id(),
                self.id,
                error
            );
            if request.message_type() == MessageType::Offer {
                self.context.statistics.record_dead_letter();
                self.context.queues.dead_letter(request.clone()).await;
            }
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("Request {} on connection {} failed: {}", request.id(), self.id, error);
        self.context.statistics.record_request_failed();
        self.send(Message::status_response(request, status, error.to_string()))
            .await
    }

    async fn send(&self, response: Message) -> Result<(), IpcError> {
        let max = self.context.config.max_message_size;
        let response = if response.data().len() > max {
            let reason = format!("response of {} bytes exceeds maximum {}", response.data().len(), max);
            Message::status_response(&response, ResponseStatus::LimitExceeded, reason)
        } else {
            response
        };
        self.outbound
            .send(Outbound::Message(response))
            .await
            .map_err(|_| writer_gone())
    }
}

async fn read_next<R>(
    codec: &Codec,
    reader: &mut R,
    limit: Option<Duration>,
) -> Result<Option<Message>, IpcError>
where
    R: AsyncRead + Unpin,
{
    match limit {
        Some(duration) => tokio::time::timeout(duration, codec.read(reader))
            .await
            .map_err(|_| IpcError::Timeout { duration })?,
        None => codec.read(reader).await,
    }
}

fn is_oneway(request: &Message) -> bool {
    request.is_oneway() || request.message_type() == MessageType::OneWay
}

/// Milliseconds a queue operation may wait, taken from the request timeout.
fn wait_of(request: &Message) -> Duration {
    u64::try_from(request.timeout())
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
}

fn destination_of(request: &Message) -> Result<&str, IpcError> {
    request
        .destination_name()
        .ok_or_else(|| IpcError::InvalidRequest {
            reason: format!("{} needs a destination", request.message_type()),
        })
}

fn ok(request: &Message, text: impl Into<String>) -> Message {
    Message::status_response(request, ResponseStatus::Ok, text)
}

fn json_reply<T: Serialize>(request: &Message, value: &T) -> Result<Message, IpcError> {
    let body = Message::new_json(request.subject(), value)?;
    Ok(Message::response_to(request, ResponseStatus::Ok, body))
}

fn writer_gone() -> IpcError {
    IpcError::ConnectionClosed {
        reason: "connection writer stopped".to_string(),
    }
}
