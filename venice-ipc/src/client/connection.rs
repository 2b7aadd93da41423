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


//! The client side of one physical connection.
//!
//! After setup a listener task owns the read half. Responses go to a bounded
//! queue drained by [`ClientConnection::send`]; subscription deliveries go to
//! a dispatcher task that calls the registered [`SubscriptionHandler`].

use crate::client::ClientConfig;
use crate::crypto::{DiffieHellmanKeys, Side};
use crate::error::IpcError;
use crate::message::{
    Message, MessageType, ResponseStatus, CHARSET_UTF8, MIMETYPE_BINARY, MIMETYPE_TEXT,
    SUBJECT_AUTHENTICATION,
};
use crate::observability::ClientStatistics;
use crate::protocol::{Codec, PROTOCOL_VERSION};
use crate::serialization::framing::DEFAULT_MAX_FRAME_SIZE;
use crate::server::{Credentials, ServerSettings};
use crate::transport::{Compressor, ConnectionId, TcpTransport, TransportError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Receives topic deliveries.
///
/// Plain closures `Fn(Message)` implement this trait.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync + 'static {
    /// Handles one delivery.
    async fn on_message(&self, message: Message);
}

#[async_trait]
impl<F> SubscriptionHandler for F
where
    F: Fn(Message) + Send + Sync + 'static,
{
    async fn on_message(&self, message: Message) {
        self(message)
    }
}

/// State shared between the connection and its tasks.
struct Shared {
    statistics: ClientStatistics,
    handler: RwLock<Option<Arc<dyn SubscriptionHandler>>>,
    failure: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl Shared {
    fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Keeps the first reason only.
    fn fail(&self, reason: String) {
        self.failure.lock().get_or_insert(reason);
    }

    fn closed_error(&self) -> IpcError {
        let reason = self
            .failure
            .lock()
            .clone()
            .unwrap_or_else(|| "connection closed".to_string());
        IpcError::ConnectionClosed { reason }
    }
}

struct Exchange {
    writer: OwnedWriteHalf,
    codec: Codec,
    responses: mpsc::Receiver<Message>,
}

/// A connected, set-up client connection.
///
/// Any number of tasks may call [`send`](Self::send) concurrently. The
/// exchange lock makes "write the request, await its response" atomic per
/// caller, so responses are never handed to the wrong caller.
pub struct ClientConnection {
    id: ConnectionId,
    settings: ServerSettings,
    encrypted: bool,
    principal: Option<String>,
    exchange: tokio::sync::Mutex<Exchange>,
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl ClientConnection {
    /// Connects and runs the setup exchange: server settings, then key
    /// agreement if either side wants encryption, then authentication if
    /// credentials are configured.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Transport`] if the server cannot be reached
    /// - [`IpcError::Handshake`] if setup fails or the server refuses the
    ///   key exchange
    /// - [`IpcError::AuthenticationFailed`] for refused credentials
    pub async fn connect(config: &ClientConfig) -> Result<Self, IpcError> {
        let mut transport =
            TcpTransport::connect(config.address.clone(), Some(config.connect_timeout)).await?;
        let id = transport.id();
        let mut codec = Codec::new(DEFAULT_MAX_FRAME_SIZE);

        let setup = handshake(&mut transport, &mut codec, config);
        let settings = tokio::time::timeout(config.handshake_timeout, setup)
            .await
            .map_err(|_| IpcError::Handshake {
                reason: format!("setup did not finish within {:?}", config.handshake_timeout),
            })??;
        let encrypted = codec.is_encrypted();
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Connected {} to {} (encrypted: {}, user: {:?})",
            id,
            config.address,
            encrypted,
            config.user
        );

        let shared = Arc::new(Shared {
            statistics: ClientStatistics::new(),
            handler: RwLock::new(None),
            failure: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        let (reader, writer) = transport.into_split();
        let (responses_tx, responses) = mpsc::channel(config.receive_queue_capacity);
        let (deliveries_tx, deliveries) = mpsc::channel(config.subscription_buffer_size);
        let listener = tokio::spawn(listen(
            reader,
            codec.clone(),
            responses_tx,
            deliveries_tx,
            shared.clone(),
        ));
        let dispatcher = tokio::spawn(dispatch(deliveries, shared.clone()));

        Ok(Self {
            id,
            settings,
            encrypted,
            principal: config.user.clone().filter(|_| config.password.is_some()),
            exchange: tokio::sync::Mutex::new(Exchange {
                writer,
                codec,
                responses,
            }),
            shared,
            listener,
            dispatcher,
        })
    }

    /// Connection id used in log output.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Settings the server advertised.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Returns `true` if the channel is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// The authenticated principal, if any.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Client counters.
    pub fn statistics(&self) -> &ClientStatistics {
        &self.shared.statistics
    }

    /// Returns `true` once closed, by either side.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire) || self.listener.is_finished()
    }

    /// Installs the handler for subscription deliveries, returning the
    /// previous one.
    pub fn set_subscription_handler(
        &self,
        handler: Option<Arc<dyn SubscriptionHandler>>,
    ) -> Option<Arc<dyn SubscriptionHandler>> {
        std::mem::replace(&mut *self.shared.handler.write(), handler)
    }

    /// Sends a message and waits for its response.
    ///
    /// One-way messages return `Ok(None)` once written. For others, the
    /// exchange lock and the response share one deadline `timeout` from now.
    /// Responses to other requests that show up first, typically late
    /// answers to callers that timed out, are discarded.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Timeout`] if no matching response arrives in time; the
    ///   connection stays usable
    /// - [`IpcError::ConnectionClosed`] carrying the listener's final error
    ///   if the connection is gone
    pub async fn send(&self, request: &Message, timeout: Duration) -> Result<Option<Message>, IpcError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(self.shared.closed_error());
        }
        let deadline = Instant::now() + timeout;
        let mut exchange = tokio::time::timeout_at(deadline, self.exchange.lock())
            .await
            .map_err(|_| self.timed_out(timeout))?;
        let Exchange {
            writer,
            codec,
            responses,
        } = &mut *exchange;

        let started = Instant::now();
        if let Err(e) = codec.write(writer, request).await {
            if e.is_connection_fatal() {
                self.shared.fail(e.to_string());
            }
            return Err(e);
        }
        self.shared.statistics.record_message_sent();
        if request.is_oneway() || request.message_type() == MessageType::OneWay {
            return Ok(None);
        }

        loop {
            match tokio::time::timeout_at(deadline, responses.recv()).await {
                Err(_) => return Err(self.timed_out(timeout)),
                Ok(None) => return Err(self.shared.closed_error()),
                Ok(Some(response)) if response.id() == request.id() => {
                    self.shared.statistics.record_response_received();
                    self.shared.statistics.record_latency(started.elapsed());
                    return Ok(Some(response));
                }
                Ok(Some(other)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "Discarding response {} while waiting for {}",
                        other.id(),
                        request.id()
                    );
                    self.shared.statistics.record_out_of_order_discard();
                }
            }
        }
    }

    /// Closes the connection. Later calls do nothing.
    ///
    /// Stops the dispatcher and the listener, then shuts the socket down.
    /// Callers waiting for a response get [`IpcError::ConnectionClosed`].
    pub async fn close(&self) -> Result<(), IpcError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shared.fail("connection closed by client".to_string());
        self.dispatcher.abort();
        self.listener.abort();

        let mut exchange = self.exchange.lock().await;
        match exchange.writer.shutdown().await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => {}
            Err(e) => return Err(TransportError::from_io(e, "closing connection").into()),
        }
        #[cfg(feature = "tracing")]
        tracing::info!("Closed connection {}", self.id);
        Ok(())
    }

    fn timed_out(&self, duration: Duration) -> IpcError {
        self.shared.statistics.record_timeout();
        IpcError::Timeout { duration }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.dispatcher.abort();
        self.listener.abort();
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("encrypted", &self.encrypted)
            .field("principal", &self.principal)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn handshake<S>(stream: &mut S, codec: &mut Codec, config: &ClientConfig) -> Result<ServerSettings, IpcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = Message::control(MessageType::ClientConfig, MIMETYPE_TEXT, Some(CHARSET_UTF8), Vec::new());
    let response = exchange_direct(stream, codec, &request).await?;
    if response.response_status() != ResponseStatus::Ok {
        return Err(IpcError::Handshake {
            reason: format!("server refused configuration request: {}", response.response_status()),
        });
    }
    let settings: ServerSettings = response.json()?;
    if settings.protocol_version != PROTOCOL_VERSION {
        return Err(IpcError::Handshake {
            reason: format!(
                "server speaks protocol version {}, expected {}",
                settings.protocol_version, PROTOCOL_VERSION
            ),
        });
    }
    *codec = Codec::new(settings.max_message_size)
        .with_compressor(Compressor::new(settings.compress_cutoff_size));

    if settings.encrypt || config.encrypt {
        let keys = DiffieHellmanKeys::generate();
        let client_public = keys.public_key();
        let request = Message::control(
            MessageType::DiffieHellmanKeyRequest,
            MIMETYPE_BINARY,
            None,
            client_public.to_vec(),
        );
        let response = exchange_direct(stream, codec, &request).await?;
        match response.response_status() {
            ResponseStatus::DiffieHellmanAck => {}
            status => {
                let reason = response.text().unwrap_or("no reason given");
                return Err(IpcError::Handshake {
                    reason: format!("server refused key exchange ({status}): {reason}"),
                });
            }
        }
        let server_public = DiffieHellmanKeys::parse_public_key(response.data())?;
        let channel = keys.agree(&server_public, &client_public, &server_public, Side::Client)?;
        codec.activate_encryption(Arc::new(channel));
        #[cfg(feature = "tracing")]
        tracing::debug!("Key exchange complete");
    }

    match (&config.user, &config.password) {
        (Some(user), Some(password)) => {
            let credentials = Credentials {
                user: user.clone(),
                password: password.clone(),
            };
            let request = Message::new_json(SUBJECT_AUTHENTICATION, &credentials)?
                .with_type(MessageType::Authentication);
            let response = exchange_direct(stream, codec, &request).await?;
            match response.response_status() {
                ResponseStatus::Ok => {}
                ResponseStatus::AuthenticationFailed => return Err(IpcError::AuthenticationFailed),
                _ => {
                    return Err(IpcError::Handshake {
                        reason: IpcError::rejected(&response).to_string(),
                    })
                }
            }
        }
        _ if settings.authentication => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Server requires authentication but no credentials are configured");
        }
        _ => {}
    }
    Ok(settings)
}

/// Writes one setup request and reads its response directly.
async fn exchange_direct<S>(stream: &mut S, codec: &Codec, request: &Message) -> Result<Message, IpcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    codec.write(stream, request).await?;
    match codec.read(stream).await? {
        Some(response) if response.id() == request.id() => Ok(response),
        Some(other) => Err(IpcError::Handshake {
            reason: format!("unexpected {} during setup", other.message_type()),
        }),
        None => Err(IpcError::Handshake {
            reason: "server closed the connection during setup".to_string(),
        }),
    }
}

async fn listen(
    mut reader: OwnedReadHalf,
    codec: Codec,
    responses: mpsc::Sender<Message>,
    deliveries: mpsc::Sender<Message>,
    shared: Arc<Shared>,
) {
    let reason = loop {
        match codec.read(&mut reader).await {
            Ok(Some(message)) if message.is_subscription_reply() => {
                if !shared.has_handler() {
                    shared.statistics.record_subscription_discard();
                    continue;
                }
                match deliveries.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(message)) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Dispatcher full, discarding delivery {}", message.id());
                        shared.statistics.record_subscription_discard();
                    }
                    Err(TrySendError::Closed(_)) => shared.statistics.record_subscription_discard(),
                }
            }
            Ok(Some(message)) => {
                if responses.send(message).await.is_err() {
                    break "connection dropped".to_string();
                }
            }
            Ok(None) => break "server closed the connection".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    #[cfg(feature = "tracing")]
    tracing::debug!("Listener stopped: {}", reason);
    shared.fail(reason);
}

async fn dispatch(mut deliveries: mpsc::Receiver<Message>, shared: Arc<Shared>) {
    while let Some(message) = deliveries.recv().await {
        let handler = shared.handler.read().clone();
        match handler {
            Some(handler) => {
                shared.statistics.record_subscription_message();
                handler.on_message(message).await;
            }
            None => shared.statistics.record_subscription_discard(),
        }
    }
}
