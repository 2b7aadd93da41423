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


//! TCP transport implementation.
//!
//! Wraps a Tokio `TcpStream` with the connection id and addresses used in log
//! output. A transport is used whole during connection setup (the bootstrap
//! control exchange is a direct write-then-read) and split into independent
//! read and write halves once the background tasks take over.

use crate::transport::{ConnectionId, TransportError};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

/// TCP transport.
///
/// # Examples
///
/// ```rust,no_run
/// use venice_ipc::transport::TcpTransport;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listener = TcpTransport::bind("127.0.0.1:0").await?;
/// let addr = listener.local_addr()?;
///
/// let mut client = TcpTransport::connect(addr.to_string(), None).await?;
/// let (mut server, _peer) = TcpTransport::accept(&listener).await?;
/// client.write_all(b"vn").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    id: ConnectionId,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl TcpTransport {
    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            id: ConnectionId::next(),
            local_addr,
            peer_addr,
        })
    }

    /// Connects to a remote endpoint, optionally bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if the connection cannot be
    /// established, or [`TransportError::Timeout`] if it takes too long.
    pub async fn connect(
        addr: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let address = addr.into();
        #[cfg(feature = "tracing")]
        tracing::debug!("Connecting to {}", address);

        let connect = TcpStream::connect(&address);
        let stream = match timeout {
            Some(duration) => tokio::time::timeout(duration, connect)
                .await
                .map_err(|_| TransportError::Timeout { duration })?,
            None => connect.await,
        }
        .map_err(|source| TransportError::ConnectionFailed {
            address: address.clone(),
            source,
        })?;

        Self::from_stream(stream).map_err(|source| TransportError::Io { source })
    }

    /// Binds a listener on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address cannot be bound,
    /// for instance because another server instance already owns it.
    pub async fn bind(addr: impl Into<String>) -> Result<TcpListener, TransportError> {
        let address = addr.into();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: address.clone(),
                source,
            })?;
        #[cfg(feature = "tracing")]
        tracing::info!("Listening on {}", address);
        Ok(listener)
    }

    /// Accepts the next inbound connection.
    pub async fn accept(listener: &TcpListener) -> Result<(Self, SocketAddr), TransportError> {
        let (stream, peer_addr) = listener
            .accept()
            .await
            .map_err(|source| TransportError::Io { source })?;
        let transport = Self::from_stream(stream).map_err(|source| TransportError::Io { source })?;
        Ok((transport, peer_addr))
    }

    /// Returns the id assigned to this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the local socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the remote socket address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Splits the transport into owned read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }

    /// Shuts down the write side of the socket.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| TransportError::from_io(e, "shutdown"))
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
