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


//! Transport layer error types.
//!
//! The lowest level of the error hierarchy: failures of the TCP socket.
//! A peer that went away mid-frame or reset the socket is
//! [`TransportError::ConnectionLost`]; everything the socket reports beyond
//! that stays a plain [`TransportError::Io`].

use std::io;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::from_io(
///     io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
///     "writing request",
/// );
/// assert!(error.is_connection_lost());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("cannot connect to {address}: {source}")]
    ConnectionFailed {
        /// Server address
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The peer closed the socket, or it broke.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// What the socket was doing
        reason: String,
        /// Socket error, `None` for an orderly close mid-frame
        #[source]
        source: Option<io::Error>,
    },

    /// Connecting took longer than allowed.
    #[error("connect timed out after {duration:?}")]
    Timeout {
        /// The connect budget
        duration: std::time::Duration,
    },

    /// The socket was already shut down.
    #[error("transport is closed")]
    Closed,

    /// The listener could not be bound.
    #[error("cannot bind {address}: {source}")]
    BindFailed {
        /// Listen address
        address: String,
        /// Socket error
        #[source]
        source: io::Error,
    },

    /// Any other socket error.
    #[error("I/O error: {source}")]
    Io {
        /// Socket error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Classifies an I/O error raised while `context` was in progress.
    ///
    /// Peer-closed conditions become [`TransportError::ConnectionLost`];
    /// everything else stays a generic [`TransportError::Io`].
    pub fn from_io(error: io::Error, context: &str) -> Self {
        if is_peer_closed(error.kind()) {
            TransportError::ConnectionLost {
                reason: format!("{}: {}", context, error),
                source: Some(error),
            }
        } else {
            TransportError::Io { source: error }
        }
    }

    /// Returns `true` if the peer is gone.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            TransportError::ConnectionLost { .. } | TransportError::Closed => true,
            TransportError::Io { source } => is_peer_closed(source.kind()),
            _ => false,
        }
    }

    /// Returns `true` if the socket can no longer carry messages.
    ///
    /// Setup failures are not included: there is no socket to close yet.
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::ConnectionLost { .. } | TransportError::Closed => true,
            TransportError::Io { source } => !matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
            TransportError::ConnectionFailed { .. }
            | TransportError::BindFailed { .. }
            | TransportError::Timeout { .. } => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::from_io(error, "socket")
    }
}

fn is_peer_closed(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_gone_closes_transport() {
        for kind in [io::ErrorKind::BrokenPipe, io::ErrorKind::ConnectionReset, io::ErrorKind::UnexpectedEof] {
            let error = TransportError::from_io(io::Error::new(kind, "gone"), "writing response");
            assert!(matches!(error, TransportError::ConnectionLost { .. }));
            assert!(error.is_connection_lost());
            assert!(error.should_close_transport());
            assert!(error.to_string().contains("writing response"));
        }
    }

    #[test]
    fn test_interrupted_keeps_transport() {
        let error: TransportError = io::Error::new(io::ErrorKind::Interrupted, "signal").into();
        assert!(matches!(error, TransportError::Io { .. }));
        assert!(!error.is_connection_lost());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_setup_failures_do_not_close() {
        let refused = TransportError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(!refused.should_close_transport());
        assert!(!refused.is_connection_lost());
        let slow = TransportError::Timeout {
            duration: std::time::Duration::from_secs(1),
        };
        assert!(!slow.should_close_transport());
    }
}
