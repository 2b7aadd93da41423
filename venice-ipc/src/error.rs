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


//! Top-level error type.
//!
//! [`IpcError`] composes the layered errors of the crate:
//!
//! 1. **Transport**: socket failures ([`TransportError`])
//! 2. **Protocol**: wire violations ([`ProtocolError`]), always fatal to the
//!    connection
//! 3. **Request**: timeouts, rejections and destination errors, scoped to the
//!    single request that raised them
//!
//! # Error handling strategy
//!
//! - **Connection-fatal errors** close the socket; every waiting caller gets
//!   one final [`IpcError::ConnectionClosed`]
//! - **Timeouts** leave the connection open
//! - **Rejections** carry the server's [`ResponseStatus`]
//!
//! # Examples
//!
//! ```rust
//! use venice_ipc::IpcError;
//! use venice_ipc::transport::TransportError;
//! use std::time::Duration;
//!
//! let lost: IpcError = TransportError::Closed.into();
//! assert!(lost.is_connection_fatal());
//!
//! let timeout = IpcError::Timeout { duration: Duration::from_millis(100) };
//! assert!(timeout.is_timeout());
//! assert!(!timeout.is_connection_fatal());
//! ```

use crate::crypto::CryptoError;
use crate::destination::DestinationKind;
use crate::message::{Message, ResponseStatus, ValidationError};
use crate::protocol::ProtocolError;
use crate::serialization::SerializationError;
use crate::transport::TransportError;
use crate::wal::WalError;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for IPC operations.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Socket failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Wire protocol violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key agreement or cipher failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Write-ahead log failure.
    #[error(transparent)]
    Wal(#[from] WalError),

    /// A name, subject or payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record or frame failed to encode.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// No response arrived in time. The connection stays open.
    #[error("timed out after {duration:?}")]
    Timeout {
        /// The budget that elapsed
        duration: Duration,
    },

    /// The server answered with a failure status.
    #[error("request rejected with {status}: {reason}")]
    Rejected {
        /// Status of the response
        status: ResponseStatus,
        /// Text carried by the response
        reason: String,
    },

    /// The connection is gone.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Final error of the connection
        reason: String,
    },

    /// A payload exceeds the maximum message size.
    #[error("message of {size} bytes exceeds maximum {max}")]
    MessageTooLarge {
        /// Payload size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Connection setup failed.
    #[error("handshake failed: {reason}")]
    Handshake {
        /// What went wrong
        reason: String,
    },

    /// Credentials were refused, or are required and missing.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// No destination with that name.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Destination kind
        kind: DestinationKind,
        /// Requested name
        name: String,
    },

    /// A destination with that name exists with different settings.
    #[error("{kind} '{name}' already exists with different settings")]
    Conflict {
        /// Destination kind
        kind: DestinationKind,
        /// Requested name
        name: String,
    },

    /// The configured destination count is reached.
    #[error("{kind} limit of {max} reached")]
    Capacity {
        /// Destination kind
        kind: DestinationKind,
        /// Configured limit
        max: usize,
    },

    /// A bounded queue stayed full.
    #[error("queue '{name}' is full")]
    QueueFull {
        /// Queue name
        name: String,
    },

    /// The principal lacks the required access.
    #[error("access to {kind} '{name}' denied for {}", .principal.as_deref().unwrap_or("anonymous"))]
    AccessDenied {
        /// Destination kind
        kind: DestinationKind,
        /// Destination name
        name: String,
        /// Caller, `None` if anonymous
        principal: Option<String>,
    },

    /// The request is well-formed but cannot be served.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong
        reason: String,
    },

    /// A function handler failed.
    #[error("handler failed: {reason}")]
    Handler {
        /// Handler error message
        reason: String,
    },
}

impl IpcError {
    /// Builds a [`IpcError::Rejected`] from a failed response.
    pub fn rejected(response: &Message) -> Self {
        let reason = response
            .text()
            .map(str::to_string)
            .unwrap_or_else(|_| format!("{} byte payload", response.data().len()));
        Self::Rejected {
            status: response.response_status(),
            reason,
        }
    }

    /// Returns `true` for [`IpcError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the connection cannot be used after this error.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.should_close_transport(),
            Self::Protocol(_)
            | Self::ConnectionClosed { .. }
            | Self::Handshake { .. }
            | Self::AuthenticationFailed => true,
            _ => false,
        }
    }

    /// The response status reporting this error to a client.
    #[must_use]
    pub fn response_status(&self) -> ResponseStatus {
        match self {
            Self::Validation(_) | Self::InvalidRequest { .. } | Self::Serialization(_) => {
                ResponseStatus::BadRequest
            }
            Self::NotFound { kind, .. } => match kind {
                DestinationKind::Queue => ResponseStatus::QueueNotFound,
                DestinationKind::Topic => ResponseStatus::TopicNotFound,
                DestinationKind::Function => ResponseStatus::FunctionNotFound,
            },
            Self::Conflict { .. } => ResponseStatus::DestinationExists,
            Self::Capacity { .. } | Self::MessageTooLarge { .. } => ResponseStatus::LimitExceeded,
            Self::QueueFull { .. } => ResponseStatus::QueueFull,
            Self::AccessDenied { .. } => ResponseStatus::NoPermission,
            Self::Handler { .. } => ResponseStatus::HandlerError,
            Self::AuthenticationFailed => ResponseStatus::AuthenticationFailed,
            Self::Rejected { status, .. } => *status,
            _ => ResponseStatus::ServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_connection_fatal_classification() {
        let lost = IpcError::from(TransportError::from_io(
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe"),
            "writing",
        ));
        assert!(lost.is_connection_fatal());

        let protocol = IpcError::from(ProtocolError::UnsupportedVersion { version: 9 });
        assert!(protocol.is_connection_fatal());

        let full = IpcError::QueueFull { name: "q".into() };
        assert!(!full.is_connection_fatal());
        assert!(!IpcError::Timeout {
            duration: Duration::from_secs(1)
        }
        .is_connection_fatal());
    }

    #[test]
    fn test_response_status_mapping() {
        let not_found = IpcError::NotFound {
            kind: DestinationKind::Topic,
            name: "t".into(),
        };
        assert_eq!(not_found.response_status(), ResponseStatus::TopicNotFound);

        let denied = IpcError::AccessDenied {
            kind: DestinationKind::Queue,
            name: "q".into(),
            principal: None,
        };
        assert_eq!(denied.response_status(), ResponseStatus::NoPermission);
        assert!(denied.to_string().contains("anonymous"));

        let invalid = IpcError::from(ValidationError::InvalidCapacity { capacity: 1 });
        assert_eq!(invalid.response_status(), ResponseStatus::BadRequest);
        assert_eq!(
            IpcError::Capacity {
                kind: DestinationKind::Queue,
                max: 20
            }
            .response_status(),
            ResponseStatus::LimitExceeded
        );
    }

    #[test]
    fn test_rejected_from_response() {
        let request = Message::new_text("s", "text/plain", "x").unwrap();
        let response = Message::status_response(&request, ResponseStatus::QueueFull, "no room");
        match IpcError::rejected(&response) {
            IpcError::Rejected { status, reason } => {
                assert_eq!(status, ResponseStatus::QueueFull);
                assert_eq!(reason, "no room");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
