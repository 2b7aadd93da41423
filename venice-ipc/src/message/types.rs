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


//! Message and response type codes.

use serde::{Deserialize, Serialize};

/// Reserved subject of the client configuration request.
pub const SUBJECT_CLIENT_CONFIG: &str = "$client-config";
/// Reserved subject of the Diffie-Hellman key request.
pub const SUBJECT_DIFFIE_HELLMAN: &str = "$diffie-hellman";
/// Reserved subject of the authentication request.
pub const SUBJECT_AUTHENTICATION: &str = "$authentication";
/// Reserved subject of the heartbeat request.
pub const SUBJECT_HEARTBEAT: &str = "$heartbeat";
/// Reserved subject of the server status report.
pub const SUBJECT_SERVER_STATUS: &str = "$server-status";
/// Reserved subject of the server worker statistics report.
pub const SUBJECT_SERVER_THREAD_POOL_STATISTICS: &str = "$server-thread-pool-statistics";
/// Reserved subject of the recent server errors report.
pub const SUBJECT_SERVER_ERRORS: &str = "$server-errors";
/// Reserved subject of the locally produced client statistics report.
pub const SUBJECT_CLIENT_THREAD_POOL_STATISTICS: &str = "$client-thread-pool-statistics";

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Returns the stable numeric code used on the wire.
            pub const fn code(self) -> u16 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            /// Resolves a wire code, returning `None` for unknown codes.
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

wire_enum! {
    /// The kind of a [`Message`](crate::message::Message).
    pub enum MessageType {
        /// Two-way request expecting a correlated response.
        Request = 1,
        /// Fire-and-forget request.
        OneWay = 2,
        /// Response to a request.
        Response = 3,
        /// Topic delivery pushed to a subscriber.
        SubscriptionPush = 4,
        /// Key exchange request carrying the client public key.
        DiffieHellmanKeyRequest = 5,
        /// Request for the server settings.
        ClientConfig = 6,
        /// Test message echoed by the server.
        Test = 7,
        /// User/password authentication.
        Authentication = 10,
        /// Liveness check.
        Heartbeat = 11,
        /// Server status report.
        ServerStatus = 12,
        /// Server worker statistics report.
        ServerThreadPoolStatistics = 13,
        /// Recent server errors report.
        ServerErrors = 14,
        /// Subscribe the connection to one or more topics.
        Subscribe = 20,
        /// Drop the connection's topic subscriptions.
        Unsubscribe = 21,
        /// Publish to a topic.
        Publish = 22,
        /// Enqueue a message on a queue.
        Offer = 30,
        /// Dequeue a message from a queue.
        Poll = 31,
        /// Create a queue.
        CreateQueue = 32,
        /// Create a queue owned by the connection.
        CreateTemporaryQueue = 33,
        /// Remove a queue.
        RemoveQueue = 34,
        /// Queue status report.
        StatusQueue = 35,
        /// Drop every message from a queue.
        ClearQueue = 36,
        /// Create a topic.
        CreateTopic = 40,
        /// Remove a topic.
        RemoveTopic = 41,
        /// Topic status report.
        StatusTopic = 42,
        /// Remove a function.
        RemoveFunction = 50,
        /// Function status report.
        StatusFunction = 51,
        /// Read a destination's ACLs.
        GetAcls = 60,
        /// Replace a destination's ACLs.
        UpdateAcls = 61,
    }
}

impl MessageType {
    /// Returns the reserved subject for control message types.
    pub const fn control_subject(self) -> Option<&'static str> {
        match self {
            Self::ClientConfig => Some(SUBJECT_CLIENT_CONFIG),
            Self::DiffieHellmanKeyRequest => Some(SUBJECT_DIFFIE_HELLMAN),
            Self::Authentication => Some(SUBJECT_AUTHENTICATION),
            Self::Heartbeat => Some(SUBJECT_HEARTBEAT),
            Self::ServerStatus => Some(SUBJECT_SERVER_STATUS),
            Self::ServerThreadPoolStatistics => Some(SUBJECT_SERVER_THREAD_POOL_STATISTICS),
            Self::ServerErrors => Some(SUBJECT_SERVER_ERRORS),
            _ => None,
        }
    }

    /// Returns `true` for types that an unauthenticated connection may send.
    pub const fn is_handshake(self) -> bool {
        matches!(
            self,
            Self::ClientConfig | Self::DiffieHellmanKeyRequest | Self::Authentication
        )
    }

    /// Returns `true` for administrative types.
    pub const fn is_admin(self) -> bool {
        matches!(
            self,
            Self::CreateQueue
                | Self::RemoveQueue
                | Self::ClearQueue
                | Self::CreateTopic
                | Self::RemoveTopic
                | Self::RemoveFunction
                | Self::UpdateAcls
                | Self::ServerErrors
        )
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

wire_enum! {
    /// The outcome carried by a response.
    pub enum ResponseStatus {
        /// Not a response.
        Null = 0,
        /// Success.
        Ok = 1,
        /// Unexpected server failure.
        ServerError = 2,
        /// Malformed or invalid request.
        BadRequest = 3,
        /// A function handler failed.
        HandlerError = 4,
        /// ACL check failed.
        NoPermission = 5,
        /// No queue with that name.
        QueueNotFound = 6,
        /// Poll found no message before the timeout.
        QueueEmpty = 7,
        /// Bounded queue stayed full until the timeout.
        QueueFull = 8,
        /// Message enqueued.
        QueueAccepted = 9,
        /// No topic with that name.
        TopicNotFound = 10,
        /// No function with that name.
        FunctionNotFound = 11,
        /// Key exchange accepted; the payload carries the server public key.
        DiffieHellmanAck = 12,
        /// Key exchange refused.
        DiffieHellmanNak = 13,
        /// Bad credentials, or authentication required.
        AuthenticationFailed = 14,
        /// A configured limit was reached.
        LimitExceeded = 15,
        /// A destination exists under that name with a different shape.
        DestinationExists = 16,
    }
}

impl ResponseStatus {
    /// Returns `true` if the status reports success.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::QueueAccepted | Self::DiffieHellmanAck)
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_resolve() {
        for t in [
            MessageType::Request,
            MessageType::SubscriptionPush,
            MessageType::ClearQueue,
            MessageType::UpdateAcls,
        ] {
            assert_eq!(MessageType::from_code(t.code()), Some(t));
        }
        assert_eq!(MessageType::from_code(0), None);
        assert_eq!(MessageType::from_code(999), None);
        assert_eq!(ResponseStatus::from_code(0), Some(ResponseStatus::Null));
        assert_eq!(ResponseStatus::from_code(17), None);
    }

    #[test]
    fn test_control_subjects() {
        assert_eq!(
            MessageType::Heartbeat.control_subject(),
            Some(SUBJECT_HEARTBEAT)
        );
        assert_eq!(MessageType::Request.control_subject(), None);
        assert!(MessageType::Authentication.is_handshake());
        assert!(!MessageType::Offer.is_handshake());
    }

    #[test]
    fn test_success_statuses() {
        assert!(ResponseStatus::Ok.is_success());
        assert!(ResponseStatus::QueueAccepted.is_success());
        assert!(!ResponseStatus::QueueFull.is_success());
        assert!(!ResponseStatus::Null.is_success());
    }
}
