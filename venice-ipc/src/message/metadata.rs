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


//! Wire metadata record.

use crate::serialization::{DeserializationError, PostcardSerializer, SerializationError, Serializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything about a message except its payload and timestamp.
///
/// The timestamp travels in the frame header; the payload in its own frame.
/// Enum fields are carried as their stable numeric codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMetaData {
    /// Message id
    pub id: Uuid,
    /// Correlation id
    pub request_id: Option<String>,
    /// [`MessageType`](crate::message::MessageType) code
    pub message_type: u16,
    /// [`ResponseStatus`](crate::message::ResponseStatus) code
    pub response_status: u16,
    /// No response expected
    pub oneway: bool,
    /// Persist when routed to a durable queue
    pub durable: bool,
    /// Deliver out of band to the subscription handler
    pub subscription_reply: bool,
    /// Target queue, topic or function
    pub destination_name: Option<String>,
    /// Queue for asynchronous replies
    pub reply_to_queue_name: Option<String>,
    /// Expiry in epoch millis, -1 for never
    pub expires_at: i64,
    /// Client wait budget in millis, -1 for none
    pub timeout: i64,
    /// Routing subject
    pub subject: String,
    /// Payload mimetype
    pub mimetype: String,
    /// Payload charset, `None` for binary payloads
    pub charset: Option<String>,
}

impl PayloadMetaData {
    /// Encodes the record with postcard.
    pub fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        PostcardSerializer::new().serialize(self)
    }

    /// Decodes a record produced by [`PayloadMetaData::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DeserializationError> {
        PostcardSerializer::new().deserialize(bytes)
    }
}
