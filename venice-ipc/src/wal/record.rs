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


//! Log record bodies.

use crate::destination::QueueKind;
use crate::message::Message;
use crate::serialization::{PostcardSerializer, Serializer};
use crate::wal::WalError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a queue log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalRecord {
    /// Queue shape; always the first record.
    Config {
        /// Queue capacity
        capacity: u64,
        /// Overflow behavior
        kind: QueueKind,
    },
    /// A message was enqueued.
    Offer(Message),
    /// The message with this id left the queue.
    Remove(Uuid),
}

impl WalRecord {
    /// Encodes the record body.
    pub fn encode_body(&self) -> Result<Vec<u8>, WalError> {
        PostcardSerializer::new()
            .serialize(self)
            .map_err(|e| WalError::Codec {
                reason: e.to_string(),
            })
    }

    /// Decodes a record body.
    pub fn decode_body(body: &[u8]) -> Result<Self, WalError> {
        PostcardSerializer::new()
            .deserialize(body)
            .map_err(|e| WalError::Codec {
                reason: e.to_string(),
            })
    }
}
