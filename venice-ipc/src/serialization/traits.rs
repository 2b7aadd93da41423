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


//! Serialization trait definitions.

use crate::serialization::{DeserializationError, SerializationError};

/// Trait for serializing and deserializing values.
///
/// Two implementations are used by the IPC layer: [`PostcardSerializer`]
/// for the binary metadata frame and WAL record bodies, and
/// [`JsonSerializer`] for the payloads of administrative and status
/// messages, which are textual `application/json` messages.
///
/// [`PostcardSerializer`]: crate::serialization::PostcardSerializer
/// [`JsonSerializer`]: crate::serialization::JsonSerializer
///
/// # Examples
///
/// ```rust
/// use venice_ipc::serialization::{PostcardSerializer, Serializer};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Record {
///     queue: String,
///     capacity: u32,
/// }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::default();
/// let record = Record { queue: "orders".to_string(), capacity: 100 };
///
/// let bytes = serializer.serialize(&record)?;
/// let decoded: Record = serializer.deserialize(&bytes)?;
/// assert_eq!(record, decoded);
/// # Ok(())
/// # }
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Serializes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the value cannot be serialized.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Deserializes bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the bytes are corrupt,
    /// truncated, or exceed a configured size limit.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Returns the name of this serializer, used in log output.
    fn name(&self) -> &'static str;
}
