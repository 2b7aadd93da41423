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


//! Postcard serializer implementation.
//!
//! Postcard is the compact binary format used for the metadata frame of every
//! message and for the bodies of write-ahead-log records.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Postcard serializer with an optional input size limit.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::serialization::{PostcardSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::new().with_max_size(64);
/// let bytes = serializer.serialize(&(1u32, "queue"))?;
/// let (n, name): (u32, String) = serializer.deserialize(&bytes)?;
/// assert_eq!((n, name.as_str()), (1, "queue"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a new postcard serializer without a size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects inputs larger than `max_size` bytes on deserialization.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        let bytes = postcard::to_allocvec(value)?;
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(SerializationError::TooLarge {
                    size: bytes.len(),
                    max: max_size,
                });
            }
        }
        Ok(bytes)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::TooLarge {
                    size: bytes.len(),
                    max: max_size,
                });
            }
        }

        Ok(postcard::from_bytes(bytes)?)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}
