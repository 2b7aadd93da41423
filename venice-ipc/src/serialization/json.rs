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


//! JSON serializer implementation.
//!
//! Administrative requests, status reports and the server settings returned
//! during connection setup travel as textual `application/json` payloads.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// JSON serializer.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::serialization::{JsonSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = JsonSerializer::new();
/// let bytes = serializer.serialize(&vec!["orders", "invoices"])?;
/// assert_eq!(bytes, br#"["orders","invoices"]"#);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Creates a serializer producing compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Produces indented JSON, used for human-facing status reports.
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        if self.pretty {
            Ok(serde_json::to_vec_pretty(value)?)
        } else {
            Ok(serde_json::to_vec(value)?)
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
