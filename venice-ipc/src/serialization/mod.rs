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


//! Serialization layer.
//!
//! - **[`Serializer`] trait** with two backends: [`PostcardSerializer`] for
//!   binary records and [`JsonSerializer`] for textual payloads
//! - **[`framing`] module**: length-prefixed frames
//! - **Error types**: [`SerializationError`] and [`DeserializationError`]
//!
//! Message metadata and log records are always postcard and control bodies
//! are always JSON. The `json` and `postcard` features only decide whether
//! the two backends are exported for application payloads.

pub mod framing;

mod error;
mod json;
mod postcard;
mod traits;

pub use error::{DeserializationError, SerializationError};
#[cfg(feature = "json")]
pub use self::json::JsonSerializer;
#[cfg(not(feature = "json"))]
pub(crate) use self::json::JsonSerializer;
#[cfg(feature = "postcard")]
pub use self::postcard::PostcardSerializer;
#[cfg(not(feature = "postcard"))]
pub(crate) use self::postcard::PostcardSerializer;
pub use traits::Serializer;
