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


//! Validation errors for names, subjects and message payloads.

use std::fmt;
use thiserror::Error;

/// What a validated string names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Queue name
    Queue,
    /// Topic name
    Topic,
    /// Function name
    Function,
    /// Message subject
    Subject,
    /// Payload mimetype
    Mimetype,
    /// Payload charset
    Charset,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queue => "queue name",
            Self::Topic => "topic name",
            Self::Function => "function name",
            Self::Subject => "subject",
            Self::Mimetype => "mimetype",
            Self::Charset => "charset",
        })
    }
}

/// A value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value is empty or whitespace only.
    #[error("{kind} must not be blank")]
    Blank {
        /// What was validated
        kind: NameKind,
    },

    /// The value exceeds its maximum length.
    #[error("{kind} too long: {len} chars, max {max}")]
    TooLong {
        /// What was validated
        kind: NameKind,
        /// Actual length in chars
        len: usize,
        /// Maximum length in chars
        max: usize,
    },

    /// The value is a reserved word.
    #[error("{kind} '{name}' is reserved")]
    Reserved {
        /// What was validated
        kind: NameKind,
        /// The rejected value
        name: String,
    },

    /// The value contains a character outside the allowed set.
    #[error("{kind} '{name}' contains invalid character {ch:?}")]
    InvalidCharacter {
        /// What was validated
        kind: NameKind,
        /// The rejected value
        name: String,
        /// The first offending character
        ch: char,
    },

    /// A queue capacity must be greater than one.
    #[error("invalid queue capacity {capacity}: must be greater than 1")]
    InvalidCapacity {
        /// The rejected capacity
        capacity: usize,
    },

    /// A multi-topic subscription has too many entries.
    #[error("too many topics: {count}, max {max}")]
    TooManyTopics {
        /// Number of distinct topics given
        count: usize,
        /// Maximum number of topics
        max: usize,
    },

    /// A wire code does not map to a known enum value.
    #[error("unknown {kind} code {code}")]
    UnknownCode {
        /// The enum being decoded
        kind: &'static str,
        /// The received code
        code: u16,
    },

    /// Text access on a binary message.
    #[error("message is binary")]
    NotText,

    /// Structured access on a message that is not textual JSON.
    #[error("message is not application/json (mimetype '{mimetype}')")]
    NotJson {
        /// The message mimetype
        mimetype: String,
    },

    /// The charset is not one this crate decodes.
    #[error("unsupported charset '{charset}'")]
    UnsupportedCharset {
        /// The message charset
        charset: String,
    },

    /// The payload does not decode under its declared format.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// Decoder message
        reason: String,
    },
}
