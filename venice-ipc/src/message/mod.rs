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


//! Messages, their wire metadata, and name validation.
//!
//! [`Message`] is the unit of IPC traffic. It is immutable: changing a field
//! produces a new value. Destination names, subjects, mimetypes and charsets
//! are validated by the pure functions in this module before they reach a
//! manager or the wire.

mod error;
#[allow(clippy::module_inception)]
mod message;
mod metadata;
mod names;
mod topics;
mod types;

pub use error::{NameKind, ValidationError};
pub(crate) use message::now_millis;
pub use message::{Message, CHARSET_UTF8, MIMETYPE_BINARY, MIMETYPE_JSON, MIMETYPE_TEXT};
pub use metadata::PayloadMetaData;
pub use names::{
    validate_charset, validate_function_name, validate_mimetype, validate_queue_name,
    validate_subject, validate_topic_name, MAX_CHARSET_LEN, MAX_FUNCTION_NAME_LEN,
    MAX_MIMETYPE_LEN, MAX_QUEUE_NAME_LEN, MAX_SUBJECT_LEN, MAX_TOPIC_NAME_LEN, RESERVED_NAME,
};
pub use topics::{Topics, MAX_TOPICS};
pub use types::{
    MessageType, ResponseStatus, SUBJECT_AUTHENTICATION, SUBJECT_CLIENT_CONFIG,
    SUBJECT_CLIENT_THREAD_POOL_STATISTICS, SUBJECT_DIFFIE_HELLMAN, SUBJECT_HEARTBEAT,
    SUBJECT_SERVER_ERRORS, SUBJECT_SERVER_STATUS, SUBJECT_SERVER_THREAD_POOL_STATISTICS,
};
