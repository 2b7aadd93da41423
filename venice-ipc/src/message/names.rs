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


//! Name and subject validation.
//!
//! Destination names share one character set, `[a-zA-Z0-9_-/]`, and may not be
//! the reserved literal `wal`. Subjects, mimetypes and charsets are free-form
//! but length bounded, and subjects may not contain commas or whitespace.

use crate::message::{NameKind, ValidationError};

/// Maximum length of a queue name.
pub const MAX_QUEUE_NAME_LEN: usize = 80;
/// Maximum length of a topic name.
pub const MAX_TOPIC_NAME_LEN: usize = 100;
/// Maximum length of a function name.
pub const MAX_FUNCTION_NAME_LEN: usize = 100;
/// Maximum length of a subject.
pub const MAX_SUBJECT_LEN: usize = 100;
/// Maximum length of a mimetype.
pub const MAX_MIMETYPE_LEN: usize = 100;
/// Maximum length of a charset name.
pub const MAX_CHARSET_LEN: usize = 50;

/// Name reserved for the write-ahead-log directory.
pub const RESERVED_NAME: &str = "wal";

/// Validates a queue name.
///
/// ```rust
/// use venice_ipc::message::validate_queue_name;
///
/// assert!(validate_queue_name("orders_2024/eu").is_ok());
/// assert!(validate_queue_name("wal").is_err());
/// assert!(validate_queue_name("has space").is_err());
/// ```
pub fn validate_queue_name(name: &str) -> Result<(), ValidationError> {
    validate_destination_name(name, NameKind::Queue, MAX_QUEUE_NAME_LEN)
}

/// Validates a topic name.
pub fn validate_topic_name(name: &str) -> Result<(), ValidationError> {
    validate_destination_name(name, NameKind::Topic, MAX_TOPIC_NAME_LEN)
}

/// Validates a function name.
pub fn validate_function_name(name: &str) -> Result<(), ValidationError> {
    validate_destination_name(name, NameKind::Function, MAX_FUNCTION_NAME_LEN)
}

/// Validates a message subject.
pub fn validate_subject(subject: &str) -> Result<(), ValidationError> {
    let kind = NameKind::Subject;
    check_blank_and_length(subject, kind, MAX_SUBJECT_LEN)?;
    if let Some(ch) = subject.chars().find(|c| *c == ',' || c.is_whitespace()) {
        return Err(ValidationError::InvalidCharacter {
            kind,
            name: subject.to_string(),
            ch,
        });
    }
    Ok(())
}

/// Validates a payload mimetype.
pub fn validate_mimetype(mimetype: &str) -> Result<(), ValidationError> {
    check_blank_and_length(mimetype, NameKind::Mimetype, MAX_MIMETYPE_LEN)
}

/// Validates a payload charset name.
pub fn validate_charset(charset: &str) -> Result<(), ValidationError> {
    check_blank_and_length(charset, NameKind::Charset, MAX_CHARSET_LEN)
}

fn validate_destination_name(name: &str, kind: NameKind, max: usize) -> Result<(), ValidationError> {
    check_blank_and_length(name, kind, max)?;
    if name == RESERVED_NAME {
        return Err(ValidationError::Reserved {
            kind,
            name: name.to_string(),
        });
    }
    if let Some(ch) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(ValidationError::InvalidCharacter {
            kind,
            name: name.to_string(),
            ch,
        });
    }
    Ok(())
}

fn check_blank_and_length(value: &str, kind: NameKind, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { kind });
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { kind, len, max });
    }
    Ok(())
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_names() {
        assert!(validate_queue_name("orders_2024/eu").is_ok());
        assert!(validate_topic_name("prices-EUR").is_ok());
        assert!(validate_function_name("a").is_ok());
    }

    #[test]
    fn test_rejects_reserved() {
        assert!(matches!(
            validate_topic_name("wal"),
            Err(ValidationError::Reserved { .. })
        ));
        assert!(validate_topic_name("wal2").is_ok());
    }

    #[test]
    fn test_rejects_blank() {
        assert_eq!(
            validate_queue_name("  "),
            Err(ValidationError::Blank {
                kind: NameKind::Queue
            })
        );
        assert!(validate_queue_name("").is_err());
    }

    #[test]
    fn test_length_limits() {
        let topic = "t".repeat(101);
        assert_eq!(
            validate_topic_name(&topic),
            Err(ValidationError::TooLong {
                kind: NameKind::Topic,
                len: 101,
                max: 100
            })
        );
        assert!(validate_topic_name(&topic[..100]).is_ok());

        let queue = "q".repeat(81);
        assert!(validate_queue_name(&queue).is_err());
        assert!(validate_queue_name(&queue[..80]).is_ok());
    }

    #[test]
    fn test_rejects_invalid_characters() {
        for name in ["has space", "a,b", "dot.name", "ümlaut", "$x"] {
            assert!(
                matches!(
                    validate_queue_name(name),
                    Err(ValidationError::InvalidCharacter { .. })
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_subjects() {
        assert!(validate_subject("$heartbeat").is_ok());
        assert!(validate_subject("price.update").is_ok());
        assert!(validate_subject("a b").is_err());
        assert!(validate_subject("a,b").is_err());
        assert!(validate_subject(&"s".repeat(101)).is_err());
    }

    #[test]
    fn test_mimetype_and_charset() {
        assert!(validate_mimetype("application/json").is_ok());
        assert!(validate_mimetype(&"m".repeat(101)).is_err());
        assert!(validate_charset("UTF-8").is_ok());
        assert!(validate_charset(&"c".repeat(51)).is_err());
    }
}
