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


//! Multi-topic subscriptions.

use crate::message::{validate_topic_name, ValidationError};
use std::fmt;

/// Maximum number of topics in one subscription.
pub const MAX_TOPICS: usize = 20;

/// A deduplicated, ordered set of validated topic names.
///
/// On the wire a set is a comma-joined string, which is why topic names may
/// not contain commas.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::message::Topics;
///
/// let topics = Topics::parse("alpha,beta,alpha").unwrap();
/// assert_eq!(topics.len(), 2);
/// assert_eq!(topics.encode(), "alpha,beta");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topics {
    names: Vec<String>,
}

impl Topics {
    /// Builds a set from topic names, dropping duplicates but keeping order.
    pub fn new<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Vec::new();
        for name in names {
            let name = name.into();
            validate_topic_name(&name)?;
            if !set.contains(&name) {
                set.push(name);
            }
        }
        if set.len() > MAX_TOPICS {
            return Err(ValidationError::TooManyTopics {
                count: set.len(),
                max: MAX_TOPICS,
            });
        }
        Ok(Self { names: set })
    }

    /// Parses the comma-joined wire form.
    pub fn parse(encoded: &str) -> Result<Self, ValidationError> {
        Self::new(encoded.split(','))
    }

    /// Returns the comma-joined wire form.
    pub fn encode(&self) -> String {
        self.names.join(",")
    }

    /// Number of topics.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns `true` if `topic` is a member.
    pub fn contains(&self, topic: &str) -> bool {
        self.names.iter().any(|n| n == topic)
    }

    /// Iterates the topics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for Topics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
