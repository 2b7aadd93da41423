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


//! Addressable destinations and their access control.
//!
//! A [`Destination`] is a named, principal-scoped endpoint. There are three
//! kinds, differing only in behavior:
//!
//! - [`IpcQueue`]: a bounded or circular buffer, optionally write-ahead logged
//! - [`IpcTopic`]: a fan-out point for subscribers
//! - [`IpcFunction`]: a handler answering requests synchronously
//!
//! Each destination holds its ACLs as an immutable [`AclTable`] snapshot that
//! updates replace whole.

mod acl;
mod function;
mod queue;
mod topic;

use std::fmt;
use std::sync::Arc;

pub use acl::{AccessMode, Acl, AclTable, SharedAcls, WILDCARD_PRINCIPAL};
pub use function::{FunctionHandler, FunctionStatus, HandlerError, IpcFunction};
pub use queue::{IpcQueue, Persistence, QueueKind, QueueStatus};
pub use topic::{IpcTopic, TopicStatus};

/// The three kinds of destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    /// [`IpcQueue`]
    Queue,
    /// [`IpcTopic`]
    Topic,
    /// [`IpcFunction`]
    Function,
}

impl DestinationKind {
    /// Lower-case name, also used as the subject of ACL requests.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Topic => "topic",
            Self::Function => "function",
        }
    }

    /// Parses the result of [`as_str`](Self::as_str).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "queue" => Some(Self::Queue),
            "topic" => Some(Self::Topic),
            "function" => Some(Self::Function),
            _ => None,
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named endpoint with access control.
///
/// Anonymous callers pass `None` as principal and resolve through the
/// default ACL only.
pub trait Destination: Send + Sync {
    /// Destination name.
    fn name(&self) -> &str;

    /// Destination kind.
    fn kind(&self) -> DestinationKind;

    /// Current ACL snapshot.
    fn acls(&self) -> Arc<AclTable>;

    /// Replaces the ACLs in one step.
    fn update_acls(&self, acls: Vec<Acl>);

    /// Returns `true` if `principal` may receive from the destination.
    fn can_read(&self, principal: Option<&str>) -> bool {
        self.acls().resolve(principal).can_read()
    }

    /// Returns `true` if `principal` may send to the destination.
    fn can_write(&self, principal: Option<&str>) -> bool {
        self.acls().resolve(principal).can_write()
    }

    /// Returns `true` if `principal` may call the destination.
    ///
    /// Calling sends data into the destination, so this is write access.
    fn can_execute(&self, principal: Option<&str>) -> bool {
        self.can_write(principal)
    }
}
