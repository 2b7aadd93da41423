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


//! Access control lists.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Principal name matching every principal without an explicit entry.
pub const WILDCARD_PRINCIPAL: &str = "*";

/// What a principal may do with a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    /// No access
    Deny,
    /// Receive only
    Read,
    /// Send only
    Write,
    /// Send and receive
    ReadWrite,
}

impl AccessMode {
    /// Returns `true` if the mode grants read access.
    pub const fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Returns `true` if the mode grants write access.
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// One ACL entry binding a principal to an access mode on a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acl {
    /// Destination name
    pub subject: String,
    /// Principal, or [`WILDCARD_PRINCIPAL`]
    pub principal: String,
    /// Granted access
    pub mode: AccessMode,
}

impl Acl {
    /// Creates an entry for a named principal.
    pub fn new(subject: impl Into<String>, principal: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            subject: subject.into(),
            principal: principal.into(),
            mode,
        }
    }

    /// Creates the wildcard default entry.
    pub fn default_for(subject: impl Into<String>, mode: AccessMode) -> Self {
        Self::new(subject, WILDCARD_PRINCIPAL, mode)
    }

    /// Returns `true` for the wildcard entry.
    pub fn is_default(&self) -> bool {
        self.principal == WILDCARD_PRINCIPAL
    }
}

/// An immutable snapshot of one destination's ACLs.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::destination::{Acl, AccessMode, AclTable};
///
/// let table = AclTable::new("jobs", AccessMode::Read)
///     .with_updates(vec![Acl::new("jobs", "worker", AccessMode::ReadWrite)]);
///
/// assert_eq!(table.resolve(Some("worker")), AccessMode::ReadWrite);
/// assert_eq!(table.resolve(Some("guest")), AccessMode::Read);
/// assert_eq!(table.resolve(None), AccessMode::Read);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclTable {
    default: Acl,
    entries: HashMap<String, Acl>,
}

impl AclTable {
    /// Creates a table holding only the default entry.
    pub fn new(subject: impl Into<String>, default_mode: AccessMode) -> Self {
        Self {
            default: Acl::default_for(subject, default_mode),
            entries: HashMap::new(),
        }
    }

    /// Returns a new table with `acls` replacing every named entry.
    ///
    /// A wildcard entry in `acls` replaces the default; otherwise the current
    /// default is kept. Subjects are rewritten to this table's destination.
    pub fn with_updates(&self, acls: impl IntoIterator<Item = Acl>) -> Self {
        let subject = self.default.subject.clone();
        let mut default = self.default.clone();
        let mut entries = HashMap::new();
        for acl in acls {
            let acl = Acl::new(subject.clone(), acl.principal, acl.mode);
            if acl.is_default() {
                default = acl;
            } else {
                entries.insert(acl.principal.clone(), acl);
            }
        }
        Self { default, entries }
    }

    /// Resolves a principal's access mode.
    ///
    /// Anonymous callers (`None`) only ever get the default.
    pub fn resolve(&self, principal: Option<&str>) -> AccessMode {
        principal
            .and_then(|p| self.entries.get(p))
            .unwrap_or(&self.default)
            .mode
    }

    /// The wildcard default entry.
    pub fn default_acl(&self) -> &Acl {
        &self.default
    }

    /// All entries, default first, then by principal.
    pub fn acls(&self) -> Vec<Acl> {
        let mut named: Vec<Acl> = self.entries.values().cloned().collect();
        named.sort_by(|a, b| a.principal.cmp(&b.principal));
        let mut all = Vec::with_capacity(named.len() + 1);
        all.push(self.default.clone());
        all.extend(named);
        all
    }
}

/// An ACL table swapped atomically as a whole.
#[derive(Debug)]
pub struct SharedAcls {
    table: RwLock<Arc<AclTable>>,
}

impl SharedAcls {
    /// Wraps an initial table.
    pub fn new(table: AclTable) -> Self {
        Self {
            table: RwLock::new(Arc::new(table)),
        }
    }

    /// Returns the current snapshot.
    pub fn load(&self) -> Arc<AclTable> {
        self.table.read().clone()
    }

    /// Replaces the named entries in one step.
    pub fn update(&self, acls: Vec<Acl>) {
        let mut table = self.table.write();
        let next = table.with_updates(acls);
        *table = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert!(AccessMode::ReadWrite.can_read() && AccessMode::ReadWrite.can_write());
        assert!(AccessMode::Read.can_read() && !AccessMode::Read.can_write());
        assert!(!AccessMode::Write.can_read() && AccessMode::Write.can_write());
        assert!(!AccessMode::Deny.can_read() && !AccessMode::Deny.can_write());
    }

    #[test]
    fn test_anonymous_never_matches_named_entry() {
        let table = AclTable::new("q", AccessMode::Deny)
            .with_updates(vec![Acl::new("q", "alice", AccessMode::ReadWrite)]);
        assert_eq!(table.resolve(None), AccessMode::Deny);
        assert_eq!(table.resolve(Some("alice")), AccessMode::ReadWrite);
    }

    #[test]
    fn test_updates_replace_named_entries() {
        let table = AclTable::new("q", AccessMode::Read).with_updates(vec![
            Acl::new("q", "alice", AccessMode::ReadWrite),
            Acl::new("q", "bob", AccessMode::Write),
        ]);
        let table = table.with_updates(vec![Acl::new("other", "bob", AccessMode::Deny)]);

        assert_eq!(table.resolve(Some("alice")), AccessMode::Read);
        assert_eq!(table.resolve(Some("bob")), AccessMode::Deny);
        assert!(table.acls().iter().all(|a| a.subject == "q"));
    }

    #[test]
    fn test_wildcard_update_replaces_default() {
        let table = AclTable::new("q", AccessMode::ReadWrite)
            .with_updates(vec![Acl::default_for("q", AccessMode::Deny)]);
        assert_eq!(table.resolve(None), AccessMode::Deny);
        assert_eq!(table.acls().len(), 1);
    }

    #[test]
    fn test_shared_snapshot_unaffected_by_update() {
        let shared = SharedAcls::new(AclTable::new("q", AccessMode::Read));
        let before = shared.load();
        shared.update(vec![Acl::default_for("q", AccessMode::Deny)]);
        assert_eq!(before.resolve(None), AccessMode::Read);
        assert_eq!(shared.load().resolve(None), AccessMode::Deny);
    }
}
