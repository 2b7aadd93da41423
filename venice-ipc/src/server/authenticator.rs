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


//! Principals, credentials and ACL seeding.

use crate::crypto::PasswordHash;
use crate::destination::{AccessMode, Acl, AclTable, DestinationKind};
use std::collections::HashMap;

struct Credential {
    hash: PasswordHash,
    admin: bool,
}

/// A rule granting `mode` to `principal` on matching destinations.
///
/// The pattern is an exact name, `*` for every name, or a prefix ending in
/// `*`. A seed with no kind applies to every kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclSeed {
    /// Destination kind, `None` for all
    pub kind: Option<DestinationKind>,
    /// Name pattern
    pub pattern: String,
    /// Principal, or `*` for the default
    pub principal: String,
    /// Granted mode
    pub mode: AccessMode,
}

impl AclSeed {
    /// Creates a seed for every kind.
    pub fn new(pattern: impl Into<String>, principal: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            kind: None,
            pattern: pattern.into(),
            principal: principal.into(),
            mode,
        }
    }

    /// Restricts the seed to one kind.
    pub fn for_kind(mut self, kind: DestinationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Returns `true` if the seed applies to `name` of `kind`.
    pub fn matches(&self, kind: DestinationKind, name: &str) -> bool {
        if self.kind.is_some_and(|k| k != kind) {
            return false;
        }
        match self.pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => self.pattern == name,
        }
    }
}

/// Verifies credentials and seeds destination ACLs.
///
/// Passwords are stored only as salted hashes and are never exposed. The
/// authenticator is active once a credential is registered; connections to
/// a server with an active authenticator must authenticate before anything
/// but the setup exchange.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::destination::{AccessMode, DestinationKind};
/// use venice_ipc::server::{AclSeed, Authenticator};
///
/// let auth = Authenticator::new()
///     .with_user("admin", "secret", true)
///     .with_user("worker", "pw", false)
///     .with_default_mode(AccessMode::Deny)
///     .with_acl(AclSeed::new("jobs/*", "worker", AccessMode::ReadWrite));
///
/// assert!(auth.is_active());
/// assert!(auth.is_authenticated("worker", "pw"));
/// assert!(!auth.is_authenticated("worker", "wrong"));
/// assert!(auth.is_admin(Some("admin")));
///
/// let acls = auth.acls_for(DestinationKind::Queue, "jobs/eu");
/// assert_eq!(acls.resolve(Some("worker")), AccessMode::ReadWrite);
/// assert_eq!(acls.resolve(None), AccessMode::Deny);
/// ```
pub struct Authenticator {
    credentials: HashMap<String, Credential>,
    seeds: Vec<AclSeed>,
    default_mode: AccessMode,
}

impl Authenticator {
    /// Creates an inactive authenticator granting read-write by default.
    pub fn new() -> Self {
        Self {
            credentials: HashMap::new(),
            seeds: Vec::new(),
            default_mode: AccessMode::ReadWrite,
        }
    }

    /// Registers a principal. The password is hashed immediately.
    pub fn with_user(mut self, user: impl Into<String>, password: &str, admin: bool) -> Self {
        self.credentials.insert(
            user.into(),
            Credential {
                hash: PasswordHash::new(password),
                admin,
            },
        );
        self
    }

    /// Adds an ACL seed.
    pub fn with_acl(mut self, seed: AclSeed) -> Self {
        self.seeds.push(seed);
        self
    }

    /// Sets the default mode of new destinations.
    pub fn with_default_mode(mut self, mode: AccessMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Returns `true` if at least one credential is registered.
    pub fn is_active(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Checks a user/password pair in constant time per hash.
    pub fn is_authenticated(&self, user: &str, password: &str) -> bool {
        match self.credentials.get(user) {
            Some(credential) => credential.hash.verify(password),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Authentication attempt for unknown principal {}", user);
                false
            }
        }
    }

    /// Returns `true` if `principal` is a registered admin.
    pub fn is_admin(&self, principal: Option<&str>) -> bool {
        principal
            .and_then(|p| self.credentials.get(p))
            .is_some_and(|c| c.admin)
    }

    /// Returns `true` if `principal` may run administrative operations.
    ///
    /// Everyone may while the authenticator is inactive.
    pub fn may_administer(&self, principal: Option<&str>) -> bool {
        !self.is_active() || self.is_admin(principal)
    }

    /// The default mode of new destinations.
    pub fn default_mode(&self) -> AccessMode {
        self.default_mode
    }

    /// Builds the initial ACLs of a new destination.
    pub fn acls_for(&self, kind: DestinationKind, name: &str) -> AclTable {
        self.seeded(kind, name, self.default_mode)
    }

    /// Builds initial ACLs with an explicit default mode.
    pub fn seeded(&self, kind: DestinationKind, name: &str, default_mode: AccessMode) -> AclTable {
        let table = AclTable::new(name, default_mode);
        let seeds: Vec<Acl> = self
            .seeds
            .iter()
            .filter(|s| s.matches(kind, name))
            .map(|s| Acl::new(name, s.principal.clone(), s.mode))
            .collect();
        if seeds.is_empty() {
            table
        } else {
            table.with_updates(seeds)
        }
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("principals", &self.credentials.len())
            .field("seeds", &self.seeds)
            .field("default_mode", &self.default_mode)
            .finish()
    }
}
