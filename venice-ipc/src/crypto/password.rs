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


//! Salted password hashes.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_SIZE: usize = 16;

/// A salted SHA-256 password hash.
///
/// Only the salt and digest are kept in memory; the clear-text password is
/// dropped as soon as the hash is built.
#[derive(Clone)]
pub struct PasswordHash {
    salt: [u8; SALT_SIZE],
    digest: [u8; 32],
}

impl PasswordHash {
    /// Hashes `password` under a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let digest = Self::digest(&salt, password);
        Self { salt, digest }
    }

    /// Returns `true` if `candidate` matches, comparing digests in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        let digest = Self::digest(&self.salt, candidate);
        self.digest[..].ct_eq(&digest[..]).into()
    }

    fn digest(salt: &[u8], password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let hash = PasswordHash::new("s3cret");
        assert!(hash.verify("s3cret"));
        assert!(!hash.verify("s3cret "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_salts_differ() {
        let a = PasswordHash::new("same");
        let b = PasswordHash::new("same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn test_debug_hides_digest() {
        assert_eq!(format!("{:?}", PasswordHash::new("pw")), "PasswordHash(..)");
    }
}
