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


//! X25519 Diffie-Hellman key agreement.

use crate::crypto::{CryptoError, SecureChannel, Side};
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey};

/// Size of an encoded X25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// An ephemeral X25519 key pair.
///
/// A fresh pair is generated for every connection and consumed by
/// [`DiffieHellmanKeys::agree`], so a compromised session key never exposes
/// another session.
pub struct DiffieHellmanKeys {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl DiffieHellmanKeys {
    /// Generates a new key pair from the operating system RNG.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Returns the encoded public key to send to the peer.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Parses a peer public key received on the wire.
    pub fn parse_public_key(bytes: &[u8]) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
        <[u8; PUBLIC_KEY_SIZE]>::try_from(bytes).map_err(|_| CryptoError::InvalidPublicKey {
            expected: PUBLIC_KEY_SIZE,
            actual: bytes.len(),
        })
    }

    /// Completes the exchange and derives the channel for `side`.
    ///
    /// Both sides pass the two public keys in the same order (client first) so
    /// that the derived keys are bound to this particular exchange.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NonContributory`] if the peer key is a low-order
    /// point.
    pub fn agree(
        self,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
        client_public: &[u8; PUBLIC_KEY_SIZE],
        server_public: &[u8; PUBLIC_KEY_SIZE],
        side: Side,
    ) -> Result<SecureChannel, CryptoError> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }

        let mut salt = [0u8; PUBLIC_KEY_SIZE * 2];
        salt[..PUBLIC_KEY_SIZE].copy_from_slice(client_public);
        salt[PUBLIC_KEY_SIZE..].copy_from_slice(server_public);

        SecureChannel::derive(shared.as_bytes(), &salt, side)
    }
}

impl std::fmt::Debug for DiffieHellmanKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffieHellmanKeys")
            .field("public", &self.public.as_bytes())
            .finish_non_exhaustive()
    }
}
