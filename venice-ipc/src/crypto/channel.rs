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


//! Per-connection session state for an encrypted channel.

use crate::crypto::{CryptoError, Encryptor, KEY_SIZE};
use hkdf::Hkdf;
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};

const CLIENT_TO_SERVER_INFO: &[u8] = b"venice-ipc/aes-256-gcm/v2/client-to-server";
const SERVER_TO_CLIENT_INFO: &[u8] = b"venice-ipc/aes-256-gcm/v2/server-to-client";

/// Which end of the connection a [`SecureChannel`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The connecting end.
    Client,
    /// The accepting end.
    Server,
}

/// Keys and transmission counters of one encrypted connection.
///
/// Each direction has its own key, so a transmission reflected back at its
/// sender never opens. Each direction also numbers its transmissions from
/// zero; the number is bound into the additional authenticated data, and the
/// reader only accepts the next number it expects. Replayed, dropped or
/// reordered transmissions therefore fail authentication.
///
/// The write half of a connection only touches the outbound counter and the
/// read half only the inbound one, so both halves share one channel.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::crypto::{SecureChannel, Side};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SecureChannel::derive(&[1u8; 32], b"salt", Side::Client)?;
/// let server = SecureChannel::derive(&[1u8; 32], b"salt", Side::Server)?;
///
/// let sealed = client.seal(b"hello", b"aad")?;
/// assert_eq!(server.open(&sealed, b"aad")?, b"hello");
/// assert!(client.open(&sealed, b"aad").is_err());
/// # Ok(())
/// # }
/// ```
pub struct SecureChannel {
    side: Side,
    outbound: Encryptor,
    inbound: Encryptor,
    sent: AtomicU64,
    received: AtomicU64,
}

impl SecureChannel {
    /// Derives both direction keys from a shared secret with HKDF-SHA256.
    pub fn derive(secret: &[u8], salt: &[u8], side: Side) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(salt), secret);
        let expand = |info: &[u8]| -> Result<Encryptor, CryptoError> {
            let mut key = [0u8; KEY_SIZE];
            hk.expand(info, &mut key)
                .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
            Encryptor::new(&key)
        };
        let to_server = expand(CLIENT_TO_SERVER_INFO)?;
        let to_client = expand(SERVER_TO_CLIENT_INFO)?;
        let (outbound, inbound) = match side {
            Side::Client => (to_server, to_client),
            Side::Server => (to_client, to_server),
        };
        Ok(Self {
            side,
            outbound,
            inbound,
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
        })
    }

    /// The end this channel belongs to.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Claims the sequence number of the next outbound transmission.
    pub fn next_outbound_sequence(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::AcqRel)
    }

    /// The sequence number the next inbound transmission must carry.
    pub fn expected_inbound_sequence(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }

    /// Marks the expected inbound transmission as accepted.
    pub fn advance_inbound(&self) {
        self.received.fetch_add(1, Ordering::AcqRel);
    }

    /// Seals a frame with the outbound key.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.outbound.encrypt(plaintext, aad)
    }

    /// Opens a frame with the inbound key.
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inbound.decrypt(sealed, aad)
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("side", &self.side)
            .field("sent", &self.sent.load(Ordering::Relaxed))
            .field("received", &self.received.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (SecureChannel, SecureChannel) {
        let secret = [5u8; 32];
        (
            SecureChannel::derive(&secret, b"salt", Side::Client).unwrap(),
            SecureChannel::derive(&secret, b"salt", Side::Server).unwrap(),
        )
    }

    #[test]
    fn test_directions_use_distinct_keys() {
        let (client, server) = pair();
        let up = client.seal(b"up", b"aad").unwrap();
        let down = server.seal(b"down", b"aad").unwrap();

        assert_eq!(server.open(&up, b"aad").unwrap(), b"up");
        assert_eq!(client.open(&down, b"aad").unwrap(), b"down");
        assert_eq!(client.open(&up, b"aad"), Err(CryptoError::Decrypt));
        assert_eq!(server.open(&down, b"aad"), Err(CryptoError::Decrypt));
    }

    #[test]
    fn test_counters_are_independent() {
        let (client, _) = pair();
        assert_eq!(client.next_outbound_sequence(), 0);
        assert_eq!(client.next_outbound_sequence(), 1);
        assert_eq!(client.expected_inbound_sequence(), 0);
        client.advance_inbound();
        assert_eq!(client.expected_inbound_sequence(), 1);
        assert_eq!(client.next_outbound_sequence(), 2);
    }

    #[test]
    fn test_salt_separates_sessions() {
        let client = SecureChannel::derive(&[5u8; 32], b"one", Side::Client).unwrap();
        let server = SecureChannel::derive(&[5u8; 32], b"two", Side::Server).unwrap();
        let sealed = client.seal(b"x", b"").unwrap();
        assert!(server.open(&sealed, b"").is_err());
    }
}
