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


//! AES-256-GCM frame sealing.

use crate::crypto::CryptoError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of the symmetric channel key.
pub const KEY_SIZE: usize = 32;

/// Size of the per-frame nonce prefixed to every sealed frame.
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag appended to every sealed frame.
pub const TAG_SIZE: usize = 16;

/// Authenticated encryption of individual frames.
///
/// A sealed frame is laid out as `nonce || ciphertext || tag`, so sealing adds
/// [`NONCE_SIZE`] + [`TAG_SIZE`] bytes. The additional authenticated data is
/// not stored; the reader must supply the same bytes (the frame header) to
/// open it.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::crypto::{Encryptor, NONCE_SIZE, TAG_SIZE};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cipher = Encryptor::new(&[7u8; 32])?;
/// let sealed = cipher.encrypt(b"data", b"aad")?;
/// assert_eq!(sealed.len(), 4 + NONCE_SIZE + TAG_SIZE);
/// assert!(cipher.decrypt(&sealed, b"other aad").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    /// Creates a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Seals `plaintext`, binding it to `aad`.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Opens a frame produced by [`Encryptor::encrypt`].
    ///
    /// Fails if the key, the ciphertext, or `aad` differ from those used to
    /// seal it.
    pub fn decrypt(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Truncated { len: sealed.len() });
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Decrypt)
    }

    /// Number of bytes sealing adds to a frame.
    pub const fn overhead() -> usize {
        NONCE_SIZE + TAG_SIZE
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}
