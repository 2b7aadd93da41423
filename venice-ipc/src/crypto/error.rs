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


//! Cryptographic error types.

use thiserror::Error;

/// Errors raised by key agreement, key derivation and frame sealing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A public key had the wrong length.
    #[error("invalid public key: expected {expected} bytes, got {actual}")]
    InvalidPublicKey {
        /// Expected key length
        expected: usize,
        /// Received key length
        actual: usize,
    },

    /// The peer's public key produced a non-contributory shared secret.
    #[error("key agreement rejected: peer public key is a low-order point")]
    NonContributory,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Sealing a frame failed.
    #[error("encryption failed")]
    Encrypt,

    /// Opening a frame failed: wrong key, tampered ciphertext, or tampered
    /// additional authenticated data.
    #[error("decryption failed: frame authentication error")]
    Decrypt,

    /// A sealed frame is too short to contain a nonce and tag.
    #[error("sealed frame too short: {len} bytes")]
    Truncated {
        /// Length of the received frame
        len: usize,
    },
}
