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


//! Cryptographic building blocks for the IPC channel.
//!
//! - [`DiffieHellmanKeys`]: one ephemeral X25519 key pair per connection
//! - [`SecureChannel`]: HKDF-SHA256 derivation of one key per direction from
//!   the shared secret, plus the transmission counters of each direction
//! - [`Encryptor`]: AES-256-GCM sealing of individual frames, with a fresh
//!   random nonce per frame and caller-supplied additional authenticated data
//! - [`PasswordHash`]: salted SHA-256 password hashes compared in constant time
//!
//! # Key exchange
//!
//! ```rust
//! use venice_ipc::crypto::{DiffieHellmanKeys, Side};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DiffieHellmanKeys::generate();
//! let server = DiffieHellmanKeys::generate();
//! let client_public = client.public_key();
//! let server_public = server.public_key();
//!
//! let client_channel = client.agree(&server_public, &client_public, &server_public, Side::Client)?;
//! let server_channel = server.agree(&client_public, &client_public, &server_public, Side::Server)?;
//!
//! let sealed = client_channel.seal(b"hello", b"header")?;
//! assert_eq!(server_channel.open(&sealed, b"header")?, b"hello");
//! # Ok(())
//! # }
//! ```

mod channel;
mod cipher;
mod dh;
mod error;
mod password;

pub use channel::{SecureChannel, Side};
pub use cipher::{Encryptor, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use dh::{DiffieHellmanKeys, PUBLIC_KEY_SIZE};
pub use error::CryptoError;
pub use password::PasswordHash;
