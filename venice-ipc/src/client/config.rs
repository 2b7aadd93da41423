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


//! Client configuration.

use std::time::Duration;

/// Default capacity of the response queue between the listener and callers.
pub const DEFAULT_RECEIVE_QUEUE_CAPACITY: usize = 100;

/// Default number of subscription deliveries buffered for the handler.
pub const DEFAULT_SUBSCRIPTION_BUFFER_SIZE: usize = 1000;

/// Configuration for a [`Client`](crate::client::Client).
///
/// # Examples
///
/// ```rust
/// use venice_ipc::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("127.0.0.1:33333")
///     .with_encryption(true)
///     .with_credentials("worker", "secret")
///     .with_default_timeout(Duration::from_secs(5));
/// assert!(config.encrypt);
/// assert_eq!(config.receive_queue_capacity, 100);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Server address.
    pub address: String,

    /// Request encryption even if the server does not mandate it.
    ///
    /// Default: false
    pub encrypt: bool,

    /// Principal to authenticate as.
    pub user: Option<String>,

    /// Password of [`user`](Self::user).
    pub password: Option<String>,

    /// Time allowed for the TCP connect.
    ///
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Time allowed for the setup exchange.
    ///
    /// Default: 10 seconds
    pub handshake_timeout: Duration,

    /// Timeout of the convenience operations that take none.
    ///
    /// Default: 10 seconds
    pub default_timeout: Duration,

    /// Responses buffered between the listener and waiting callers. A full
    /// queue stalls the listener rather than dropping responses.
    ///
    /// Default: 100
    pub receive_queue_capacity: usize,

    /// Subscription deliveries buffered for the handler. A full buffer drops
    /// deliveries.
    ///
    /// Default: 1000
    pub subscription_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:33333".to_string(),
            encrypt: false,
            user: None,
            password: None,
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            default_timeout: Duration::from_secs(10),
            receive_queue_capacity: DEFAULT_RECEIVE_QUEUE_CAPACITY,
            subscription_buffer_size: DEFAULT_SUBSCRIPTION_BUFFER_SIZE,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("address", &self.address)
            .field("encrypt", &self.encrypt)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("default_timeout", &self.default_timeout)
            .field("receive_queue_capacity", &self.receive_queue_capacity)
            .field("subscription_buffer_size", &self.subscription_buffer_size)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Requests encryption.
    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Authenticates as `user` during setup.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the setup exchange timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the timeout of convenience operations.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the response queue capacity.
    pub fn with_receive_queue_capacity(mut self, capacity: usize) -> Self {
        self.receive_queue_capacity = capacity.max(1);
        self
    }

    /// Sets the subscription buffer size.
    pub fn with_subscription_buffer_size(mut self, size: usize) -> Self {
        self.subscription_buffer_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let config = ClientConfig::new("localhost:1").with_credentials("u", "topsecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_capacities_at_least_one() {
        let config = ClientConfig::default()
            .with_receive_queue_capacity(0)
            .with_subscription_buffer_size(0);
        assert_eq!(config.receive_queue_capacity, 1);
        assert_eq!(config.subscription_buffer_size, 1);
    }
}
