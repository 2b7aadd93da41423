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


//! Server-side functions.

use crate::destination::{Acl, AclTable, Destination, DestinationKind, SharedAcls};
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error type returned by function handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Application code answering requests addressed to a function.
///
/// Plain closures `Fn(Message) -> Result<Message, HandlerError>` implement
/// this trait.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use venice_ipc::destination::{FunctionHandler, HandlerError};
/// use venice_ipc::message::Message;
///
/// struct Echo;
///
/// #[async_trait]
/// impl FunctionHandler for Echo {
///     async fn call(&self, request: Message) -> Result<Message, HandlerError> {
///         Ok(request)
///     }
/// }
/// ```
#[async_trait]
pub trait FunctionHandler: Send + Sync + 'static {
    /// Handles one request, returning the reply body.
    async fn call(&self, request: Message) -> Result<Message, HandlerError>;
}

#[async_trait]
impl<F> FunctionHandler for F
where
    F: Fn(Message) -> Result<Message, HandlerError> + Send + Sync + 'static,
{
    async fn call(&self, request: Message) -> Result<Message, HandlerError> {
        self(request)
    }
}

/// Point-in-time description of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionStatus {
    /// Function name
    pub name: String,
    /// Calls since registration
    pub invocations: u64,
    /// Calls that returned an error
    pub failures: u64,
}

/// A synchronous request/response destination.
pub struct IpcFunction {
    name: String,
    acls: SharedAcls,
    handler: Arc<dyn FunctionHandler>,
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl IpcFunction {
    /// Wraps a handler.
    pub fn new(name: impl Into<String>, acls: AclTable, handler: Arc<dyn FunctionHandler>) -> Self {
        Self {
            name: name.into(),
            acls: SharedAcls::new(acls),
            handler,
            invocations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Calls the handler.
    pub async fn invoke(&self, request: Message) -> Result<Message, HandlerError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let result = self.handler.call(request).await;
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Describes the function.
    pub fn status(&self) -> FunctionStatus {
        FunctionStatus {
            name: self.name.clone(),
            invocations: self.invocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Destination for IpcFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Function
    }

    fn acls(&self) -> Arc<AclTable> {
        self.acls.load()
    }

    fn update_acls(&self, acls: Vec<Acl>) {
        self.acls.update(acls);
    }
}

impl std::fmt::Debug for IpcFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::AccessMode;

    fn upper(request: Message) -> Result<Message, HandlerError> {
        let text = request.text()?.to_uppercase();
        Ok(Message::new_text("upper", "text/plain", text)?)
    }

    #[tokio::test]
    async fn test_invoke_counts() {
        let f = IpcFunction::new("upper", AclTable::new("upper", AccessMode::ReadWrite), Arc::new(upper));

        let reply = f
            .invoke(Message::new_text("s", "text/plain", "abc").unwrap())
            .await
            .unwrap();
        assert_eq!(reply.text().unwrap(), "ABC");

        let binary = Message::new_binary("s", "application/octet-stream", vec![1]).unwrap();
        assert!(f.invoke(binary).await.is_err());

        let status = f.status();
        assert_eq!(status.invocations, 2);
        assert_eq!(status.failures, 1);
    }

    #[test]
    fn test_execute_requires_write() {
        let f = IpcFunction::new("f", AclTable::new("f", AccessMode::Read), Arc::new(upper));
        assert!(!f.can_execute(None));
        f.update_acls(vec![Acl::default_for("f", AccessMode::Write)]);
        assert!(f.can_execute(None));
        assert!(!f.can_read(None));
    }
}
