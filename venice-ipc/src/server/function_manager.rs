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


//! Function registry.

use crate::destination::{DestinationKind, FunctionHandler, FunctionStatus, IpcFunction};
use crate::error::IpcError;
use crate::message::validate_function_name;
use crate::server::Authenticator;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every function of a server.
///
/// Functions are registered in-process; clients can only call, query and
/// remove them.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::destination::HandlerError;
/// use venice_ipc::message::Message;
/// use venice_ipc::server::{Authenticator, FunctionManager};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), venice_ipc::IpcError> {
/// let manager = FunctionManager::new(20, Arc::new(Authenticator::new()));
/// let echo = |request: Message| -> Result<Message, HandlerError> { Ok(request) };
/// manager.register("echo", Arc::new(echo))?;
/// assert!(manager.exists_function("echo"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FunctionManager {
    functions: RwLock<HashMap<String, Arc<IpcFunction>>>,
    max_functions: usize,
    authenticator: Arc<Authenticator>,
}

impl FunctionManager {
    /// Creates an empty manager.
    pub fn new(max_functions: usize, authenticator: Arc<Authenticator>) -> Self {
        Self {
            functions: RwLock::new(HashMap::new()),
            max_functions,
            authenticator,
        }
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`IpcError::Conflict`] if the name is taken: handlers
    /// cannot be compared, so a second registration is never idempotent.
    pub fn register(
        &self,
        name: &str,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<Arc<IpcFunction>, IpcError> {
        validate_function_name(name)?;
        let mut functions = self.functions.write();
        if functions.contains_key(name) {
            return Err(IpcError::Conflict {
                kind: DestinationKind::Function,
                name: name.to_string(),
            });
        }
        if functions.len() >= self.max_functions {
            return Err(IpcError::Capacity {
                kind: DestinationKind::Function,
                max: self.max_functions,
            });
        }
        let acls = self.authenticator.acls_for(DestinationKind::Function, name);
        let function = Arc::new(IpcFunction::new(name, acls, handler));
        functions.insert(name.to_string(), function.clone());
        drop(functions);

        #[cfg(feature = "tracing")]
        tracing::info!("Registered function {}", name);
        Ok(function)
    }

    /// Looks up a function.
    pub fn get_function(&self, name: &str) -> Result<Arc<IpcFunction>, IpcError> {
        self.functions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IpcError::NotFound {
                kind: DestinationKind::Function,
                name: name.to_string(),
            })
    }

    /// Returns `true` if the function exists.
    pub fn exists_function(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Removes a function.
    pub fn remove_function(&self, name: &str) -> Result<(), IpcError> {
        match self.functions.write().remove(name) {
            Some(_) => {
                #[cfg(feature = "tracing")]
                tracing::info!("Removed function {}", name);
                Ok(())
            }
            None => Err(IpcError::NotFound {
                kind: DestinationKind::Function,
                name: name.to_string(),
            }),
        }
    }

    /// Describes a function.
    pub fn function_status(&self, name: &str) -> Result<FunctionStatus, IpcError> {
        Ok(self.get_function(name)?.status())
    }

    /// All function names, sorted.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Returns `true` if there are no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::HandlerError;
    use crate::message::Message;

    fn echo() -> Arc<dyn FunctionHandler> {
        Arc::new(|request: Message| -> Result<Message, HandlerError> { Ok(request) })
    }

    #[test]
    fn test_register_rejects_duplicates_and_limit() {
        let manager = FunctionManager::new(1, Arc::new(Authenticator::new()));
        manager.register("echo", echo()).unwrap();
        assert!(matches!(
            manager.register("echo", echo()),
            Err(IpcError::Conflict { .. })
        ));
        assert!(matches!(
            manager.register("other", echo()),
            Err(IpcError::Capacity { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_counts_invocations() {
        let manager = FunctionManager::new(5, Arc::new(Authenticator::new()));
        let function = manager.register("echo", echo()).unwrap();
        let request = Message::new_text("ping", "text/plain", "x").unwrap();
        function.invoke(request).await.unwrap();
        assert_eq!(manager.function_status("echo").unwrap().invocations, 1);

        manager.remove_function("echo").unwrap();
        assert!(!manager.exists_function("echo"));
        assert!(manager.remove_function("echo").is_err());
    }
}
