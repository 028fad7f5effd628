//! Per-command domain actions supplied by the host

use crate::core::error::Result;
use crate::core::types::{EntityId, Parameters};
use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Arc;

/// What a domain action reported back
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub success: bool,
    /// Set when the action created an entity
    pub entity_id: Option<EntityId>,
    /// User-facing description of what happened (or why it did not)
    pub message: String,
}

impl DispatchOutcome {
    pub fn created(entity_id: EntityId, message: impl Into<String>) -> Self {
        Self { success: true, entity_id: Some(entity_id), message: message.into() }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self { success: true, entity_id: None, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, entity_id: None, message: message.into() }
    }
}

/// One executable domain action.
///
/// `Err` means the action raised; `Ok` with `success == false` means it ran
/// and reported a failure. The executor retries the two differently.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, parameters: &Parameters) -> Result<DispatchOutcome>;
}

/// Command name -> handler
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: AHashMap<String, Arc<dyn CommandHandler>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn with(mut self, name: &str, handler: Arc<dyn CommandHandler>) -> Self {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("DispatchTable").field("handlers", &names).finish()
    }
}
