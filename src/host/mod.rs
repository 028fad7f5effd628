//! Collaborator interfaces implemented by the host application
//!
//! The pipeline never talks to a modeling application directly. It reads
//! scene state through [`SceneHost`] and performs work through the
//! per-command handlers registered in a [`crate::command::DispatchTable`].

pub mod memory;

use crate::core::error::Result;
use crate::core::types::EntityId;
use async_trait::async_trait;

pub use memory::MemoryScene;

/// Read-only view of the host scene used to refresh conversation context
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Label of the layer new objects land on
    async fn active_layer(&self) -> Result<String>;

    /// Identifiers of the currently selected entities
    async fn selected_entities(&self) -> Result<Vec<EntityId>>;

    /// Short free-text description of the scene
    async fn scene_summary(&self) -> Result<String>;

    /// Names of existing layers. An empty list disables layer checks.
    async fn layers(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
