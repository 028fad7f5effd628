//! Conversation context for one session
//!
//! The [`ContextStore`] owns the bounded turn history and the derived
//! [`ConversationContext`] that every downstream stage reads. It is the only
//! place session state is mutated.

pub mod store;

use crate::command::catalog::IntentCategory;
use crate::core::types::{EntityId, Parameters, Vec3};
use serde::Serialize;
use std::collections::BTreeSet;

pub use store::{ContextStore, ConversationTurn};

/// Situational state derived at the start of each turn
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationContext {
    /// Operation tags of recent turns, oldest first
    pub recent_operations: Vec<String>,
    /// Layer new objects land on
    pub active_layer: String,
    /// Currently selected entities
    pub selected_entities: BTreeSet<EntityId>,
    /// Free-text scene description from the host
    pub scene_summary: String,
    /// Layers known to exist in the host document
    pub layers: Vec<String>,
    /// Most recent object created through the pipeline
    pub last_created: Option<CreatedObject>,
}

/// An entity created by a successful command execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedObject {
    pub id: EntityId,
    /// Type tag ("sphere", "box", ...)
    pub kind: String,
    /// Parameters the entity was created with
    pub parameters: Parameters,
    /// Resolved position, used for "next to it" style phrases
    pub position: Vec3,
}

impl CreatedObject {
    /// Build a record from creation parameters; position falls back to the origin
    pub fn from_parameters(id: EntityId, kind: &str, parameters: Parameters) -> Self {
        let position = parameters
            .get("center")
            .and_then(|v| v.as_vec3())
            .unwrap_or(Vec3::ORIGIN);
        Self {
            id,
            kind: kind.into(),
            parameters,
            position,
        }
    }
}

/// Map an operation tag to the category it supports
fn tag_category(tag: &str) -> Option<IntentCategory> {
    match tag {
        "create" => Some(IntentCategory::DirectCommand),
        "move" | "scale" | "rotate" | "modify" => Some(IntentCategory::Modification),
        _ => None,
    }
}

impl ConversationContext {
    /// How strongly recent history supports `category`, in [0, 1].
    ///
    /// 0 when no recent tag maps to the category; otherwise scaled by the
    /// age of the newest matching tag (newest = 1.0, each older step loses
    /// an equal share).
    pub fn relevance_score(&self, category: IntentCategory) -> f64 {
        let n = self.recent_operations.len();
        if n == 0 {
            return 0.0;
        }

        self.recent_operations
            .iter()
            .rev()
            .position(|tag| tag_category(tag) == Some(category))
            .map(|age| (n - age) as f64 / n as f64)
            .unwrap_or(0.0)
    }

    /// Generate a text summary of the context for prompts and query answers
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(&format!("Scene: {}\n", display_or(&self.scene_summary, "unknown")));
        s.push_str(&format!("Active layer: {}\n", display_or(&self.active_layer, "default")));
        s.push_str(&format!("Selected objects: {}\n", self.selected_entities.len()));

        if !self.recent_operations.is_empty() {
            let recent: Vec<_> = self.recent_operations.iter().rev().take(3).cloned().collect();
            s.push_str(&format!("Recent operations: {}\n", recent.join(", ")));
        }

        if let Some(obj) = &self.last_created {
            s.push_str(&format!("Last created: {} {} at {}\n", obj.kind, obj.id, obj.position));
        }

        s
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ParamValue;

    fn context_with(tags: &[&str]) -> ConversationContext {
        ConversationContext {
            recent_operations: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_relevance_zero_without_history() {
        let ctx = ConversationContext::default();
        assert_eq!(ctx.relevance_score(IntentCategory::DirectCommand), 0.0);
    }

    #[test]
    fn test_relevance_scaled_by_recency() {
        let ctx = context_with(&["create", "move", "move", "move", "move"]);
        assert!((ctx.relevance_score(IntentCategory::Modification) - 1.0).abs() < 1e-9);
        assert!((ctx.relevance_score(IntentCategory::DirectCommand) - 0.2).abs() < 1e-9);
        assert_eq!(ctx.relevance_score(IntentCategory::Query), 0.0);
    }

    #[test]
    fn test_created_object_position_from_center() {
        let mut params = Parameters::new();
        params.insert("center".into(), ParamValue::Vector(Vec3::new(1.0, 2.0, 3.0)));
        let obj = CreatedObject::from_parameters(EntityId::new(), "sphere", params);
        assert_eq!(obj.position, Vec3::new(1.0, 2.0, 3.0));

        let bare = CreatedObject::from_parameters(EntityId::new(), "box", Parameters::new());
        assert_eq!(bare.position, Vec3::ORIGIN);
    }

    #[test]
    fn test_summary_mentions_last_created() {
        let mut ctx = context_with(&["create"]);
        ctx.active_layer = "Walls".into();
        ctx.last_created = Some(CreatedObject::from_parameters(
            EntityId::new(),
            "sphere",
            Parameters::new(),
        ));
        let summary = ctx.summary();
        assert!(summary.contains("Active layer: Walls"));
        assert!(summary.contains("Last created: sphere"));
        assert!(summary.contains("Scene: unknown"));
    }
}
