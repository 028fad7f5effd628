//! Per-session context store with bounded FIFO history

use super::{ConversationContext, CreatedObject};
use crate::core::text::words;
use crate::host::SceneHost;
use std::collections::VecDeque;
use std::time::SystemTime;

/// One user turn; appended to history, never edited
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub utterance: String,
    pub timestamp: SystemTime,
}

/// Verb forms recognized as operations, mapped to their tag
const OPERATION_VERBS: &[(&str, &str)] = &[
    ("create", "create"),
    ("make", "create"),
    ("add", "create"),
    ("draw", "create"),
    ("place", "create"),
    ("move", "move"),
    ("shift", "move"),
    ("scale", "scale"),
    ("resize", "scale"),
    ("rotate", "rotate"),
    ("turn", "rotate"),
    ("modify", "modify"),
    ("change", "modify"),
    ("edit", "modify"),
    ("update", "modify"),
];

/// Operation tag of the first recognized verb in `utterance`
pub fn operation_tag(utterance: &str) -> Option<&'static str> {
    words(utterance).iter().find_map(|w| {
        OPERATION_VERBS
            .iter()
            .find(|(verb, _)| verb == w)
            .map(|(_, tag)| *tag)
    })
}

/// Owns one session's history and derived context
#[derive(Debug)]
pub struct ContextStore {
    history: VecDeque<ConversationTurn>,
    capacity: usize,
    operation_limit: usize,
    context: ConversationContext,
}

impl ContextStore {
    pub fn new(capacity: usize, operation_limit: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            operation_limit,
            context: ConversationContext::default(),
        }
    }

    /// Record a turn and refresh host-derived fields.
    ///
    /// Host failures keep the previous value of the affected field.
    pub async fn begin_turn(&mut self, utterance: &str, host: &dyn SceneHost) -> &ConversationContext {
        self.record_turn(utterance);

        match host.active_layer().await {
            Ok(layer) => self.context.active_layer = layer,
            Err(e) => tracing::warn!("active layer refresh failed: {}", e),
        }
        match host.selected_entities().await {
            Ok(selected) => self.context.selected_entities = selected.into_iter().collect(),
            Err(e) => tracing::warn!("selection refresh failed: {}", e),
        }
        match host.scene_summary().await {
            Ok(summary) => self.context.scene_summary = summary,
            Err(e) => tracing::warn!("scene summary refresh failed: {}", e),
        }
        match host.layers().await {
            Ok(layers) => self.context.layers = layers,
            Err(e) => tracing::warn!("layer list refresh failed: {}", e),
        }

        &self.context
    }

    /// Append a turn, evict beyond capacity, and re-derive operation tags
    pub fn record_turn(&mut self, utterance: &str) {
        self.history.push_back(ConversationTurn {
            utterance: utterance.to_string(),
            timestamp: SystemTime::now(),
        });
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let skip = self.history.len().saturating_sub(self.operation_limit);
        self.context.recent_operations = self
            .history
            .iter()
            .skip(skip)
            .filter_map(|turn| operation_tag(&turn.utterance))
            .map(String::from)
            .collect();
    }

    /// Remember an entity created by the executor
    pub fn record_created(&mut self, object: CreatedObject) {
        tracing::debug!("recording created {} {}", object.kind, object.id);
        self.context.last_created = Some(object);
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Turns in chronological order
    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{PipelineError, Result};
    use crate::core::types::{EntityId, Parameters};
    use async_trait::async_trait;

    struct FixedHost;

    #[async_trait]
    impl SceneHost for FixedHost {
        async fn active_layer(&self) -> Result<String> {
            Ok("Walls".into())
        }
        async fn selected_entities(&self) -> Result<Vec<EntityId>> {
            Ok(vec![EntityId::new(), EntityId::new()])
        }
        async fn scene_summary(&self) -> Result<String> {
            Err(PipelineError::Dispatch("host busy".into()))
        }
    }

    #[test]
    fn test_operation_tags() {
        assert_eq!(operation_tag("Create a sphere"), Some("create"));
        assert_eq!(operation_tag("please resize the box"), Some("scale"));
        assert_eq!(operation_tag("what is on the layer?"), None);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut store = ContextStore::new(10, 5);
        for i in 0..11 {
            store.record_turn(&format!("turn {}", i));
        }
        assert_eq!(store.history_len(), 10);
        let first = store.history().next().unwrap();
        assert_eq!(first.utterance, "turn 1");
    }

    #[test]
    fn test_recent_operations_limited_to_window() {
        let mut store = ContextStore::new(10, 5);
        store.record_turn("rotate it");
        for _ in 0..5 {
            store.record_turn("move it");
        }
        let ops = &store.context().recent_operations;
        assert_eq!(ops.len(), 5);
        assert!(ops.iter().all(|op| op == "move"));
    }

    #[test]
    fn test_record_created_sets_last_created() {
        let mut store = ContextStore::new(10, 5);
        let id = EntityId::new();
        store.record_created(CreatedObject::from_parameters(id, "box", Parameters::new()));
        assert_eq!(store.context().last_created.as_ref().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_begin_turn_refreshes_and_tolerates_host_errors() {
        let mut store = ContextStore::new(10, 5);
        let ctx = store.begin_turn("create a box", &FixedHost).await;
        assert_eq!(ctx.active_layer, "Walls");
        assert_eq!(ctx.selected_entities.len(), 2);
        assert_eq!(ctx.scene_summary, "");
        assert_eq!(ctx.recent_operations, vec!["create".to_string()]);
    }
}
