//! Pipeline controller
//!
//! One turn runs strictly in order:
//! classify (previous context) -> refresh context -> route
//!
//! Routing:
//! - confident `DirectCommand` / `Modification`: extract, validate, execute
//! - confident `Query`: answered from the refreshed context
//! - anything else: AI orchestrator, or a clarification request when no
//!   provider is configured
//!
//! Each session has its own `ContextStore` behind an async mutex, so turns
//! within a session are serialized while sessions run independently.

use crate::command::catalog::{CommandCatalog, IntentCategory};
use crate::command::dispatch::DispatchTable;
use crate::command::executor::CommandExecutor;
use crate::context::{ContextStore, ConversationContext};
use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::ProcessingResult;
use crate::extract::ParameterExtractor;
use crate::fallback::{FallbackHandler, EMPTY_INPUT_MESSAGE};
use crate::host::SceneHost;
use crate::intent::{IntentClassifier, IntentResult};
use crate::llm::cache::ResponseCache;
use crate::llm::orchestrator::{answer_query, AiOrchestrator};
use crate::llm::provider::{PromptProvider, ProviderChain};
use crate::validation::SemanticValidator;
use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type SessionHandle = Arc<Mutex<ContextStore>>;

pub struct Pipeline {
    config: PipelineConfig,
    catalog: Arc<CommandCatalog>,
    classifier: IntentClassifier,
    extractor: Arc<ParameterExtractor>,
    validator: SemanticValidator,
    executor: CommandExecutor,
    orchestrator: AiOrchestrator,
    fallback: FallbackHandler,
    scene: Arc<dyn SceneHost>,
    sessions: Mutex<AHashMap<String, SessionHandle>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        catalog: CommandCatalog,
        scene: Arc<dyn SceneHost>,
        dispatch: DispatchTable,
        providers: Vec<Arc<dyn PromptProvider>>,
    ) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new(config.cache_ttl()));
        Self::with_cache(config, catalog, scene, dispatch, providers, cache)
    }

    /// Build a pipeline that shares an existing response cache
    pub fn with_cache(
        config: PipelineConfig,
        catalog: CommandCatalog,
        scene: Arc<dyn SceneHost>,
        dispatch: DispatchTable,
        providers: Vec<Arc<dyn PromptProvider>>,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        config.validate().map_err(PipelineError::Config)?;

        for template in catalog.all() {
            if !template.requires_ai
                && template.category != IntentCategory::Query
                && !dispatch.contains(&template.name)
            {
                tracing::warn!("no handler registered for {}", template.name);
            }
        }

        let catalog = Arc::new(catalog);
        let extractor = Arc::new(ParameterExtractor::new(config.relative_offset, config.max_dimension)?);
        let classifier = IntentClassifier::new(catalog.clone(), config.keyword_weight, config.context_weight);
        let executor = CommandExecutor::new(dispatch, extractor.clone(), &config);
        let chain = ProviderChain::new(providers, config.provider_timeout());
        tracing::info!("pipeline ready with {} template(s), providers {:?}", catalog.len(), chain.ids());
        let orchestrator = AiOrchestrator::new(chain, cache, catalog.clone(), &config);

        Ok(Self {
            config,
            catalog,
            classifier,
            extractor,
            validator: SemanticValidator::new(),
            executor,
            orchestrator,
            fallback: FallbackHandler::new(),
            scene,
            sessions: Mutex::new(AHashMap::new()),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ResponseCache {
        self.orchestrator.cache()
    }

    /// Single entry point: one utterance, one result
    pub async fn process_utterance(&self, text: &str, session_id: &str) -> ProcessingResult {
        if text.trim().is_empty() {
            return ProcessingResult::Error(EMPTY_INPUT_MESSAGE.into());
        }

        let session = self.session(session_id).await;
        let mut store = session.lock().await;

        match self.run_turn(text, &mut store).await {
            Ok(result) => {
                tracing::debug!("session {} -> {}", session_id, result);
                result
            }
            Err(e) => self.fallback.internal_fault(&e),
        }
    }

    async fn run_turn(&self, text: &str, store: &mut ContextStore) -> Result<ProcessingResult> {
        // Classification sees the context as of the previous turn
        let intent = self.classifier.classify(text, store.context());
        store.begin_turn(text, self.scene.as_ref()).await;

        tracing::info!(
            "classified as {} ({:?}) with confidence {:.2}",
            intent.category.label(),
            intent.template_name(),
            intent.confidence
        );

        if self.needs_interpretation(&intent) {
            if !self.orchestrator.has_providers() {
                return Ok(self.fallback.low_confidence(&intent));
            }
            return self.orchestrator.interpret(text, store, &self.executor).await;
        }

        let Some(template) = intent.template.clone() else {
            return Ok(self.fallback.low_confidence(&intent));
        };

        match intent.category {
            IntentCategory::Query => Ok(answer_query(store.context())),
            IntentCategory::DirectCommand | IntentCategory::Modification => {
                let parameters = self.extractor.extract(text, &template, store.context());
                let validation = self.validator.validate_parameters(&parameters, &template);
                if !validation.is_valid {
                    return Ok(ProcessingResult::Error(format!(
                        "Invalid parameters: {}",
                        validation.message()
                    )));
                }
                let report = self.executor.execute_with_retry(&template, parameters, store).await;
                Ok(report.result)
            }
            IntentCategory::ComplexOperation | IntentCategory::Unknown => Ok(self.fallback.low_confidence(&intent)),
        }
    }

    fn needs_interpretation(&self, intent: &IntentResult) -> bool {
        intent.confidence < self.config.confidence_threshold
            || matches!(intent.category, IntentCategory::ComplexOperation | IntentCategory::Unknown)
            || intent.template.as_ref().map_or(true, |t| t.requires_ai)
    }

    async fn session(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("opening session {}", session_id);
                Arc::new(Mutex::new(ContextStore::new(
                    self.config.history_capacity,
                    self.config.recent_operation_limit,
                )))
            })
            .clone()
    }

    /// Snapshot of a session's context, if the session exists
    pub async fn session_context(&self, session_id: &str) -> Option<ConversationContext> {
        let session = self.sessions.lock().await.get(session_id).cloned()?;
        let store = session.lock().await;
        Some(store.context().clone())
    }

    /// Utterances currently held in a session's history, oldest first
    pub async fn session_history(&self, session_id: &str) -> Vec<String> {
        let Some(session) = self.sessions.lock().await.get(session_id).cloned() else {
            return Vec::new();
        };
        let store = session.lock().await;
        store.history().map(|turn| turn.utterance.clone()).collect()
    }

    pub async fn end_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
