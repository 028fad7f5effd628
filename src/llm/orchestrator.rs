//! AI interpretation of utterances the classifier could not settle
//!
//! Cache lookup -> prompt -> provider chain -> recovery parser -> execute
//! each action through the command executor. Only fully successful outcomes
//! are cached.

use crate::command::catalog::{CommandCatalog, CommandTemplate, IntentCategory};
use crate::command::executor::CommandExecutor;
use crate::context::{ContextStore, ConversationContext};
use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::{ParamValue, Parameters, ProcessingResult};
use crate::fallback::FallbackHandler;
use crate::llm::cache::{fingerprint, ResponseCache};
use crate::llm::parser::{parse_reply, AiAction};
use crate::llm::prompt::{system_prompt, AiRequest};
use crate::llm::provider::ProviderChain;
use std::sync::Arc;

const NO_ACTIONS_MESSAGE: &str = "Could not process the request completely.";

pub struct AiOrchestrator {
    chain: ProviderChain,
    cache: Arc<ResponseCache>,
    catalog: Arc<CommandCatalog>,
    fallback: FallbackHandler,
    min_action_confidence: f64,
}

impl AiOrchestrator {
    pub fn new(
        chain: ProviderChain,
        cache: Arc<ResponseCache>,
        catalog: Arc<CommandCatalog>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            chain,
            cache,
            catalog,
            fallback: FallbackHandler::new(),
            min_action_confidence: config.min_action_confidence,
        }
    }

    pub fn has_providers(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Interpret `utterance` and execute what the provider proposes.
    ///
    /// Provider exhaustion is an `Error` result, not an `Err`; `Err` is kept
    /// for internal faults.
    pub async fn interpret(
        &self,
        utterance: &str,
        store: &mut ContextStore,
        executor: &CommandExecutor,
    ) -> Result<ProcessingResult> {
        let key = fingerprint(utterance, store.context());
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("cache hit for {:?}", utterance);
            return Ok(cached);
        }

        let system = system_prompt(&self.catalog, store.context());
        let payload = AiRequest::new(utterance, store.context(), &self.catalog).to_payload()?;

        let reply = match self.chain.request(&system, &payload, parse_reply).await {
            Ok(reply) => reply,
            Err(PipelineError::ProvidersExhausted { attempted }) => {
                return Ok(self.fallback.providers_exhausted(attempted));
            }
            Err(e) => return Err(e),
        };
        let response = reply.value;
        tracing::info!("provider {} proposed {} action(s)", reply.provider, response.actions.len());

        let actions: Vec<&AiAction> = response
            .actions
            .iter()
            .filter(|action| {
                let keep = action.confidence >= self.min_action_confidence;
                if !keep {
                    tracing::debug!(
                        "skipping {} with confidence {:.2}",
                        action.command_name,
                        action.confidence
                    );
                }
                keep
            })
            .collect();

        if actions.is_empty() {
            let text = response.response_text.unwrap_or_else(|| NO_ACTIONS_MESSAGE.to_string());
            return Ok(ProcessingResult::Partial(text));
        }

        let mut lines = Vec::with_capacity(actions.len());
        let mut succeeded = 0;
        for action in &actions {
            let result = self.run_action(action, store, executor).await;
            if result.is_success() {
                succeeded += 1;
            }
            lines.push(result.message().to_string());
        }

        let combined = lines.join("\n");
        let result = if succeeded == actions.len() {
            let result = ProcessingResult::Success(combined);
            self.cache.insert(key, result.clone());
            result
        } else if succeeded > 0 {
            ProcessingResult::Warning(combined)
        } else {
            ProcessingResult::Error(combined)
        };
        Ok(result)
    }

    async fn run_action(
        &self,
        action: &AiAction,
        store: &mut ContextStore,
        executor: &CommandExecutor,
    ) -> ProcessingResult {
        let Some(template) = self.catalog.get(&action.command_name) else {
            tracing::warn!("provider proposed unknown command {}", action.command_name);
            return ProcessingResult::Error(format!("Unknown command '{}'", action.command_name));
        };

        if template.category == IntentCategory::Query {
            return answer_query(store.context());
        }

        let parameters = declared_parameters(action, &template);
        executor.execute_with_retry(&template, parameters, store).await.result
    }
}

/// Answer a scene question from the refreshed context; never dispatches
pub fn answer_query(context: &ConversationContext) -> ProcessingResult {
    ProcessingResult::Success(context.summary().trim_end().to_string())
}

/// Provider parameters restricted to the keys the template declares
fn declared_parameters(action: &AiAction, template: &CommandTemplate) -> Parameters {
    let mut parameters = Parameters::new();
    for (key, value) in &action.parameters {
        let Some(declared) = template.parameters.iter().find(|p| p.eq_ignore_ascii_case(key)) else {
            tracing::debug!("dropping undeclared parameter {} for {}", key, template.name);
            continue;
        };
        match ParamValue::from_json(value) {
            Some(value) => {
                parameters.insert(declared.clone(), value);
            }
            None => tracing::debug!("dropping unusable value for {}: {}", key, value),
        }
    }
    parameters
}
