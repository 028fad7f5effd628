//! Prompt providers and the ordered fallback chain

use crate::core::error::{PipelineError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One LLM backend: send a prompt, get text back
#[async_trait]
pub trait PromptProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn send_prompt(&self, system: &str, payload: &str) -> Result<String>;
}

/// A reply accepted from one provider
#[derive(Debug, Clone)]
pub struct ProviderReply<T> {
    pub provider: String,
    pub value: T,
}

/// Providers in fixed priority order.
///
/// Providers are tried one at a time, never concurrently. A provider that
/// errors, times out, returns blank text, or returns text the caller cannot
/// accept is skipped in favor of the next one.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn PromptProvider>>,
    timeout: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn PromptProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// First reply that `accept` turns into a value
    pub async fn request<T, F>(&self, system: &str, payload: &str, accept: F) -> Result<ProviderReply<T>>
    where
        F: Fn(&str) -> Result<T>,
    {
        for provider in &self.providers {
            let id = provider.id();
            tracing::debug!("sending prompt to provider {}", id);

            let text = match tokio::time::timeout(self.timeout, provider.send_prompt(system, payload)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => text,
                Ok(Ok(_)) => {
                    tracing::warn!("provider {} returned an empty reply", id);
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!("provider {} failed: {}", id, e);
                    continue;
                }
                Err(_) => {
                    tracing::warn!("provider {} timed out after {:?}", id, self.timeout);
                    continue;
                }
            };

            match accept(&text) {
                Ok(value) => {
                    return Ok(ProviderReply { provider: id.to_string(), value });
                }
                Err(e) => tracing::warn!("provider {} reply rejected: {}", id, e),
            }
        }

        Err(PipelineError::ProvidersExhausted { attempted: self.providers.len() })
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.ids())
            .field("timeout", &self.timeout)
            .finish()
    }
}
