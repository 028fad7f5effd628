//! AI interpretation layer
//!
//! Utterances the classifier cannot settle are sent to LLM providers in
//! priority order. Replies are parsed leniently into an action list that the
//! command executor runs. Providers only interpret; they never execute.

pub mod cache;
pub mod client;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod provider;

pub use cache::{fingerprint, ResponseCache};
pub use client::LlmClient;
pub use orchestrator::{answer_query, AiOrchestrator};
pub use parser::{parse_reply, AiAction, AiResponse};
pub use provider::{PromptProvider, ProviderChain, ProviderReply};
