//! Cadence - natural-language command orchestration
//!
//! Turns free-text utterances into validated, executed application commands,
//! falling back to LLM providers for requests keyword classification cannot
//! settle.

pub mod command;
pub mod context;
pub mod core;
pub mod extract;
pub mod fallback;
pub mod host;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod validation;

pub use crate::core::{PipelineConfig, PipelineError, ProcessingResult, Result};
pub use crate::pipeline::Pipeline;
