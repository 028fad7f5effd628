//! User-facing results for the paths that did not produce a confident,
//! successful outcome
//!
//! Every function here maps a failure to a [`ProcessingResult`]. Internal
//! detail goes to the log only; the returned messages are stable.

use crate::command::catalog::{CommandTemplate, IntentCategory};
use crate::core::error::PipelineError;
use crate::core::types::ProcessingResult;
use crate::intent::IntentResult;

pub const EMPTY_INPUT_MESSAGE: &str = "Please provide a valid input.";
pub const INTERPRETATION_UNAVAILABLE_MESSAGE: &str =
    "AI interpretation is unavailable right now. Please try a more specific command.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong while processing your request.";

/// Last failure seen by the execution loop
#[derive(Debug, Clone, PartialEq)]
pub enum FailureDetail {
    /// The action ran and reported this (user-facing) message
    Reported(String),
    /// The action raised; the detail is internal
    Fault(String),
    /// The attempt hit its deadline
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct FallbackHandler;

impl FallbackHandler {
    pub fn new() -> Self {
        Self
    }

    /// Ask for clarification, naming the best guess when there is one
    pub fn low_confidence(&self, intent: &IntentResult) -> ProcessingResult {
        if intent.category == IntentCategory::Unknown {
            return ProcessingResult::Partial(
                "I couldn't understand that request. Could you rephrase it, for example \
                 \"create a sphere with radius 5 at the origin\"?"
                    .into(),
            );
        }

        let guess = match intent.template_name() {
            Some(name) => format!("a {} ({})", intent.category.label(), name),
            None => format!("a {}", intent.category.label()),
        };
        ProcessingResult::Partial(format!(
            "I'm not sure what you meant. It sounded like {}, but I need more detail. \
             Could you rephrase?",
            guess
        ))
    }

    pub fn providers_exhausted(&self, attempted: usize) -> ProcessingResult {
        tracing::warn!("no AI provider produced a usable reply ({} tried)", attempted);
        ProcessingResult::Error(INTERPRETATION_UNAVAILABLE_MESSAGE.into())
    }

    /// Summarize the last failure of an execution that ran out of attempts
    pub fn execution_exhausted(
        &self,
        template: &CommandTemplate,
        attempts: u32,
        last: Option<&FailureDetail>,
    ) -> ProcessingResult {
        let reason = match last {
            Some(FailureDetail::Reported(message)) => message.clone(),
            Some(FailureDetail::TimedOut) => "the application did not respond in time".into(),
            Some(FailureDetail::Fault(_)) | None => {
                "the application reported an internal error".into()
            }
        };
        ProcessingResult::Error(format!(
            "Could not complete {} after {} attempt{}: {}",
            template.name,
            attempts,
            if attempts == 1 { "" } else { "s" },
            reason
        ))
    }

    /// Stable generic message; full detail only in the log
    pub fn internal_fault(&self, error: &PipelineError) -> ProcessingResult {
        tracing::error!("internal pipeline fault: {:?}", error);
        ProcessingResult::Error(INTERNAL_ERROR_MESSAGE.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::catalog::CommandCatalog;

    #[test]
    fn test_low_confidence_is_partial_with_guess() {
        let catalog = CommandCatalog::with_defaults();
        let intent = IntentResult {
            category: IntentCategory::DirectCommand,
            template: catalog.get("CreateBox"),
            confidence: 0.35,
            keywords: vec!["create".into()],
        };
        let result = FallbackHandler.low_confidence(&intent);
        assert!(matches!(result, ProcessingResult::Partial(_)));
        assert!(result.message().contains("command (CreateBox)"));

        let unknown = FallbackHandler.low_confidence(&IntentResult::unknown());
        assert!(matches!(unknown, ProcessingResult::Partial(_)));
    }

    #[test]
    fn test_execution_exhausted_hides_fault_detail() {
        let catalog = CommandCatalog::with_defaults();
        let sphere = catalog.get("CreateSphere").unwrap();
        let fault = FailureDetail::Fault("NullReference at geometry.rs:42".into());

        let result = FallbackHandler.execution_exhausted(&sphere, 3, Some(&fault));
        assert!(result.is_error());
        assert!(!result.message().contains("geometry.rs"));
        assert!(result.message().contains("after 3 attempts"));

        let reported = FailureDetail::Reported("radius too large".into());
        let result = FallbackHandler.execution_exhausted(&sphere, 3, Some(&reported));
        assert!(result.message().ends_with("radius too large"));
    }

    #[test]
    fn test_internal_fault_is_generic() {
        let err = PipelineError::Dispatch("socket closed: 10.0.0.3".into());
        let result = FallbackHandler.internal_fault(&err);
        assert_eq!(result, ProcessingResult::Error(INTERNAL_ERROR_MESSAGE.into()));
    }

    #[test]
    fn test_providers_exhausted_is_error() {
        assert!(FallbackHandler.providers_exhausted(2).is_error());
    }
}
