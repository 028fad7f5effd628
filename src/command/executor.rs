//! Command execution - validates, dispatches and retries with repair
//!
//! Each attempt runs Validate -> Dispatch and ends in one of:
//! - success: the created entity (if any) is recorded into the context
//! - reported failure: parameters are repaired before the next attempt
//! - raised fault or timeout: the next attempt waits `base × 2^attempt`
//!
//! Invalid parameters and unknown commands end the loop immediately.

use crate::command::catalog::CommandTemplate;
use crate::command::dispatch::{DispatchOutcome, DispatchTable};
use crate::context::{ContextStore, CreatedObject};
use crate::core::config::PipelineConfig;
use crate::core::types::{Parameters, ProcessingResult};
use crate::extract::ParameterExtractor;
use crate::fallback::{FailureDetail, FallbackHandler};
use crate::validation::SemanticValidator;
use std::sync::Arc;
use std::time::Duration;

/// Result of one `execute_with_retry` call
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: ProcessingResult,
    /// Dispatch attempts made (0 when rejected before dispatch)
    pub attempts: u32,
    /// Parameter repairs applied between attempts
    pub adjustments: u32,
    /// Entity recorded into the context, if any
    pub created: Option<CreatedObject>,
}

impl ExecutionReport {
    fn rejected(result: ProcessingResult) -> Self {
        Self { result, attempts: 0, adjustments: 0, created: None }
    }
}

/// Executes validated commands against the host's dispatch table
pub struct CommandExecutor {
    dispatch: DispatchTable,
    validator: SemanticValidator,
    extractor: Arc<ParameterExtractor>,
    fallback: FallbackHandler,
    max_attempts: u32,
    base_delay: Duration,
    dispatch_timeout: Duration,
}

impl CommandExecutor {
    pub fn new(dispatch: DispatchTable, extractor: Arc<ParameterExtractor>, config: &PipelineConfig) -> Self {
        Self {
            dispatch,
            validator: SemanticValidator::new(),
            extractor,
            fallback: FallbackHandler::new(),
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_base_delay(),
            dispatch_timeout: config.dispatch_timeout(),
        }
    }

    /// Delay after a raised fault on 0-based `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub async fn execute_with_retry(
        &self,
        template: &CommandTemplate,
        parameters: Parameters,
        store: &mut ContextStore,
    ) -> ExecutionReport {
        let original = parameters.clone();
        let mut parameters = parameters;
        let mut last_failure: Option<FailureDetail> = None;
        let mut adjustments = 0;
        let mut attempts = 0;

        for attempt in 0..self.max_attempts {
            let validation = self
                .validator
                .pre_execute_validation(template, &parameters, store.context());
            if !validation.is_valid {
                let result = ProcessingResult::Error(format!("Invalid parameters: {}", validation.message()));
                return ExecutionReport { attempts, adjustments, ..ExecutionReport::rejected(result) };
            }

            let Some(handler) = self.dispatch.get(&template.name) else {
                tracing::warn!("no handler registered for {}", template.name);
                return ExecutionReport::rejected(ProcessingResult::Error(format!(
                    "Command '{}' is not available in this application.",
                    template.name
                )));
            };

            attempts = attempt + 1;
            let is_last = attempts == self.max_attempts;

            match tokio::time::timeout(self.dispatch_timeout, handler.execute(&parameters)).await {
                Ok(Ok(outcome)) if outcome.success => {
                    return self.succeeded(template, outcome, &original, parameters, attempts, adjustments, store);
                }
                Ok(Ok(outcome)) => {
                    tracing::warn!(
                        "{} attempt {}/{} reported failure: {}",
                        template.name,
                        attempts,
                        self.max_attempts,
                        outcome.message
                    );
                    if !is_last {
                        parameters = self.extractor.adjust_parameters(&parameters, &outcome.message);
                        adjustments += 1;
                    }
                    last_failure = Some(FailureDetail::Reported(outcome.message));
                }
                Ok(Err(e)) => {
                    tracing::warn!("{} attempt {}/{} raised: {}", template.name, attempts, self.max_attempts, e);
                    last_failure = Some(FailureDetail::Fault(e.to_string()));
                    if !is_last {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        "{} attempt {}/{} timed out after {:?}",
                        template.name,
                        attempts,
                        self.max_attempts,
                        self.dispatch_timeout
                    );
                    last_failure = Some(FailureDetail::TimedOut);
                    if !is_last {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        ExecutionReport {
            result: self.fallback.execution_exhausted(template, attempts, last_failure.as_ref()),
            attempts,
            adjustments,
            created: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn succeeded(
        &self,
        template: &CommandTemplate,
        outcome: DispatchOutcome,
        original: &Parameters,
        parameters: Parameters,
        attempts: u32,
        adjustments: u32,
        store: &mut ContextStore,
    ) -> ExecutionReport {
        let changed: Vec<&str> = original
            .keys()
            .chain(parameters.keys())
            .filter(|k| original.get(*k) != parameters.get(*k))
            .map(String::as_str)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let result = if changed.is_empty() {
            ProcessingResult::Success(outcome.message)
        } else {
            ProcessingResult::Warning(format!("{} (adjusted {})", outcome.message, changed.join(", ")))
        };

        let created = outcome.entity_id.map(|id| {
            let object = CreatedObject::from_parameters(id, &template.entity_kind(), parameters);
            store.record_created(object.clone());
            object
        });

        tracing::info!("{} succeeded after {} attempt(s)", template.name, attempts);
        ExecutionReport { result, attempts, adjustments, created }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::catalog::CommandCatalog;
    use crate::command::dispatch::CommandHandler;
    use crate::core::error::{PipelineError, Result};
    use crate::core::types::{EntityId, ParamValue, Vec3};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays scripted outcomes and records the parameters of every call
    struct Scripted {
        script: Mutex<Vec<Result<DispatchOutcome>>>,
        seen: Mutex<Vec<Parameters>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<DispatchOutcome>>) -> Arc<Self> {
            Arc::new(Self { script: Mutex::new(script), seen: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<Parameters> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandHandler for Scripted {
        async fn execute(&self, parameters: &Parameters) -> Result<DispatchOutcome> {
            self.seen.lock().unwrap().push(parameters.clone());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(DispatchOutcome::created(EntityId::new(), "done"))
            } else {
                script.remove(0)
            }
        }
    }

    fn executor(handler: Arc<Scripted>) -> CommandExecutor {
        let config = PipelineConfig { retry_base_delay_ms: 1, ..PipelineConfig::default() };
        let dispatch = DispatchTable::new().with("CreateSphere", handler);
        let extractor = Arc::new(ParameterExtractor::new(5.0, 1000.0).unwrap());
        CommandExecutor::new(dispatch, extractor, &config)
    }

    fn sphere() -> Arc<CommandTemplate> {
        CommandCatalog::with_defaults().get("CreateSphere").unwrap()
    }

    fn radius(r: f64) -> Parameters {
        let mut p = Parameters::new();
        p.insert("radius".into(), ParamValue::Real(r));
        p.insert("center".into(), ParamValue::Vector(Vec3::new(1.0, 1.0, 1.0)));
        p
    }

    #[tokio::test]
    async fn test_success_first_attempt_records_entity() {
        let id = EntityId::new();
        let handler = Scripted::new(vec![Ok(DispatchOutcome::created(id, "Created sphere"))]);
        let mut store = ContextStore::new(10, 5);

        let report = executor(handler.clone()).execute_with_retry(&sphere(), radius(5.0), &mut store).await;

        assert_eq!(report.result, ProcessingResult::Success("Created sphere".into()));
        assert_eq!(report.attempts, 1);
        assert_eq!(report.adjustments, 0);
        let last = store.context().last_created.as_ref().unwrap();
        assert_eq!(last.id, id);
        assert_eq!(last.kind, "sphere");
        assert_eq!(last.position, Vec3::new(1.0, 1.0, 1.0));
    }

    #[tokio::test]
    async fn test_two_reported_failures_then_success() {
        let handler = Scripted::new(vec![
            Ok(DispatchOutcome::failed("radius too large")),
            Ok(DispatchOutcome::failed("radius still rejected")),
        ]);
        let mut store = ContextStore::new(10, 5);

        let report = executor(handler.clone()).execute_with_retry(&sphere(), radius(5000.0), &mut store).await;

        assert!(report.result.is_success());
        assert_eq!(report.attempts, 3);
        assert_eq!(report.adjustments, 2);
        let calls = handler.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0]["radius"], ParamValue::Real(5000.0));
        assert_eq!(calls[1]["radius"], ParamValue::Real(10.0));
        assert!(matches!(report.result, ProcessingResult::Warning(ref m) if m.contains("adjusted radius")));
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_dispatch() {
        let handler = Scripted::new(vec![]);
        let mut store = ContextStore::new(10, 5);

        let report = executor(handler.clone()).execute_with_retry(&sphere(), radius(-2.0), &mut store).await;

        assert!(report.result.is_error());
        assert!(report.result.message().contains("radius"));
        assert_eq!(report.attempts, 0);
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_raised_faults_exhaust_without_leaking_detail() {
        let handler = Scripted::new(vec![
            Err(PipelineError::Dispatch("segfault in kernel.dll".into())),
            Err(PipelineError::Dispatch("segfault in kernel.dll".into())),
            Err(PipelineError::Dispatch("segfault in kernel.dll".into())),
        ]);
        let mut store = ContextStore::new(10, 5);

        let report = executor(handler.clone()).execute_with_retry(&sphere(), radius(2.0), &mut store).await;

        assert!(report.result.is_error());
        assert!(!report.result.message().contains("kernel.dll"));
        assert_eq!(report.attempts, 3);
        assert_eq!(report.adjustments, 0);
        assert!(store.context().last_created.is_none());
    }

    /// Never answers within any reasonable deadline
    struct Stalled {
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl CommandHandler for Stalled {
        async fn execute(&self, _parameters: &Parameters) -> Result<DispatchOutcome> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(DispatchOutcome::created(EntityId::new(), "too late"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_timeout_retried_like_fault() {
        let handler = Arc::new(Stalled { calls: std::sync::atomic::AtomicU32::new(0) });
        let config = PipelineConfig {
            retry_base_delay_ms: 1,
            dispatch_timeout_ms: 10,
            ..PipelineConfig::default()
        };
        let extractor = Arc::new(ParameterExtractor::new(5.0, 1000.0).unwrap());
        let executor = CommandExecutor::new(
            DispatchTable::new().with("CreateSphere", handler.clone()),
            extractor,
            &config,
        );
        let mut store = ContextStore::new(10, 5);

        let report = executor.execute_with_retry(&sphere(), radius(2.0), &mut store).await;

        assert!(report.result.is_error());
        assert!(report.result.message().contains("did not respond in time"));
        assert_eq!(report.attempts, 3);
        assert_eq!(report.adjustments, 0);
        assert_eq!(handler.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert!(store.context().last_created.is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_is_error() {
        let handler = Scripted::new(vec![]);
        let catalog = CommandCatalog::with_defaults();
        let boxed = catalog.get("CreateBox").unwrap();
        let mut store = ContextStore::new(10, 5);

        let report = executor(handler).execute_with_retry(&boxed, Parameters::new(), &mut store).await;
        assert!(report.result.message().contains("not available"));
    }

    #[test]
    fn test_exponential_backoff() {
        let config = PipelineConfig::default();
        let extractor = Arc::new(ParameterExtractor::new(5.0, 1000.0).unwrap());
        let executor = CommandExecutor::new(DispatchTable::new(), extractor, &config);
        assert_eq!(executor.backoff(0), Duration::from_millis(1000));
        assert_eq!(executor.backoff(1), Duration::from_millis(2000));
        assert_eq!(executor.backoff(2), Duration::from_millis(4000));
    }
}
