//! Command model and execution
//!
//! Catalog templates describe what can be run, the dispatch table maps each
//! template name to the host action that runs it, and the executor ties the
//! two together with validation, retry and repair:
//! CommandTemplate + Parameters -> CommandExecutor -> DispatchTable -> ProcessingResult

pub mod catalog;
pub mod dispatch;
pub mod executor;

pub use catalog::{CommandCatalog, CommandTemplate, IntentCategory};
pub use dispatch::{CommandHandler, DispatchOutcome, DispatchTable};
pub use executor::{CommandExecutor, ExecutionReport};
