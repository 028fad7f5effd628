pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::{PipelineConfig, ProviderConfig};
pub use error::{PipelineError, Result};
pub use types::{EntityId, ParamValue, Parameters, ProcessingResult, Vec3};
