use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("All {attempted} AI providers failed")]
    ProvidersExhausted { attempted: usize },

    #[error("Malformed provider reply: {0}")]
    MalformedReply(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
