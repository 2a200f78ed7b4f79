use thiserror::Error;

#[derive(Debug, Error)]
pub enum VendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Domain '{0}' not found in registry")]
    UnknownDomain(String),

    #[error("Model '{0}' not found in model configuration")]
    UnknownModel(String),

    #[error("Unsupported order scenario: {0}")]
    UnknownScenario(String),

    #[error("Missing required parameter: {0}")]
    MissingOrderParam(String),

    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("Invalid API response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid agent message: {0}")]
    InvalidAgentMessage(String),

    #[error("All evaluators failed after {retries} retries; aborting evaluation (n={panel_size})")]
    EvaluationAborted { panel_size: usize, retries: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VendError>;
