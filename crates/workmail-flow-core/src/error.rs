/// Error types for the WorkMail flow system
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Execution engine error: {0}")]
    Engine(String),

    #[error("Execution store error: {0}")]
    Store(String),

    #[error("No execution found for invocation {0}")]
    LocatorExhausted(String),

    #[error("Malformed routing output: {0}")]
    MalformedOutput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lambda runtime error: {0}")]
    Lambda(String),
}

impl FlowError {
    /// Determines if an error is retriable by the invoking mail host
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Engine(_) => true,
            Self::Store(_) => true,
            // The execution may still show up once listings catch up
            Self::LocatorExhausted(_) => true,
            Self::MalformedOutput(_) => false,
            Self::Validation(_) => false,
            Self::Config(_) => false,
            Self::Lambda(_) => false,
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}
