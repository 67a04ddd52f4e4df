use thiserror::Error;

/// Failures surfaced by a [`crate::gateway::FlowStore`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("flow not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response from backend: {0}")]
    InvalidResponse(&'static str),

    #[error("invalid flow document: {0}")]
    InvalidWire(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}
