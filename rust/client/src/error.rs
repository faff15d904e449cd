use thiserror::Error;

pub type GymResult<T> = Result<T, GymError>;

#[derive(Debug, Error)]
pub enum GymError {
    #[error("request to gymnasium server failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered, but not with what the protocol promises.
    #[error("unexpected reply from gymnasium server: {0}")]
    Protocol(String),

    #[error("shape mismatch: expected {expected} components, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("unsupported space: {0}")]
    UnsupportedSpace(String),
}

impl GymError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
