use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Queue index out of bound {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("Invalid media URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("Backend '{0}' error: {1}")]
    Backend(String, String),
    #[error("Coordinator has been released")]
    Released,
}

impl PlayerError {
    pub fn backend(backend: &str, message: &str) -> Self {
        PlayerError::Backend(backend.to_string(), message.to_string())
    }

    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        PlayerError::IndexOutOfBounds { index, len }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
