//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No stream is registered under this id
    StreamNotFound(String),
    /// A publisher is already live on this id
    StreamAlreadyPublishing(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(id) => write!(f, "Stream not found: {}", id),
            RegistryError::StreamAlreadyPublishing(id) => {
                write!(f, "Stream already has a publisher: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
