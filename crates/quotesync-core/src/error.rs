use thiserror::Error;

/// Everything that can go wrong while handling quotes
///
/// Only `Validation` and `Format` are meant for the user's eyes. Storage
/// and remote failures get logged and replaced with a safe default long
/// before they could bubble up.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid quote: {0}")]
    Validation(String),

    #[error("Invalid import file: {0}")]
    Format(String),

    #[error("Stored data unreadable: {0}")]
    StorageRead(String),

    #[error("Remote source unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors the user should see as a rejected operation
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Format(_))
    }
}

impl From<quotesync_cache::StoreError> for Error {
    fn from(err: quotesync_cache::StoreError) -> Self {
        Error::StorageRead(err.to_string())
    }
}

impl From<quotesync_api::ApiError> for Error {
    fn from(err: quotesync_api::ApiError) -> Self {
        Error::RemoteUnavailable(err.to_string())
    }
}
