pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("catalog sync failed: {0}")]
    Storage(#[from] StorageError),
    #[error("catalog sync failed: {0}")]
    Other(#[from] BoxError),
    #[error("no local catalog configured")]
    NoCache,
}

impl From<ReadError> for SyncError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::NotFound => SyncError::Storage(StorageError::NotFound),
            ReadError::FallbackExhausted(storage) | ReadError::Storage(storage) => {
                SyncError::Storage(storage)
            }
            ReadError::Other(other) => SyncError::Other(other),
        }
    }
}

impl From<WriteError> for SyncError {
    fn from(value: WriteError) -> Self {
        match value {
            WriteError::Storage(storage) => SyncError::Storage(storage),
            WriteError::Other(other) => SyncError::Other(other),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("not found")]
    NotFound,
    #[error("no fallback available: {0}")]
    FallbackExhausted(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Other(#[from] BoxError),
}

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Other(#[from] BoxError),
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("no connection")]
    NoConnection,
    #[error("connection lost")]
    ConnectionLost,
    #[error("request timed out")]
    Timeout,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("server error ({0})")]
    Server(u16),
    #[error("unexpected status ({0})")]
    Status(u16),
    #[error("invalid payload: {0}")]
    Decoding(String),
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl StorageError {
    /// Maps a non-success HTTP status code to the matching error kind.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => StorageError::Unauthorized,
            403 => StorageError::Forbidden,
            404 => StorageError::NotFound,
            429 => StorageError::RateLimited,
            500..=599 => StorageError::Server(status),
            _ => StorageError::Status(status),
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StorageError::NoConnection | StorageError::ConnectionLost | StorageError::Timeout
        )
    }
}
