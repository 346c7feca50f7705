use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failure reported by a [`Fetcher`](crate::fetcher::Fetcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed ({status:?}): {message}")]
    Http { status: Option<u16>, message: String },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("Rate limited by source: {0}")]
    RateLimited(String),

    #[error("Fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Whether waiting and asking again has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::RateLimited(_) | FetchError::Other(_) => true,
            FetchError::Http { status, .. } => status.map_or(true, |code| code >= 500 || code == 429),
            FetchError::NotFound(_) | FetchError::Parse { .. } => false,
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
