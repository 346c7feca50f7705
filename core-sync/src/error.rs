use bridge_traits::FetchError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Index {index_id} of novel {novel_id} not found")]
    IndexMissing { novel_id: String, index_id: String },

    #[error("Sync run already in progress for {source_key}")]
    RunInProgress { source_key: String },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
