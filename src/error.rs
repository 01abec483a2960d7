use std::path::PathBuf;
use thiserror::Error;

/// Store failures. A failed load or create leaves the store exactly as it was.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate transaction id in source: {0}")]
    DuplicateId(String),

    #[error("transaction id space exhausted")]
    IdSpaceExhausted,

    #[error("failed to read snapshot {}: {source}", .path.display())]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {}: {source}", .path.display())]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
