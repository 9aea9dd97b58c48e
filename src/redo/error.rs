//! Redo log error types.

use super::codec::Encoding;
use super::{InstanceId, RowId};
use thiserror::Error;

/// Errors raised by a redo log implementation
#[derive(Debug, Error)]
pub enum RedoError {
    /// The embedded database failed
    #[error("Storage failed: {0}")]
    Store(#[from] redb::Error),

    /// JSON encoding or decoding failed
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding or decoding failed
    #[error("Binary serialization failed: {0}")]
    Bincode(#[from] bincode::Error),

    /// Schema version is not supported by this version
    #[error("Unsupported schema version {found}, supported: {supported}")]
    UnsupportedVersion { found: u64, supported: u64 },

    /// The store was created with another record encoding
    #[error("Store records are encoded as {stored:?}, not {requested:?}")]
    EncodingMismatch {
        stored: Option<Encoding>,
        requested: Encoding,
    },

    /// No checkpoint record exists for the instance
    #[error("State machine instance {0} not found")]
    InstanceNotFound(InstanceId),

    /// No log row exists with the id
    #[error("Redo log row {0} not found")]
    RowNotFound(RowId),

    /// Backend-specific failure
    #[error("Redo log backend failed: {0}")]
    Backend(String),
}

macro_rules! store_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for RedoError {
                fn from(err: $source) -> Self {
                    Self::Store(err.into())
                }
            }
        )*
    };
}

store_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
