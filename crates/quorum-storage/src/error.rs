//! Storage error types

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key in store '{store}': {detail}")]
    DuplicateKey { store: String, detail: String },

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl StorageError {
    /// Attach the store name to a constraint violation raised by the engine.
    pub(crate) fn in_store(self, store: &str) -> Self {
        match self {
            StorageError::DuplicateKey { detail, .. } => StorageError::DuplicateKey {
                store: store.to_string(),
                detail,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => {
                let detail = message.clone().unwrap_or_else(|| failure.to_string());
                match failure.code {
                    ErrorCode::ConstraintViolation => StorageError::DuplicateKey {
                        store: String::new(),
                        detail,
                    },
                    ErrorCode::CannotOpen
                    | ErrorCode::PermissionDenied
                    | ErrorCode::ReadOnly
                    | ErrorCode::DiskFull
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::NotADatabase
                    | ErrorCode::NoLargeFileSupport
                    | ErrorCode::SystemIoFailure => StorageError::StorageUnavailable(detail),
                    _ => StorageError::TransactionAborted(detail),
                }
            }
            _ => StorageError::TransactionAborted(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::InvalidRecord(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::TransactionAborted(format!("storage task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), Some("boom".into()))
    }

    #[test]
    fn test_constraint_maps_to_duplicate_key() {
        let err = StorageError::from(failure(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE));
        assert!(matches!(err, StorageError::DuplicateKey { .. }));

        let err = err.in_store("users");
        assert_eq!(
            err,
            StorageError::DuplicateKey {
                store: "users".into(),
                detail: "boom".into()
            }
        );
    }

    #[test]
    fn test_open_failures_map_to_unavailable() {
        let err = StorageError::from(failure(rusqlite::ffi::SQLITE_CANTOPEN));
        assert!(matches!(err, StorageError::StorageUnavailable(_)));

        let err = StorageError::from(failure(rusqlite::ffi::SQLITE_FULL));
        assert!(matches!(err, StorageError::StorageUnavailable(_)));
    }

    #[test]
    fn test_busy_maps_to_aborted() {
        let err = StorageError::from(failure(rusqlite::ffi::SQLITE_BUSY));
        assert!(matches!(err, StorageError::TransactionAborted(_)));
    }
}
