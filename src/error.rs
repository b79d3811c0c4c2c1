//! Error type shared by every store operation.

use thiserror::Error;

use crate::collection::Collection;

/// Failure of a record-store, local-storage or validation step.
///
/// A missing record is not an error: lookups return `Option` and removals
/// return `false`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The local store could not be opened, or has been closed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// An insert targeted an identifier that already exists.
    #[error("Duplicate key '{id}' in {collection}")]
    DuplicateKey { collection: Collection, id: String },

    /// Any other failure inside a transaction. The transaction was aborted.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// A record or identifier did not match its collection's schema.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<lmdb::Error> for StoreError {
    fn from(err: lmdb::Error) -> Self {
        StoreError::Transaction(format!("LMDB error: {err}"))
    }
}

impl StoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    /// The auto-id sequence of `collection` has reached `u64::MAX`.
    pub(crate) fn sequence_exhausted(collection: Collection) -> Self {
        StoreError::Validation(format!("No identifiers left in {collection}"))
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        StoreError::Transaction(format!("{what} lock poisoned"))
    }
}
