//! Error taxonomy for repository operations

use thiserror::Error;

/// Errors surfaced by the stock repository.
///
/// Absent records are distinguished from statement failures so callers can
/// render a 404-equivalent instead of a 5xx-equivalent. Statement failures
/// always carry the operation and the identifier under mutation. No variant
/// is retried internally; retry policy belongs to the connection owner.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("stock {0} not found")]
    NotFound(String),

    #[error("parent strain {0} not found")]
    ParentNotFound(String),

    #[error("invalid filter: {0}")]
    BadFilter(String),

    #[error("query failed in {operation} for {id}: {source}")]
    Query {
        operation: &'static str,
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("insert failed in {operation} for {id}: {source}")]
    Insert {
        operation: &'static str,
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("update failed in {operation} for {id}: {source}")]
    Update {
        operation: &'static str,
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("delete failed in {operation} for {id}: {source}")]
    Delete {
        operation: &'static str,
        id: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Fatal; occurs only at startup. The process must not begin serving.
    #[error("schema bootstrap failed at step {step}: {source}")]
    Bootstrap {
        step: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("timestamp out of range: {0}")]
    Timestamp(i64),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
