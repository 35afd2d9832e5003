use thiserror::Error;

/// Errors from a [`SQLStore`](crate::SQLStore).
#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    /// A UNIQUE, PRIMARY KEY or CHECK constraint rejected a write. Callers
    /// usually surface this as a conflict.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A batch could not be opened or committed. Nothing was applied.
    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("connection error: {0}")]
    Connection(String),
}
