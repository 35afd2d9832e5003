use thiserror::Error;

/// Errors from a [`KVStore`](crate::KVStore). The redb error is flattened
/// to its message.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv storage error: {0}")]
    Storage(String),
}
