use crate::types::BridgeId;

/// Errors returned by [`super::StorageApi`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A bridge with this id already exists.
    #[error("bridge {0} already exists")]
    Duplicate(BridgeId),
    /// No bridge with this id exists.
    #[error("bridge {0} not found")]
    NotFound(BridgeId),
}
