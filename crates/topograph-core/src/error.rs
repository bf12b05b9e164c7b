//! Error types for the graph model store.

use thiserror::Error;

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while decoding or querying a graph model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The fetch payload was not valid model JSON.
    #[error("invalid model payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A vertex referenced by id does not exist in the snapshot.
    #[error("vertex not found: {id}")]
    VertexNotFound { id: String },

    /// The time window in the metadata is inverted.
    #[error("invalid time window: start {start_ms} is after end {end_ms}")]
    InvalidTimeWindow { start_ms: i64, end_ms: i64 },
}
