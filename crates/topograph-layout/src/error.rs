//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur during placement or simulation.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A node id is not present in the registry.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// The simulation was given inconsistent input.
    #[error("invalid simulation input: {0}")]
    InvalidGraph(String),

    /// A position contained NaN or infinity.
    #[error("non-finite position for node {0}")]
    NonFinite(String),
}
