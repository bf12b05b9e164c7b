//! Error types for scene operations.

use thiserror::Error;
use topograph_layout::LayoutError;

/// Result type alias for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors surfaced by interaction entry points.
///
/// Reconciliation itself never fails: missing references and unknown layers
/// are logged and counted in the report instead.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The entity id is not rendered in the scene.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A drag ended without a matching drag start.
    #[error("no drag in progress")]
    NoDragSession,

    /// A drag started while another was still active.
    #[error("drag already in progress for {0}")]
    DragInProgress(String),

    /// The layout subsystem rejected an update.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
