//! Incremental 3D scene for topology graphs.
//!
//! This crate turns successive [`GraphModel`](topograph_core::GraphModel)
//! snapshots into an explicit scene graph:
//! - [`reconcile`] diffs a snapshot against the scene, places new entities
//!   and builds connectors
//! - [`TopologyView`] wraps a scene with its camera, hover/drag state, flow
//!   markers and refresh ordering, and is what a render loop talks to
//!
//! Rendering itself is out of scope; a renderer mirrors [`SceneGraph`].

pub mod connectors;
mod error;
mod flows;
pub mod interaction;
mod meshes;
mod reconciler;
mod refresh;
mod scene_graph;
mod settings;
mod simulation;
pub mod tween;
mod view;

pub use connectors::ConnectorStyle;
pub use error::{SceneError, SceneResult};
pub use flows::FlowSimulator;
pub use interaction::{Camera, CameraRig, DragSession, Hit, HoverDiff, HoverTracker, OrbitControls, Ray};
pub use meshes::EntityRole;
pub use reconciler::{reconcile, ConnectorRecord, ReconcilePhase, ReconcileReport, SceneContext};
pub use refresh::{RefreshGate, RefreshOutcome, RefreshTicket};
pub use scene_graph::{EntityTag, ObjectId, SceneGraph, SceneObject, Shape};
pub use settings::{CameraConfig, LayoutMode, SceneSettings, SettingsStyle};
pub use simulation::{advance, SimulationAdapter};
pub use view::{SearchResult, TopologyView, SEARCH_LIMIT};
