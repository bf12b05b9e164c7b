//! Placement, node registry and force layout for the topograph viewer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   parent positions   ┌──────────────────┐
//! │  Placement       │◀─────────────────────│  NodeRegistry    │
//! │  (pure fns)      │─────────────────────▶│  id → NodeInfo   │
//! └──────────────────┘   new positions      └──────────────────┘
//!                                                  ▲   │
//!                                     x/z per tick │   │ start positions
//!                                                  │   ▼
//!                                           ┌──────────────────┐
//!                                           │ ForceSimulation  │
//!                                           │ (Barnes-Hut)     │
//!                                           └──────────────────┘
//! ```
//!
//! Placement is deterministic and used for the layered/radial layout. The
//! force simulation is the alternative layout mode; it only moves nodes on
//! the ground plane so layer heights stay intact.

mod error;
pub mod geometry;
pub mod placement;
mod quadtree;
mod registry;
pub mod simulation;

pub use error::LayoutError;
pub use geometry::{Aabb, Vec3};
pub use placement::{Axis, PlacementConfig, PlacementStrategy};
pub use quadtree::{ChargeParams, PlanarPoint, QuadTree};
pub use registry::{NodeInfo, NodeRegistry};
pub use simulation::{ForceSimulation, SimulationConfig, TickOutcome};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
