//! Graph model store for the topograph topology viewer.
//!
//! Holds the wire types of a fetched snapshot ([`GraphModel`]), the display
//! filter applied before layout ([`ModelView`]), and the relationship tables
//! the placement engine consumes ([`Relationships`]).

pub mod error;
pub mod model;
pub mod relationships;
pub mod view;

pub use error::{ModelError, ModelResult};
pub use model::{
    edge_types, layers, Edge, GraphMetadata, GraphModel, Kpi, Layer, Severity, TemporalAnnotation,
    TimeMetadata, Vertex, VertexKind,
};
pub use relationships::{
    severity_filters, AlarmConnection, Connection, Relationships, SituationConnection,
};
pub use view::{DisplaySettings, ModelView};
